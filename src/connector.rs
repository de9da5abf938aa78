//! The tap
//!
//! Wires configuration, catalog, authentication, transport and state into the
//! three operations a tap exposes: check, discover and sync.

use crate::auth::{TokenProvider, TokenProviderConfig};
use crate::config::TapConfig;
use crate::decode::{PostProcessor, RecordExtractor};
use crate::engine::{StreamRunner, SyncConfig, SyncStats};
use crate::error::{Error, Result};
use crate::http::{PageFetcher, PageRequest, Transport, TransportConfig};
use crate::output::{Message, MessageSink};
use crate::pagination::Paginator;
use crate::state::{ReplicationTracker, StateManager};
use crate::streams::{Catalog, StreamDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Sync Report
// ============================================================================

/// A stream that did not finish
#[derive(Debug, Clone)]
pub struct StreamFailure {
    /// Stream name
    pub stream: String,
    /// Error description
    pub error: String,
}

/// Outcome of a sync over several streams
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Streams that completed
    pub completed: Vec<SyncStats>,
    /// Streams that failed
    pub failed: Vec<StreamFailure>,
}

impl SyncReport {
    /// Whether every selected stream completed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Records emitted by completed streams
    pub fn total_records(&self) -> usize {
        self.completed.iter().map(|s| s.records_synced).sum()
    }
}

// ============================================================================
// Tap
// ============================================================================

/// Apaleo tap
#[derive(Debug)]
pub struct Tap {
    config: TapConfig,
    catalog: Catalog,
    tokens: Arc<TokenProvider>,
    fetcher: Arc<PageFetcher>,
    extractor: Arc<RecordExtractor>,
    state: StateManager,
}

impl Tap {
    /// Create a tap over the built-in catalog
    pub fn new(config: TapConfig, state: StateManager) -> Result<Self> {
        Self::with_catalog(config, Catalog::builtin()?, state)
    }

    /// Create a tap over a custom catalog
    pub fn with_catalog(config: TapConfig, catalog: Catalog, state: StateManager) -> Result<Self> {
        config.validate()?;

        let tokens = Arc::new(TokenProvider::new(TokenProviderConfig::from(&config)));
        let transport = Transport::new(TransportConfig::from_tap_config(&config)?)?;
        let fetcher = Arc::new(PageFetcher::new(transport, Arc::clone(&tokens)));

        Ok(Self {
            config,
            catalog,
            tokens,
            fetcher,
            extractor: Arc::new(RecordExtractor::new()),
            state,
        })
    }

    /// Transform or drop records before they are emitted
    #[must_use]
    pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.extractor = Arc::new(RecordExtractor::with_post_processor(processor));
        self
    }

    /// State manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Shared token provider
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Verify credentials and API access
    ///
    /// Fetches one record of the properties stream.
    pub async fn check(&self) -> CheckResult {
        match self.probe().await {
            Ok(()) => {
                info!("Connection check succeeded");
                CheckResult::success()
            }
            Err(e) => {
                error!(error = %e, "Connection check failed");
                CheckResult::failure(e.to_string())
            }
        }
    }

    async fn probe(&self) -> Result<()> {
        let stream = self.probe_stream()?;
        let request = PageRequest::new(&stream.path, 1).param("pageSize", 1);
        let response = self.fetcher.fetch(stream, &request).await?;
        if !response.is_no_content() {
            response.json()?;
        }
        Ok(())
    }

    fn probe_stream(&self) -> Result<&StreamDescriptor> {
        self.catalog.get("properties").or_else(|_| {
            self.catalog
                .streams()
                .first()
                .ok_or_else(|| Error::config("catalog has no streams"))
        })
    }

    /// Discovery document for the catalog
    pub fn discover(&self) -> Value {
        self.catalog.discover()
    }

    /// Sync the selected streams, in catalog order
    ///
    /// `selection` is a comma-separated list of stream names, `None` for all.
    /// A failing stream is recorded in the report and the next stream still
    /// runs, except for authentication failures, which end the run. A final
    /// `STATE` message is emitted either way.
    pub async fn sync(
        &self,
        selection: Option<&str>,
        sync_config: SyncConfig,
        sink: &mut dyn MessageSink,
    ) -> Result<SyncReport> {
        let streams = self.catalog.select(selection)?;
        let runner = StreamRunner::new(
            Arc::clone(&self.fetcher),
            Paginator::new(self.config.page_size),
        )
        .with_extractor(Arc::clone(&self.extractor))
        .with_config(sync_config);
        let mut tracker = ReplicationTracker::from_config(&self.config, self.state.clone());

        info!(streams = streams.len(), "Starting sync");
        let mut report = SyncReport::default();
        let mut fatal = None;

        for stream in streams {
            match runner.run(stream, &mut tracker, sink).await {
                Ok(stats) => report.completed.push(stats),
                Err(e) if e.is_auth() => {
                    error!(stream = %stream.name, error = %e, "Authentication failed, aborting run");
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    error!(stream = %stream.name, error = %e, "Stream failed");
                    report.failed.push(StreamFailure {
                        stream: stream.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        sink.flush()?;
        self.state.save().await?;
        sink.emit(Message::state(&self.state.snapshot().await)?)?;
        sink.flush()?;

        if let Some(e) = fatal {
            return Err(e);
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            records = report.total_records(),
            "Sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_success() {
        let result = CheckResult::success();
        assert!(result.success);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_check_result_failure() {
        let result = CheckResult::failure("bad credentials");
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("bad credentials"));
    }

    #[test]
    fn test_sync_report() {
        let mut report = SyncReport::default();
        assert!(report.is_success());

        let mut stats = SyncStats::new("units");
        stats.records_synced = 3;
        report.completed.push(stats);
        report.failed.push(StreamFailure {
            stream: "properties".to_string(),
            error: "boom".to_string(),
        });

        assert!(!report.is_success());
        assert_eq!(report.total_records(), 3);
    }

    #[test]
    fn test_tap_rejects_invalid_config() {
        let config = TapConfig::new("", "secret", chrono::Utc::now());
        assert!(Tap::new(config, StateManager::in_memory()).is_err());
    }

    #[test]
    fn test_discover_lists_builtin_streams() {
        let config = TapConfig::new("id", "secret", chrono::Utc::now());
        let tap = Tap::new(config, StateManager::in_memory()).unwrap();
        let doc = tap.discover();
        assert_eq!(doc["streams"].as_array().unwrap().len(), 6);
    }
}
