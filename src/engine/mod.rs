//! Execution engine module
//!
//! The per-stream pull loop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `StreamRunner` - Fetches, extracts and emits one stream page by page
//! - `SyncConfig` - Configuration for sync operations
//! - `SyncStats` - What a stream run did
//!
//! Pages of a stream are fetched strictly one after another, since each
//! page number depends on the previous response.

mod types;

pub use types::{SyncConfig, SyncStats};

use crate::decode::RecordExtractor;
use crate::error::{Error, Result};
use crate::http::{PageFetcher, PageRequest, PageResponse};
use crate::output::{Message, MessageSink};
use crate::pagination::{PageToken, Paginator};
use crate::state::{ReplicationTracker, StartingPoint, StreamBookmark};
use crate::streams::{RequestStyle, StreamDescriptor};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs streams against the API
#[derive(Debug)]
pub struct StreamRunner {
    /// Page fetcher shared by every stream of the run
    fetcher: Arc<PageFetcher>,
    /// Record extractor
    extractor: Arc<RecordExtractor>,
    /// Paginator
    paginator: Paginator,
    /// Sync configuration
    config: SyncConfig,
}

/// Whether the page loop ran to the end or stopped at the record limit
enum PageOutcome {
    Continue,
    LimitReached,
}

impl StreamRunner {
    /// Create a new stream runner
    pub fn new(fetcher: Arc<PageFetcher>, paginator: Paginator) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(RecordExtractor::new()),
            paginator,
            config: SyncConfig::default(),
        }
    }

    /// Use a custom record extractor
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<RecordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the request for one page of `stream`
    pub fn build_request(
        &self,
        stream: &StreamDescriptor,
        token: PageToken,
        start: Option<&StartingPoint>,
    ) -> PageRequest {
        let mut request = PageRequest::new(&stream.path, token.number())
            .param("pageSize", self.paginator.page_size());

        if token != PageToken::FIRST {
            request = request.param("pageNumber", token);
        }

        if let Some(key) = &stream.replication_key {
            request = request.param("sort", format!("{key}:asc"));
        }

        if !stream.expand.is_empty() {
            request = request.param("expand", stream.expand.join(","));
        }

        match &stream.style {
            RequestStyle::Plain => {}
            RequestStyle::ModificationWindow { date_filter } => {
                request = request.param("dateFilter", date_filter);
                if let Some(start) = start {
                    request = request.param("from", start.as_param());
                }
            }
        }

        request
    }

    /// Run one stream from page 1 to the end
    ///
    /// Emits the stream's `SCHEMA` message, then every record as soon as its
    /// page arrives. The bookmark is persisted when the stream finishes and
    /// also when a page fails, covering only records already emitted. The
    /// sink is flushed before every persist.
    pub async fn run(
        &self,
        stream: &StreamDescriptor,
        tracker: &mut ReplicationTracker,
        sink: &mut dyn MessageSink,
    ) -> Result<SyncStats> {
        let started = Instant::now();
        let mut stats = SyncStats::new(&stream.name);

        sink.emit(Message::schema(stream))?;

        let start = tracker.starting_point(stream).await;
        match &start {
            Some(point) => info!(
                stream = %stream.name,
                from = %point.as_param(),
                bookmark = point.is_from_bookmark(),
                "Starting incremental sync"
            ),
            None => info!(stream = %stream.name, "Starting full table sync"),
        }

        let result = self
            .pull(stream, start.as_ref(), tracker, sink, &mut stats)
            .await;

        let persisted = self.checkpoint(stream, tracker, sink).await;
        stats.set_duration(started.elapsed().as_millis() as u64);

        match (result, persisted) {
            (Ok(()), Ok(bookmark)) => {
                stats.bookmark = bookmark.map(|b| b.replication_key_value);
                info!(
                    stream = %stream.name,
                    records = stats.records_synced,
                    pages = stats.pages_fetched,
                    duration_ms = stats.duration_ms,
                    "Stream complete"
                );
                Ok(stats)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), persisted) => {
                if let Err(persist_err) = persisted {
                    warn!(stream = %stream.name, error = %persist_err, "Failed to persist bookmark after error");
                }
                Err(e)
            }
        }
    }

    async fn pull(
        &self,
        stream: &StreamDescriptor,
        start: Option<&StartingPoint>,
        tracker: &mut ReplicationTracker,
        sink: &mut dyn MessageSink,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let mut token = PageToken::FIRST;

        loop {
            let request = self.build_request(stream, token, start);
            let page = token.number();

            let response = self
                .fetcher
                .fetch(stream, &request)
                .await
                .map_err(|e| e.in_stream(&stream.name, page))?;
            stats.add_page();

            let outcome = self.emit_page(stream, page, &response, tracker, sink, stats)?;

            if self.config.emit_state_per_page {
                self.checkpoint(stream, tracker, sink)
                    .await
                    .map_err(|e| e.in_stream(&stream.name, page))?;
                let state = tracker.state().snapshot().await;
                sink.emit(Message::state(&state)?)
                    .map_err(|e| e.in_stream(&stream.name, page))?;
            }

            if let PageOutcome::LimitReached = outcome {
                info!(stream = %stream.name, max_records = self.config.max_records, "Record limit reached");
                return Ok(());
            }

            match self
                .paginator
                .next_page_token(&response, Some(token))
                .map_err(|e| Error::protocol(&stream.name, page, e.to_string()))?
            {
                Some(next) => token = next,
                None => {
                    debug!(stream = %stream.name, page, "No more pages");
                    return Ok(());
                }
            }
        }
    }

    /// Flush the sink, then persist the bookmark
    ///
    /// A bookmark is only written once every record it covers has left the
    /// sink, so a crash can never resume past undelivered records.
    async fn checkpoint(
        &self,
        stream: &StreamDescriptor,
        tracker: &mut ReplicationTracker,
        sink: &mut dyn MessageSink,
    ) -> Result<Option<StreamBookmark>> {
        sink.flush()?;
        tracker.persist(stream).await
    }

    fn emit_page(
        &self,
        stream: &StreamDescriptor,
        page: u32,
        response: &PageResponse,
        tracker: &mut ReplicationTracker,
        sink: &mut dyn MessageSink,
        stats: &mut SyncStats,
    ) -> Result<PageOutcome> {
        let records = self
            .extractor
            .extract(stream, response)
            .map_err(|e| Error::protocol(&stream.name, page, e.to_string()))?;

        let mut emitted = 0usize;
        for record in records {
            sink.emit(Message::record(&stream.name, record.clone()))
                .map_err(|e| e.in_stream(&stream.name, page))?;
            tracker.observe(stream, &record);
            stats.add_record();
            emitted += 1;

            if self.config.limit_reached(stats.records_synced) {
                return Ok(PageOutcome::LimitReached);
            }
        }

        debug!(stream = %stream.name, page, records = emitted, "Page emitted");
        Ok(PageOutcome::Continue)
    }
}
