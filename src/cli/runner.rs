//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::connector::Tap;
use crate::engine::SyncConfig;
use crate::error::{Error, Result, ResultExt};
use crate::output::JsonLinesWriter;
use crate::state::StateManager;
use serde_json::{json, Value};
use std::io::{self, BufWriter};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Read {
                streams,
                max_records,
                state_per_page,
            } => {
                self.read(streams.as_deref(), *max_records, *state_per_page)
                    .await
            }
        }
    }

    /// Load configuration
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        TapConfig::from_file(path)
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence, the file still receives updates
        match (&self.cli.state_json, &self.cli.state) {
            (Some(state_json), Some(path)) => Ok(StateManager::from_json(state_json)
                .context("Invalid --state-json")?
                .persist_to(path)),
            (Some(state_json), None) => {
                StateManager::from_json(state_json).context("Invalid --state-json")
            }
            (None, Some(path)) => StateManager::from_file(path)
                .with_context(|| format!("Failed to load state from {}", path.display())),
            (None, None) => Ok(StateManager::in_memory()),
        }
    }

    fn build_tap(&self) -> Result<Tap> {
        Tap::new(self.load_config()?, self.load_state()?)
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let tap = self.build_tap()?;
        let result = tap.check().await;

        let status = if result.success { "SUCCEEDED" } else { "FAILED" };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": status,
                "message": result.message.as_deref().unwrap_or("Connection successful")
            }
        }));

        if result.success {
            Ok(())
        } else {
            Err(Error::CheckFailed {
                message: result.message.unwrap_or_default(),
            })
        }
    }

    /// Discover streams
    fn discover(&self) -> Result<()> {
        let tap = self.build_tap()?;
        self.output_message(&tap.discover());
        Ok(())
    }

    /// Read streams to stdout
    async fn read(
        &self,
        streams: Option<&str>,
        max_records: Option<usize>,
        state_per_page: bool,
    ) -> Result<()> {
        let tap = self.build_tap()?;
        let sync_config = SyncConfig::new()
            .with_state_per_page(state_per_page)
            .with_max_records(max_records.unwrap_or(0));

        let mut sink = JsonLinesWriter::new(BufWriter::new(io::stdout()));
        let report = tap.sync(streams, sync_config, &mut sink).await?;

        if report.is_success() {
            return Ok(());
        }

        let failed: Vec<String> = report
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.stream, f.error))
            .collect();
        Err(Error::StreamsFailed {
            failed: failed.len(),
            summary: failed.join("; "),
        })
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
