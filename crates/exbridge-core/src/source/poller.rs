//! Polling content source for the exchange file.
//!
//! Reads `<exchange_dir>/<file_name>` on a fixed interval and forwards the
//! text when its SHA256 digest differs from the last forwarded blob. A
//! half-written file simply fails to parse in the pipeline; the next poll
//! after the writer finishes sees a new digest and forwards the full file.

use crate::errors::{BridgeError, ExError, Result};
use crate::pipeline::ContentFeed;
use crate::snapshot::digest::content_digest;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// File the upstream process writes into the exchange directory
pub const DEFAULT_EXCHANGE_FILE: &str = "ak-eep-out.json";
pub const DEFAULT_EXCHANGE_DIR: &str = "./exchange";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub exchange_dir: PathBuf,
    pub file_name: String,
    pub poll_interval: Duration,
}

impl WatchConfig {
    pub fn new(exchange_dir: impl Into<PathBuf>) -> Self {
        Self {
            exchange_dir: exchange_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Full path of the watched file
    pub fn exchange_file(&self) -> PathBuf {
        self.exchange_dir.join(&self.file_name)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            exchange_dir: PathBuf::from(DEFAULT_EXCHANGE_DIR),
            file_name: DEFAULT_EXCHANGE_FILE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a single poll observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// New content was handed to the feed
    Forwarded,
    /// Content identical to the last forwarded blob
    Unchanged,
    /// The exchange file does not exist (yet)
    Missing,
}

pub struct ExchangePoller {
    config: WatchConfig,
    feed: ContentFeed,
    last_digest: Option<String>,
    last_error: Option<String>,
}

impl ExchangePoller {
    pub fn new(config: WatchConfig, feed: ContentFeed) -> Self {
        Self {
            config,
            feed,
            last_digest: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Read the exchange file once and forward it if it changed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read.
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        let path = self.config.exchange_file();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PollOutcome::Missing);
            }
            Err(err) => return Err(BridgeError::io(&path, &err)),
        };

        let digest = content_digest(&bytes);
        if self.last_digest.as_deref() == Some(digest.as_str()) {
            return Ok(PollOutcome::Unchanged);
        }

        let text = decode(&path, bytes);
        self.feed.on_content_changed(text);
        tracing::debug!(
            path = %path.display(),
            content_digest = &digest[..12],
            "exchange content changed"
        );
        self.last_digest = Some(digest);
        Ok(PollOutcome::Forwarded)
    }

    /// Poll until the feed closes.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            path = %self.config.exchange_file().display(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "watching exchange file"
        );

        loop {
            ticker.tick().await;
            if self.feed.is_closed() {
                break;
            }
            match self.poll_once().await {
                Ok(PollOutcome::Missing) => self.report_missing(),
                Ok(_) => self.last_error = None,
                Err(err) => self.report_error(err),
            }
        }
        tracing::debug!("exchange poller stopped");
    }

    /// Run the poller as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn report_missing(&mut self) {
        let message = "missing".to_string();
        if self.last_error.as_ref() != Some(&message) {
            tracing::debug!(
                path = %self.config.exchange_file().display(),
                "exchange file not present yet"
            );
            self.last_error = Some(message);
        }
    }

    // Repeated identical failures are logged once
    fn report_error(&mut self, err: BridgeError) {
        let message = err.to_string();
        if self.last_error.as_ref() != Some(&message) {
            let ex_err: ExError = err.into();
            tracing::warn!(
                err.code = ex_err.code(),
                error = %ex_err,
                "exchange poll failed"
            );
            self.last_error = Some(message);
        }
    }
}

/// Decode file bytes, replacing invalid UTF-8 rather than dropping the blob.
fn decode(path: &Path, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                valid_up_to = err.utf8_error().valid_up_to(),
                "exchange file is not valid UTF-8; replacing invalid bytes"
            );
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}
