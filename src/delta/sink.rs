use super::Update;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Downstream publisher for finished updates. Fire-and-forget: callers log
/// failures and move on, they never retry.
#[async_trait]
pub trait DeltaSink: Send {
    async fn publish(&mut self, update: Update) -> Result<(), SinkError>;
}

/// Renders each update as a SignalK delta document on stdout, one JSON
/// object per line.
#[derive(Debug, Default)]
pub struct StdoutDeltaSink;

impl StdoutDeltaSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeltaSink for StdoutDeltaSink {
    async fn publish(&mut self, update: Update) -> Result<(), SinkError> {
        let delta = json!({
            "context": "vessels.self",
            "updates": [{
                "$source": update.source,
                "timestamp": update.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                "values": update.values,
            }],
        });

        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer(&mut stdout, &delta).map_err(std::io::Error::from)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Collects published updates in memory. Used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    updates: Arc<Mutex<Vec<Update>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Update> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeltaSink for MemorySink {
    async fn publish(&mut self, update: Update) -> Result<(), SinkError> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}
