use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Destination for a finished log document.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Stores `body` under `name` (e.g. `ToeiBus.xes`).
    async fn put(&self, name: &str, body: Bytes) -> Result<()>;

    /// Human-readable location, for logs.
    fn location(&self, name: &str) -> String;
}
