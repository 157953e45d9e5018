//! Where finished log documents go.
//!
//! Every conversion writes to a [`LocalDirSink`]; an [`S3Sink`] can be added
//! to mirror the same bytes to a bucket.

mod local;
mod s3;
mod sink;

pub use local::LocalDirSink;
pub use s3::{S3Sink, gzip_bytes};
pub use sink::LogSink;

use anyhow::Result;
use bytes::Bytes;
use tracing::info;

/// Hands `body` to every sink in order, stopping at the first failure.
pub async fn publish(sinks: &[Box<dyn LogSink>], name: &str, body: Bytes) -> Result<()> {
    for sink in sinks {
        sink.put(name, body.clone()).await?;
        info!(location = %sink.location(name), bytes = body.len(), "Log written");
    }
    Ok(())
}
