use std::io::Write;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use super::sink::LogSink;

/// Mirrors documents to an S3 bucket under `{prefix}/`, optionally gzipped.
pub struct S3Sink {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    gzip: bool,
}

impl S3Sink {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str, gzip: bool) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: "xes".to_string(),
            gzip,
        }
    }

    /// Creates a sink using the ambient AWS configuration (env vars, instance
    /// profile, etc.).
    pub async fn from_env(bucket: &str, gzip: bool) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, gzip)
    }

    fn key(&self, name: &str) -> String {
        if self.gzip {
            format!("{}/{}.gz", self.prefix, name)
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

/// Gzip-compresses `body` in memory.
pub fn gzip_bytes(body: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

#[async_trait]
impl LogSink for S3Sink {
    async fn put(&self, name: &str, body: Bytes) -> Result<()> {
        let key = self.key(name);
        let body = if self.gzip {
            Bytes::from(gzip_bytes(&body)?)
        } else {
            body
        };
        debug!(bucket = %self.bucket, key = %key, bytes = body.len(), "Uploading log to S3");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/xml")
            .send()
            .await?;

        Ok(())
    }

    fn location(&self, name: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_round_trips() {
        let compressed = gzip_bytes(b"<log></log>").unwrap();
        let mut decoded = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();

        assert_eq!(decoded, "<log></log>");
    }
}
