use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;

use super::sink::LogSink;

/// Writes documents into a local directory, replacing any previous file.
pub struct LocalDirSink {
    dir: PathBuf,
}

impl LocalDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl LogSink for LocalDirSink {
    async fn put(&self, name: &str, body: Bytes) -> Result<()> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    fn location(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_put_writes_file() {
        let dir = std::env::temp_dir().join("gtfs_rt_xes_test_local_sink");
        fs::create_dir_all(&dir).unwrap();
        let sink = LocalDirSink::new(&dir);

        sink.put("Feed.xes", Bytes::from_static(b"<log/>")).await.unwrap();
        sink.put("Feed.xes", Bytes::from_static(b"<log></log>")).await.unwrap();

        assert_eq!(fs::read_to_string(dir.join("Feed.xes")).unwrap(), "<log></log>");
        assert!(sink.location("Feed.xes").ends_with("Feed.xes"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_put_into_missing_dir_fails() {
        let dir = std::env::temp_dir().join("gtfs_rt_xes_test_local_sink_missing");
        let _ = fs::remove_dir_all(&dir);
        let sink = LocalDirSink::new(&dir);

        assert!(sink.put("Feed.xes", Bytes::new()).await.is_err());
    }
}
