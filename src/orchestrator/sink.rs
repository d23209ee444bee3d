use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::FileError;

/// JSON array file that always holds a complete document.
///
/// Each write goes to a sibling temp file which is then renamed over the target,
/// so a reader sees either the previous snapshot or the new one.
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the batch with an empty array
    pub async fn initialize(&self) -> Result<(), FileError> {
        self.write(&[]).await
    }

    pub async fn write(&self, records: &[JsonValue]) -> Result<(), FileError> {
        let mut document = serde_json::to_string_pretty(records)
            .map_err(|e| FileError::write(&self.path, std::io::Error::other(e)))?;
        document.push('\n');

        let tmp = self.temp_path();
        if let Err(e) = write_file(&tmp, document.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(FileError::write(&tmp, e));
        }

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            FileError::write(&self.path, e)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results.json".to_string());
        self.path
            .with_file_name(format!(".{name}.tmp-{}", std::process::id()))
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("out.json"));
        sink.initialize().await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(serde_json::from_str::<JsonValue>(&content).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("out.json"));
        sink.write(&[json!({"lcsc_code": "C1", "success": true})]).await.unwrap();
        sink.write(&[json!({"lcsc_code": "C1"}), json!({"lcsc_code": "C2"})]).await.unwrap();

        let content: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert_eq!(content.as_array().unwrap().len(), 2);

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path().join("missing").join("out.json"));
        assert!(matches!(
            sink.initialize().await,
            Err(FileError::WriteFailed { .. })
        ));
    }
}
