//! # File Download Strategy
//!
//! Serves `file://` URLs by reading the local file. The payload goes into the
//! session base64 encoded so any parse strategy can pick it up.

use super::keys;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pipeline_base::log_debug;
use pipeline_base::models::StrategyConfig;
use pipeline_base::session::{Delta, Session};
use pipeline_base::strategies::{
    standard, ExecutionError, PluginRegistrar, Strategy, StrategyImplementation, StrategyKind,
};
use std::path::PathBuf;
use std::sync::Arc;

const MODULE: &str = module_path!();

pub fn register(registrar: &mut PluginRegistrar<'_>) {
    registrar
        .export(MODULE, "FileDownload", load_file_download)
        .declare(StrategyKind::Download, "file", MODULE, "FileDownload");
}

fn load_file_download() -> Result<Arc<dyn StrategyImplementation>, String> {
    Ok(standard("file-download", FileDownload::new).shared())
}

pub struct FileDownload {
    config: StrategyConfig,
    path: PathBuf,
}

impl FileDownload {
    pub fn new(config: StrategyConfig) -> Result<Self, ExecutionError> {
        let url = config
            .get_str("downloadUrl")
            .ok_or_else(|| ExecutionError::InvalidConfiguration {
                reason: "downloadUrl is required".to_string(),
            })?;
        let path = file_path(url)?;
        Ok(Self { config, path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Local path of a `file:` URL (`file:///tmp/a.json` and `file:/tmp/a.json`)
fn file_path(url: &str) -> Result<PathBuf, ExecutionError> {
    let rest = url
        .strip_prefix("file://")
        .or_else(|| url.strip_prefix("file:"))
        .ok_or_else(|| ExecutionError::InvalidConfiguration {
            reason: format!("'{}' is not a file URL", url),
        })?;

    // file://localhost/path
    let rest = rest.strip_prefix("localhost").unwrap_or(rest);
    if rest.is_empty() {
        return Err(ExecutionError::InvalidConfiguration {
            reason: format!("'{}' has no path", url),
        });
    }
    Ok(PathBuf::from(rest))
}

#[async_trait]
impl Strategy for FileDownload {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    async fn initialize(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        // Fail early when the file is not there
        tokio::fs::metadata(&self.path).await?;
        Ok(Delta::new())
    }

    async fn get(&self, _session: &Session) -> Result<Delta, ExecutionError> {
        let bytes = tokio::fs::read(&self.path).await?;
        log_debug!("Resource read", "bytes" => bytes.len(), "path" => self.path.display());

        Ok(Delta::new()
            .with(keys::CONTENT_LENGTH, bytes.len())
            .with(keys::CONTENT_BASE64, STANDARD.encode(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::io::Write;

    fn config(url: &str) -> StrategyConfig {
        StrategyConfig::from_value(StrategyKind::Download, json!({ "downloadUrl": url })).unwrap()
    }

    #[test]
    fn file_urls_map_to_paths() {
        assert_eq!(file_path("file:///tmp/a.json").unwrap(), PathBuf::from("/tmp/a.json"));
        assert_eq!(file_path("file:/tmp/a.json").unwrap(), PathBuf::from("/tmp/a.json"));
        assert_eq!(
            file_path("file://localhost/tmp/a.json").unwrap(),
            PathBuf::from("/tmp/a.json")
        );
        assert_matches!(
            file_path("https://example.org/a.json"),
            Err(ExecutionError::InvalidConfiguration { .. })
        );
        assert_matches!(file_path("file://"), Err(ExecutionError::InvalidConfiguration { .. }));
    }

    #[tokio::test]
    async fn get_returns_encoded_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();
        let url = format!("file://{}", file.path().display());

        let strategy = FileDownload::new(config(&url)).unwrap();
        strategy.initialize(&Session::new()).await.unwrap();
        let delta = strategy.get(&Session::new()).await.unwrap();

        assert_eq!(delta.get(keys::CONTENT_LENGTH), Some(&json!(5)));
        assert_eq!(delta.get(keys::CONTENT_BASE64), Some(&json!("aGVsbG8=")));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().join("absent.txt").display());
        let strategy = FileDownload::new(config(&url)).unwrap();

        assert_matches!(
            strategy.initialize(&Session::new()).await,
            Err(ExecutionError::Io(_))
        );
        assert_matches!(strategy.get(&Session::new()).await, Err(ExecutionError::Io(_)));
    }
}
