use super::schema::PinpointConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_CONFIG: &str = "pinpoint.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Files consulted by [`load_default`](Self::load_default), first match wins.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".").join(LOCAL_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".pinpoint").join("config.yaml"));
        }
        paths
    }

    /// First file from [`search_paths`](Self::search_paths) that exists, or
    /// the built-in defaults when none does.
    pub async fn load_default() -> Result<PinpointConfig, ConfigError> {
        for path in Self::search_paths() {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Self::load_from(&path).await;
            }
        }
        Ok(PinpointConfig::default())
    }

    /// Sections and fields missing from the file keep their defaults.
    pub async fn load_from(path: &Path) -> Result<PinpointConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
