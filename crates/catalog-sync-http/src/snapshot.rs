use std::path::{Component, Path, PathBuf};

use serde_json::Value;

/// Errors writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot name {0:?} escapes the snapshot root")]
    InvalidName(String),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory of JSON snapshots of raw source responses.
///
/// Each name maps to `<root>/<name>.json` and is overwritten on every save.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, SnapshotError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(SnapshotError::InvalidName(name.to_owned()));
        }

        Ok(self.root.join(format!("{name}.json")))
    }

    /// Write `payload` under `name`, replacing any previous snapshot.
    pub async fn save(&self, name: &str, payload: &Value) -> Result<PathBuf, SnapshotError> {
        let path = self.path_for(name)?;
        let bytes = serde_json::to_vec_pretty(payload)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SnapshotError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(path)
    }
}
