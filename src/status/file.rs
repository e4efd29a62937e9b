//! JSON-file status store.
//!
//! One document per policy at `<dir>/<policy>.json`:
//!
//! ```json
//! {"policy":"p1","lastRotationTime":"2024-01-01T00:05:00Z"}
//! ```
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the document, so a crash never leaves a truncated document behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{Result, StatusError};
use super::StatusStore;
use crate::recycler::RotationState;

#[derive(Debug, Serialize, Deserialize)]
struct StatusDocument {
    policy: String,
    #[serde(flatten)]
    state: RotationState,
}

/// Whether `policy` can name a status document: `[A-Za-z0-9._-]`, not
/// empty and not starting with a dot.
pub fn is_storable_name(policy: &str) -> bool {
    !policy.is_empty()
        && !policy.starts_with('.')
        && policy.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// [`StatusStore`] writing one JSON document per policy into a directory.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    /// The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the document for `policy`; see [`is_storable_name`].
    pub fn document_path(&self, policy: &str) -> Result<PathBuf> {
        if !is_storable_name(policy) {
            return Err(StatusError::invalid_name(policy));
        }
        Ok(self.dir.join(format!("{}.json", policy)))
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn load(&self, policy: &str) -> Result<RotationState> {
        let path = self.document_path(policy)?;
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RotationState::default());
            }
            Err(e) => return Err(StatusError::io(path, e)),
        };

        let document: StatusDocument =
            serde_json::from_slice(&content).map_err(|e| StatusError::serialization(&path, e))?;
        if document.policy != policy {
            tracing::warn!(
                policy = %policy,
                stored_policy = %document.policy,
                path = %path.display(),
                "Status document names a different policy"
            );
        }
        Ok(document.state)
    }

    async fn save(&self, policy: &str, state: &RotationState) -> Result<()> {
        let path = self.document_path(policy)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| StatusError::io(&self.dir, e))?;

        let document = StatusDocument { policy: policy.to_string(), state: *state };
        let content =
            serde_json::to_vec_pretty(&document).map_err(|e| StatusError::serialization(&path, e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content).await.map_err(|e| StatusError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| StatusError::io(&path, e))?;

        tracing::debug!(policy = %policy, path = %path.display(), "Saved rotation state");
        Ok(())
    }
}
