// src/services/storage.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::AppError;

/// Where uploaded speaking audio ends up.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persists `payload` and returns the storage reference to keep on the submission row.
    async fn save(&self, payload: &[u8], suggested_name: &str) -> Result<String, AppError>;

    /// Deletes a previously saved payload. Missing files are not an error.
    async fn remove(&self, reference: &str) -> Result<(), AppError>;
}

/// Stores files under `<root>/speaking_submissions/`.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

const SUBDIR: &str = "speaking_submissions";

/// Only the final path component is honoured.
fn file_name_of(name: &str) -> Result<&str, AppError> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid file name '{}'", name)))
}

impl LocalDiskStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SubmissionStore for LocalDiskStore {
    async fn save(&self, payload: &[u8], suggested_name: &str) -> Result<String, AppError> {
        let file_name = file_name_of(suggested_name)?;

        let dir = self.root.join(SUBDIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(file_name), payload).await?;

        Ok(format!("{}/{}", SUBDIR, file_name))
    }

    async fn remove(&self, reference: &str) -> Result<(), AppError> {
        let path = self.root.join(SUBDIR).join(file_name_of(reference)?);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
