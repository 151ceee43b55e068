use crate::errors::{Error, Result};
use crate::storage::naming::is_plain_file_name;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Trait for file storage backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stream `content` into the file `file_name`, returning the number of bytes written
    async fn store(&self, file_name: &str, content: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64>;

    /// Retrieve the full content of `file_name`
    async fn retrieve(&self, file_name: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// Local Filesystem Storage Implementation
// ============================================================================

/// Local filesystem storage backend - one flat directory, one file per upload
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Create the backing directory if it does not exist yet
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        tracing::info!(dir = %self.base_path.display(), "Upload directory ready");
        Ok(())
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(file_name) {
            return Err(Error::BadRequest {
                message: format!("Invalid storage file name: {file_name:?}"),
            });
        }
        Ok(self.base_path.join(file_name))
    }

    /// Resolve `file_name` to a canonical path that is guaranteed to sit inside the base directory
    async fn resolve_existing(&self, file_name: &str) -> Result<PathBuf> {
        let candidate = self.path_for(file_name)?;
        let base = fs::canonicalize(&self.base_path).await?;
        let resolved = fs::canonicalize(&candidate).await?;

        if !resolved.starts_with(&base) {
            return Err(Error::Forbidden {
                message: format!("{} resolves outside of {}", candidate.display(), base.display()),
            });
        }
        Ok(resolved)
    }
}

async fn write_all_from(path: &Path, content: &mut (dyn AsyncRead + Send + Unpin)) -> std::io::Result<u64> {
    // The handle is dropped, and so closed, on every return path
    let mut file = fs::File::create(path).await?;
    let written = tokio::io::copy(content, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, file_name: &str, content: &mut (dyn AsyncRead + Send + Unpin)) -> Result<u64> {
        let full_path = self.path_for(file_name)?;

        match write_all_from(&full_path, content).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&full_path).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        path = %full_path.display(),
                        error = %cleanup,
                        "Failed to remove partially written upload"
                    );
                }
                Err(Error::Io(e))
            }
        }
    }

    async fn retrieve(&self, file_name: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve_existing(file_name).await?;
        Ok(fs::read(&resolved).await?)
    }
}
