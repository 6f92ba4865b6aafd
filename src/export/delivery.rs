//! Hands encoded exports to their destination.

use async_trait::async_trait;

use crate::error::Result;

/// Receives a finished export file.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Delivers the file and returns where it ended up.
    async fn deliver(&self, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Writes exports into a directory, creating it if needed.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: std::path::PathBuf,
}

#[cfg(feature = "native")]
impl DirectoryDelivery {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[cfg(feature = "native")]
#[async_trait]
impl Delivery for DirectoryDelivery {
    async fn deliver(&self, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        log::debug!("wrote {} bytes of {mime_type} to {}", bytes.len(), path.display());
        Ok(path.display().to_string())
    }
}
