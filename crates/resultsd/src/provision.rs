//! One-time provisioning of the results database.
//!
//! If the data file is already on disk nothing happens. Otherwise it is
//! downloaded into a temporary sibling, checked for the SQLite header and
//! renamed into place, so a partial download never sits at the final path.

use async_trait::async_trait;
use results_common::ProvisionConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

/// First 16 bytes of every SQLite 3 database file
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Provisioning errors. All of them stop startup.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Downloaded file is not a results database: {0}")]
    InvalidContent(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the database comes from
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Human-readable origin for logs
    fn describe(&self) -> String;

    /// Write the remote file to `dest`, returning the number of bytes written
    async fn fetch_to(&self, dest: &Path) -> Result<u64, ProvisionError>;
}

/// What `ensure` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Makes sure the data file exists before the service starts
#[derive(Debug, Clone)]
pub struct Provisioner {
    path: PathBuf,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl Provisioner {
    pub fn new(path: impl Into<PathBuf>, config: &ProvisionConfig) -> Self {
        Self {
            path: path.into(),
            max_attempts: config.attempts(),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Override retry policy (tests use a zero backoff)
    pub fn with_retry(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download the data file unless it already exists
    pub async fn ensure<S>(&self, source: &S) -> Result<ProvisionOutcome, ProvisionError>
    where
        S: RemoteSource + ?Sized,
    {
        if self.path.exists() {
            info!("Results database present at {}", self.path.display());
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ProvisionError::io(parent, e))?;
        }

        let temp_path = self.temp_path();
        info!(
            "Downloading results database from {} to {}",
            source.describe(),
            self.path.display()
        );

        let mut attempt = 1;
        loop {
            match self.download(source, &temp_path).await {
                Ok(bytes) => {
                    info!("Download complete: {} bytes", bytes);
                    return Ok(ProvisionOutcome::Downloaded { bytes });
                }
                Err(e) => {
                    let _ = fs::remove_file(&temp_path).await;
                    if attempt >= self.max_attempts {
                        error!(
                            "Giving up on download after {} attempt(s): {}",
                            attempt, e
                        );
                        return Err(e);
                    }
                    warn!(
                        "Download attempt {}/{} failed: {}",
                        attempt, self.max_attempts, e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn download<S>(&self, source: &S, temp_path: &Path) -> Result<u64, ProvisionError>
    where
        S: RemoteSource + ?Sized,
    {
        let bytes = source.fetch_to(temp_path).await?;
        validate_database_file(temp_path).await?;
        fs::rename(temp_path, &self.path)
            .await
            .map_err(|e| ProvisionError::io(&self.path, e))?;
        Ok(bytes)
    }

    /// Process-unique sibling so concurrent starts never share a partial file
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.db".to_string());
        self.path
            .with_file_name(format!("{}.part.{}", name, std::process::id()))
    }
}

/// Reject empty files and anything that is not an SQLite database
pub async fn validate_database_file(path: &Path) -> Result<(), ProvisionError> {
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| ProvisionError::io(path, e))?;

    let mut header = [0u8; 16];
    match file.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProvisionError::InvalidContent(
                "file is empty or truncated".to_string(),
            ));
        }
        Err(e) => return Err(ProvisionError::io(path, e)),
    }

    if &header != SQLITE_MAGIC {
        return Err(ProvisionError::InvalidContent(
            "missing SQLite header".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_sibling() {
        let provisioner = Provisioner::new("/srv/results/data.db", &ProvisionConfig::default());
        let temp = provisioner.temp_path();
        assert_eq!(temp.parent(), Some(Path::new("/srv/results")));
        assert_eq!(
            temp.file_name().unwrap().to_string_lossy(),
            format!("data.db.part.{}", std::process::id())
        );
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let provisioner =
            Provisioner::new("data.db", &ProvisionConfig::default()).with_retry(0, Duration::ZERO);
        assert_eq!(provisioner.max_attempts, 1);
    }
}
