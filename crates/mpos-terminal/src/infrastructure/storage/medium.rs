//! Byte-level storage media for the session document.
//!
//! The [`ConfigStore`](super::session_store::ConfigStore) decides *what* is
//! written; a [`StorageMedium`] decides *where*.  Two media are provided:
//!
//! - [`FileMedium`]: a single file, replaced atomically (write to a sibling
//!   temp file, then rename over the target) so a crash mid-write never
//!   leaves a truncated document behind.
//! - [`InMemoryMedium`]: a byte buffer, with a switch that makes writes fail.
//!   Used by tests and by headless runs that must not touch the disk.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

/// A place the session document can be read from and written to.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Returns the stored bytes, or `None` when nothing has been stored yet.
    async fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replaces the stored bytes.
    async fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

// ── File ──────────────────────────────────────────────────────────────────────

pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StorageMedium for FileMedium {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!("wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryMedium {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl InMemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `bytes` already stored.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the stored bytes.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl StorageMedium for InMemoryMedium {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage medium rejected the write",
            ));
        }
        *self
            .bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(bytes.to_vec());
        Ok(())
    }
}
