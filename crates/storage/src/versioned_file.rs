//! Versioned file persistence
//!
//! Stores a single serializable value as a JSON document wrapped in a
//! version number and an md5 checksum. Writes go through a temp file and a
//! rename so a crash mid-write never leaves a half-written document behind.

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Persistence error types
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Corruption detected
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// On-disk envelope
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
struct Envelope<T> {
    version: u32,
    checksum: String,
    data: T,
}

fn checksum_of<T: Serialize>(data: &T) -> Result<String> {
    let data_json = serde_json::to_string(data)?;
    Ok(format!("{:x}", md5::compute(&data_json)))
}

impl<T: Serialize> Envelope<T> {
    fn seal(version: u32, data: T) -> Result<Self> {
        let checksum = checksum_of(&data)?;
        Ok(Self { version, checksum, data })
    }

    fn verify_checksum(&self) -> Result<()> {
        let computed = checksum_of(&self.data)?;

        if computed != self.checksum {
            return Err(PersistenceError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                self.checksum, computed
            )));
        }

        Ok(())
    }
}

/// File store configuration
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path to the document
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Write through a temp file + rename
    pub atomic_writes: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("session.json"),
            version: 1,
            atomic_writes: true,
        }
    }
}

impl FileStoreConfig {
    /// Create a new configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// A single value persisted to a versioned, checksummed JSON file
///
/// The store keeps no in-memory copy; every [`load`](Self::load) reads the
/// file. Writes and removals are serialized through an internal lock.
pub struct VersionedFile<T> {
    config: FileStoreConfig,
    write_lock: Mutex<()>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> VersionedFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a new file store
    pub fn new(config: FileStoreConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
            _phantom: PhantomData,
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Load the stored value
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<T>> {
        let contents = match fs::read_to_string(&self.config.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope<T> = serde_json::from_str(&contents)?;
        envelope.verify_checksum()?;

        if envelope.version != self.config.version {
            return Err(PersistenceError::VersionMismatch {
                expected: self.config.version,
                found: envelope.version,
            });
        }

        Ok(Some(envelope.data))
    }

    /// Replace the stored value
    pub async fn save(&self, data: &T) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let envelope = Envelope::seal(self.config.version, data)?;
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if self.config.atomic_writes {
            self.write_atomic(&json).await
        } else {
            fs::write(&self.config.path, json).await?;
            Ok(())
        }
    }

    /// Delete the stored value, if any
    pub async fn remove(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, contents: &str) -> Result<()> {
        let temp_path = self.config.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.config.path).await?;
        tracing::debug!("Wrote {}", self.config.path.display());

        Ok(())
    }
}
