//! Persistence backends for the ticket store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::Ticket;

/// Errors raised while reading or writing the ticket document.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The data directory could not be created.
    #[error("Could not create data directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The data file exists but could not be read.
    #[error("Failed to load data from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The data file could not be written.
    #[error("Failed to save data to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The collection could not be encoded.
    #[error("Failed to encode tickets: {0}")]
    Encode(#[from] serde_json::Error),

    /// Write failure reported by a non-file backend.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result of reading the ticket document.
#[derive(Debug, Default)]
pub struct LoadedTickets {
    pub tickets: Vec<Ticket>,
    /// Set when the document existed but could not be parsed; `tickets` is empty then.
    pub corrupt: Option<String>,
}

impl LoadedTickets {
    pub fn new(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            corrupt: None,
        }
    }
}

/// Where the store reads and writes its whole collection.
pub trait TicketBackend: Send + Sync {
    /// Read the full collection. A missing document is an empty collection.
    fn load(&self) -> Result<LoadedTickets, StorageError>;

    /// Replace the stored collection with `tickets`.
    fn save(&self, tickets: &[Ticket]) -> Result<(), StorageError>;

    /// Human-readable location, for logs and messages.
    fn location(&self) -> String;
}

/// JSON array in a single file, rewritten on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Use `data_dir/file_name`, creating `data_dir` if needed.
    pub fn new(data_dir: &Path, file_name: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir).map_err(|source| StorageError::CreateDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: data_dir.join(file_name),
        })
    }

    /// Use an exact file path without touching the filesystem.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
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

impl TicketBackend for JsonFileBackend {
    fn load(&self) -> Result<LoadedTickets, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No data file at {:?}, starting empty", self.path);
                return Ok(LoadedTickets::default());
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Vec<Ticket>>(&raw) {
            Ok(tickets) => Ok(LoadedTickets::new(tickets)),
            Err(e) => {
                warn!("Data file {:?} is corrupted: {}", self.path, e);
                Ok(LoadedTickets {
                    tickets: Vec::new(),
                    corrupt: Some(e.to_string()),
                })
            }
        }
    }

    fn save(&self, tickets: &[Ticket]) -> Result<(), StorageError> {
        let body = serde_json::to_string_pretty(tickets)?;
        let tmp = self.temp_path();

        fs::write(&tmp, body).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!("Saved {} tickets to {:?}", tickets.len(), self.path);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
