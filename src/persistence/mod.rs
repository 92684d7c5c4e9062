//! Plain-text persistence
//!
//! Settings, hiscores and save games share one flat `key=value` format
//! with nested `name { ... }` blocks (see [`kv`]).

pub mod kv;
pub mod savegame;

pub use kv::KvDoc;
pub use savegame::{SaveGame, SavedPlayer};

use std::fmt;
use std::io;

/// Persistence failure
#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    /// File readable but its content is unusable
    Corrupted(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "I/O error: {e}"),
            PersistError::Corrupted(msg) => write!(f, "corrupted data: {msg}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Corrupted(_) => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}
