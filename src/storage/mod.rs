//! Local file storage — public API.
//!
//! Files are grouped into five category folders under a single base path.
//! There is no index: the directory listing is the inventory.

mod manager;
mod naming;
mod paths;

pub use manager::{FilePayload, FileStorageManager, ReadData, ReadEncoding, TextEncoding};
pub use naming::{decode_base64_payload, generate_timestamp_file_name, validate_file_name};
pub use paths::{resolve_paths, AppDataPaths, CategoryFolders};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

/// One of the five storage buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Message,
    Audio,
    Image,
    Video,
    File,
}

impl FileCategory {
    pub const ALL: [FileCategory; 5] = [
        FileCategory::Message,
        FileCategory::Audio,
        FileCategory::Image,
        FileCategory::Video,
        FileCategory::File,
    ];

    /// Parse a wire name. Unknown names fall back to `File`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "message" => FileCategory::Message,
            "audio" => FileCategory::Audio,
            "image" => FileCategory::Image,
            "video" => FileCategory::Video,
            _ => FileCategory::File,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Message => "message",
            FileCategory::Audio => "audio",
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::File => "file",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(FileCategory::from_name(&name))
    }
}

/// A directory entry surfaced by `FileStorageManager::list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub is_directory: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("No default data directory is available on this system")]
    NoDataRoot,

    #[error("Invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("Unsupported encoding {0:?}")]
    UnsupportedEncoding(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("File {} is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound { path }
        } else {
            StorageError::Io { path, source }
        }
    }
}
