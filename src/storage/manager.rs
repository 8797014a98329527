//! Category-scoped save / read / list over the resolved storage folders.
//!
//! The manager caches the resolved `AppDataPaths` after `initialize()`.
//! Switching the storage root in config does NOT invalidate that cache on
//! its own — call `initialize()` again after any `fileStorage` change.

use super::naming::{decode_base64_payload, validate_file_name};
use super::{resolve_paths, AppDataPaths, FileCategory, StorageError, StoredFile};
use crate::config::ConfigStore;
use crate::fsutil::{is_temp_file_name, write_atomic};
use crate::host_env::HostEnvironment;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Data handed to `save`.
///
/// Deserializes from the wire untagged: a JSON string is text, an array of
/// bytes is binary, anything else is stored as serialized JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilePayload {
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

/// How a text payload is turned into bytes on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// The text is base64 (optionally a data URL); the decoded bytes are stored.
    Base64,
}

impl TextEncoding {
    pub fn parse(name: Option<&str>) -> Result<Self, StorageError> {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("utf8") | Some("utf-8") => Ok(TextEncoding::Utf8),
            Some("base64") => Ok(TextEncoding::Base64),
            Some(other) => Err(StorageError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// How file contents are returned by `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadEncoding {
    #[default]
    Utf8,
    Base64,
    Binary,
}

impl ReadEncoding {
    pub fn parse(name: Option<&str>) -> Result<Self, StorageError> {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("utf8") | Some("utf-8") => Ok(ReadEncoding::Utf8),
            Some("base64") => Ok(ReadEncoding::Base64),
            Some("binary") | Some("raw") => Ok(ReadEncoding::Binary),
            Some(other) => Err(StorageError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// File contents returned by `read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReadData {
    Text(String),
    Bytes(Vec<u8>),
}

impl ReadData {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReadData::Text(text) => Some(text),
            ReadData::Bytes(_) => None,
        }
    }
}

pub struct FileStorageManager {
    env: HostEnvironment,
    config: ConfigStore,
    paths: RwLock<Option<AppDataPaths>>,
}

impl FileStorageManager {
    pub fn new(env: HostEnvironment, config: ConfigStore) -> Self {
        Self {
            env,
            config,
            paths: RwLock::new(None),
        }
    }

    /// Read config, resolve and create the folders, cache the result.
    ///
    /// On failure the cache is cleared, so later calls retry resolution
    /// instead of using folders from the previous root.
    pub async fn initialize(&self) -> Result<AppDataPaths, StorageError> {
        let load = self.config.load().await;
        let mut cached = self.paths.write().await;
        let paths = match resolve_paths(Some(&load.config), &self.env) {
            Ok(paths) => paths,
            Err(e) => {
                *cached = None;
                return Err(e);
            }
        };
        log::info!(
            "[STORAGE] Initialized at {} (custom path: {})",
            paths.base_path.display(),
            load.config.file_storage.effective_custom_path().is_some()
        );
        *cached = Some(paths.clone());
        Ok(paths)
    }

    pub async fn is_initialized(&self) -> bool {
        self.paths.read().await.is_some()
    }

    /// Cached layout, initializing lazily on first use.
    pub async fn paths(&self) -> Result<AppDataPaths, StorageError> {
        if let Some(paths) = self.paths.read().await.as_ref() {
            return Ok(paths.clone());
        }
        self.initialize().await
    }

    /// Absolute location of `file_name` within `category`.
    pub async fn file_path(
        &self,
        category: FileCategory,
        file_name: &str,
    ) -> Result<PathBuf, StorageError> {
        validate_file_name(file_name)?;
        Ok(self.paths().await?.folder(category).join(file_name))
    }

    /// Write `payload` to `<category folder>/<file_name>`, replacing any
    /// existing file. Returns the absolute path written.
    pub async fn save(
        &self,
        category: FileCategory,
        file_name: &str,
        payload: &FilePayload,
        encoding: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        let path = self.file_path(category, file_name).await?;

        let bytes = match payload {
            FilePayload::Text(text) => match TextEncoding::parse(encoding)? {
                TextEncoding::Utf8 => text.as_bytes().to_vec(),
                TextEncoding::Base64 => decode_base64_payload(text)?,
            },
            FilePayload::Binary(bytes) => bytes.clone(),
            FilePayload::Json(value) => serde_json::to_string_pretty(value)?.into_bytes(),
        };

        write_atomic(&path, &bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        log::info!(
            "[STORAGE] Saved {} ({} bytes) to {}",
            category,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    pub async fn read(
        &self,
        category: FileCategory,
        file_name: &str,
        encoding: Option<&str>,
    ) -> Result<ReadData, StorageError> {
        let encoding = ReadEncoding::parse(encoding)?;
        let path = self.file_path(category, file_name).await?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        match encoding {
            ReadEncoding::Utf8 => String::from_utf8(bytes)
                .map(ReadData::Text)
                .map_err(|_| StorageError::NotUtf8 { path }),
            ReadEncoding::Base64 => Ok(ReadData::Text(STANDARD.encode(&bytes))),
            ReadEncoding::Binary => Ok(ReadData::Bytes(bytes)),
        }
    }

    /// Direct children of the category folder, sorted by name.
    ///
    /// A folder that does not exist yet lists as empty. Temp files of saves
    /// still in progress are skipped.
    pub async fn list(&self, category: FileCategory) -> Result<Vec<StoredFile>, StorageError> {
        let folder = self.paths().await?.folder(category).to_path_buf();

        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&folder, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&folder, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_file_name(&name) {
                continue;
            }
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Vanished between readdir and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            };

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let created = metadata.created().unwrap_or(modified);

            files.push(StoredFile {
                name,
                path,
                size: metadata.len(),
                created: DateTime::<Utc>::from(created),
                modified: DateTime::<Utc>::from(modified),
                is_directory: metadata.is_dir(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Save a chat transcript into the message folder as pretty JSON.
    /// `.json` is appended to the name when missing.
    pub async fn save_message(
        &self,
        file_name: &str,
        message: &serde_json::Value,
    ) -> Result<PathBuf, StorageError> {
        let payload = match message {
            serde_json::Value::String(text) => FilePayload::Text(text.clone()),
            other => FilePayload::Json(other.clone()),
        };
        self.save(FileCategory::Message, &message_file_name(file_name), &payload, None)
            .await
    }

    pub async fn read_message(&self, file_name: &str) -> Result<ReadData, StorageError> {
        self.read(FileCategory::Message, &message_file_name(file_name), None)
            .await
    }
}

fn message_file_name(file_name: &str) -> String {
    if file_name.ends_with(".json") {
        file_name.to_string()
    } else {
        format!("{}.json", file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_in(dir: &tempfile::TempDir) -> FileStorageManager {
        let env = HostEnvironment::rooted_at(dir.path(), false);
        let config = ConfigStore::for_env(&env);
        FileStorageManager::new(env, config)
    }

    #[tokio::test]
    async fn lazily_initializes_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        assert!(!manager.is_initialized().await);

        let paths = manager.paths().await.unwrap();
        assert!(manager.is_initialized().await);
        assert_eq!(paths.base_path, dir.path().join("home").join(".hdsome-dev"));
        assert!(paths.folders.videos.is_dir());
    }

    #[tokio::test]
    async fn text_round_trips_in_every_category() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let text = "héllo\nworld 👋";

        for category in FileCategory::ALL {
            manager
                .save(category, "f.txt", &FilePayload::Text(text.to_string()), None)
                .await
                .unwrap();
            let data = manager.read(category, "f.txt", None).await.unwrap();
            assert_eq!(data.as_text(), Some(text));
        }
    }

    #[tokio::test]
    async fn binary_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let bytes = vec![0u8, 159, 146, 150, 255];

        let path = manager
            .save(FileCategory::Audio, "clip.webm", &FilePayload::Binary(bytes.clone()), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        let data = manager
            .read(FileCategory::Audio, "clip.webm", Some("binary"))
            .await
            .unwrap();
        assert_eq!(data, ReadData::Bytes(bytes.clone()));

        let data = manager
            .read(FileCategory::Audio, "clip.webm", Some("base64"))
            .await
            .unwrap();
        assert_eq!(data, ReadData::Text(STANDARD.encode(&bytes)));
    }

    #[tokio::test]
    async fn base64_text_payload_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let payload = FilePayload::Text("data:image/png;base64,aGVsbG8=".to_string());

        let path = manager
            .save(FileCategory::Image, "shot.png", &payload, Some("base64"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn json_payload_is_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let value = serde_json::json!({ "sender": "user123", "count": 2 });

        manager
            .save(FileCategory::File, "meta.json", &FilePayload::Json(value.clone()), None)
            .await
            .unwrap();
        let data = manager.read(FileCategory::File, "meta.json", None).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(data.as_text().unwrap()).unwrap();
        assert_eq!(parsed, value);
    }

    #[tokio::test]
    async fn later_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        for text in ["one", "two"] {
            manager
                .save(FileCategory::File, "same.txt", &FilePayload::Text(text.into()), None)
                .await
                .unwrap();
        }
        let data = manager.read(FileCategory::File, "same.txt", None).await.unwrap();
        assert_eq!(data.as_text(), Some("two"));
    }

    #[tokio::test]
    async fn save_recreates_vanished_folder() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let paths = manager.initialize().await.unwrap();
        std::fs::remove_dir_all(&paths.folders.images).unwrap();

        manager
            .save(FileCategory::Image, "a.txt", &FilePayload::Text("x".into()), None)
            .await
            .unwrap();
        assert!(paths.folders.images.join("a.txt").is_file());
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let err = manager
            .read(FileCategory::Message, "ghost.json", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn read_non_utf8_as_text_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        manager
            .save(FileCategory::File, "bin", &FilePayload::Binary(vec![0xff, 0xfe]), None)
            .await
            .unwrap();
        assert!(matches!(
            manager.read(FileCategory::File, "bin", None).await,
            Err(StorageError::NotUtf8 { .. })
        ));
    }

    #[tokio::test]
    async fn unsupported_encoding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let err = manager
            .save(FileCategory::File, "x.txt", &FilePayload::Text("x".into()), Some("ucs2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedEncoding(_)));
    }

    #[tokio::test]
    async fn escaping_file_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let err = manager
            .save(FileCategory::File, "../x.txt", &FilePayload::Text("x".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidFileName(_)));
    }

    #[tokio::test]
    async fn list_is_sorted_and_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        for name in ["b.txt", "a.txt"] {
            manager
                .save(FileCategory::File, name, &FilePayload::Text("abc".into()), None)
                .await
                .unwrap();
        }
        let folder = manager.paths().await.unwrap().folders.files;
        std::fs::create_dir_all(folder.join("sub")).unwrap();
        std::fs::write(folder.join("sub").join("deep.txt"), b"x").unwrap();

        let files = manager.list(FileCategory::File).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(files[0].size, 3);
        assert!(!files[0].is_directory);
        assert!(files[2].is_directory);
    }

    #[tokio::test]
    async fn list_skips_in_flight_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        manager
            .save(FileCategory::Image, "done.png", &FilePayload::Binary(vec![1]), None)
            .await
            .unwrap();
        let folder = manager.paths().await.unwrap().folders.images;
        std::fs::write(folder.join(".next.png.4242-7.partial"), b"half").unwrap();

        let files = manager.list(FileCategory::Image).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["done.png"]);
    }

    #[tokio::test]
    async fn temp_shaped_file_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let err = manager
            .save(FileCategory::File, ".x.partial", &FilePayload::Text("x".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidFileName(_)));
    }

    #[tokio::test]
    async fn failed_reinitialize_drops_cached_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let old = manager.initialize().await.unwrap();

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        manager
            .config
            .set_custom_storage_path(&blocker.join("data").to_string_lossy())
            .await
            .unwrap();

        assert!(manager.initialize().await.is_err());
        assert!(!manager.is_initialized().await);

        let saved = manager
            .save(FileCategory::File, "a.txt", &FilePayload::Text("x".into()), None)
            .await;
        assert!(saved.is_err());
        assert!(!old.folders.files.join("a.txt").exists());
    }

    #[tokio::test]
    async fn list_missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let paths = manager.initialize().await.unwrap();
        std::fs::remove_dir_all(&paths.folders.videos).unwrap();

        assert!(manager.list(FileCategory::Video).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_helpers_append_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir);
        let transcript = serde_json::json!({ "messages": [{ "id": "1", "content": "hi" }] });

        let path = manager.save_message("chat_a_b", &transcript).await.unwrap();
        assert!(path.ends_with("messages/chat_a_b.json"));

        let data = manager.read_message("chat_a_b").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(data.as_text().unwrap()).unwrap();
        assert_eq!(parsed, transcript);
    }

    #[test]
    fn payload_deserializes_by_shape() {
        let text: FilePayload = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text, FilePayload::Text("hello".into()));

        let bytes: FilePayload = serde_json::from_str("[1, 2, 255]").unwrap();
        assert_eq!(bytes, FilePayload::Binary(vec![1, 2, 255]));

        let json: FilePayload = serde_json::from_str("{\"a\": 1}").unwrap();
        assert!(matches!(json, FilePayload::Json(_)));

        let not_bytes: FilePayload = serde_json::from_str("[1, 300]").unwrap();
        assert!(matches!(not_bytes, FilePayload::Json(_)));
    }
}
