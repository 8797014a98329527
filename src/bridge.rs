//! Boundary operations consumed by the UI.
//!
//! `AppContext` is the one owned context for the process: it is built once
//! at startup and handed to every caller. Storage and config operations
//! answer with an `OperationResult` that the UI branches on (`success`)
//! instead of throwing; region capture answers with a plain `Result` so a
//! cancelled selection rejects with `Region selection cancelled`.

use crate::capture::{CaptureError, RegionCaptureController, RegionSelection};
use crate::config::{AppConfig, ConfigStore};
use crate::host_env::HostEnvironment;
use crate::storage::{
    AppDataPaths, FileCategory, FilePayload, FileStorageManager, ReadData, StorageError,
    StoredFile,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Uniform answer shape for storage/config operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> OperationResult<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            payload: Some(payload),
        }
    }

    pub fn fail(message: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.to_string()),
            payload: None,
        }
    }
}

/// For operations with nothing to return beyond success.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPathPayload {
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigPayload {
    pub config: AppConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilePayload {
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFilePayload {
    pub data: ReadData,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListFilesPayload {
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequest {
    pub data: FilePayload,
    pub file_name: String,
    pub file_type: FileCategory,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileRequest {
    pub file_name: String,
    pub file_type: FileCategory,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesRequest {
    pub file_type: FileCategory,
}

pub struct AppContext {
    config: ConfigStore,
    storage: FileStorageManager,
    capture: Arc<RegionCaptureController>,
}

impl AppContext {
    pub fn new(env: HostEnvironment, capture: Arc<RegionCaptureController>) -> Self {
        let config = ConfigStore::for_env(&env);
        let storage = FileStorageManager::new(env, config.clone());
        Self {
            config,
            storage,
            capture,
        }
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn storage(&self) -> &FileStorageManager {
        &self.storage
    }

    pub fn capture(&self) -> &Arc<RegionCaptureController> {
        &self.capture
    }

    /// Startup: make sure a config file exists, then resolve storage.
    pub async fn initialize(&self) -> OperationResult<AppDataPaths> {
        let load = self.config.load().await;
        if load.used_defaults() {
            if let Err(e) = self.config.save(&load.config).await {
                log::warn!("[CONFIG] Could not write default config: {}", e);
            }
        }
        self.get_app_data_path_inner("Storage initialized", true).await
    }

    // ── Config ──────────────────────────────────────────────────────────

    pub fn get_config_path(&self) -> OperationResult<ConfigPathPayload> {
        OperationResult::ok(
            "Config path resolved",
            ConfigPathPayload {
                config_path: self.config.path().to_path_buf(),
            },
        )
    }

    /// Never fails: a missing or corrupt file answers with the defaults.
    pub async fn read_config(&self) -> OperationResult<ConfigPayload> {
        let load = self.config.load().await;
        let message = if load.used_defaults() {
            "Config unavailable, using defaults"
        } else {
            "Config loaded"
        };
        OperationResult::ok(message, ConfigPayload { config: load.config })
    }

    /// Overwrite the config. Re-resolves storage when `fileStorage` changed,
    /// so cached folders never point at the old root.
    pub async fn save_config(&self, config: AppConfig) -> OperationResult<Ack> {
        let previous = self.config.load().await.config;
        if let Err(e) = self.config.save(&config).await {
            log::error!("[CONFIG] Save failed: {}", e);
            return OperationResult::fail("Failed to save config", e);
        }

        if previous.file_storage != config.file_storage {
            if let Err(e) = self.storage.initialize().await {
                log::error!("[STORAGE] Re-initialize after config change failed: {}", e);
                return OperationResult::fail("Config saved but storage path is unusable", e);
            }
        }
        OperationResult::ok("Config saved", Ack {})
    }

    pub async fn set_custom_storage_path(&self, path: &str) -> OperationResult<ConfigPayload> {
        match self.config.set_custom_storage_path(path).await {
            Ok(config) => self.reinitialize_with(config).await,
            Err(e) => OperationResult::fail("Failed to set custom storage path", e),
        }
    }

    pub async fn reset_to_default_storage_path(&self) -> OperationResult<ConfigPayload> {
        match self.config.reset_to_default_storage_path().await {
            Ok(config) => self.reinitialize_with(config).await,
            Err(e) => OperationResult::fail("Failed to reset storage path", e),
        }
    }

    async fn reinitialize_with(&self, config: AppConfig) -> OperationResult<ConfigPayload> {
        match self.storage.initialize().await {
            Ok(_) => OperationResult::ok("Storage path updated", ConfigPayload { config }),
            Err(e) => OperationResult::fail("Storage path saved but unusable", e),
        }
    }

    // ── Storage ─────────────────────────────────────────────────────────

    pub async fn get_app_data_path(&self) -> OperationResult<AppDataPaths> {
        self.get_app_data_path_inner("Storage paths resolved", false)
            .await
    }

    async fn get_app_data_path_inner(
        &self,
        message: &str,
        force: bool,
    ) -> OperationResult<AppDataPaths> {
        let paths = if force {
            self.storage.initialize().await
        } else {
            self.storage.paths().await
        };
        match paths {
            Ok(paths) => OperationResult::ok(message, paths),
            Err(e) => storage_failure("Failed to resolve storage paths", e),
        }
    }

    pub async fn save_file(&self, request: SaveFileRequest) -> OperationResult<SavedFilePayload> {
        let result = self
            .storage
            .save(
                request.file_type,
                &request.file_name,
                &request.data,
                request.encoding.as_deref(),
            )
            .await;
        match result {
            Ok(file_path) => OperationResult::ok("File saved", SavedFilePayload { file_path }),
            Err(e) => storage_failure("Failed to save file", e),
        }
    }

    pub async fn read_file(&self, request: ReadFileRequest) -> OperationResult<ReadFilePayload> {
        let file_path = match self
            .storage
            .file_path(request.file_type, &request.file_name)
            .await
        {
            Ok(path) => path,
            Err(e) => return storage_failure("Failed to read file", e),
        };

        match self
            .storage
            .read(
                request.file_type,
                &request.file_name,
                request.encoding.as_deref(),
            )
            .await
        {
            Ok(data) => OperationResult::ok("File read", ReadFilePayload { data, file_path }),
            Err(e) => storage_failure("Failed to read file", e),
        }
    }

    pub async fn list_files(&self, request: ListFilesRequest) -> OperationResult<ListFilesPayload> {
        match self.storage.list(request.file_type).await {
            Ok(files) => OperationResult::ok("Files listed", ListFilesPayload { files }),
            Err(e) => storage_failure("Failed to list files", e),
        }
    }

    // ── Capture ─────────────────────────────────────────────────────────

    /// Interactive region capture, answered as a PNG data URL.
    pub async fn capture_region_screenshot(&self) -> Result<String, CaptureError> {
        self.capture
            .capture_region()
            .await
            .map(|image| image.to_data_url())
    }

    pub async fn capture_screenshot(&self) -> Result<String, CaptureError> {
        self.capture
            .capture_full_screen()
            .await
            .map(|image| image.to_data_url())
    }

    pub fn send_region_selection(&self, region: RegionSelection) -> Result<bool, CaptureError> {
        self.capture.submit_selection(region)
    }

    pub fn cancel_region_selection(&self) -> Result<bool, CaptureError> {
        self.capture.cancel()
    }
}

fn storage_failure<T>(message: &str, error: StorageError) -> OperationResult<T> {
    log::error!("[STORAGE] {}: {}", message, error);
    OperationResult::fail(message, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_result_flattens_payload() {
        let result = OperationResult::ok(
            "File saved",
            SavedFilePayload {
                file_path: PathBuf::from("/base/messages/note.txt"),
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["filePath"], "/base/messages/note.txt");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_result_carries_error_and_no_payload() {
        let result: OperationResult<ListFilesPayload> =
            OperationResult::fail("Failed to list files", "disk on fire");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "disk on fire");
        assert!(json.get("files").is_none());
    }

    #[test]
    fn save_request_parses_wire_shape() {
        let request: SaveFileRequest = serde_json::from_str(
            r#"{ "data": "hello", "fileName": "note.txt", "fileType": "message" }"#,
        )
        .unwrap();
        assert_eq!(request.file_type, FileCategory::Message);
        assert_eq!(request.data, FilePayload::Text("hello".into()));
        assert!(request.encoding.is_none());
    }
}
