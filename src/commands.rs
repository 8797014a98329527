//! Tauri command handlers — thin wrappers over `AppContext`.
//!
//! Every non-cancellation failure is also emitted as an `app-error` event so
//! the UI can show a notification instead of only logging it.

use crate::bridge::{
    Ack, AppContext, ConfigPathPayload, ConfigPayload, ListFilesPayload, ListFilesRequest,
    OperationResult, ReadFilePayload, ReadFileRequest, SaveFileRequest, SavedFilePayload,
};
use crate::capture::{CaptureError, RegionSelection};
use crate::config::AppConfig;
use crate::storage::{generate_timestamp_file_name, AppDataPaths, FileCategory, FilePayload};
use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};

pub const APP_ERROR_EVENT: &str = "app-error";
pub const REGION_CAPTURED_EVENT: &str = "region-captured";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppErrorEvent {
    message: String,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionCapturedEvent {
    file_path: String,
    data_url: String,
}

fn notify_error(app: &AppHandle, message: &str, error: &str) {
    let payload = AppErrorEvent {
        message: message.to_string(),
        error: error.to_string(),
    };
    if let Err(e) = app.emit(APP_ERROR_EVENT, payload) {
        log::error!("Failed to emit {}: {}", APP_ERROR_EVENT, e);
    }
}

fn reported<T>(app: &AppHandle, result: OperationResult<T>) -> OperationResult<T> {
    if !result.success {
        notify_error(app, &result.message, result.error.as_deref().unwrap_or_default());
    }
    result
}

fn capture_result<T>(app: &AppHandle, result: Result<T, CaptureError>) -> Result<T, String> {
    result.map_err(|e| {
        if !e.is_cancellation() {
            notify_error(app, "Screen capture failed", &e.to_string());
        }
        e.to_string()
    })
}

// ── Config ──────────────────────────────────────────────────────────────

#[tauri::command]
pub fn get_config_path(app: AppHandle) -> OperationResult<ConfigPathPayload> {
    app.state::<AppContext>().get_config_path()
}

#[tauri::command]
pub async fn read_config(app: AppHandle) -> OperationResult<ConfigPayload> {
    app.state::<AppContext>().read_config().await
}

#[tauri::command]
pub async fn save_config(app: AppHandle, config: AppConfig) -> OperationResult<Ack> {
    let result = app.state::<AppContext>().save_config(config).await;
    reported(&app, result)
}

/// Native folder picker; the chosen folder becomes the custom storage root.
/// Answers `None` when the dialog is dismissed.
#[tauri::command]
pub async fn pick_storage_folder(app: AppHandle) -> Option<OperationResult<ConfigPayload>> {
    use tauri_plugin_dialog::DialogExt;

    let (tx, rx) = tokio::sync::oneshot::channel();
    app.dialog().file().pick_folder(move |folder| {
        let _ = tx.send(folder);
    });
    let picked = rx.await.ok().flatten()?;
    let path = match picked.into_path() {
        Ok(path) => path,
        Err(e) => {
            let result = OperationResult::fail("Unsupported folder selection", e);
            return Some(reported(&app, result));
        }
    };
    let result = app
        .state::<AppContext>()
        .set_custom_storage_path(&path.to_string_lossy())
        .await;
    Some(reported(&app, result))
}

#[tauri::command]
pub async fn reset_storage_path(app: AppHandle) -> OperationResult<ConfigPayload> {
    let result = app
        .state::<AppContext>()
        .reset_to_default_storage_path()
        .await;
    reported(&app, result)
}

// ── Storage ─────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn get_app_data_path(app: AppHandle) -> OperationResult<AppDataPaths> {
    let result = app.state::<AppContext>().get_app_data_path().await;
    reported(&app, result)
}

#[tauri::command]
pub async fn save_file(app: AppHandle, options: SaveFileRequest) -> OperationResult<SavedFilePayload> {
    let result = app.state::<AppContext>().save_file(options).await;
    reported(&app, result)
}

#[tauri::command]
pub async fn read_file(app: AppHandle, options: ReadFileRequest) -> OperationResult<ReadFilePayload> {
    let result = app.state::<AppContext>().read_file(options).await;
    reported(&app, result)
}

#[tauri::command]
pub async fn list_files(app: AppHandle, options: ListFilesRequest) -> OperationResult<ListFilesPayload> {
    let result = app.state::<AppContext>().list_files(options).await;
    reported(&app, result)
}

/// Open a category folder in the OS file manager.
#[tauri::command]
pub async fn open_storage_folder(app: AppHandle, file_type: FileCategory) -> Result<(), String> {
    use tauri_plugin_shell::ShellExt;

    let folder = app
        .state::<AppContext>()
        .storage()
        .paths()
        .await
        .map_err(|e| e.to_string())?
        .folder(file_type)
        .to_path_buf();

    #[allow(deprecated)]
    let opened = app.shell().open(folder.to_string_lossy().to_string(), None);
    opened.map_err(|e| {
        notify_error(&app, "Failed to open folder", &e.to_string());
        e.to_string()
    })
}

// ── Capture ─────────────────────────────────────────────────────────────

/// Rejects with `Region selection cancelled` when the user presses Escape.
#[tauri::command]
pub async fn capture_region_screenshot(app: AppHandle) -> Result<String, String> {
    let result = app
        .state::<AppContext>()
        .capture_region_screenshot()
        .await;
    capture_result(&app, result)
}

#[tauri::command]
pub async fn capture_screenshot(app: AppHandle) -> Result<String, String> {
    let result = app.state::<AppContext>().capture_screenshot().await;
    capture_result(&app, result)
}

#[tauri::command]
pub fn send_region_selection(app: AppHandle, region: RegionSelection) -> Result<bool, String> {
    app.state::<AppContext>()
        .send_region_selection(region)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn cancel_region_selection(app: AppHandle) -> Result<bool, String> {
    app.state::<AppContext>()
        .cancel_region_selection()
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn region_pointer_down(app: AppHandle, x: f64, y: f64) -> Result<bool, String> {
    app.state::<AppContext>()
        .capture()
        .pointer_down(x, y)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn region_pointer_move(
    app: AppHandle,
    x: f64,
    y: f64,
) -> Result<Option<RegionSelection>, String> {
    app.state::<AppContext>()
        .capture()
        .pointer_move(x, y)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn region_pointer_up(app: AppHandle, x: f64, y: f64) -> Result<bool, String> {
    app.state::<AppContext>()
        .capture()
        .pointer_up(x, y)
        .map_err(|e| e.to_string())
}

/// Region capture started from the tray or the global shortcut: the PNG is
/// saved into the images folder, put on the clipboard, and announced with a
/// `region-captured` event.
pub(crate) fn spawn_region_capture_to_storage(app: &AppHandle) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let ctx = app.state::<AppContext>();
        let image = match ctx.capture().capture_region().await {
            Ok(image) => image,
            Err(e) if e.is_cancellation() => return,
            Err(e) => {
                log::error!("[CAPTURE] Region capture failed: {}", e);
                notify_error(&app, "Screen capture failed", &e.to_string());
                return;
            }
        };

        let file_name = generate_timestamp_file_name("screenshot", "png");
        let saved = ctx
            .storage()
            .save(
                FileCategory::Image,
                &file_name,
                &FilePayload::Binary(image.png.clone()),
                None,
            )
            .await;
        let file_path = match saved {
            Ok(path) => path,
            Err(e) => {
                log::error!("[STORAGE] Failed to save capture: {}", e);
                notify_error(&app, "Failed to save screenshot", &e.to_string());
                return;
            }
        };

        if let Err(e) = copy_png_to_clipboard(&image.png) {
            log::warn!("[CAPTURE] Clipboard copy failed: {}", e);
        }

        let event = RegionCapturedEvent {
            file_path: file_path.to_string_lossy().into_owned(),
            data_url: image.to_data_url(),
        };
        if let Err(e) = app.emit(REGION_CAPTURED_EVENT, event) {
            log::error!("Failed to emit {}: {}", REGION_CAPTURED_EVENT, e);
        }
    });
}

fn copy_png_to_clipboard(png: &[u8]) -> Result<(), String> {
    let rgba = image::load_from_memory(png)
        .map_err(|e| format!("decode failed: {}", e))?
        .to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);

    let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clipboard
        .set_image(arboard::ImageData {
            width,
            height,
            bytes: rgba.into_raw().into(),
        })
        .map_err(|e| e.to_string())
}
