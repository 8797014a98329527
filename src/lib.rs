//! HdSome — desktop chat shell backend.
//!
//! The platform-neutral core:
//! - Config document (config/)
//! - Local file storage (storage/)
//! - Interactive region capture (capture/)
//! - Boundary operations for the UI (bridge.rs)
//!
//! With the `desktop` feature the Tauri app shell wires these to the
//! system tray (tray.rs), the global shortcut and the command handlers
//! (commands.rs).

pub mod bridge;
pub mod capture;
pub mod config;
pub mod fsutil;
pub mod host_env;
pub mod storage;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod tray;

/// Global shortcut that starts a region capture.
pub const REGION_CAPTURE_SHORTCUT: &str = "CommandOrControl+Alt+A";

/// Event carrying each `CaptureStage` while a region capture runs.
pub const CAPTURE_STAGE_EVENT: &str = "region-capture-stage";

/// Entry point — called by Tauri runtime.
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use bridge::AppContext;
    use capture::{
        CaptureSettings, RegionCaptureController, TauriOverlayHost, XcapScreenSource,
    };
    use host_env::HostEnvironment;
    use std::sync::Arc;
    use tauri::{Emitter, Manager, WindowEvent};
    use tauri_plugin_global_shortcut::ShortcutState;

    let _ = dotenvy::dotenv();
    env_logger::init();

    let shortcut_plugin = match tauri_plugin_global_shortcut::Builder::new()
        .with_shortcut(REGION_CAPTURE_SHORTCUT)
    {
        Ok(builder) => builder,
        Err(e) => {
            log::error!("Invalid shortcut {}: {}", REGION_CAPTURE_SHORTCUT, e);
            tauri_plugin_global_shortcut::Builder::new()
        }
    }
    .with_handler(|app, _shortcut, event| {
        if event.state == ShortcutState::Pressed {
            log::info!("[CAPTURE] Region capture requested from shortcut");
            commands::spawn_region_capture_to_storage(app);
        }
    })
    .build();

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(shortcut_plugin)
        .invoke_handler(tauri::generate_handler![
            commands::get_config_path,
            commands::read_config,
            commands::save_config,
            commands::pick_storage_folder,
            commands::reset_storage_path,
            commands::get_app_data_path,
            commands::save_file,
            commands::read_file,
            commands::list_files,
            commands::open_storage_folder,
            commands::capture_region_screenshot,
            commands::capture_screenshot,
            commands::send_region_selection,
            commands::cancel_region_selection,
            commands::region_pointer_down,
            commands::region_pointer_move,
            commands::region_pointer_up,
        ])
        .on_window_event(|window, event| {
            // Closing the main window keeps the app running in the tray.
            if let WindowEvent::CloseRequested { api, .. } = event {
                if window.label() == "main" {
                    api.prevent_close();
                    if let Err(e) = window.hide() {
                        log::error!("Failed to hide main window: {}", e);
                    }
                }
            }
        })
        .setup(|app| {
            log::info!("HdSome starting up");

            let env = HostEnvironment::detect();
            let handle = app.handle().clone();
            let stage_handle = handle.clone();
            let controller = RegionCaptureController::new(
                Arc::new(XcapScreenSource),
                Arc::new(TauriOverlayHost::new(handle)),
                CaptureSettings::from_env(),
            )
            .with_stage_listener(Arc::new(move |stage| {
                if let Err(e) = stage_handle.emit(CAPTURE_STAGE_EVENT, stage) {
                    log::debug!("Failed to emit {}: {}", CAPTURE_STAGE_EVENT, e);
                }
            }));

            let ctx = AppContext::new(env, Arc::new(controller));
            let init = tauri::async_runtime::block_on(ctx.initialize());
            if init.success {
                log::info!("[STORAGE] {}", init.message);
            } else {
                // The UI still starts; storage operations report the failure.
                log::error!(
                    "[STORAGE] {}: {}",
                    init.message,
                    init.error.as_deref().unwrap_or_default()
                );
            }
            app.manage(ctx);

            tray::setup_tray(app.handle())?;

            log::info!("System tray initialized");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("Error running HdSome");
}
