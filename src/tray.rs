//! System tray setup and menu handler.
//!
//! The tray keeps HdSome alive while the main window is hidden; it can
//! bring the window back or start a region capture.

use tauri::{
    image::Image as TauriImage,
    menu::{MenuBuilder, MenuItemBuilder},
    tray::{MouseButton, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

const MENU_SHOW: &str = "show";
const MENU_CAPTURE: &str = "capture-region";
const MENU_QUIT: &str = "quit";

/// Sets up the system tray icon.
///
/// Left-click: shows the main window.
/// Right-click: context menu (Show window / Capture region / Quit).
pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let show_item = MenuItemBuilder::with_id(MENU_SHOW, "Show window").build(app)?;
    let capture_item = MenuItemBuilder::with_id(MENU_CAPTURE, "Capture region").build(app)?;
    let quit_item = MenuItemBuilder::with_id(MENU_QUIT, "Quit HdSome").build(app)?;
    let menu = MenuBuilder::new(app)
        .item(&show_item)
        .item(&capture_item)
        .separator()
        .item(&quit_item)
        .build()?;

    // Decode the PNG icon to RGBA for Tauri's Image type
    let icon_bytes = include_bytes!("../icons/32x32.png");
    let icon_img = image::load_from_memory(icon_bytes)
        .map_err(|e| format!("Failed to decode tray icon: {}", e))?;
    let rgba = icon_img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let tray_icon = TauriImage::new_owned(rgba.into_raw(), w, h);

    let _tray = TrayIconBuilder::new()
        .icon(tray_icon)
        .tooltip("HdSome")
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray_icon, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                ..
            } = event
            {
                show_main_window(tray_icon.app_handle());
            }
        })
        .on_menu_event(|app, event| match event.id().as_ref() {
            MENU_SHOW => show_main_window(app),
            MENU_CAPTURE => {
                log::info!("[CAPTURE] Region capture requested from tray menu");
                crate::commands::spawn_region_capture_to_storage(app);
            }
            MENU_QUIT => {
                log::info!("Quit requested from tray menu");
                app.exit(0);
            }
            _ => {}
        })
        .build(app)?;

    Ok(())
}

pub fn show_main_window(app: &AppHandle) {
    let Some(window) = app.get_webview_window("main") else {
        log::warn!("Main window not found");
        return;
    };
    if let Err(e) = window.unminimize().and_then(|_| window.show()).and_then(|_| window.set_focus()) {
        log::error!("Failed to show main window: {}", e);
    }
}
