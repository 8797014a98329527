//! Selection overlay as a Tauri webview window.
//!
//! The page (`overlay.html`) forwards pointer events and Escape back through
//! the `region_pointer_*` / `cancel_region_selection` commands.

use super::{CaptureError, DisplayBounds, OverlayHost};
use tauri::{AppHandle, LogicalPosition, LogicalSize, Manager, WebviewUrl, WebviewWindowBuilder};

pub const OVERLAY_LABEL: &str = "region-overlay";

pub struct TauriOverlayHost {
    app: AppHandle,
}

impl TauriOverlayHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl OverlayHost for TauriOverlayHost {
    fn show(&self, bounds: DisplayBounds) -> Result<(), CaptureError> {
        // A leftover from a crashed session would swallow all input.
        if let Some(stale) = self.app.get_webview_window(OVERLAY_LABEL) {
            log::warn!("[CAPTURE] Destroying stale overlay window");
            let _ = stale.destroy();
        }

        let window = WebviewWindowBuilder::new(
            &self.app,
            OVERLAY_LABEL,
            WebviewUrl::App("overlay.html".into()),
        )
        .title("HdSome Region Capture")
        .transparent(true)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .resizable(false)
        .shadow(false)
        .visible(false)
        .build()
        .map_err(|e| CaptureError::Overlay(e.to_string()))?;

        window
            .set_position(LogicalPosition::new(bounds.x as f64, bounds.y as f64))
            .and_then(|_| {
                window.set_size(LogicalSize::new(bounds.width as f64, bounds.height as f64))
            })
            .and_then(|_| window.show())
            .and_then(|_| window.set_focus())
            .map_err(|e| CaptureError::Overlay(e.to_string()))
    }

    fn hide(&self) -> Result<(), CaptureError> {
        match self.app.get_webview_window(OVERLAY_LABEL) {
            Some(window) => window.hide().map_err(|e| CaptureError::Overlay(e.to_string())),
            None => Ok(()),
        }
    }

    fn destroy(&self) {
        if let Some(window) = self.app.get_webview_window(OVERLAY_LABEL) {
            if let Err(e) = window.destroy() {
                log::error!("[CAPTURE] Failed to destroy overlay: {}", e);
            }
        }
    }
}
