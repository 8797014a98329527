//! Full-screen capture using the `xcap` crate.
//!
//! This is the infrastructure layer — it talks to the OS.

use super::{CaptureError, DisplayBounds, ScreenSource};
use image::DynamicImage;
use xcap::Monitor;

/// Captures the primary monitor (or the first one, if none reports primary).
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreenSource;

impl XcapScreenSource {
    fn primary_monitor() -> Result<Monitor, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::NoSource(e.to_string()))?;

        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
        fallback.ok_or_else(|| CaptureError::NoSource("no monitors found".to_string()))
    }
}

impl ScreenSource for XcapScreenSource {
    fn primary_display(&self) -> Result<DisplayBounds, CaptureError> {
        let monitor = Self::primary_monitor()?;
        let read = |e: xcap::XCapError| CaptureError::NoSource(e.to_string());
        Ok(DisplayBounds {
            x: monitor.x().map_err(read)?,
            y: monitor.y().map_err(read)?,
            width: monitor.width().map_err(read)?,
            height: monitor.height().map_err(read)?,
        })
    }

    fn capture_primary(&self) -> Result<DynamicImage, CaptureError> {
        let monitor = Self::primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        Ok(DynamicImage::ImageRgba8(image))
    }
}
