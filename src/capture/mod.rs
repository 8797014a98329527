//! Screen capture domain — public API.
//!
//! This module owns interactive region capture. The OS-facing parts sit
//! behind two traits so the sequencing logic runs (and is tested) without a
//! real display:
//! - `ScreenSource` — enumerate the primary display, take a full snapshot
//! - `OverlayHost`  — show / hide / destroy the selection overlay window

mod controller;
mod region;
mod selection;

#[cfg(feature = "desktop")]
mod overlay;
#[cfg(feature = "desktop")]
mod screenshot;

pub use controller::{RegionCaptureController, StageListener};
pub use region::{crop_to_png_bytes, encode_png, CropError, PixelRect, Point, RegionSelection};
pub use selection::{DragTracker, SelectionPhase};

#[cfg(feature = "desktop")]
pub use overlay::{TauriOverlayHost, OVERLAY_LABEL};
#[cfg(feature = "desktop")]
pub use screenshot::XcapScreenSource;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Env var overriding the settle delay, in milliseconds.
pub const SETTLE_DELAY_ENV_VAR: &str = "HDSOME_SETTLE_DELAY_MS";

/// Pause between hiding the overlay and taking the snapshot. The compositor
/// redraws asynchronously; without the pause the overlay can still show up in
/// the frame. A heuristic, not a guarantee.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Drags whose width or height is at or below this (overlay pixels) are ignored.
pub const DEFAULT_MIN_SELECTION: f64 = 10.0;

/// Logical bounds of a display in desktop-global coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A PNG-encoded capture returned to the caller. Not persisted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...`, ready for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// Infrastructure side of capture: the displays and their pixels.
pub trait ScreenSource: Send + Sync {
    /// Bounds of the display the overlay should cover.
    fn primary_display(&self) -> Result<DisplayBounds, CaptureError>;

    /// Full snapshot of that display, at whatever pixel density the OS gives.
    fn capture_primary(&self) -> Result<DynamicImage, CaptureError>;
}

/// The transparent, input-grabbing window the user drags on.
pub trait OverlayHost: Send + Sync {
    fn show(&self, bounds: DisplayBounds) -> Result<(), CaptureError>;

    /// Make the overlay invisible without destroying it.
    fn hide(&self) -> Result<(), CaptureError>;

    /// Must be safe to call on an overlay that was never shown.
    fn destroy(&self);
}

/// Milestones of a capture session, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureStage {
    OverlayShown,
    SelectionMade,
    OverlayHidden,
    SnapshotTaken,
    Cropped,
    OverlayDestroyed,
}

/// Tunables for `RegionCaptureController`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub settle_delay: Duration,
    pub min_selection: f64,
    /// Give up if no selection arrives in time. `None` waits indefinitely.
    pub selection_timeout: Option<Duration>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            min_selection: DEFAULT_MIN_SELECTION,
            selection_timeout: None,
        }
    }
}

impl CaptureSettings {
    /// Defaults, with the settle delay overridable from the environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(raw) = std::env::var(SETTLE_DELAY_ENV_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => settings.settle_delay = Duration::from_millis(ms),
                Err(e) => log::warn!("[CAPTURE] Ignoring {}={:?}: {}", SETTLE_DELAY_ENV_VAR, raw, e),
            }
        }
        settings
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The user pressed Escape. Not a failure worth reporting.
    #[error("Region selection cancelled")]
    SelectionCancelled,

    #[error("No capturable screen source: {0}")]
    NoSource(String),

    #[error("A region capture is already in progress")]
    SessionInProgress,

    #[error("No region capture is in progress")]
    NoActiveSession,

    #[error("Region selection timed out")]
    TimedOut,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Overlay window error: {0}")]
    Overlay(String),

    #[error(transparent)]
    Crop(#[from] CropError),
}

impl CaptureError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CaptureError::SelectionCancelled)
    }
}
