//! Interactive region capture: overlay → drag → hide → snapshot → crop.
//!
//! One session at a time. Each session owns a one-shot channel; the overlay
//! signals (`pointer_*`, `submit_selection`, `cancel`) resolve it exactly once.
//! The overlay is destroyed on every exit path, including early returns and
//! a dropped future.

use super::region::{crop_to_png_bytes, encode_png, Point, RegionSelection};
use super::selection::DragTracker;
use super::{
    CaptureError, CaptureSettings, CaptureStage, CapturedImage, DisplayBounds, OverlayHost,
    ScreenSource,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::oneshot;

/// Receives stage transitions as they happen.
pub type StageListener = Arc<dyn Fn(CaptureStage) + Send + Sync>;

enum Outcome {
    Selected(RegionSelection),
    Cancelled,
}

struct ActiveSession {
    id: u64,
    bounds: DisplayBounds,
    tracker: DragTracker,
    reply: Option<oneshot::Sender<Outcome>>,
}

impl ActiveSession {
    fn resolve(&mut self, outcome: Outcome) {
        if let Some(reply) = self.reply.take() {
            // Receiver gone means the session is already unwinding.
            let _ = reply.send(outcome);
        }
    }

    fn to_global(&self, region: RegionSelection) -> RegionSelection {
        region.translated(self.bounds.x as f64, self.bounds.y as f64)
    }
}

pub struct RegionCaptureController {
    source: Arc<dyn ScreenSource>,
    overlay: Arc<dyn OverlayHost>,
    settings: CaptureSettings,
    listener: Option<StageListener>,
    active: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl RegionCaptureController {
    pub fn new(
        source: Arc<dyn ScreenSource>,
        overlay: Arc<dyn OverlayHost>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            source,
            overlay,
            settings,
            listener: None,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_stage_listener(mut self, listener: StageListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Run a full interactive session and return the selected region.
    ///
    /// Fails with `SelectionCancelled` on Escape, `NoSource` when nothing can
    /// be captured, `SessionInProgress` if another session is running.
    pub async fn capture_region(&self) -> Result<CapturedImage, CaptureError> {
        let start = Instant::now();
        let bounds = self.source.primary_display()?;

        let (session_id, selection) = self.begin_session(bounds)?;
        let _guard = SessionGuard {
            controller: self,
            session_id,
        };

        self.overlay.show(bounds)?;
        self.emit(CaptureStage::OverlayShown);
        log::info!(
            "[CAPTURE] Overlay shown over {}x{} at {},{}",
            bounds.width,
            bounds.height,
            bounds.x,
            bounds.y
        );

        let outcome = match self.settings.selection_timeout {
            Some(limit) => tokio::time::timeout(limit, selection)
                .await
                .map_err(|_| CaptureError::TimedOut)?,
            None => selection.await,
        };
        let region = match outcome {
            Ok(Outcome::Selected(region)) => region,
            Ok(Outcome::Cancelled) | Err(_) => {
                log::info!("[CAPTURE] Selection cancelled");
                return Err(CaptureError::SelectionCancelled);
            }
        };
        self.emit(CaptureStage::SelectionMade);

        // Hide before the snapshot so the overlay's own pixels stay out of it.
        self.overlay.hide()?;
        self.emit(CaptureStage::OverlayHidden);
        tokio::time::sleep(self.settings.settle_delay).await;

        let snapshot_start = Instant::now();
        let source = Arc::clone(&self.source);
        let snapshot = tokio::task::spawn_blocking(move || source.capture_primary())
            .await
            .map_err(|e| CaptureError::CaptureFailed(format!("capture task failed: {}", e)))??;
        self.emit(CaptureStage::SnapshotTaken);
        log::info!(
            "[CAPTURE] Screen captured in {}ms ({}x{})",
            snapshot_start.elapsed().as_millis(),
            snapshot.width(),
            snapshot.height()
        );

        let rect = region.to_pixel_rect(&bounds, snapshot.width(), snapshot.height())?;
        let png = crop_to_png_bytes(&snapshot, rect)?;
        self.emit(CaptureStage::Cropped);

        log::info!(
            "[CAPTURE] Cropped region ({}x{} at {},{}) in {}ms total — {} bytes",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            start.elapsed().as_millis(),
            png.len()
        );

        Ok(CapturedImage {
            png,
            width: rect.width,
            height: rect.height,
        })
    }

    /// Snapshot the whole primary display, no overlay involved.
    pub async fn capture_full_screen(&self) -> Result<CapturedImage, CaptureError> {
        let start = Instant::now();
        let source = Arc::clone(&self.source);
        let snapshot = tokio::task::spawn_blocking(move || source.capture_primary())
            .await
            .map_err(|e| CaptureError::CaptureFailed(format!("capture task failed: {}", e)))??;

        let png = encode_png(&snapshot)?;
        log::info!(
            "[CAPTURE] Full screen captured in {}ms — {} bytes",
            start.elapsed().as_millis(),
            png.len()
        );
        Ok(CapturedImage {
            png,
            width: snapshot.width(),
            height: snapshot.height(),
        })
    }

    /// Overlay mouse-down, in overlay-local pixels.
    pub fn pointer_down(&self, x: f64, y: f64) -> Result<bool, CaptureError> {
        self.with_session(|session| session.tracker.press(Point::new(x, y)))
    }

    /// Overlay mouse-move; returns the live preview rectangle (overlay-local).
    pub fn pointer_move(&self, x: f64, y: f64) -> Result<Option<RegionSelection>, CaptureError> {
        self.with_session(|session| session.tracker.motion(Point::new(x, y)))
    }

    /// Overlay mouse-up. Returns `true` if the drag was large enough to be
    /// submitted; `false` leaves the overlay up for another attempt.
    pub fn pointer_up(&self, x: f64, y: f64) -> Result<bool, CaptureError> {
        self.with_session(|session| match session.tracker.release(Point::new(x, y)) {
            Some(region) => {
                let global = session.to_global(region);
                session.resolve(Outcome::Selected(global));
                true
            }
            None => false,
        })
    }

    /// A rectangle (overlay-local) tracked by the overlay page itself.
    pub fn submit_selection(&self, region: RegionSelection) -> Result<bool, CaptureError> {
        self.with_session(|session| match session.tracker.submit(region) {
            Some(region) => {
                let global = session.to_global(region);
                session.resolve(Outcome::Selected(global));
                true
            }
            None => false,
        })
    }

    /// Escape pressed on the overlay.
    pub fn cancel(&self) -> Result<bool, CaptureError> {
        self.with_session(|session| {
            let cancelled = session.tracker.cancel();
            if cancelled {
                session.resolve(Outcome::Cancelled);
            }
            cancelled
        })
    }

    fn begin_session(
        &self,
        bounds: DisplayBounds,
    ) -> Result<(u64, oneshot::Receiver<Outcome>), CaptureError> {
        let mut active = self.lock_active();
        if active.is_some() {
            return Err(CaptureError::SessionInProgress);
        }
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *active = Some(ActiveSession {
            id,
            bounds,
            tracker: DragTracker::new(self.settings.min_selection),
            reply: Some(tx),
        });
        Ok((id, rx))
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut ActiveSession) -> T,
    ) -> Result<T, CaptureError> {
        let mut active = self.lock_active();
        let session = active.as_mut().ok_or(CaptureError::NoActiveSession)?;
        Ok(f(session))
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, stage: CaptureStage) {
        log::debug!("[CAPTURE] Stage: {:?}", stage);
        if let Some(listener) = &self.listener {
            listener(stage);
        }
    }
}

/// Tears the session down when `capture_region` exits, however it exits.
struct SessionGuard<'a> {
    controller: &'a RegionCaptureController,
    session_id: u64,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.controller.overlay.destroy();
        self.controller.emit(CaptureStage::OverlayDestroyed);

        let mut active = self.controller.lock_active();
        if active.as_ref().map(|s| s.id) == Some(self.session_id) {
            *active = None;
        }
    }
}
