//! Drag-to-select state machine driven by overlay pointer events.
//!
//! ```text
//! OverlayShown --press--> Dragging --move--> Dragging
//! Dragging --release, both sides > min--> Selected
//! Dragging --release, too small--------> OverlayShown
//! OverlayShown | Dragging --cancel--> Cancelled
//! ```
//!
//! Coordinates are overlay-local; the size gate uses the same units.

use super::region::{Point, RegionSelection};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionPhase {
    OverlayShown,
    Dragging { start: Point, current: Point },
    Selected(RegionSelection),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct DragTracker {
    phase: SelectionPhase,
    min_size: f64,
}

impl DragTracker {
    pub fn new(min_size: f64) -> Self {
        Self {
            phase: SelectionPhase::OverlayShown,
            min_size,
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            SelectionPhase::Selected(_) | SelectionPhase::Cancelled
        )
    }

    /// Start a drag. Ignored unless waiting for one.
    pub fn press(&mut self, at: Point) -> bool {
        match self.phase {
            SelectionPhase::OverlayShown => {
                self.phase = SelectionPhase::Dragging {
                    start: at,
                    current: at,
                };
                true
            }
            _ => false,
        }
    }

    /// Update the drag; returns the preview rectangle.
    pub fn motion(&mut self, to: Point) -> Option<RegionSelection> {
        match self.phase {
            SelectionPhase::Dragging { start, .. } => {
                self.phase = SelectionPhase::Dragging { start, current: to };
                Some(RegionSelection::from_drag(start, to))
            }
            _ => None,
        }
    }

    /// Finish the drag. Returns the selection if it passes the size gate;
    /// otherwise the drag is discarded and a new one may start.
    pub fn release(&mut self, at: Point) -> Option<RegionSelection> {
        let SelectionPhase::Dragging { start, .. } = self.phase else {
            return None;
        };
        self.accept(RegionSelection::from_drag(start, at))
    }

    /// Accept a rectangle tracked elsewhere (e.g. by the overlay page).
    /// Subject to the same size gate as a drag.
    pub fn submit(&mut self, region: RegionSelection) -> Option<RegionSelection> {
        if self.is_finished() {
            return None;
        }
        self.accept(region.normalized())
    }

    pub fn cancel(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.phase = SelectionPhase::Cancelled;
        true
    }

    fn accept(&mut self, region: RegionSelection) -> Option<RegionSelection> {
        if region.exceeds(self.min_size) {
            self.phase = SelectionPhase::Selected(region);
            Some(region)
        } else {
            log::debug!(
                "[CAPTURE] Ignoring {:.0}x{:.0} selection (min {})",
                region.width,
                region.height,
                self.min_size
            );
            self.phase = SelectionPhase::OverlayShown;
            None
        }
    }
}
