//! Drag Session
//!
//! Pointer state machine for dragging tags in a panel.
//! Uses a movement threshold to distinguish a click from a drag.

use tag_store::TagId;

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: u32 = 5;

/// A completed drag: `active` was dropped onto `over`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropIntent {
    pub active: TagId,
    pub over: TagId,
}

/// Outcome of releasing the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Pressed and released without moving past the threshold
    Click(TagId),
    Drop(DropIntent),
    /// Drag ended outside any tag row
    Cancelled,
    /// Nothing was pressed
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct DragSession {
    /// Pressed but not yet moved past the threshold
    pending: Option<TagId>,
    start: (i32, i32),
    dragging: Option<TagId>,
    over: Option<TagId>,
    just_ended: bool,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary button pressed on a tag row
    pub fn press(&mut self, id: TagId, x: i32, y: i32) {
        self.pending = Some(id);
        self.start = (x, y);
        self.just_ended = false;
    }

    /// Pointer moved. Returns true when this motion started the drag.
    pub fn motion(&mut self, x: i32, y: i32) -> bool {
        let Some(id) = self.pending else {
            return false;
        };
        let dx = x.abs_diff(self.start.0);
        let dy = y.abs_diff(self.start.1);
        if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
            self.pending = None;
            self.dragging = Some(id);
            return true;
        }
        false
    }

    /// Pointer entered a tag row. The dragged tag never targets itself.
    pub fn enter(&mut self, id: TagId) {
        if self.dragging.is_some_and(|d| d != id) {
            self.over = Some(id);
        }
    }

    /// Pointer left a tag row
    pub fn leave(&mut self, id: TagId) {
        if self.over == Some(id) {
            self.over = None;
        }
    }

    pub fn release(&mut self) -> Release {
        let result = match (self.dragging, self.over, self.pending) {
            (Some(active), Some(over), _) => Release::Drop(DropIntent { active, over }),
            (Some(_), None, _) => Release::Cancelled,
            (None, _, Some(id)) => Release::Click(id),
            (None, _, None) => Release::Idle,
        };
        self.just_ended = self.dragging.is_some();
        self.pending = None;
        self.dragging = None;
        self.over = None;
        result
    }

    pub fn dragging(&self) -> Option<TagId> {
        self.dragging
    }

    pub fn drop_target(&self) -> Option<TagId> {
        self.over
    }

    /// True right after a drag ended, so the host can swallow the trailing click
    pub fn just_ended(&self) -> bool {
        self.just_ended
    }

    pub fn clear_just_ended(&mut self) {
        self.just_ended = false;
    }
}
