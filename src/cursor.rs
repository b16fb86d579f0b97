//! Pointer modality: passthrough, move, and resize grabs.

use crate::geometry::Rect;
use crate::ids::ViewId;

/// The edges a resize grab is anchored to, so growing from a top-left
/// corner moves the opposite corner of the other two and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEdges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Pointer events are delivered to whatever is under the cursor.
    Passthrough,
    /// Dragging `view`; `grab_offset` is the pointer's position relative to
    /// the view's origin at grab start, held constant through the drag.
    Move { view: ViewId, grab_offset_x: i32, grab_offset_y: i32 },
    /// Resizing `view` from `start_box` along `edges`; the pointer's
    /// starting position is implied by `start_box` plus the first motion
    /// delta the grab receives.
    Resize {
        view: ViewId,
        start_box: Rect,
        edges: ResizeEdges,
    },
}

/// Which physical button a press/release event came from. The compositor
/// only distinguishes three; anything else is `Other` and never starts a
/// grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabError {
    /// A grab is already active; only one is allowed at a time per seat (a
    /// second button press during an active grab is ignored, not queued).
    AlreadyGrabbing,
}

/// One seat's pointer state: its mode, and how many buttons are currently
/// held (a grab ends on release of whichever button started it, tracked
/// by `pressed_count` rather than a specific button code since the caller
/// already knows which button to watch).
pub struct Cursor {
    pub x: i32,
    pub y: i32,
    mode: CursorMode,
    pressed_count: u32,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            mode: CursorMode::Passthrough,
            pressed_count: 0,
        }
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.mode, CursorMode::Passthrough)
    }

    pub fn note_button_down(&mut self) {
        self.pressed_count += 1;
    }

    /// How many buttons are currently held. A modifier+click grab only
    /// starts from the first button of a fresh press, not a second button
    /// added mid-click.
    pub fn pressed_count(&self) -> u32 {
        self.pressed_count
    }

    /// Returns `true` if this release ended an active grab (every button
    /// released while grabbing returns to passthrough; a grab that started
    /// with multiple buttons held only ends once they're all back up).
    pub fn note_button_up(&mut self) -> bool {
        self.pressed_count = self.pressed_count.saturating_sub(1);
        if self.pressed_count == 0 && !self.is_passthrough() {
            self.mode = CursorMode::Passthrough;
            true
        } else {
            false
        }
    }

    pub fn begin_move(&mut self, view: ViewId, view_box: Rect) -> Result<(), GrabError> {
        if !self.is_passthrough() {
            return Err(GrabError::AlreadyGrabbing);
        }
        self.mode = CursorMode::Move {
            view,
            grab_offset_x: self.x - view_box.x,
            grab_offset_y: self.y - view_box.y,
        };
        Ok(())
    }

    pub fn begin_resize(&mut self, view: ViewId, view_box: Rect, edges: ResizeEdges) -> Result<(), GrabError> {
        if !self.is_passthrough() {
            return Err(GrabError::AlreadyGrabbing);
        }
        self.mode = CursorMode::Resize {
            view,
            start_box: view_box,
            edges,
        };
        Ok(())
    }

    /// Moves the cursor to `(x, y)` and, if a move grab is active, returns
    /// the view's new (unclamped) box; the caller clamps it into the
    /// output's usable rect with `Rect::clamp_x`/`clamp_y` and writes it
    /// into the view's `pending.box_`.
    pub fn motion(&mut self, x: i32, y: i32) -> Option<(ViewId, Rect)> {
        self.x = x;
        self.y = y;
        match self.mode {
            CursorMode::Move {
                view,
                grab_offset_x,
                grab_offset_y,
            } => Some((view, Rect::new(x - grab_offset_x, y - grab_offset_y, 0, 0))),
            CursorMode::Resize { view, start_box, edges } => {
                Some((view, resize_box(start_box, edges, x, y)))
            }
            CursorMode::Passthrough => None,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes a resized box given the pointer's absolute position, growing
/// or shrinking only along the anchored edges and leaving the opposite
/// edge fixed. Width/height are not clamped to a minimum here; that's
/// `SizeConstraints::clamp`'s job once this reaches `View::apply_constraints`.
fn resize_box(start: Rect, edges: ResizeEdges, px: i32, py: i32) -> Rect {
    let mut r = start;
    if edges.left {
        let right = start.right();
        r.x = px;
        r.width = right - px;
    } else if edges.right {
        r.width = px - start.x;
    }
    if edges.top {
        let bottom = start.bottom();
        r.y = py;
        r.height = bottom - py;
    } else if edges.bottom {
        r.height = py - start.y;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cursor_is_passthrough() {
        assert!(Cursor::new().is_passthrough());
    }

    #[test]
    fn move_grab_tracks_pointer_offset() {
        let view = ViewId::default();
        let mut c = Cursor::new();
        c.x = 110;
        c.y = 210;
        c.begin_move(view, Rect::new(100, 200, 50, 50)).unwrap();
        // Grab offset is (10, 10); moving to (300, 300) should place the
        // view's origin at (290, 290).
        let (moved, result) = c.motion(300, 300).unwrap();
        assert_eq!(moved, view);
        assert_eq!((result.x, result.y), (290, 290));
    }

    #[test]
    fn second_grab_while_active_is_refused() {
        let view = ViewId::default();
        let mut c = Cursor::new();
        c.begin_move(view, Rect::new(0, 0, 10, 10)).unwrap();
        assert_eq!(
            c.begin_move(view, Rect::new(0, 0, 10, 10)),
            Err(GrabError::AlreadyGrabbing)
        );
    }

    #[test]
    fn releasing_the_only_button_ends_the_grab() {
        let view = ViewId::default();
        let mut c = Cursor::new();
        c.note_button_down();
        c.begin_move(view, Rect::new(0, 0, 10, 10)).unwrap();
        assert!(c.note_button_up());
        assert!(c.is_passthrough());
    }

    #[test]
    fn resize_from_bottom_right_grows_in_place() {
        let view = ViewId::default();
        let mut c = Cursor::new();
        c.begin_resize(
            view,
            Rect::new(0, 0, 100, 100),
            ResizeEdges { top: false, bottom: true, left: false, right: true },
        )
        .unwrap();
        let (_, result) = c.motion(150, 140).unwrap();
        assert_eq!(result, Rect::new(0, 0, 150, 140));
    }

    #[test]
    fn resize_from_top_left_moves_origin_and_keeps_opposite_corner() {
        let view = ViewId::default();
        let mut c = Cursor::new();
        c.begin_resize(
            view,
            Rect::new(100, 100, 100, 100),
            ResizeEdges { top: true, bottom: false, left: true, right: false },
        )
        .unwrap();
        let (_, result) = c.motion(80, 80).unwrap();
        // Bottom-right corner (200, 200) stays fixed.
        assert_eq!(result, Rect::new(80, 80, 120, 120));
    }

    #[test]
    fn passthrough_motion_reports_no_grabbed_view() {
        let mut c = Cursor::new();
        assert_eq!(c.motion(10, 10), None);
    }
}
