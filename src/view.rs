//! Per-window state: the current/pending/inflight snapshot triple, size
//! constraints, and the shell capability handle.

use crate::geometry::{Rect, SizeConstraints};
use crate::ids::{NodeId, OutputId};
use crate::tags::Tags;

/// A 32-bit wire serial, monotonically increasing. Wraps whatever the
/// concrete shell implementation hands back from `configure()`; kept as our
/// own type (rather than smithay's) so the view/transaction logic has no
/// smithay dependency and can be unit-tested without a live display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigureSerial(pub u64);

/// One of the three geometry/state snapshots a `View` carries. Value
/// semantic and cheap to copy, per the Design Notes: the transaction engine
/// swaps these wholesale at commit rather than mutating fields in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub box_: Rect,
    pub tags: Tags,
    pub float: bool,
    pub fullscreen: bool,
    pub focus_count: u32,
}

impl Snapshot {
    pub fn new(box_: Rect, tags: Tags) -> Self {
        Self {
            box_,
            tags,
            float: false,
            fullscreen: false,
            focus_count: 0,
        }
    }
}

/// The capability set a shell-specific surface (xdg-shell toplevel or an
/// XWayland surface) exposes to the core. The Root/Transaction engine only
/// ever talks to a `dyn ShellSurface`, per the "static polymorphism across
/// shell kinds" design note.
pub trait ShellSurface {
    /// Instructs the client to take `box_`. Returns the serial to expect
    /// back in the eventual acknowledgement, or `None` for shells (X11)
    /// that have no configure/ack round-trip — those are treated as
    /// acknowledged the instant they are configured.
    fn configure(&self, box_: Rect) -> Option<ConfigureSerial>;

    /// Asks the client to close. The eventual unmap is observed later as a
    /// separate event; this call never blocks and never itself removes the
    /// view.
    fn close(&self);

    fn constraints(&self) -> SizeConstraints;
    fn set_activated(&self, activated: bool);
    fn set_fullscreen(&self, fullscreen: bool);
    fn app_id(&self) -> Option<String>;

    /// `false` once the backing client resource has gone away; the core
    /// treats this as "same as an explicit unmap" wherever it matters
    /// (focus reassignment, transaction bookkeeping).
    fn alive(&self) -> bool;
}

/// Per-window state. Owned by `Root::views`; cross-links to its `Output`
/// and its position in that output's `ViewStack` are ids, never
/// back-pointers.
pub struct View {
    pub output: OutputId,
    pub node: NodeId,

    pub current: Snapshot,
    pub pending: Snapshot,
    pub inflight: Snapshot,

    pub constraints: SizeConstraints,
    pub float_box: Rect,
    pub pending_serial: Option<ConfigureSerial>,

    pub shell: Box<dyn ShellSurface>,
}

impl View {
    pub fn new(output: OutputId, node: NodeId, shell: Box<dyn ShellSurface>, tags: Tags) -> Self {
        let constraints = shell.constraints();
        let snapshot = Snapshot::new(Rect::default(), tags);
        Self {
            output,
            node,
            current: snapshot,
            pending: snapshot,
            inflight: snapshot,
            constraints,
            float_box: Rect::default(),
            pending_serial: None,
            shell,
        }
    }

    /// `needsConfigure()`: true iff the client doesn't yet believe
    /// `pending.box`. "What the client currently believes" is the last box
    /// it was actually configured with — `inflight.box_` while a configure
    /// is outstanding, `current.box_` otherwise.
    pub fn needs_configure(&self) -> bool {
        let client_believes = if self.pending_serial.is_some() {
            self.inflight.box_
        } else {
            self.current.box_
        };
        client_believes != self.pending.box_
    }

    /// `applyConstraints()`: clamps `pending.box.{width,height}` into
    /// `[min, max]`.
    pub fn apply_constraints(&mut self) {
        let (w, h) = self
            .constraints
            .clamp(self.pending.box_.width, self.pending.box_.height);
        self.pending.box_.width = w;
        self.pending.box_.height = h;
    }

    /// `configure()`: sends the client `pending.box` and records the
    /// resulting serial (or treats shells with no ack round-trip as
    /// immediately settled).
    pub fn configure(&mut self) {
        self.inflight = self.pending;
        self.pending_serial = self.shell.configure(self.pending.box_);
    }

    /// `applyPending()`: copies tags/float/fullscreen into the view's
    /// *current* snapshot ahead of the next arrangement (geometry itself is
    /// always supplied by the layout client / transaction engine, not by
    /// this call).
    pub fn apply_pending_state(&mut self) {
        self.current.tags = self.pending.tags;
        self.current.float = self.pending.float;
        self.current.fullscreen = self.pending.fullscreen;
    }

    pub fn close(&self) {
        self.shell.close();
    }

    pub fn set_activated(&self, activated: bool) {
        self.shell.set_activated(activated);
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.shell.set_fullscreen(fullscreen);
        self.pending.fullscreen = fullscreen;
    }

    /// The tags arrangement should filter on for this view right now: the
    /// pending tags if an arrangement is in flight for them, else current.
    /// Used as the `tags_of` closure passed to `ViewStack::pendingIterator`.
    pub fn effective_pending_tags(&self) -> Tags {
        self.pending.tags
    }

    pub fn current_tags(&self) -> Tags {
        self.current.tags
    }

    /// Sets `pending.tags`, silently refusing if that would zero it: a view
    /// must always carry at least one tag.
    pub fn set_pending_tags(&mut self, tags: Tags) {
        if !tags.is_empty() {
            self.pending.tags = tags;
        }
    }

    pub fn toggle_pending_tags(&mut self, mask: Tags) {
        self.set_pending_tags(self.pending.tags.toggled(mask));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockShell {
        constraints: SizeConstraints,
        next_serial: std::cell::Cell<u64>,
        has_acks: bool,
    }

    impl ShellSurface for MockShell {
        fn configure(&self, _box_: Rect) -> Option<ConfigureSerial> {
            if !self.has_acks {
                return None;
            }
            let s = self.next_serial.get();
            self.next_serial.set(s + 1);
            Some(ConfigureSerial(s))
        }
        fn close(&self) {}
        fn constraints(&self) -> SizeConstraints {
            self.constraints
        }
        fn set_activated(&self, _activated: bool) {}
        fn set_fullscreen(&self, _fullscreen: bool) {}
        fn app_id(&self) -> Option<String> {
            None
        }
        fn alive(&self) -> bool {
            true
        }
    }

    fn mock_view(tags: u32) -> View {
        let shell = MockShell {
            constraints: SizeConstraints::default(),
            next_serial: std::cell::Cell::new(0),
            has_acks: true,
        };
        View::new(
            OutputId::default(),
            NodeId::default(),
            Box::new(shell),
            Tags::new(tags),
        )
    }

    #[test]
    fn needs_configure_false_when_pending_matches_current() {
        let v = mock_view(1);
        assert!(!v.needs_configure());
    }

    #[test]
    fn needs_configure_true_after_pending_box_changes() {
        let mut v = mock_view(1);
        v.pending.box_ = Rect::new(0, 0, 400, 600);
        assert!(v.needs_configure());
    }

    #[test]
    fn configure_sets_pending_serial_and_inflight() {
        let mut v = mock_view(1);
        v.pending.box_ = Rect::new(0, 0, 400, 600);
        v.configure();
        assert!(v.pending_serial.is_some());
        assert_eq!(v.inflight.box_, Rect::new(0, 0, 400, 600));
        assert!(!v.needs_configure());
    }

    #[test]
    fn shells_without_acks_get_no_pending_serial() {
        let shell = MockShell {
            constraints: SizeConstraints::default(),
            next_serial: std::cell::Cell::new(0),
            has_acks: false,
        };
        let mut v = View::new(
            OutputId::default(),
            NodeId::default(),
            Box::new(shell),
            Tags::new(1),
        );
        v.pending.box_ = Rect::new(0, 0, 10, 10);
        v.configure();
        assert_eq!(v.pending_serial, None);
    }

    #[test]
    fn apply_constraints_clamps_into_range() {
        let shell = MockShell {
            constraints: SizeConstraints {
                min_width: 100,
                min_height: 100,
                max_width: 200,
                max_height: 200,
            },
            next_serial: std::cell::Cell::new(0),
            has_acks: true,
        };
        let mut v = View::new(
            OutputId::default(),
            NodeId::default(),
            Box::new(shell),
            Tags::new(1),
        );
        v.pending.box_ = Rect::new(0, 0, 10, 500);
        v.apply_constraints();
        assert_eq!(v.pending.box_.width, 100);
        assert_eq!(v.pending.box_.height, 200);
    }

    #[test]
    fn toggle_that_would_zero_tags_is_ignored() {
        let mut v = mock_view(0b0001);
        v.toggle_pending_tags(Tags::new(0b0001));
        assert_eq!(v.pending.tags, Tags::new(0b0001));
    }
}
