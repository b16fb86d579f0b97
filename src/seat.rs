//! Per-seat focus and the input-inhibitor gate.

use crate::cursor::Cursor;
use crate::ids::{SeatId, ViewId};

/// Opaque handle to a layer-shell surface that has requested exclusive
/// keyboard interactivity, kept as a seat-local counter rather than the
/// smithay surface object so this module stays usable without a live
/// display (`state.rs` owns the mapping back to the real surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerSurfaceToken(pub u64);

/// What currently has keyboard focus on a seat: nothing, a view, or a
/// layer-shell surface. A tagged sum rather than an `Option` plus a
/// separate flag, so payload validity is encoded in the variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    None,
    View(ViewId),
    Layer(LayerSurfaceToken),
}

/// A seat "mode" as set by an `enter-mode` control command; mode `0` is
/// the always-present default and mode `1` is the reserved *locked* mode
/// the input-inhibitor gate switches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModeId(pub u32);

impl ModeId {
    pub const DEFAULT: ModeId = ModeId(0);
    pub const LOCKED: ModeId = ModeId(1);
}

/// Opaque handle to whichever client currently holds the input-inhibitor
/// lock, independent of smithay's `ClientId` so this module stays
/// testable without a live display; `state.rs` is the only place that
/// converts between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitError {
    AlreadyInhibited,
}

/// One attached input device, kept only well enough to answer "does this
/// seat have a pointer/keyboard" — the smithay-side device handle lives in
/// `state.rs`'s `InputManager`, which is the only place that needs to tell
/// a virtual device apart from a physical one at creation time — once
/// attached, the two are indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Pointer,
    Keyboard,
}

pub struct Seat {
    pub id: SeatId,
    pub focus: FocusTarget,
    pub cursor: Cursor,
    inhibited_by: Option<ClientToken>,
    mode: ModeId,
    previous_mode: ModeId,
    devices: Vec<DeviceKind>,
}

impl Seat {
    pub fn new(id: SeatId) -> Self {
        Self {
            id,
            focus: FocusTarget::None,
            cursor: Cursor::new(),
            inhibited_by: None,
            mode: ModeId::DEFAULT,
            previous_mode: ModeId::DEFAULT,
            devices: Vec::new(),
        }
    }

    pub fn add_device(&mut self, kind: DeviceKind) {
        self.devices.push(kind);
    }

    pub fn devices(&self) -> &[DeviceKind] {
        &self.devices
    }

    pub fn mode(&self) -> ModeId {
        self.mode
    }

    /// Enters `mode`, remembering the previous one so the input-inhibitor
    /// gate can restore it on deactivation.
    pub fn enter_mode(&mut self, mode: ModeId) {
        self.previous_mode = self.mode;
        self.mode = mode;
    }

    /// Returns to whichever mode was active before the most recent
    /// `enter_mode`.
    pub fn restore_previous_mode(&mut self) {
        self.mode = self.previous_mode;
    }

    pub fn focus_view(&mut self, view: ViewId) {
        self.focus = FocusTarget::View(view);
    }

    pub fn focus_layer(&mut self, layer: LayerSurfaceToken) {
        self.focus = FocusTarget::Layer(layer);
    }

    pub fn clear_focus(&mut self) {
        self.focus = FocusTarget::None;
    }

    /// Drops focus if it currently points at `view` (called when a view is
    /// unmapped or loses eligibility, e.g. its tags no longer intersect the
    /// output's active tags).
    pub fn clear_focus_if(&mut self, view: ViewId) {
        if self.focus == FocusTarget::View(view) {
            self.focus = FocusTarget::None;
        }
    }

    pub fn focused_view(&self) -> Option<ViewId> {
        match self.focus {
            FocusTarget::View(v) => Some(v),
            _ => None,
        }
    }

    /// Grants the input-inhibitor lock to `client`, refusing if another
    /// client already holds it — exclusive, one holder at a time. On
    /// success, clears focus and enters the reserved *locked* mode,
    /// remembering what to restore on deactivation.
    pub fn inhibit(&mut self, client: ClientToken) -> Result<(), InhibitError> {
        match self.inhibited_by {
            Some(existing) if existing != client => return Err(InhibitError::AlreadyInhibited),
            Some(_) => return Ok(()),
            None => {}
        }
        self.inhibited_by = Some(client);
        self.clear_focus();
        self.enter_mode(ModeId::LOCKED);
        Ok(())
    }

    /// Releases the lock if `client` holds it and restores the mode that
    /// was active before the lock was taken. Focus itself is *not*
    /// recomputed here: the caller re-arranges layers and recomputes focus
    /// once this returns.
    pub fn release_inhibit(&mut self, client: ClientToken) {
        if self.inhibited_by == Some(client) {
            self.inhibited_by = None;
            self.restore_previous_mode();
        }
    }

    /// `true` once an exclusive client holds the lock and `candidate` isn't
    /// it: the caller should drop the input event rather than route it
    /// normally.
    pub fn is_inhibited_for(&self, candidate: Option<ClientToken>) -> bool {
        match self.inhibited_by {
            None => false,
            Some(holder) => candidate != Some(holder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_seat_has_no_focus() {
        let seat = Seat::new(SeatId::default());
        assert_eq!(seat.focus, FocusTarget::None);
    }

    #[test]
    fn clear_focus_if_only_affects_the_matching_view() {
        let mut views: slotmap::SlotMap<ViewId, ()> = slotmap::SlotMap::with_key();
        let a = views.insert(());
        let b = views.insert(());

        let mut seat = Seat::new(SeatId::default());
        seat.focus_view(a);
        seat.clear_focus_if(b);
        assert_eq!(seat.focus, FocusTarget::View(a));

        seat.clear_focus_if(a);
        assert_eq!(seat.focus, FocusTarget::None);
    }

    #[test]
    fn second_client_cannot_inhibit_while_another_holds_the_lock() {
        let mut seat = Seat::new(SeatId::default());
        seat.inhibit(ClientToken(1)).unwrap();
        assert_eq!(seat.inhibit(ClientToken(2)), Err(InhibitError::AlreadyInhibited));
    }

    #[test]
    fn same_client_can_reinhibit_idempotently() {
        let mut seat = Seat::new(SeatId::default());
        seat.inhibit(ClientToken(1)).unwrap();
        assert!(seat.inhibit(ClientToken(1)).is_ok());
    }

    #[test]
    fn release_by_a_non_holder_is_a_noop() {
        let mut seat = Seat::new(SeatId::default());
        seat.inhibit(ClientToken(1)).unwrap();
        seat.release_inhibit(ClientToken(2));
        assert!(seat.is_inhibited_for(Some(ClientToken(2))));
    }

    #[test]
    fn is_inhibited_for_the_holder_itself_is_false() {
        let mut seat = Seat::new(SeatId::default());
        seat.inhibit(ClientToken(1)).unwrap();
        assert!(!seat.is_inhibited_for(Some(ClientToken(1))));
        assert!(seat.is_inhibited_for(Some(ClientToken(2))));
        assert!(seat.is_inhibited_for(None));
    }

    #[test]
    fn inhibiting_clears_focus_and_enters_locked_mode() {
        let mut views: slotmap::SlotMap<ViewId, ()> = slotmap::SlotMap::with_key();
        let a = views.insert(());
        let mut seat = Seat::new(SeatId::default());
        seat.focus_view(a);
        seat.inhibit(ClientToken(1)).unwrap();
        assert_eq!(seat.focus, FocusTarget::None);
        assert_eq!(seat.mode(), ModeId::LOCKED);
    }

    #[test]
    fn releasing_inhibit_restores_the_previous_mode() {
        let mut seat = Seat::new(SeatId::default());
        seat.enter_mode(ModeId(3));
        seat.inhibit(ClientToken(1)).unwrap();
        assert_eq!(seat.mode(), ModeId::LOCKED);
        seat.release_inhibit(ClientToken(1));
        assert_eq!(seat.mode(), ModeId(3));
    }

    #[test]
    fn focus_layer_is_distinct_from_view_and_none() {
        let mut seat = Seat::new(SeatId::default());
        seat.focus_layer(LayerSurfaceToken(7));
        assert_eq!(seat.focus, FocusTarget::Layer(LayerSurfaceToken(7)));
        assert_eq!(seat.focused_view(), None);
    }
}
