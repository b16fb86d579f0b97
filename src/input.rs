//! Device bookkeeping for the single logical seat: virtual and physical
//! pointers/keyboards are attached identically once added, and the
//! input-inhibitor gate decides whether a given client's events reach the
//! seat at all. The actual libinput/virtual-device wiring lives in
//! `state.rs` (it needs live smithay types); this module is the
//! transport-agnostic policy layer above it, same split as `layout::tracker`
//! versus `layout::protocol`.

use crate::ids::SeatId;
use crate::seat::{ClientToken, DeviceKind, Seat};

/// Owns the one `"default"` seat's device list and input-inhibitor gate.
/// Multi-seat support is out of scope, so this is deliberately not a
/// collection.
pub struct InputManager {
    pub seat_id: SeatId,
}

impl InputManager {
    pub fn new(seat_id: SeatId) -> Self {
        Self { seat_id }
    }

    /// Registers a newly-enumerated device (physical or virtual — the two
    /// become indistinguishable once attached) on `seat`.
    pub fn attach_device(&self, seat: &mut Seat, kind: DeviceKind) {
        seat.add_device(kind);
    }

    /// `true` if `seat`'s input-inhibitor gate should swallow an event
    /// originating from `client` rather than route it normally.
    pub fn is_blocked(&self, seat: &Seat, client: Option<ClientToken>) -> bool {
        seat.is_inhibited_for(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SeatId;

    #[test]
    fn attached_devices_are_recorded_regardless_of_kind() {
        let manager = InputManager::new(SeatId::default());
        let mut seat = Seat::new(SeatId::default());
        manager.attach_device(&mut seat, DeviceKind::Pointer);
        manager.attach_device(&mut seat, DeviceKind::Keyboard);
        assert_eq!(seat.devices().len(), 2);
    }

    #[test]
    fn blocked_check_defers_to_the_seat_inhibitor_gate() {
        let manager = InputManager::new(SeatId::default());
        let mut seat = Seat::new(SeatId::default());
        assert!(!manager.is_blocked(&seat, None));
        seat.inhibit(ClientToken(1)).unwrap();
        assert!(manager.is_blocked(&seat, None));
        assert!(!manager.is_blocked(&seat, Some(ClientToken(1))));
    }
}
