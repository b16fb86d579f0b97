//! The serial/count bookkeeping behind one bound layout client's demands,
//! kept free of any Wayland wire types so serial supersession and count
//! mismatches are plain unit tests. `layout::protocol` adapts this to the
//! generated `mosaic_layout_v1` handler.

use crate::geometry::Rect;

/// A protocol-level error: the client violated the wire contract and
/// should be disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    CountMismatch,
    AlreadyCommitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The live demand settled; these are the geometries in advertisement
    /// order, ready to copy into each view's `pending.box`.
    Committed,
    /// `serial` didn't match the current live demand; silently ignored,
    /// not an error.
    Superseded,
}

struct LiveDemand {
    serial: u32,
    expected_count: usize,
    pushed: Vec<Rect>,
    committed: bool,
}

/// Tracks exactly one live `layout_demand` at a time for a single bound
/// layout client. A fresh `begin()` implicitly supersedes whatever demand
/// was live before it; there is no explicit cancellation message.
#[derive(Default)]
pub struct LayoutDemandTracker {
    next_serial: u32,
    live: Option<LiveDemand>,
}

impl LayoutDemandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh demand for `expected_count` views, superseding any
    /// prior live demand, and returns its serial.
    pub fn begin(&mut self, expected_count: usize) -> u32 {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        self.live = Some(LiveDemand {
            serial,
            expected_count,
            pushed: Vec::with_capacity(expected_count),
            committed: false,
        });
        serial
    }

    pub fn live_serial(&self) -> Option<u32> {
        self.live.as_ref().map(|d| d.serial)
    }

    /// `push_view_dimensions`. A push against a superseded serial is
    /// silently dropped (no error, no effect).
    pub fn push_dimensions(&mut self, serial: u32, rect: Rect) {
        if let Some(live) = self.live.as_mut() {
            if live.serial == serial && !live.committed {
                live.pushed.push(rect);
            }
        }
    }

    /// `commit`. Returns `Ok(Superseded)` for a stale serial (silently
    /// ignored), `Err(ProtocolError)` for a same-serial contract violation
    /// (wrong count, or committing twice), or `Ok(Committed)` with the
    /// geometries available via `take_committed`.
    pub fn commit(&mut self, serial: u32) -> Result<CommitOutcome, ProtocolError> {
        let live = match self.live.as_mut() {
            Some(live) if live.serial == serial => live,
            _ => return Ok(CommitOutcome::Superseded),
        };

        if live.committed {
            return Err(ProtocolError::AlreadyCommitted);
        }
        if live.pushed.len() != live.expected_count {
            return Err(ProtocolError::CountMismatch);
        }
        live.committed = true;
        Ok(CommitOutcome::Committed)
    }

    /// The geometries pushed for the most recent successful commit, in
    /// push order. `None` if the live demand hasn't committed (yet).
    pub fn committed_geometries(&self) -> Option<&[Rect]> {
        self.live
            .as_ref()
            .filter(|d| d.committed)
            .map(|d| d.pushed.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_commit_returns_pushed_geometries() {
        let mut t = LayoutDemandTracker::new();
        let serial = t.begin(2);
        t.push_dimensions(serial, Rect::new(0, 0, 400, 600));
        t.push_dimensions(serial, Rect::new(400, 0, 400, 600));
        assert_eq!(t.commit(serial), Ok(CommitOutcome::Committed));
        assert_eq!(
            t.committed_geometries(),
            Some(&[Rect::new(0, 0, 400, 600), Rect::new(400, 0, 400, 600)][..])
        );
    }

    #[test]
    fn serial_supersession_only_newest_commit_honored() {
        // Scenario 3: demand serial=7 (3 views), then serial=8 (2 views).
        // Only commit(8) is honored; commit(7) is ignored.
        let mut t = LayoutDemandTracker::new();
        let first = t.begin(3);
        let second = t.begin(2);
        assert_ne!(first, second);

        t.push_dimensions(second, Rect::new(0, 0, 1, 1));
        t.push_dimensions(second, Rect::new(1, 1, 1, 1));

        assert_eq!(t.commit(first), Ok(CommitOutcome::Superseded));
        assert_eq!(t.commit(second), Ok(CommitOutcome::Committed));
    }

    #[test]
    fn count_mismatch_is_a_protocol_error() {
        // Scenario 4: demand advertises 3 views, client pushes 2 then
        // commits.
        let mut t = LayoutDemandTracker::new();
        let serial = t.begin(3);
        t.push_dimensions(serial, Rect::new(0, 0, 1, 1));
        t.push_dimensions(serial, Rect::new(1, 1, 1, 1));
        assert_eq!(t.commit(serial), Err(ProtocolError::CountMismatch));
    }

    #[test]
    fn double_commit_is_a_protocol_error() {
        let mut t = LayoutDemandTracker::new();
        let serial = t.begin(1);
        t.push_dimensions(serial, Rect::new(0, 0, 1, 1));
        assert_eq!(t.commit(serial), Ok(CommitOutcome::Committed));
        assert_eq!(t.commit(serial), Err(ProtocolError::AlreadyCommitted));
    }

    #[test]
    fn pushes_against_superseded_serial_are_dropped_silently() {
        let mut t = LayoutDemandTracker::new();
        let first = t.begin(1);
        let second = t.begin(1);
        t.push_dimensions(first, Rect::new(9, 9, 9, 9));
        t.push_dimensions(second, Rect::new(0, 0, 1, 1));
        assert_eq!(t.commit(second), Ok(CommitOutcome::Committed));
        assert_eq!(t.committed_geometries(), Some(&[Rect::new(0, 0, 1, 1)][..]));
    }

    #[test]
    fn serials_increase_monotonically() {
        let mut t = LayoutDemandTracker::new();
        let a = t.begin(1);
        let b = t.begin(1);
        let c = t.begin(1);
        assert!(a < b && b < c);
    }
}
