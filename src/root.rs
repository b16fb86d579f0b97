//! The view/output arena and the atomic transaction engine that moves every
//! view from its `pending` snapshot into `current` together.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use slotmap::SlotMap;

use crate::ids::{LayoutClientId, OutputId, SeatId, ViewId};
use crate::layout::{CommitOutcome, LayoutRegistry, ViewDescriptor};
use crate::output::Output;
use crate::seat::Seat;
use crate::view::{ConfigureSerial, View};

/// How long a started transaction waits for every participating view to
/// acknowledge its configure before committing anyway. A single constant
/// rather than a per-transaction parameter: the hot path has no need for
/// a configurable timeout.
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum TransactionPhase {
    Idle,
    Awaiting {
        deadline: Instant,
        pending: Vec<(ViewId, ConfigureSerial)>,
    },
}

/// A layout demand that needs to be sent out over the wire by the caller
/// (`state.rs`): `arrange_output` never touches a Wayland object directly,
/// it hands back what to advertise and waits for `apply_layout_commit`.
pub struct LayoutDemandRequest {
    pub client: LayoutClientId,
    pub serial: u32,
    pub usable_width: u32,
    pub usable_height: u32,
    pub tags: u32,
    pub views: Vec<ViewDescriptor>,
}

pub struct Root {
    pub views: SlotMap<ViewId, View>,
    pub outputs: SlotMap<OutputId, Output>,
    pub seats: SlotMap<SeatId, Seat>,
    pub layout_registry: LayoutRegistry,

    /// For the most recent live demand per output: the view ids in the
    /// exact order they were advertised, so a later commit's geometry list
    /// can be zipped back onto the right views.
    demand_order: HashMap<OutputId, Vec<ViewId>>,

    phase: TransactionPhase,
    /// Set when `start_transaction` is called while another transaction is
    /// already in flight; re-arms a fresh transaction the instant the
    /// current one settles, instead of mutating views mid-flight.
    rearrange_pending: bool,
}

impl Default for Root {
    fn default() -> Self {
        Self {
            views: SlotMap::with_key(),
            outputs: SlotMap::with_key(),
            seats: SlotMap::with_key(),
            layout_registry: LayoutRegistry::new(),
            demand_order: HashMap::new(),
            phase: TransactionPhase::Idle,
            rearrange_pending: false,
        }
    }
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, TransactionPhase::Idle)
    }

    /// Recomputes one output's arrangement: layer-shell usable area, then
    /// floating/fullscreen views placed directly, then tiled views either
    /// via the fallback columns layout or by beginning an async demand on
    /// whichever layout client is bound to the output's active namespace.
    ///
    /// Returns `Some` when a real layout client needs to be asked; the
    /// caller advertises it over the wire and eventually calls
    /// `apply_layout_commit` once the client commits.
    pub fn arrange_output(&mut self, output_id: OutputId) -> Option<LayoutDemandRequest> {
        let output = self.outputs.get_mut(output_id)?;
        output.arrange_layers();
        let usable = output.usable_rect();
        let active_tags = output.active_tags;

        let start = output.views.first();
        let tagged: Vec<ViewId> = output
            .views
            .iter_tagged(start, active_tags, |vid| {
                self.views
                    .get(*vid)
                    .map(|v| v.effective_pending_tags())
                    .unwrap_or_default()
            })
            .map(|(_, vid)| *vid)
            .collect();

        let fullscreen = tagged
            .iter()
            .copied()
            .find(|vid| self.views.get(*vid).is_some_and(|v| v.pending.fullscreen));

        if let Some(fs) = fullscreen {
            let geometry = self.outputs[output_id].geometry;
            if let Some(view) = self.views.get_mut(fs) {
                view.pending.box_ = geometry;
            }
            self.start_transaction();
            return None;
        }

        let mut tiled = Vec::new();
        for vid in &tagged {
            if let Some(view) = self.views.get_mut(*vid) {
                if view.pending.float {
                    view.pending.box_ = view.float_box;
                } else {
                    tiled.push(*vid);
                }
            }
        }

        let namespace_client = self.outputs[output_id].active_layout_client(&self.layout_registry);

        match namespace_client {
            None => {
                let boxes = self.outputs[output_id].fallback_arrangement(tiled.len());
                for (vid, rect) in tiled.iter().zip(boxes) {
                    if let Some(view) = self.views.get_mut(*vid) {
                        view.pending.box_ = rect;
                    }
                }
                self.start_transaction();
                None
            }
            Some(client_id) => {
                let descriptors: Vec<ViewDescriptor> = tiled
                    .iter()
                    .map(|vid| ViewDescriptor {
                        tags: self.views[*vid].effective_pending_tags(),
                        app_id: self.views[*vid].shell.app_id(),
                    })
                    .collect();
                let count = descriptors.len();
                let serial = self
                    .layout_registry
                    .tracker_mut(client_id)
                    .map(|t| t.begin(count))
                    .unwrap_or(0);
                self.demand_order.insert(output_id, tiled);

                Some(LayoutDemandRequest {
                    client: client_id,
                    serial,
                    usable_width: usable.width.max(0) as u32,
                    usable_height: usable.height.max(0) as u32,
                    tags: active_tags.0,
                    views: descriptors,
                })
            }
        }
    }

    /// Call once a layout client's `commit` request resolves to
    /// `CommitOutcome::Committed`: copies the geometries it pushed onto the
    /// views advertised for that demand, in order, and starts a
    /// transaction. A `Superseded` outcome needs no action here; the wire
    /// layer already treated it as a no-op.
    pub fn apply_layout_commit(&mut self, output_id: OutputId, client_id: LayoutClientId) {
        let Some(order) = self.demand_order.get(&output_id).cloned() else {
            return;
        };
        let Some(tracker) = self.layout_registry.tracker_mut(client_id) else {
            return;
        };
        let Some(geometries) = tracker.committed_geometries() else {
            return;
        };
        if geometries.len() != order.len() {
            return;
        }

        for (vid, rect) in order.iter().zip(geometries.iter().copied()) {
            if let Some(view) = self.views.get_mut(*vid) {
                view.pending.box_ = rect;
            }
        }
        self.start_transaction();
    }

    pub fn check_commit_outcome(
        &mut self,
        output_id: OutputId,
        client_id: LayoutClientId,
        outcome: CommitOutcome,
    ) {
        if outcome == CommitOutcome::Committed {
            self.apply_layout_commit(output_id, client_id);
        }
    }

    /// Begins (or re-arms) a transaction: every view clamps its pending box
    /// into its constraints, those that disagree with what their client
    /// currently believes get configured, and the transaction waits for
    /// every resulting serial to be acknowledged (or the deadline) before
    /// committing all of them together.
    pub fn start_transaction(&mut self) {
        if !matches!(self.phase, TransactionPhase::Idle) {
            self.rearrange_pending = true;
            return;
        }

        let mut pending = Vec::new();
        for (id, view) in self.views.iter_mut() {
            view.apply_constraints();
            if view.needs_configure() {
                view.configure();
                if let Some(serial) = view.pending_serial {
                    pending.push((id, serial));
                }
            }
        }

        if pending.is_empty() {
            self.commit_transaction();
        } else {
            self.phase = TransactionPhase::Awaiting {
                deadline: Instant::now() + TRANSACTION_TIMEOUT,
                pending,
            };
        }
    }

    /// A client acknowledged `serial` for `view_id`. Settles the
    /// transaction immediately once every participant has acked.
    pub fn notify_configured(&mut self, view_id: ViewId, serial: ConfigureSerial) {
        let done = if let TransactionPhase::Awaiting { pending, .. } = &mut self.phase {
            pending.retain(|(id, s)| !(*id == view_id && *s == serial));
            pending.is_empty()
        } else {
            false
        };
        if done {
            self.commit_transaction();
        }
    }

    /// A view is closing mid-transaction: it will never acknowledge its
    /// outstanding configure, so it's dropped from the awaiting set as if it
    /// already had. Must be called before the view is removed from `views`.
    /// Settles the transaction immediately if it was the last participant.
    pub fn view_closed(&mut self, view_id: ViewId) {
        let done = if let TransactionPhase::Awaiting { pending, .. } = &mut self.phase {
            pending.retain(|(id, _)| *id != view_id);
            pending.is_empty()
        } else {
            false
        };
        if done {
            self.commit_transaction();
        }
    }

    /// Called periodically (driven by a `calloop::timer::Timer` in
    /// `state.rs`) with the current time. Settles a still-`Awaiting`
    /// transaction past its deadline, best-effort, even if some views never
    /// acked. Returns `true` if it committed.
    pub fn poll_deadline(&mut self, now: Instant) -> bool {
        let expired = matches!(&self.phase, TransactionPhase::Awaiting { deadline, .. } if now >= *deadline);
        if expired {
            self.commit_transaction();
        }
        expired
    }

    fn commit_transaction(&mut self) {
        for (_, view) in self.views.iter_mut() {
            view.apply_pending_state();
            view.current.box_ = view.pending.box_;
            view.pending_serial = None;
        }
        self.phase = TransactionPhase::Idle;

        if self.rearrange_pending {
            self.rearrange_pending = false;
            self.start_transaction();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, SizeConstraints};
    use crate::tags::Tags;
    use crate::view::ShellSurface;

    struct MockShell {
        next_serial: std::cell::Cell<u64>,
    }

    impl ShellSurface for MockShell {
        fn configure(&self, _box_: Rect) -> Option<ConfigureSerial> {
            let s = self.next_serial.get();
            self.next_serial.set(s + 1);
            Some(ConfigureSerial(s))
        }
        fn close(&self) {}
        fn constraints(&self) -> SizeConstraints {
            SizeConstraints::default()
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

    fn make_root_with_views(n: usize) -> (Root, OutputId, Vec<ViewId>) {
        let mut root = Root::new();
        let output_id = root.outputs.insert(Output::new(
            OutputId::default(),
            Rect::new(0, 0, 800, 600),
        ));
        let mut view_ids = Vec::new();
        for _ in 0..n {
            let node = root.outputs[output_id].views.push(ViewId::default());
            let view = View::new(
                output_id,
                node,
                Box::new(MockShell {
                    next_serial: std::cell::Cell::new(0),
                }),
                Tags::new(1),
            );
            let vid = root.views.insert(view);
            *root.outputs[output_id].views.get_mut(node).unwrap() = vid;
            view_ids.push(vid);
        }
        (root, output_id, view_ids)
    }

    #[test]
    fn transaction_with_no_geometry_change_commits_immediately() {
        let (mut root, _output, _views) = make_root_with_views(1);
        root.start_transaction();
        assert!(root.is_idle());
    }

    #[test]
    fn transaction_waits_for_every_ack_before_committing() {
        let (mut root, _output, views) = make_root_with_views(2);
        for vid in &views {
            root.views[*vid].pending.box_ = Rect::new(0, 0, 400, 600);
        }
        root.start_transaction();
        assert!(!root.is_idle());

        let serial0 = root.views[views[0]].pending_serial.unwrap();
        root.notify_configured(views[0], serial0);
        assert!(!root.is_idle(), "still waiting on the second view");

        let serial1 = root.views[views[1]].pending_serial.unwrap();
        root.notify_configured(views[1], serial1);
        assert!(root.is_idle());
        for vid in &views {
            assert_eq!(root.views[*vid].current.box_, Rect::new(0, 0, 400, 600));
        }
    }

    #[test]
    fn deadline_commits_even_without_every_ack() {
        let (mut root, _output, views) = make_root_with_views(2);
        for vid in &views {
            root.views[*vid].pending.box_ = Rect::new(0, 0, 400, 600);
        }
        root.start_transaction();
        let serial0 = root.views[views[0]].pending_serial.unwrap();
        root.notify_configured(views[0], serial0);
        assert!(!root.is_idle());

        let committed = root.poll_deadline(Instant::now() + TRANSACTION_TIMEOUT + Duration::from_millis(1));
        assert!(committed);
        assert!(root.is_idle());
        assert_eq!(root.views[views[1]].current.box_, Rect::new(0, 0, 400, 600));
    }

    #[test]
    fn rearrange_while_in_flight_is_queued_not_applied_immediately() {
        let (mut root, _output, views) = make_root_with_views(1);
        root.views[views[0]].pending.box_ = Rect::new(0, 0, 400, 600);
        root.start_transaction();
        assert!(!root.is_idle());

        root.views[views[0]].pending.box_ = Rect::new(0, 0, 500, 500);
        root.start_transaction();
        assert!(!root.is_idle(), "queued, not a second in-flight transaction");

        let serial = root.views[views[0]].pending_serial.unwrap();
        root.notify_configured(views[0], serial);
        // First transaction settled at 400x600, then the queued rearrange
        // immediately starts a second one for 500x500.
        assert!(!root.is_idle());
    }

    #[test]
    fn view_closed_mid_transaction_settles_if_it_was_the_last_participant() {
        let (mut root, _output, views) = make_root_with_views(2);
        for vid in &views {
            root.views[*vid].pending.box_ = Rect::new(0, 0, 400, 600);
        }
        root.start_transaction();
        assert!(!root.is_idle());

        let serial0 = root.views[views[0]].pending_serial.unwrap();
        root.notify_configured(views[0], serial0);
        assert!(!root.is_idle(), "still waiting on the second view");

        root.view_closed(views[1]);
        assert!(root.is_idle(), "closing the last outstanding view settles the transaction");
    }

    #[test]
    fn fallback_layout_arranges_tiled_views_without_a_layout_client() {
        let (mut root, output_id, views) = make_root_with_views(2);
        let demand = root.arrange_output(output_id);
        assert!(demand.is_none(), "no layout client bound, fallback applies directly");
        assert!(root.is_idle());
        let usable = root.outputs[output_id].usable_rect();
        assert_eq!(root.views[views[0]].current.box_.width, usable.width / 2);
    }

    #[test]
    fn bound_layout_client_demand_round_trips_through_commit() {
        let (mut root, output_id, views) = make_root_with_views(2);
        let client_id = root
            .layout_registry
            .register(output_id, "default".into())
            .unwrap();
        root.outputs[output_id].set_default_layout_namespace("default".into());

        let demand = root.arrange_output(output_id).expect("client is bound");
        assert_eq!(demand.views.len(), 2);

        let tracker = root.layout_registry.tracker_mut(client_id).unwrap();
        tracker.push_dimensions(demand.serial, Rect::new(0, 0, 300, 600));
        tracker.push_dimensions(demand.serial, Rect::new(300, 0, 500, 600));
        let outcome = tracker.commit(demand.serial).unwrap();

        root.check_commit_outcome(output_id, client_id, outcome);
        for vid in &views {
            let serial = root.views[*vid].pending_serial;
            if let Some(serial) = serial {
                root.notify_configured(*vid, serial);
            }
        }
        assert!(root.is_idle());
        assert_eq!(root.views[views[0]].current.box_, Rect::new(0, 0, 300, 600));
        assert_eq!(root.views[views[1]].current.box_, Rect::new(300, 0, 500, 600));
    }
}
