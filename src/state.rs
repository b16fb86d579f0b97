//! The top-level compositor state: owns [`Root`], the one [`InputManager`],
//! every smithay global, and the id<->resource maps that let the pure core
//! talk to live Wayland objects. Every smithay handler trait is implemented
//! here and nowhere else — this is the one place allowed to know both the
//! core model's types and smithay's types at once.

use std::collections::HashMap;

use smithay::backend::renderer::utils::on_commit_buffer_handler;
use smithay::delegate_compositor;
use smithay::delegate_output;
use smithay::delegate_seat;
use smithay::delegate_shm;
use smithay::delegate_xdg_shell;
use smithay::input::pointer::CursorImageStatus;
use smithay::input::{Seat as SmithaySeat, SeatHandler, SeatState};
use smithay::reexports::calloop::LoopHandle;
use smithay::reexports::wayland_protocols::xdg::shell::server::xdg_toplevel;
use smithay::reexports::wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_shell_v1::Layer as WlrLayer;
use smithay::reexports::wayland_server::backend::{ClientData, ClientId};
use smithay::reexports::wayland_server::protocol::wl_output::WlOutput;
use smithay::reexports::wayland_server::protocol::wl_seat::WlSeat;
use smithay::reexports::wayland_server::protocol::wl_surface::WlSurface;
use smithay::reexports::wayland_server::{Client, Display, DisplayHandle};
use smithay::utils::{Logical, Point, Serial};
use smithay::wayland::buffer::BufferHandler;
use smithay::wayland::compositor::{CompositorClientState, CompositorHandler, CompositorState};
use smithay::wayland::output::OutputManagerState;
use smithay::wayland::shell::wlr_layer::{
    LayerSurface as WlrLayerSurfaceObject, WlrLayerShellHandler, WlrLayerShellState,
};
use smithay::wayland::shell::xdg::{
    Configure, PopupSurface, PositionerState, ToplevelSurface, XdgShellHandler, XdgShellState,
};
use smithay::wayland::shm::{ShmHandler, ShmState};
use smithay::xwayland::X11Surface;

use crate::control::protocol::ControlHandler;
use crate::control::Command;
use crate::cursor::{CursorMode, PointerButton, ResizeEdges};
use crate::error::CompositorError;
use crate::geometry::Rect;
use crate::hittest::{hit_test, Hit};
use crate::ids::{LayoutClientId, OutputId, SeatId, ViewId};
use crate::input::InputManager;
use crate::layout::protocol::generated::mosaic_layout_manager_v1::MosaicLayoutManagerV1;
use crate::layout::protocol::generated::mosaic_layout_v1::MosaicLayoutV1;
use crate::layout::protocol::{emit_layout_demand, LayoutManagerHandler};
use crate::layout::LayoutRegistry;
use crate::output::{Layer, Output};
use crate::root::Root;
use crate::seat::{ClientToken, DeviceKind, ModeId, Seat as LogicalSeat};
use crate::shell::{WlrLayerShell, X11Shell, XdgToplevelShell};
use crate::view::View;

/// Per-client Wayland state smithay requires on every connected `Client`.
#[derive(Default)]
pub struct ClientState {
    pub compositor_state: CompositorClientState,
}

impl ClientData for ClientState {}

/// Translates a live smithay [`Client`] into the stable [`ClientToken`] the
/// pure `seat` module uses for the input-inhibitor lock, so that module
/// never has to know about `ClientId`.
fn client_token(client_id: &ClientId) -> ClientToken {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    client_id.hash(&mut hasher);
    ClientToken(hasher.finish())
}

/// Owns the event loop's data: the pure compositor core (`Root`,
/// `InputManager`) plus every smithay global and the live-resource maps
/// needed to bridge between the two. `main.rs` is the only other module
/// allowed to reach into this struct's smithay state directly.
pub struct MosaicState {
    pub display_handle: DisplayHandle,
    pub loop_handle: LoopHandle<'static, MosaicState>,
    pub running: bool,

    pub root: Root,
    pub input: InputManager,
    pub default_seat_id: SeatId,

    pub compositor_state: CompositorState,
    pub xdg_shell_state: XdgShellState,
    pub layer_shell_state: WlrLayerShellState,
    pub output_manager_state: OutputManagerState,
    pub seat_state: SeatState<Self>,
    pub shm_state: ShmState,

    pub seat: SmithaySeat<Self>,
    pub cursor_status: CursorImageStatus,
    pub pointer_location: Point<f64, Logical>,
    pointer_focus: Option<WlSurface>,

    surfaces_by_view: HashMap<WlSurface, ViewId>,
    view_surfaces: HashMap<ViewId, WlSurface>,
    outputs_by_wl: HashMap<WlOutput, OutputId>,
    layout_resources: HashMap<LayoutClientId, MosaicLayoutV1>,
}

/// Border reserved around the output's usable area that a floating view's
/// origin can never be dragged past.
const BORDER_WIDTH: i32 = 2;

/// What a pointer event resolves to once the cursor state machine and
/// hit-testing have run. `main.rs`'s event loop uses this to decide which
/// smithay `PointerHandle` calls to make; nothing here touches a live
/// pointer resource directly.
#[derive(Debug, Clone)]
pub enum PointerRoute {
    /// An active move/resize grab consumed the motion; the view's geometry
    /// is already updated, nothing needs to be sent to any client.
    Grabbed,
    /// Passthrough: deliver enter/motion to `surface` (or clear focus and
    /// reset the cursor image if `None`). `origin` is that surface's
    /// top-left in the same logical space as `location`, needed to give
    /// smithay's `PointerHandle` the surface-relative offset it expects;
    /// it is always `Some` when `surface` is.
    Passthrough {
        surface: Option<WlSurface>,
        origin: Option<Point<i32, Logical>>,
        location: Point<f64, Logical>,
    },
}

impl MosaicState {
    pub fn init(loop_handle: LoopHandle<'static, MosaicState>, display: &mut Display<Self>) -> Self {
        let display_handle = display.handle();

        let compositor_state = CompositorState::new::<Self>(&display_handle);
        let xdg_shell_state = XdgShellState::new::<Self>(&display_handle);
        let layer_shell_state = WlrLayerShellState::new::<Self>(&display_handle);
        let output_manager_state = OutputManagerState::new_with_xdg_output::<Self>(&display_handle);
        let mut seat_state = SeatState::new();
        let shm_state = ShmState::new::<Self>(&display_handle, Vec::new());

        let mut root = Root::new();
        let default_seat_id = root.seats.insert(LogicalSeat::new(SeatId::default()));
        let input = InputManager::new(default_seat_id);

        let seat = seat_state.new_wl_seat(&display_handle, "default");

        display_handle.create_global::<Self, MosaicLayoutManagerV1, _>(1, ());
        display_handle
            .create_global::<Self, crate::control::protocol::generated::mosaic_control_v1::MosaicControlV1, _>(
                1,
                (),
            );

        Self {
            display_handle,
            loop_handle,
            running: true,
            root,
            input,
            default_seat_id,
            compositor_state,
            xdg_shell_state,
            layer_shell_state,
            output_manager_state,
            seat_state,
            shm_state,
            seat,
            cursor_status: CursorImageStatus::default_named(),
            pointer_location: Point::from((0.0, 0.0)),
            pointer_focus: None,
            surfaces_by_view: HashMap::new(),
            view_surfaces: HashMap::new(),
            outputs_by_wl: HashMap::new(),
            layout_resources: HashMap::new(),
        }
    }

    fn output_id_of_view(&self, view: ViewId) -> Option<OutputId> {
        self.root.views.get(view).map(|v| v.output)
    }

    /// Kicks off (or re-arms) arrangement for `output_id`. If a real layout
    /// client is bound, sends the demand over the wire; otherwise the
    /// fallback layout already applied inside `arrange_output` and a
    /// transaction is already underway.
    pub fn arrange_output(&mut self, output_id: OutputId) {
        if let Some(request) = self.root.arrange_output(output_id) {
            if let Some(resource) = self.layout_resources.get(&request.client) {
                emit_layout_demand(resource, &request);
            }
        }
    }

    /// Polled from a `calloop::timer::Timer` registered in `main.rs`
    /// against `root::TRANSACTION_TIMEOUT`; settles an overdue transaction.
    pub fn poll_transaction_deadline(&mut self) {
        self.root.poll_deadline(std::time::Instant::now());
    }

    /// Resolves the pointer hit at `(x, y)` on `output_id` to a view, taking
    /// focus and routing the event, or lets it fall through to layer-shell
    /// surfaces. Returns the view now under the pointer, if any.
    pub fn hit_test_output(&self, output_id: OutputId, x: i32, y: i32) -> Option<Hit> {
        let output = self.root.outputs.get(output_id)?;
        let focused = self.root.seats[self.default_seat_id].focused_view();
        hit_test(output, &self.root.views, focused, x, y)
    }

    /// The live surface backing `view_id`, for the render path. `None` once
    /// the view's client has gone away but the view hasn't been reaped yet.
    pub fn view_surface(&self, view_id: ViewId) -> Option<&WlSurface> {
        self.view_surfaces.get(&view_id)
    }

    /// Focuses `view` on the default seat: clears the previous view's
    /// activated flag, sets the new one, and bumps its pending focus
    /// ordering counter (the "most-recently-focused" tiebreak).
    pub fn focus_view(&mut self, view: ViewId) {
        let previous = self.root.seats[self.default_seat_id].focused_view();
        if previous == Some(view) {
            return;
        }
        if let Some(prev_view) = previous.and_then(|id| self.root.views.get(id)) {
            prev_view.set_activated(false);
        }
        if let Some(v) = self.root.views.get_mut(view) {
            v.pending.focus_count += 1;
            v.set_activated(true);
        }
        self.root.seats[self.default_seat_id].focus_view(view);
    }

    /// Routes one absolute pointer motion: if a move/resize grab is active
    /// it updates the dragged view's geometry directly, otherwise it
    /// re-runs hit-testing and reports what passthrough delivery should
    /// target. The caller (`main.rs`) drives the actual
    /// `PointerHandle::motion`/`enter` calls from the returned route.
    pub fn handle_pointer_motion(&mut self, location: Point<f64, Logical>) -> PointerRoute {
        self.pointer_location = location;
        let Some(output_id) = self.root.outputs.keys().next() else {
            self.pointer_focus = None;
            return PointerRoute::Passthrough { surface: None, origin: None, location };
        };

        let seat_id = self.default_seat_id;
        let (x, y) = (location.x as i32, location.y as i32);
        let mode = self.root.seats[seat_id].cursor.mode();

        if let Some(dragged) = self.root.seats[seat_id].cursor.motion(x, y) {
            self.apply_grab_motion(output_id, mode, dragged);
            return PointerRoute::Grabbed;
        }

        match self.hit_test_output(output_id, x, y) {
            Some(Hit::View(view_id)) => {
                let surface = self.view_surfaces.get(&view_id).cloned();
                self.pointer_focus = surface.clone();
                let origin = self
                    .root
                    .views
                    .get(view_id)
                    .map(|v| Point::from((v.current.box_.x, v.current.box_.y)));
                PointerRoute::Passthrough { surface, origin, location }
            }
            _ => {
                self.pointer_focus = None;
                PointerRoute::Passthrough { surface: None, origin: None, location }
            }
        }
    }

    /// Applies one frame of an in-progress move/resize grab. `dragged` is
    /// the `(view, unclamped box)` pair `Cursor::motion` just produced.
    fn apply_grab_motion(&mut self, output_id: OutputId, mode: CursorMode, dragged: (ViewId, Rect)) {
        let (view_id, unclamped) = dragged;
        let Some(usable) = self.root.outputs.get(output_id).map(|o| o.usable_rect()) else {
            return;
        };
        let Some(view) = self.root.views.get_mut(view_id) else {
            return;
        };

        match mode {
            CursorMode::Move { .. } => {
                // A move only ever changes origin; current is updated
                // without a configure.
                let width = view.current.box_.width;
                let height = view.current.box_.height;
                let x = usable.clamp_x(unclamped.x, width, BORDER_WIDTH);
                let y = usable.clamp_y(unclamped.y, height, BORDER_WIDTH);
                view.current.box_.x = x;
                view.current.box_.y = y;
                view.pending.box_.x = x;
                view.pending.box_.y = y;
                view.float_box.x = x;
                view.float_box.y = y;
            }
            CursorMode::Resize { .. } => {
                view.pending.box_.width = unclamped.width.max(1);
                view.pending.box_.height = unclamped.height.max(1);
                view.apply_constraints();
                view.float_box.width = view.pending.box_.width;
                view.float_box.height = view.pending.box_.height;
                if view.needs_configure() {
                    drop(view);
                    self.root.start_transaction();
                }
            }
            CursorMode::Passthrough => {}
        }
    }

    /// Handles one pointer button edge. On a press of `button` while
    /// passthrough and the compositor modifier is held, this starts a
    /// move/resize grab on whatever view is under the cursor (closing it
    /// instead, for the middle button) rather than forwarding the click;
    /// every other press is just focus-on-click plus normal forwarding.
    /// Returns the route the caller should forward the button event on,
    /// mirroring [`Self::handle_pointer_motion`].
    pub fn handle_pointer_button(
        &mut self,
        button: PointerButton,
        pressed: bool,
        modifier_held: bool,
    ) -> PointerRoute {
        let seat_id = self.default_seat_id;

        if pressed {
            self.root.seats[seat_id].cursor.note_button_down();

            let fresh_press = self.root.seats[seat_id].cursor.pressed_count() == 1;
            if fresh_press && modifier_held && self.root.seats[seat_id].cursor.is_passthrough() {
                if let Some(output_id) = self.root.outputs.keys().next() {
                    let (x, y) = (self.pointer_location.x as i32, self.pointer_location.y as i32);
                    if let Some(Hit::View(view_id)) = self.hit_test_output(output_id, x, y) {
                        let fullscreen = self
                            .root
                            .views
                            .get(view_id)
                            .map(|v| v.current.fullscreen)
                            .unwrap_or(false);
                        if !fullscreen {
                            match button {
                                PointerButton::Left => self.begin_move(view_id),
                                PointerButton::Right => self.begin_resize(view_id, x, y),
                                PointerButton::Middle => {
                                    if let Some(view) = self.root.views.get(view_id) {
                                        view.close();
                                    }
                                }
                                PointerButton::Other => {}
                            }
                            return PointerRoute::Grabbed;
                        }
                    }
                }
            } else if fresh_press && self.root.seats[seat_id].cursor.is_passthrough() {
                // Plain click (no modifier): focus whatever is under the
                // cursor before forwarding, same as clicking raises focus
                // in any floating/tiling wm.
                if let Some(output_id) = self.root.outputs.keys().next() {
                    let (x, y) = (self.pointer_location.x as i32, self.pointer_location.y as i32);
                    if let Some(Hit::View(view_id)) = self.hit_test_output(output_id, x, y) {
                        self.focus_view(view_id);
                    }
                }
            }
        } else if self.root.seats[seat_id].cursor.note_button_up() {
            // A grab just ended: re-run hit-testing at the current location
            // so passthrough resumes against whatever is actually there.
            let location = self.pointer_location;
            return self.handle_pointer_motion(location);
        }

        let surface = self.pointer_focus.clone();
        let origin = surface.as_ref().and_then(|s| {
            let view_id = *self.surfaces_by_view.get(s)?;
            let box_ = self.root.views.get(view_id)?.current.box_;
            Some(Point::from((box_.x, box_.y)))
        });
        PointerRoute::Passthrough { surface, origin, location: self.pointer_location }
    }

    fn begin_move(&mut self, view_id: ViewId) {
        let Some(view) = self.root.views.get(view_id) else { return };
        let box_ = view.current.box_;
        let seat_id = self.default_seat_id;
        if self.root.seats[seat_id].cursor.begin_move(view_id, box_).is_ok() {
            self.mark_floating_and_arrange(view_id);
        }
    }

    fn begin_resize(&mut self, view_id: ViewId, px: i32, py: i32) {
        let Some(view) = self.root.views.get(view_id) else { return };
        let box_ = view.current.box_;
        let edges = edges_for_point(box_, px, py);
        let seat_id = self.default_seat_id;
        if self.root.seats[seat_id].cursor.begin_resize(view_id, box_, edges).is_ok() {
            self.mark_floating_and_arrange(view_id);
        }
    }

    /// Entering a move or resize grab marks the view floating (if it wasn't
    /// already) and triggers an arrangement.
    fn mark_floating_and_arrange(&mut self, view_id: ViewId) {
        let Some(view) = self.root.views.get_mut(view_id) else { return };
        let output = view.output;
        if !view.pending.float {
            view.pending.float = true;
            view.float_box = view.current.box_;
        }
        self.arrange_output(output);
    }
}

/// Picks which edges a resize grab anchors to from where on the view the
/// grab started: the half of the box the point falls in on each axis grows,
/// the opposite edge stays fixed.
fn edges_for_point(box_: Rect, px: i32, py: i32) -> ResizeEdges {
    let mid_x = box_.x + box_.width / 2;
    let mid_y = box_.y + box_.height / 2;
    ResizeEdges {
        left: px < mid_x,
        right: px >= mid_x,
        top: py < mid_y,
        bottom: py >= mid_y,
    }
}

impl CompositorHandler for MosaicState {
    fn compositor_state(&mut self) -> &mut CompositorState {
        &mut self.compositor_state
    }

    fn client_compositor_state<'a>(&self, client: &'a Client) -> &'a CompositorClientState {
        &client.get_data::<ClientState>().unwrap().compositor_state
    }

    fn commit(&mut self, surface: &WlSurface) {
        on_commit_buffer_handler::<Self>(surface);
    }
}
delegate_compositor!(MosaicState);

delegate_output!(MosaicState);

impl BufferHandler for MosaicState {
    fn buffer_destroyed(&mut self, _buffer: &smithay::reexports::wayland_server::protocol::wl_buffer::WlBuffer) {}
}

impl ShmHandler for MosaicState {
    fn shm_state(&self) -> &ShmState {
        &self.shm_state
    }
}
delegate_shm!(MosaicState);

impl SeatHandler for MosaicState {
    type KeyboardFocus = WlSurface;
    type PointerFocus = WlSurface;
    type TouchFocus = WlSurface;

    fn seat_state(&mut self) -> &mut SeatState<Self> {
        &mut self.seat_state
    }

    fn cursor_image(&mut self, _seat: &SmithaySeat<Self>, image: CursorImageStatus) {
        self.cursor_status = image;
    }

    fn focus_changed(&mut self, _seat: &SmithaySeat<Self>, _target: Option<&WlSurface>) {}
}
delegate_seat!(MosaicState);

impl XdgShellHandler for MosaicState {
    fn xdg_shell_state(&mut self) -> &mut XdgShellState {
        &mut self.xdg_shell_state
    }

    /// A new toplevel arrives with no geometry and no tags; it is attached
    /// above the currently-focused view on the first output, tagged with
    /// whatever tags that output is currently displaying. New views attach
    /// above the focused view, or at the top of the stack if none is
    /// focused.
    fn new_toplevel(&mut self, surface: ToplevelSurface) {
        let Some((output_id, _)) = self.root.outputs.iter().next().map(|(id, o)| (id, o.geometry)) else {
            return;
        };
        let tags = self.root.outputs[output_id].tags_for_new_view();

        let wl_surface = surface.wl_surface().clone();
        let shell = Box::new(XdgToplevelShell { toplevel: surface });

        // New views attach at the top of the stack; with
        // `Top` every newly mapped view lands directly above whatever the
        // seat currently has focused, since focus is always the first
        // tagged entry a forward iteration from the head reaches.
        let node = self
            .root
            .outputs
            .get_mut(output_id)
            .unwrap()
            .views
            .push(ViewId::default());

        let view = View::new(output_id, node, shell, tags);
        let view_id = self.root.views.insert(view);
        *self.root.outputs[output_id].views.get_mut(node).unwrap() = view_id;

        self.surfaces_by_view.insert(wl_surface.clone(), view_id);
        self.view_surfaces.insert(view_id, wl_surface);
        self.focus_view(view_id);
        self.arrange_output(output_id);
    }

    fn new_popup(&mut self, _surface: PopupSurface, _positioner: PositionerState) {}

    fn move_request(&mut self, surface: ToplevelSurface, _seat: WlSeat, _serial: Serial) {
        let Some(&view_id) = self.surfaces_by_view.get(surface.wl_surface()) else {
            return;
        };
        let Some(view) = self.root.views.get(view_id) else {
            return;
        };
        let _ = self.root.seats[self.default_seat_id]
            .cursor
            .begin_move(view_id, view.current.box_);
    }

    fn resize_request(
        &mut self,
        surface: ToplevelSurface,
        _seat: WlSeat,
        _serial: Serial,
        edges: xdg_toplevel::ResizeEdge,
    ) {
        let Some(&view_id) = self.surfaces_by_view.get(surface.wl_surface()) else {
            return;
        };
        let Some(view) = self.root.views.get(view_id) else {
            return;
        };
        let edges = ResizeEdges {
            top: matches!(edges, xdg_toplevel::ResizeEdge::Top | xdg_toplevel::ResizeEdge::TopLeft | xdg_toplevel::ResizeEdge::TopRight),
            bottom: matches!(edges, xdg_toplevel::ResizeEdge::Bottom | xdg_toplevel::ResizeEdge::BottomLeft | xdg_toplevel::ResizeEdge::BottomRight),
            left: matches!(edges, xdg_toplevel::ResizeEdge::Left | xdg_toplevel::ResizeEdge::TopLeft | xdg_toplevel::ResizeEdge::BottomLeft),
            right: matches!(edges, xdg_toplevel::ResizeEdge::Right | xdg_toplevel::ResizeEdge::TopRight | xdg_toplevel::ResizeEdge::BottomRight),
        };
        let _ = self.root.seats[self.default_seat_id]
            .cursor
            .begin_resize(view_id, view.current.box_, edges);
    }

    fn grab(&mut self, _surface: PopupSurface, _seat: WlSeat, _serial: Serial) {}

    /// The wire-level counterpart of `Root::notify_configured`: a client
    /// acknowledging a toplevel configure is exactly the event the
    /// transaction engine is waiting on. Popup configures carry no
    /// transaction state and are ignored here.
    fn ack_configure(&mut self, surface: WlSurface, configure: Configure) {
        let Configure::Toplevel(configure) = configure else {
            return;
        };
        let Some(&view_id) = self.surfaces_by_view.get(&surface) else {
            return;
        };
        self.root.notify_configured(view_id, configure.serial.into());
    }

    fn toplevel_destroyed(&mut self, surface: ToplevelSurface) {
        let Some(view_id) = self.surfaces_by_view.remove(surface.wl_surface()) else {
            return;
        };
        self.root.view_closed(view_id);
        let Some(view) = self.root.views.remove(view_id) else {
            return;
        };
        self.view_surfaces.remove(&view_id);
        if let Some(output) = self.root.outputs.get_mut(view.output) {
            output.views.remove(view.node);
        }
        self.root.seats[self.default_seat_id].clear_focus_if(view_id);
        self.arrange_output(view.output);
    }
}
delegate_xdg_shell!(MosaicState);

impl WlrLayerShellHandler for MosaicState {
    fn shell_state(&mut self) -> &mut WlrLayerShellState {
        &mut self.layer_shell_state
    }

    /// Attaches the surface to its requested layer on the output it asked
    /// for (or the first output, if none). Namespace/exclusive-zone
    /// negotiation happens lazily the next time that output arranges, same
    /// as every other layer change.
    fn new_layer_surface(
        &mut self,
        surface: WlrLayerSurfaceObject,
        wl_output: Option<WlOutput>,
        layer: WlrLayer,
        _namespace: String,
    ) {
        let output_id = wl_output
            .as_ref()
            .and_then(|o| self.outputs_by_wl.get(o).copied())
            .or_else(|| self.root.outputs.keys().next());
        let Some(output_id) = output_id else {
            return;
        };
        let layer = match layer {
            WlrLayer::Background => Layer::Background,
            WlrLayer::Bottom => Layer::Bottom,
            WlrLayer::Top => Layer::Top,
            WlrLayer::Overlay => Layer::Overlay,
            _ => Layer::Top,
        };
        let shell = Box::new(WlrLayerShell { surface });
        self.root.outputs[output_id].add_layer_surface(layer, shell);
        self.arrange_output(output_id);
    }

    fn layer_destroyed(&mut self, _surface: WlrLayerSurfaceObject) {
        for (_, output) in self.root.outputs.iter_mut() {
            output.prune_dead_layers();
        }
    }
}
smithay::delegate_layer_shell!(MosaicState);

impl LayoutManagerHandler for MosaicState {
    fn layout_registry(&mut self) -> &mut LayoutRegistry {
        &mut self.root.layout_registry
    }

    fn output_id_for(&mut self, output: &WlOutput) -> Option<OutputId> {
        self.outputs_by_wl.get(output).copied()
    }

    fn layout_client_bound(&mut self, id: LayoutClientId, resource: MosaicLayoutV1) {
        self.layout_resources.insert(id, resource);
        if let Some(output) = self.root.layout_registry.output_of(id) {
            self.arrange_output(output);
        }
    }

    fn layout_client_unbound(&mut self, id: LayoutClientId) {
        self.layout_resources.remove(&id);
    }

    fn layout_demand_committed(&mut self, output: OutputId, client: LayoutClientId) {
        self.root.apply_layout_commit(output, client);
    }
}

impl ControlHandler for MosaicState {
    fn run_command(&mut self, command: Command) -> Result<String, String> {
        self.execute(command).map_err(|e| e.as_control_message())
    }
}

impl MosaicState {
    fn execute(&mut self, command: Command) -> Result<String, CompositorError> {
        use crate::control::{Command as C, Direction};

        let seat_id = self.default_seat_id;
        match command {
            C::SetFocusedTags(tags) => {
                let outputs: Vec<OutputId> = self.root.outputs.keys().collect();
                for oid in outputs {
                    self.root.outputs[oid].set_active_tags(tags);
                    self.arrange_output(oid);
                }
                Ok(String::new())
            }
            C::ToggleFocusedTags(mask) => {
                let outputs: Vec<OutputId> = self.root.outputs.keys().collect();
                for oid in outputs {
                    self.root.outputs[oid].toggle_active_tags(mask);
                    self.arrange_output(oid);
                }
                Ok(String::new())
            }
            C::SetViewTags(tags) => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    let output = self.output_id_of_view(view);
                    self.root.views[view].set_pending_tags(tags);
                    if let Some(output) = output {
                        self.arrange_output(output);
                    }
                }
                Ok(String::new())
            }
            C::ToggleViewTags(mask) => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    let output = self.output_id_of_view(view);
                    self.root.views[view].toggle_pending_tags(mask);
                    if let Some(output) = output {
                        self.arrange_output(output);
                    }
                }
                Ok(String::new())
            }
            C::SpawnTagmask(tags) => {
                if let Some(output) = self.focused_output() {
                    self.root.outputs[output].set_spawn_tagmask(tags);
                }
                Ok(String::new())
            }
            C::Close => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    self.root.views[view].close();
                }
                Ok(String::new())
            }
            C::FocusView(direction) => {
                self.cycle_focus(direction);
                Ok(String::new())
            }
            C::Swap(direction) => {
                self.swap_focused(direction);
                Ok(String::new())
            }
            C::Zoom => {
                self.zoom_focused();
                Ok(String::new())
            }
            C::ToggleFloat => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    let output = self.output_id_of_view(view);
                    let v = &mut self.root.views[view];
                    v.pending.float = !v.pending.float;
                    if let Some(output) = output {
                        self.arrange_output(output);
                    }
                }
                Ok(String::new())
            }
            C::ToggleFullscreen => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    let output = self.output_id_of_view(view);
                    let fullscreen = !self.root.views[view].pending.fullscreen;
                    self.root.views[view].set_fullscreen(fullscreen);
                    if let Some(output) = output {
                        self.arrange_output(output);
                    }
                }
                Ok(String::new())
            }
            C::DefaultLayout(namespace) => {
                let outputs: Vec<OutputId> = self.root.outputs.keys().collect();
                for oid in outputs {
                    self.root.outputs[oid].set_default_layout_namespace(namespace.clone());
                    self.arrange_output(oid);
                }
                Ok(String::new())
            }
            C::OutputLayout(namespace) => {
                if let Some(view) = self.root.seats[seat_id].focused_view() {
                    if let Some(output) = self.output_id_of_view(view) {
                        self.root.outputs[output].set_default_layout_namespace(namespace);
                        self.arrange_output(output);
                    }
                }
                Ok(String::new())
            }
            C::SetLayoutValue { name, value } => {
                self.set_focused_output_layout_int(&name, value)
            }
            C::ModLayoutValue { name, delta } => {
                self.mod_focused_output_layout_int(&name, delta)
            }
        }
    }

    fn focused_output(&self) -> Option<OutputId> {
        self.root
            .seats
            .get(self.default_seat_id)
            .and_then(|s| s.focused_view())
            .and_then(|v| self.output_id_of_view(v))
            .or_else(|| self.root.outputs.keys().next())
    }

    fn set_focused_output_layout_int(&mut self, name: &str, value: i32) -> Result<String, CompositorError> {
        let Some(output) = self.focused_output() else {
            return Err(CompositorError::configuration("no output to target"));
        };
        let Some(client) = self.root.outputs[output].active_layout_client(&self.root.layout_registry) else {
            return Err(CompositorError::configuration("no layout client bound"));
        };
        if let Some(t) = self.root.layout_registry.tunables_mut(client) {
            t.set_int(name, value);
        }
        if let Some(resource) = self.layout_resources.get(&client) {
            crate::layout::protocol::emit_set_int_value(resource, name, value);
        }
        self.arrange_output(output);
        Ok(String::new())
    }

    fn mod_focused_output_layout_int(&mut self, name: &str, delta: i32) -> Result<String, CompositorError> {
        let Some(output) = self.focused_output() else {
            return Err(CompositorError::configuration("no output to target"));
        };
        let Some(client) = self.root.outputs[output].active_layout_client(&self.root.layout_registry) else {
            return Err(CompositorError::configuration("no layout client bound"));
        };
        if let Some(t) = self.root.layout_registry.tunables_mut(client) {
            t.mod_int(name, delta);
        }
        if let Some(resource) = self.layout_resources.get(&client) {
            crate::layout::protocol::emit_mod_int_value(resource, name, delta);
        }
        self.arrange_output(output);
        Ok(String::new())
    }

    /// Focuses the next/previous view in stack order on the focused view's
    /// output, wrapping around.
    fn cycle_focus(&mut self, direction: Direction) {
        let Some(seat) = self.root.seats.get(self.default_seat_id) else { return };
        let Some(focused) = seat.focused_view() else { return };
        let Some(output_id) = self.output_id_of_view(focused) else { return };
        let Some(view) = self.root.views.get(focused) else { return };
        let node = view.node;
        let views = &self.root.views;
        let output = &self.root.outputs[output_id];

        let next_node = match direction {
            Direction::Next => output.views.next_tagged(node, output.active_tags, |vid| {
                views.get(*vid).map(|v| v.current_tags()).unwrap_or_default()
            }),
            Direction::Previous => output.views.prev_tagged(node, output.active_tags, |vid| {
                views.get(*vid).map(|v| v.current_tags()).unwrap_or_default()
            }),
        };
        if let Some(next_node) = next_node {
            if let Some(&next_view) = output.views.get(next_node) {
                self.focus_view(next_view);
            }
        }
    }

    fn swap_focused(&mut self, direction: Direction) {
        let Some(seat) = self.root.seats.get(self.default_seat_id) else { return };
        let Some(focused) = seat.focused_view() else { return };
        let Some(output_id) = self.output_id_of_view(focused) else { return };
        let Some(view) = self.root.views.get(focused) else { return };
        let node = view.node;
        let views = &self.root.views;
        let output = &self.root.outputs[output_id];
        let other = match direction {
            Direction::Next => output.views.next_tagged(node, output.active_tags, |vid| {
                views.get(*vid).map(|v| v.current_tags()).unwrap_or_default()
            }),
            Direction::Previous => output.views.prev_tagged(node, output.active_tags, |vid| {
                views.get(*vid).map(|v| v.current_tags()).unwrap_or_default()
            }),
        };
        if let Some(other) = other {
            self.root.outputs[output_id].views.swap(node, other);
            self.arrange_output(output_id);
        }
    }

    /// Moves the focused view to the top of the stack ("zoom").
    fn zoom_focused(&mut self) {
        let Some(seat) = self.root.seats.get(self.default_seat_id) else { return };
        let Some(focused) = seat.focused_view() else { return };
        let Some(output_id) = self.output_id_of_view(focused) else { return };
        let Some(view) = self.root.views.get(focused) else { return };
        let node = view.node;
        let top = self.root.outputs[output_id].views.first();
        if let Some(top) = top {
            if top != node {
                self.root.outputs[output_id].views.swap(node, top);
                self.arrange_output(output_id);
            }
        }
    }
}

/// X11 (XWayland) toplevels funnel through the same view machinery as
/// xdg-shell ones; this is the analogue of `new_toplevel` for `X11Surface`,
/// called from whatever XWayland integration the winit dev backend wires
/// up.
impl MosaicState {
    pub fn new_x11_surface(&mut self, surface: X11Surface) {
        let Some((output_id, _)) = self.root.outputs.iter().next().map(|(id, o)| (id, o.geometry)) else {
            return;
        };
        let tags = self.root.outputs[output_id].tags_for_new_view();
        let wl_surface = surface.wl_surface();
        let shell = Box::new(X11Shell { surface });
        let node = self.root.outputs.get_mut(output_id).unwrap().views.push(ViewId::default());
        let view = View::new(output_id, node, shell, tags);
        let view_id = self.root.views.insert(view);
        *self.root.outputs[output_id].views.get_mut(node).unwrap() = view_id;
        if let Some(wl_surface) = wl_surface {
            self.surfaces_by_view.insert(wl_surface.clone(), view_id);
            self.view_surfaces.insert(view_id, wl_surface);
        }
        self.focus_view(view_id);
        self.arrange_output(output_id);
    }

    pub fn add_output(&mut self, wl_output: WlOutput, geometry: Rect) -> OutputId {
        let id = self.root.outputs.insert(Output::new(OutputId::default(), geometry));
        self.outputs_by_wl.insert(wl_output, id);
        id
    }

    pub fn attach_device(&mut self, kind: DeviceKind) {
        let seat_id = self.default_seat_id;
        self.input.attach_device(&mut self.root.seats[seat_id], kind);
    }

    pub fn is_input_blocked(&self, client: Option<ClientToken>) -> bool {
        self.input.is_blocked(&self.root.seats[self.default_seat_id], client)
    }

    /// `client_id` from a live smithay `Client`, for the input-inhibitor
    /// gate and `inhibit`/`release_inhibit` requests.
    pub fn token_for(&self, client: &Client) -> ClientToken {
        client_token(&client.id())
    }

    pub fn set_cursor_mode(&mut self, mode: ModeId) {
        let seat_id = self.default_seat_id;
        self.root.seats[seat_id].enter_mode(mode);
    }
}
