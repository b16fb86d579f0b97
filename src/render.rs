//! Output compositing: turns one frame of [`crate::root::Root`] state into
//! damage-tracked render elements. `main.rs`'s winit event loop calls
//! [`render_output`] once per redraw and [`send_frame_callbacks`] once the
//! frame has actually been shown. Built around `Root`/`Output`/`View`
//! rather than smithay's `desktop::Space`, since arrangement here is
//! driven by the transaction engine instead of free placement.

use std::time::Duration;

use smithay::backend::renderer::damage::OutputDamageTracker;
use smithay::backend::renderer::element::surface::{
    render_elements_from_surface_tree, WaylandSurfaceRenderElement,
};
use smithay::backend::renderer::element::AsRenderElements;
use smithay::backend::renderer::gles::{GlesRenderer, GlesTexture};
use smithay::desktop::utils::send_frames_surface_tree;
use smithay::output::Output as SmithayOutput;
use smithay::render_elements;
use smithay::utils::{Physical, Point, Scale};

use crate::ids::OutputId;
use crate::pointer::{PointerElement, PointerRenderElement};
use crate::state::MosaicState;

render_elements! {
    pub OutputRenderElements<R> where R: smithay::backend::renderer::ImportAll + smithay::backend::renderer::ImportMem;
    Surface = WaylandSurfaceRenderElement<R>,
    Pointer = PointerRenderElement<R>,
}

/// Views currently visible on `output_id`, in paint order (back to front):
/// stack order first, with the focused view (if any) moved to the end so it
/// paints over anything it happens to overlap.
fn visible_views_back_to_front(state: &MosaicState, output_id: OutputId) -> Vec<crate::ids::ViewId> {
    let Some(output) = state.root.outputs.get(output_id) else {
        return Vec::new();
    };
    let views = &state.root.views;
    let mut ids: Vec<_> = output
        .views
        .iter_tagged(output.views.first(), output.active_tags, |vid| {
            views.get(*vid).map(|v| v.current_tags()).unwrap_or_default()
        })
        .map(|(_, vid)| *vid)
        .collect();

    let focused = state
        .root
        .seats
        .get(state.default_seat_id)
        .and_then(|s| s.focused_view());
    if let Some(pos) = focused.and_then(|f| ids.iter().position(|v| *v == f)) {
        let v = ids.remove(pos);
        ids.push(v);
    }
    ids
}

/// Renders `output_id`'s current frame into whatever `renderer` is bound
/// to: layer-shell surfaces bottom to top, then mapped views, then the
/// pointer on top of everything.
pub fn render_output(
    state: &MosaicState,
    smithay_output: &SmithayOutput,
    output_id: OutputId,
    renderer: &mut GlesRenderer,
    age: usize,
    damage_tracker: &mut OutputDamageTracker,
    pointer_element: &mut PointerElement<GlesTexture>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scale = Scale::from(smithay_output.current_scale().fractional_scale());
    // Built front-to-back: damage tracking expects the topmost element first.
    let mut elements: Vec<OutputRenderElements<GlesRenderer>> = Vec::new();

    pointer_element.set_status(state.cursor_status.clone());
    let cursor_pos: Point<i32, Physical> = state.pointer_location.to_physical(scale).to_i32_round();
    elements.extend(
        pointer_element
            .render_elements::<PointerRenderElement<GlesRenderer>>(renderer, cursor_pos, scale, 1.0)
            .into_iter()
            .map(OutputRenderElements::from),
    );

    let mut view_ids = visible_views_back_to_front(state, output_id);
    view_ids.reverse();
    for view_id in view_ids {
        let Some(view) = state.root.views.get(view_id) else {
            continue;
        };
        let Some(surface) = state.view_surface(view_id) else {
            continue;
        };
        let location: Point<i32, Physical> = Point::from((view.current.box_.x, view.current.box_.y))
            .to_f64()
            .to_physical(scale)
            .to_i32_round();
        let surface_elements: Vec<WaylandSurfaceRenderElement<GlesRenderer>> =
            render_elements_from_surface_tree(renderer, surface, location, scale, 1.0);
        elements.extend(surface_elements.into_iter().map(OutputRenderElements::from));
    }

    let Some(output) = state.root.outputs.get(output_id) else {
        return Ok(());
    };
    for (box_, layer) in output.layers_front_to_back() {
        let Some(surface) = layer.wl_surface() else {
            continue;
        };
        let location: Point<i32, Physical> = Point::from((box_.x, box_.y)).to_f64().to_physical(scale).to_i32_round();
        let surface_elements: Vec<WaylandSurfaceRenderElement<GlesRenderer>> =
            render_elements_from_surface_tree(renderer, surface, location, scale, 1.0);
        elements.extend(surface_elements.into_iter().map(OutputRenderElements::from));
    }

    damage_tracker.render_output(renderer, age, &elements, [0.1, 0.1, 0.1, 1.0])?;
    Ok(())
}

/// Sends `wl_surface.frame` callbacks to every live view and layer-shell
/// surface on `output_id`, throttling clients to the compositor's own
/// redraw rate. `time` is elapsed time since the compositor started.
pub fn send_frame_callbacks(state: &MosaicState, smithay_output: &SmithayOutput, output_id: OutputId, time: Duration) {
    let Some(output) = state.root.outputs.get(output_id) else {
        return;
    };

    for view_id in visible_views_back_to_front(state, output_id) {
        if let Some(surface) = state.view_surface(view_id) {
            send_frames_surface_tree(surface, smithay_output, time, None, |_, _| None);
        }
    }
    for (_, layer) in output.layers_front_to_back() {
        if let Some(surface) = layer.wl_surface() {
            send_frames_surface_tree(surface, smithay_output, time, None, |_, _| None);
        }
    }
}
