//! Pointer hit-testing order across layers and views: overlay layer, top
//! layer, views (focused first, then the rest in iteration order), bottom
//! layer, background layer. Kept free of any Wayland surface type —
//! popups within a band resolve to the same band and are not distinguished
//! here, since their lifecycle belongs to the layer-shell surface
//! machinery; this module only decides *which* output entity is topmost
//! at a point.

use slotmap::SlotMap;

use crate::ids::ViewId;
use crate::output::{Layer, Output};
use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Layer(Layer),
    View(ViewId),
}

/// Finds whatever is topmost at `(x, y)` in `output`-local coordinates.
/// `focused` is tried before the rest of the view stack so a
/// raised-but-occluding focused view wins ties the iteration order alone
/// wouldn't resolve.
pub fn hit_test(
    output: &Output,
    views: &SlotMap<ViewId, View>,
    focused: Option<ViewId>,
    x: i32,
    y: i32,
) -> Option<Hit> {
    if output.layer_hit(Layer::Overlay, x, y) {
        return Some(Hit::Layer(Layer::Overlay));
    }
    if output.layer_hit(Layer::Top, x, y) {
        return Some(Hit::Layer(Layer::Top));
    }

    if let Some(fid) = focused {
        if view_contains(output, views, fid, x, y) {
            return Some(Hit::View(fid));
        }
    }

    let start = output.views.first();
    for (_, vid) in output.views.iter_tagged(start, output.active_tags, |vid| {
        views
            .get(*vid)
            .map(|v| v.current_tags())
            .unwrap_or_default()
    }) {
        if Some(*vid) == focused {
            continue;
        }
        if view_contains(output, views, *vid, x, y) {
            return Some(Hit::View(*vid));
        }
    }

    if output.layer_hit(Layer::Bottom, x, y) {
        return Some(Hit::Layer(Layer::Bottom));
    }
    if output.layer_hit(Layer::Background, x, y) {
        return Some(Hit::Layer(Layer::Background));
    }
    None
}

fn view_contains(
    output: &Output,
    views: &SlotMap<ViewId, View>,
    vid: ViewId,
    x: i32,
    y: i32,
) -> bool {
    views
        .get(vid)
        .is_some_and(|v| v.output == output.id && v.current.box_.contains_point(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, SizeConstraints};
    use crate::ids::OutputId;
    use crate::output::LayerAnchor;
    use crate::tags::Tags;
    use crate::view::{ConfigureSerial, ShellSurface};

    struct MockShell;
    impl ShellSurface for MockShell {
        fn configure(&self, _box_: Rect) -> Option<ConfigureSerial> {
            None
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

    struct MockLayer {
        anchor: LayerAnchor,
        zone: i32,
    }
    impl crate::output::LayerShellSurface for MockLayer {
        fn anchor(&self) -> LayerAnchor {
            self.anchor
        }
        fn exclusive_zone(&self) -> i32 {
            self.zone
        }
        fn configure(&self, _box_: Rect) {}
        fn alive(&self) -> bool {
            true
        }
    }

    fn output_with_view(views: &mut SlotMap<ViewId, View>, box_: Rect) -> (Output, ViewId) {
        let mut output = Output::new(OutputId::default(), Rect::new(0, 0, 800, 600));
        let node = output.views.push(ViewId::default());
        let mut view = View::new(output.id, node, Box::new(MockShell), Tags::new(1));
        view.current.box_ = box_;
        let vid = views.insert(view);
        *output.views.get_mut(node).unwrap() = vid;
        (output, vid)
    }

    #[test]
    fn finds_a_view_under_the_point() {
        let mut views = SlotMap::with_key();
        let (output, vid) = output_with_view(&mut views, Rect::new(0, 0, 400, 600));
        assert_eq!(hit_test(&output, &views, None, 100, 100), Some(Hit::View(vid)));
    }

    #[test]
    fn point_outside_every_view_hits_nothing() {
        let mut views = SlotMap::with_key();
        let (output, _vid) = output_with_view(&mut views, Rect::new(0, 0, 400, 600));
        assert_eq!(hit_test(&output, &views, None, 700, 500), None);
    }

    #[test]
    fn overlay_layer_wins_over_a_view_beneath_it() {
        let mut views = SlotMap::with_key();
        let (mut output, _vid) = output_with_view(&mut views, Rect::new(0, 0, 800, 600));
        output.add_layer_surface(
            Layer::Overlay,
            Box::new(MockLayer { anchor: LayerAnchor::TOP, zone: 0 }),
        );
        output.arrange_layers();
        assert_eq!(hit_test(&output, &views, None, 10, 10), Some(Hit::Layer(Layer::Overlay)));
    }

    #[test]
    fn focused_view_is_tried_before_stack_order() {
        let mut views = SlotMap::with_key();
        let mut output = Output::new(OutputId::default(), Rect::new(0, 0, 800, 600));

        let node_a = output.views.append(ViewId::default());
        let mut view_a = View::new(output.id, node_a, Box::new(MockShell), Tags::new(1));
        view_a.current.box_ = Rect::new(0, 0, 800, 600);
        let vid_a = views.insert(view_a);
        *output.views.get_mut(node_a).unwrap() = vid_a;

        let node_b = output.views.append(ViewId::default());
        let mut view_b = View::new(output.id, node_b, Box::new(MockShell), Tags::new(1));
        view_b.current.box_ = Rect::new(0, 0, 800, 600);
        let vid_b = views.insert(view_b);
        *output.views.get_mut(node_b).unwrap() = vid_b;

        // Both occupy the same point; without a focused hint, iteration
        // order (a first) wins.
        assert_eq!(hit_test(&output, &views, None, 5, 5), Some(Hit::View(vid_a)));
        // With b focused, it wins despite being later in stack order.
        assert_eq!(hit_test(&output, &views, Some(vid_b), 5, 5), Some(Hit::View(vid_b)));
    }
}
