//! A single display: its tag state, the tag-filtered view stack that
//! belongs to it, layer-shell surfaces, and the usable-area bookkeeping the
//! transaction engine arranges views into.

use smithay::reexports::wayland_server::protocol::wl_surface::WlSurface;

use crate::geometry::Rect;
use crate::ids::{LayoutClientId, OutputId, ViewId};
use crate::layout::{fallback_layout, LayoutRegistry};
use crate::tags::Tags;
use crate::view_stack::ViewStack;

/// The four independently stacked layer-shell bands, ordered bottom to
/// top. Exclusive-zone subtraction folds in this order; pointer
/// hit-testing walks it in reverse so the topmost layer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

pub const LAYER_ARRANGE_ORDER: [Layer; 4] =
    [Layer::Background, Layer::Bottom, Layer::Top, Layer::Overlay];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerAnchor(pub u8);

impl LayerAnchor {
    pub const TOP: LayerAnchor = LayerAnchor(0b0001);
    pub const BOTTOM: LayerAnchor = LayerAnchor(0b0010);
    pub const LEFT: LayerAnchor = LayerAnchor(0b0100);
    pub const RIGHT: LayerAnchor = LayerAnchor(0b1000);

    pub fn contains(self, edge: LayerAnchor) -> bool {
        self.0 & edge.0 != 0
    }

    pub fn union(self, other: LayerAnchor) -> LayerAnchor {
        LayerAnchor(self.0 | other.0)
    }
}

/// The capability a layer-shell surface exposes to `Output::arrange_layers`,
/// kept trait-based for the same testability reason as `ShellSurface`.
pub trait LayerShellSurface {
    fn anchor(&self) -> LayerAnchor;
    fn exclusive_zone(&self) -> i32;
    fn configure(&self, box_: Rect);
    fn alive(&self) -> bool;

    /// The live surface to render, if any. `None` for test doubles that
    /// never need to draw (the render path is the only caller).
    fn wl_surface(&self) -> Option<&WlSurface> {
        None
    }
}

struct LayerEntry {
    layer: Layer,
    surface: Box<dyn LayerShellSurface>,
    current_box: Rect,
}

/// One display. Owns the tag-filtered stack of its views (by id, the
/// `View`s themselves live in `Root::views`) and its layer-shell surfaces.
pub struct Output {
    pub id: OutputId,
    pub geometry: Rect,
    pub active_tags: Tags,
    pub views: ViewStack<ViewId>,
    layers: Vec<LayerEntry>,
    usable: Rect,
    active_layout_namespace: String,
    /// Mask applied to a newly mapped view's tags (copied from `active_tags`)
    /// via `spawn-tagmask`: bits outside the mask are dropped, so a view
    /// spawned while the mask excludes the current tags doesn't silently end
    /// up with no tags at all, it keeps whatever survives the intersection.
    spawn_tagmask: Tags,
}

impl Output {
    pub fn new(id: OutputId, geometry: Rect) -> Self {
        Self {
            id,
            geometry,
            active_tags: Tags::new(1),
            views: ViewStack::new(),
            layers: Vec::new(),
            usable: geometry,
            active_layout_namespace: "default".to_string(),
            spawn_tagmask: Tags::ALL,
        }
    }

    pub fn set_spawn_tagmask(&mut self, mask: Tags) {
        self.spawn_tagmask = mask;
    }

    /// Tags a newly mapped view should get: `active_tags` filtered by the
    /// spawn tagmask, falling back to `active_tags` unfiltered if that
    /// would otherwise leave the view with no tags at all.
    pub fn tags_for_new_view(&self) -> Tags {
        let filtered = self.active_tags.intersection(self.spawn_tagmask);
        if filtered.is_empty() {
            self.active_tags
        } else {
            filtered
        }
    }

    pub fn usable_rect(&self) -> Rect {
        self.usable
    }

    pub fn add_layer_surface(&mut self, layer: Layer, surface: Box<dyn LayerShellSurface>) {
        self.layers.push(LayerEntry {
            layer,
            surface,
            current_box: self.geometry,
        });
    }

    /// Drops layer entries whose backing surface has died, mirroring how
    /// `View`s are reaped once their shell reports `alive() == false`.
    pub fn prune_dead_layers(&mut self) {
        self.layers.retain(|entry| entry.surface.alive());
    }

    /// Recomputes the usable rectangle by folding each layer's exclusive
    /// zone inward from its anchored edge, in bottom-to-top order, and
    /// (re)configures every live layer surface with the output rect it
    /// should render into. Exclusive-zone surfaces reserve space for
    /// everyone arranged after them; non-exclusive surfaces (zone <= 0)
    /// just get the full current usable rect.
    pub fn arrange_layers(&mut self) {
        self.prune_dead_layers();
        let mut usable = self.geometry;

        for wanted in LAYER_ARRANGE_ORDER {
            for entry in self.layers.iter_mut().filter(|e| e.layer == wanted) {
                let anchor = entry.surface.anchor();
                let zone = entry.surface.exclusive_zone();
                entry.current_box = usable;
                entry.surface.configure(usable);

                if zone <= 0 {
                    continue;
                }
                if anchor.contains(LayerAnchor::TOP) {
                    usable.y += zone;
                    usable.height -= zone;
                } else if anchor.contains(LayerAnchor::BOTTOM) {
                    usable.height -= zone;
                } else if anchor.contains(LayerAnchor::LEFT) {
                    usable.x += zone;
                    usable.width -= zone;
                } else if anchor.contains(LayerAnchor::RIGHT) {
                    usable.width -= zone;
                }
            }
        }

        self.usable = usable;
    }

    /// Layer surfaces in pointer hit-test / paint order: topmost layer
    /// first, paired with the box they were last configured with.
    pub fn layers_front_to_back(&self) -> impl Iterator<Item = (Rect, &dyn LayerShellSurface)> {
        self.layers
            .iter()
            .rev()
            .map(|entry| (entry.current_box, entry.surface.as_ref()))
    }

    /// `true` if any live surface in `layer` currently covers `(x, y)`,
    /// topmost-within-the-band first. Used by [`crate::hittest`].
    pub fn layer_hit(&self, layer: Layer, x: i32, y: i32) -> bool {
        self.layers
            .iter()
            .rev()
            .filter(|entry| entry.layer == layer)
            .any(|entry| entry.current_box.contains_point(x, y))
    }

    pub fn set_active_tags(&mut self, tags: Tags) {
        if !tags.is_empty() {
            self.active_tags = tags;
        }
    }

    pub fn toggle_active_tags(&mut self, mask: Tags) {
        self.set_active_tags(self.active_tags.toggled(mask));
    }

    pub fn set_default_layout_namespace(&mut self, namespace: String) {
        self.active_layout_namespace = namespace;
    }

    /// `Output::getLayoutByName`.
    pub fn get_layout_by_name<'r>(
        &self,
        registry: &'r LayoutRegistry,
        namespace: &str,
    ) -> Option<LayoutClientId> {
        registry.get_layout_by_name(self.id, namespace)
    }

    pub fn active_layout_client<'r>(&self, registry: &'r LayoutRegistry) -> Option<LayoutClientId> {
        self.get_layout_by_name(registry, &self.active_layout_namespace)
    }

    /// The trivial built-in layout, used whenever no client is bound to the
    /// output's active namespace.
    pub fn fallback_arrangement(&self, count: usize) -> Vec<Rect> {
        fallback_layout(count, self.usable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLayer {
        anchor: LayerAnchor,
        zone: i32,
        alive: std::cell::Cell<bool>,
    }

    impl LayerShellSurface for MockLayer {
        fn anchor(&self) -> LayerAnchor {
            self.anchor
        }
        fn exclusive_zone(&self) -> i32 {
            self.zone
        }
        fn configure(&self, _box_: Rect) {}
        fn alive(&self) -> bool {
            self.alive.get()
        }
    }

    fn output() -> Output {
        Output::new(OutputId::default(), Rect::new(0, 0, 800, 600))
    }

    #[test]
    fn no_layers_usable_equals_geometry() {
        let mut o = output();
        o.arrange_layers();
        assert_eq!(o.usable_rect(), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn top_bar_reserves_its_exclusive_zone() {
        let mut o = output();
        o.add_layer_surface(
            Layer::Top,
            Box::new(MockLayer {
                anchor: LayerAnchor::TOP,
                zone: 30,
                alive: std::cell::Cell::new(true),
            }),
        );
        o.arrange_layers();
        assert_eq!(o.usable_rect(), Rect::new(0, 30, 800, 570));
    }

    #[test]
    fn stacked_bars_accumulate_in_arrange_order() {
        let mut o = output();
        o.add_layer_surface(
            Layer::Bottom,
            Box::new(MockLayer {
                anchor: LayerAnchor::TOP,
                zone: 10,
                alive: std::cell::Cell::new(true),
            }),
        );
        o.add_layer_surface(
            Layer::Top,
            Box::new(MockLayer {
                anchor: LayerAnchor::TOP,
                zone: 20,
                alive: std::cell::Cell::new(true),
            }),
        );
        o.arrange_layers();
        assert_eq!(o.usable_rect(), Rect::new(0, 30, 800, 570));
    }

    #[test]
    fn non_exclusive_layer_reserves_nothing() {
        let mut o = output();
        o.add_layer_surface(
            Layer::Overlay,
            Box::new(MockLayer {
                anchor: LayerAnchor::TOP,
                zone: 0,
                alive: std::cell::Cell::new(true),
            }),
        );
        o.arrange_layers();
        assert_eq!(o.usable_rect(), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn dead_layers_are_pruned_before_arranging() {
        let mut o = output();
        o.add_layer_surface(
            Layer::Top,
            Box::new(MockLayer {
                anchor: LayerAnchor::TOP,
                zone: 30,
                alive: std::cell::Cell::new(false),
            }),
        );
        o.arrange_layers();
        assert_eq!(o.usable_rect(), Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn toggle_that_would_zero_active_tags_is_ignored() {
        let mut o = output();
        o.set_active_tags(Tags::new(0b0010));
        o.toggle_active_tags(Tags::new(0b0010));
        assert_eq!(o.active_tags, Tags::new(0b0010));
    }
}
