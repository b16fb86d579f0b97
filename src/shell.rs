//! The two concrete `ShellSurface` implementations: xdg-shell toplevels and
//! XWayland surfaces. This is the only module that bridges the pure
//! `view`/`root` logic to smithay's shell-lifecycle handling, per the
//! "static polymorphism across shell kinds" design note — Root never
//! matches on which variant a view has, it only calls through the trait.

use smithay::utils::Size;
use smithay::wayland::shell::wlr_layer::{Anchor as WlrAnchor, ExclusiveZone, LayerSurface};
use smithay::wayland::shell::xdg::ToplevelSurface;
use smithay::xwayland::X11Surface;

use crate::geometry::{Rect, SizeConstraints};
use crate::output::{LayerAnchor, LayerShellSurface};
use crate::view::{ConfigureSerial, ShellSurface};

impl From<smithay::utils::Serial> for ConfigureSerial {
    fn from(serial: smithay::utils::Serial) -> Self {
        ConfigureSerial(serial.0 as u64)
    }
}

/// Wraps an xdg-shell toplevel. Every configure has a serial; the client
/// acknowledges it asynchronously via `xdg_surface.ack_configure`.
pub struct XdgToplevelShell {
    pub toplevel: ToplevelSurface,
}

impl ShellSurface for XdgToplevelShell {
    fn configure(&self, box_: Rect) -> Option<ConfigureSerial> {
        self.toplevel.with_pending_state(|state| {
            state.size = Some(Size::from((box_.width, box_.height)));
        });
        let serial = self.toplevel.send_configure();
        Some(serial.into())
    }

    fn close(&self) {
        self.toplevel.send_close();
    }

    fn constraints(&self) -> SizeConstraints {
        let (min, max) = self
            .toplevel
            .with_pending_state(|state| (state.min_size, state.max_size));
        SizeConstraints {
            min_width: if min.w > 0 { min.w } else { 1 },
            min_height: if min.h > 0 { min.h } else { 1 },
            max_width: if max.w > 0 { max.w } else { i32::MAX },
            max_height: if max.h > 0 { max.h } else { i32::MAX },
        }
    }

    fn set_activated(&self, activated: bool) {
        self.toplevel.with_pending_state(|state| {
            use smithay::reexports::wayland_protocols::xdg::shell::server::xdg_toplevel::State;
            if activated {
                state.states.set(State::Activated);
            } else {
                state.states.unset(State::Activated);
            }
        });
        let _ = self.toplevel.send_configure();
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.toplevel.with_pending_state(|state| {
            use smithay::reexports::wayland_protocols::xdg::shell::server::xdg_toplevel::State;
            if fullscreen {
                state.states.set(State::Fullscreen);
            } else {
                state.states.unset(State::Fullscreen);
            }
        });
        let _ = self.toplevel.send_configure();
    }

    fn app_id(&self) -> Option<String> {
        smithay::wayland::compositor::with_states(self.toplevel.wl_surface(), |states| {
            states
                .data_map
                .get::<smithay::wayland::shell::xdg::XdgToplevelSurfaceData>()
                .and_then(|d| d.lock().unwrap().app_id.clone())
        })
    }

    fn alive(&self) -> bool {
        self.toplevel.alive()
    }
}

/// Wraps an XWayland surface. There is no configure/ack round-trip for
/// override-redirect-less X11 windows in the sense xdg-shell has one, so
/// `configure` reports no serial: the view is treated as settled the
/// instant it's configured, rather than joining the awaiting-acks phase.
pub struct X11Shell {
    pub surface: X11Surface,
}

impl ShellSurface for X11Shell {
    fn configure(&self, box_: Rect) -> Option<ConfigureSerial> {
        let geo = smithay::utils::Rectangle::from_loc_and_size(
            (box_.x, box_.y),
            (box_.width, box_.height),
        );
        if let Err(err) = self.surface.configure(geo) {
            tracing::warn!(?err, "failed to configure X11 surface");
        }
        None
    }

    fn close(&self) {
        if let Err(err) = self.surface.close() {
            tracing::warn!(?err, "failed to close X11 surface");
        }
    }

    fn constraints(&self) -> SizeConstraints {
        // X11 size hints aren't modeled by smithay's X11Surface beyond what
        // the window manager chooses to enforce; X11 clients rarely set
        // hard min/max via the protocol path we use, so fall back to the
        // permissive default and let the layout client's own geometry win.
        SizeConstraints::default()
    }

    fn set_activated(&self, activated: bool) {
        if let Err(err) = self.surface.set_activated(activated) {
            tracing::warn!(?err, "failed to set X11 surface activation");
        }
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.surface.set_fullscreen(fullscreen);
    }

    fn app_id(&self) -> Option<String> {
        self.surface.class().ok()
    }

    fn alive(&self) -> bool {
        self.surface.alive()
    }
}

/// Wraps a wlr-layer-shell surface for [`crate::output::Output::arrange_layers`].
/// Anchor and exclusive-zone are read from the client's cached (committed)
/// state rather than tracked separately here, the same way xdg-toplevel
/// state is read through `with_pending_state`/`current_state` rather than
/// shadowed locally.
pub struct WlrLayerShell {
    pub surface: LayerSurface,
}

impl LayerShellSurface for WlrLayerShell {
    fn anchor(&self) -> LayerAnchor {
        let anchor = smithay::wayland::compositor::with_states(self.surface.wl_surface(), |states| {
            states
                .cached_state
                .get::<smithay::wayland::shell::wlr_layer::LayerSurfaceCachedState>()
                .current()
                .anchor
        });
        let mut bits = LayerAnchor(0);
        if anchor.contains(WlrAnchor::TOP) {
            bits = bits.union(LayerAnchor::TOP);
        }
        if anchor.contains(WlrAnchor::BOTTOM) {
            bits = bits.union(LayerAnchor::BOTTOM);
        }
        if anchor.contains(WlrAnchor::LEFT) {
            bits = bits.union(LayerAnchor::LEFT);
        }
        if anchor.contains(WlrAnchor::RIGHT) {
            bits = bits.union(LayerAnchor::RIGHT);
        }
        bits
    }

    fn exclusive_zone(&self) -> i32 {
        let zone = smithay::wayland::compositor::with_states(self.surface.wl_surface(), |states| {
            states
                .cached_state
                .get::<smithay::wayland::shell::wlr_layer::LayerSurfaceCachedState>()
                .current()
                .exclusive_zone
        });
        match zone {
            ExclusiveZone::Exclusive(v) => v as i32,
            ExclusiveZone::Neutral | ExclusiveZone::DontCare => 0,
        }
    }

    fn configure(&self, box_: Rect) {
        self.surface.with_pending_state(|state| {
            state.size = Some(Size::from((box_.width, box_.height)));
        });
        self.surface.send_configure();
    }

    fn alive(&self) -> bool {
        self.surface.alive()
    }

    fn wl_surface(&self) -> Option<&smithay::reexports::wayland_server::protocol::wl_surface::WlSurface> {
        Some(self.surface.wl_surface())
    }
}
