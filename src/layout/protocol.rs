//! Wire glue for `mosaic_layout_manager_v1`/`mosaic_layout_v1`, generated at
//! build time from `protocol/mosaic-layout-unstable-v1.xml`. This is the
//! thinnest possible adapter over [`super::LayoutRegistry`] and
//! [`super::tracker::LayoutDemandTracker`]: every decision (namespace
//! uniqueness, serial bookkeeping, count mismatches) lives in the
//! transport-agnostic types, this module only turns their outcomes into
//! events and vice versa.

#![allow(non_upper_case_globals, non_camel_case_types)]

use smithay::reexports::wayland_server::backend::ClientId;
use smithay::reexports::wayland_server::protocol::wl_output::WlOutput;
use smithay::reexports::wayland_server::{
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

pub(crate) mod generated {
    use smithay::reexports::wayland_server;
    use smithay::reexports::wayland_server::protocol::*;

    include!(concat!(env!("OUT_DIR"), "/mosaic_layout_v1_server.rs"));
}

use generated::mosaic_layout_manager_v1::{self, MosaicLayoutManagerV1};
use generated::mosaic_layout_v1::{self, Error as WireError, MosaicLayoutV1};

use crate::geometry::Rect;
use crate::ids::LayoutClientId;
use crate::root::LayoutDemandRequest;

/// Per-bound-object user data: just enough to find the matching entry back
/// in the registry when a request arrives.
pub struct LayoutObjectData {
    pub client_id: LayoutClientId,
}

/// Anything that owns a [`super::LayoutRegistry`] and can resolve a bound
/// `wl_output` to our internal `OutputId`. Implemented by the top-level
/// compositor state in `state.rs`; kept as a trait so this file doesn't
/// need to know the shape of that struct.
pub trait LayoutManagerHandler {
    fn layout_registry(&mut self) -> &mut super::LayoutRegistry;
    fn output_id_for(&mut self, output: &WlOutput) -> Option<crate::ids::OutputId>;

    /// Called once registration succeeds, so the handler can remember the
    /// live resource (for later `emit_layout_demand` calls) and push an
    /// initial demand if views are already present on that output.
    fn layout_client_bound(&mut self, id: LayoutClientId, resource: MosaicLayoutV1);
    fn layout_client_unbound(&mut self, id: LayoutClientId);

    /// A `commit` request just resolved to [`super::CommitOutcome::Committed`]
    /// for `client` on `output`: the handler copies the pushed geometries
    /// into each advertised view's pending box and starts a transaction.
    fn layout_demand_committed(&mut self, output: crate::ids::OutputId, client: LayoutClientId);
}

/// Sends the three-event sequence a fresh [`LayoutDemandRequest`] turns
/// into on the wire: `layout_demand`, one `advertise_view` per descriptor in
/// order, then `advertise_done`. The caller is responsible for resolving
/// `request.client` to the live `MosaicLayoutV1` resource (`state.rs`
/// keeps that map; it isn't reachable from here without a generic handler
/// parameter this module doesn't need otherwise).
pub fn emit_layout_demand(resource: &MosaicLayoutV1, request: &LayoutDemandRequest) {
    resource.layout_demand(
        request.views.len() as u32,
        request.usable_width,
        request.usable_height,
        request.tags,
        request.serial,
    );
    for view in &request.views {
        resource.advertise_view(view.tags.0, view.app_id.clone(), request.serial);
    }
    resource.advertise_done(request.serial);
}

/// Pushes a named integer tunable to a bound layout client, mirroring a CLI
/// `set-layout-value`/`mod-layout-value int` command into the wire protocol.
pub fn emit_set_int_value(resource: &MosaicLayoutV1, name: &str, value: i32) {
    resource.set_int_value(name.to_string(), value);
}

pub fn emit_mod_int_value(resource: &MosaicLayoutV1, name: &str, delta: i32) {
    resource.mod_int_value(name.to_string(), delta);
}

pub fn emit_set_fixed_value(resource: &MosaicLayoutV1, name: &str, value: f64) {
    resource.set_fixed_value(name.to_string(), smithay::reexports::wayland_server::Fixed::from(value));
}

pub fn emit_mod_fixed_value(resource: &MosaicLayoutV1, name: &str, delta: f64) {
    resource.mod_fixed_value(name.to_string(), smithay::reexports::wayland_server::Fixed::from(delta));
}

pub fn emit_set_string_value(resource: &MosaicLayoutV1, name: &str, value: &str) {
    resource.set_string_value(name.to_string(), value.to_string());
}

impl<D> GlobalDispatch<MosaicLayoutManagerV1, ()> for D
where
    D: GlobalDispatch<MosaicLayoutManagerV1, ()> + LayoutManagerHandler + 'static,
{
    fn bind(
        _state: &mut D,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<MosaicLayoutManagerV1>,
        _global_data: &(),
        data_init: &mut DataInit<'_, D>,
    ) {
        data_init.init(resource, ());
    }
}

impl<D> Dispatch<MosaicLayoutManagerV1, ()> for D
where
    D: Dispatch<MosaicLayoutManagerV1, ()> + Dispatch<MosaicLayoutV1, LayoutObjectData> + LayoutManagerHandler + 'static,
{
    fn request(
        state: &mut D,
        _client: &Client,
        _resource: &MosaicLayoutManagerV1,
        request: mosaic_layout_manager_v1::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            mosaic_layout_manager_v1::Request::GetLayout {
                id,
                output,
                namespace,
            } => {
                let Some(output_id) = state.output_id_for(&output) else {
                    let layout = data_init.init(id, LayoutObjectData {
                        client_id: LayoutClientId::default(),
                    });
                    layout.namespace_in_use();
                    return;
                };

                match state.layout_registry().register(output_id, namespace) {
                    Ok(client_id) => {
                        let layout = data_init.init(id, LayoutObjectData { client_id });
                        state.layout_client_bound(client_id, layout);
                    }
                    Err(super::RegisterError::NamespaceInUse) => {
                        let layout = data_init.init(id, LayoutObjectData {
                            client_id: LayoutClientId::default(),
                        });
                        layout.namespace_in_use();
                    }
                }
            }
            mosaic_layout_manager_v1::Request::Destroy => {}
        }
    }
}

impl<D> Dispatch<MosaicLayoutV1, LayoutObjectData> for D
where
    D: Dispatch<MosaicLayoutV1, LayoutObjectData> + LayoutManagerHandler + 'static,
{
    fn request(
        state: &mut D,
        _client: &Client,
        resource: &MosaicLayoutV1,
        request: mosaic_layout_v1::Request,
        data: &LayoutObjectData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        let id = data.client_id;

        match request {
            mosaic_layout_v1::Request::PushViewDimensions {
                serial,
                x,
                y,
                width,
                height,
            } => {
                if let Some(tracker) = state.layout_registry().tracker_mut(id) {
                    tracker.push_dimensions(serial, Rect::new(x, y, width as i32, height as i32));
                }
            }
            mosaic_layout_v1::Request::Commit { serial } => {
                let outcome = state
                    .layout_registry()
                    .tracker_mut(id)
                    .map(|t| t.commit(serial));
                match outcome {
                    Some(Err(crate::layout::ProtocolError::CountMismatch)) => {
                        resource.post_error(WireError::CountMismatch, "view count mismatch on commit");
                    }
                    Some(Err(crate::layout::ProtocolError::AlreadyCommitted)) => {
                        resource.post_error(WireError::AlreadyCommitted, "serial already committed");
                    }
                    Some(Ok(crate::layout::CommitOutcome::Committed)) => {
                        if let Some(output_id) = state.layout_registry().output_of(id) {
                            state.layout_demand_committed(output_id, id);
                        }
                    }
                    Some(Ok(crate::layout::CommitOutcome::Superseded)) | None => {}
                }
            }
            mosaic_layout_v1::Request::Destroy => {
                state.layout_client_unbound(id);
                state.layout_registry().unregister(id);
            }
        }
    }

    fn destroyed(state: &mut D, _client: ClientId, _resource: &MosaicLayoutV1, data: &LayoutObjectData) {
        state.layout_client_unbound(data.client_id);
        state.layout_registry().unregister(data.client_id);
    }
}
