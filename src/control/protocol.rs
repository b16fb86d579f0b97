//! Wire glue for `mosaic_control_v1`. Every bound object is a one-shot
//! invocation: the client pushes its argument vector word by word, then
//! sends `run_command`, after which exactly one of `success`/`failure`
//! fires and the object dies.

#![allow(non_upper_case_globals, non_camel_case_types)]

use smithay::reexports::wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New};

pub(crate) mod generated {
    use smithay::reexports::wayland_server;
    use smithay::reexports::wayland_server::protocol::*;

    include!(concat!(env!("OUT_DIR"), "/mosaic_control_v1_server.rs"));
}

use generated::mosaic_control_v1::{self, MosaicControlV1};

use super::Command;

/// Accumulates one client's argument vector and, once `run_command`
/// arrives, hands the parsed [`Command`] to the handler for execution.
#[derive(Default)]
pub struct ControlObjectData {
    args: std::sync::Mutex<Vec<String>>,
}

/// Implemented by the top-level compositor state: executes an already
/// parsed command and reports the result back as plain text, matching
/// what the real CLI utility would print to stdout/stderr.
pub trait ControlHandler {
    fn run_command(&mut self, command: Command) -> Result<String, String>;
}

impl<D> GlobalDispatch<MosaicControlV1, ()> for D
where
    D: GlobalDispatch<MosaicControlV1, ()> + ControlHandler + 'static,
{
    fn bind(
        _state: &mut D,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<MosaicControlV1>,
        _global_data: &(),
        data_init: &mut DataInit<'_, D>,
    ) {
        data_init.init(resource, ControlObjectData::default());
    }
}

impl<D> Dispatch<MosaicControlV1, ControlObjectData> for D
where
    D: Dispatch<MosaicControlV1, ControlObjectData> + ControlHandler + 'static,
{
    fn request(
        state: &mut D,
        _client: &Client,
        resource: &MosaicControlV1,
        request: mosaic_control_v1::Request,
        data: &ControlObjectData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            mosaic_control_v1::Request::AddArgument { argument } => {
                data.args.lock().unwrap().push(argument);
            }
            mosaic_control_v1::Request::RunCommand => {
                let args = std::mem::take(&mut *data.args.lock().unwrap());
                match super::parse(&args) {
                    Ok(command) => match state.run_command(command) {
                        Ok(output) => resource.success(output),
                        Err(message) => resource.failure(message),
                    },
                    Err(err) => resource.failure(err.0),
                }
            }
        }
    }
}
