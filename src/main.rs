//! Binary entry point. Wires a winit-backed dev backend (no DRM/KMS/udev/
//! libinput — a production backend is out of scope for this core) to
//! [`MosaicState`], and drives client dispatch, input, rendering, and the
//! transaction deadline timer from one calloop event loop.

use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use smithay::backend::input::{
    AbsolutePositionEvent, ButtonState, Event, InputEvent, KeyboardKeyEvent,
};
use smithay::backend::renderer::damage::OutputDamageTracker;
use smithay::backend::renderer::gles::{GlesRenderer, GlesTexture};
use smithay::backend::winit::{self, WinitEvent};
use smithay::input::keyboard::FilterResult;
use smithay::input::pointer::{ButtonEvent, MotionEvent};
use smithay::output::{Mode as OutputMode, Output as SmithayOutput, PhysicalProperties, Subpixel};
use smithay::reexports::calloop::generic::Generic;
use smithay::reexports::calloop::timer::{TimeoutAction, Timer};
use smithay::reexports::calloop::{EventLoop, Interest, Mode as CalloopMode, PostAction};
use smithay::reexports::wayland_server::Display;
use smithay::utils::{Size, Transform, SERIAL_COUNTER};
use smithay::wayland::socket::ListeningSocketSource;

use mosaicwm::cursor::PointerButton;
use mosaicwm::geometry::Rect;
use mosaicwm::ids::OutputId;
use mosaicwm::output::Output;
use mosaicwm::pointer::PointerElement;
use mosaicwm::render::{render_output, send_frame_callbacks};
use mosaicwm::root::TRANSACTION_TIMEOUT;
use mosaicwm::startup;
use mosaicwm::state::{ClientState, MosaicState, PointerRoute};

/// Linux input event codes for the three buttons the cursor state machine
/// distinguishes; anything else maps to `PointerButton::Other`.
const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;

fn map_button(code: u32) -> PointerButton {
    match code {
        BTN_LEFT => PointerButton::Left,
        BTN_RIGHT => PointerButton::Right,
        BTN_MIDDLE => PointerButton::Middle,
        _ => PointerButton::Other,
    }
}

/// Owns the two halves the event loop juggles: the compositor state and the
/// `Display` it hasn't handed off to smithay's dispatch machinery.
struct LoopData {
    state: MosaicState,
    display: Display<MosaicState>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut event_loop: EventLoop<LoopData> = EventLoop::try_new()?;
    let mut display: Display<MosaicState> = Display::new()?;

    let mut state = MosaicState::init(event_loop.handle(), &mut display);

    let socket = ListeningSocketSource::new_auto()?;
    let socket_name = socket.socket_name().to_os_string();
    event_loop
        .handle()
        .insert_source(socket, |stream, _, data| {
            if let Err(err) = data
                .display
                .handle()
                .insert_client(stream, Arc::new(ClientState::default()))
            {
                tracing::warn!(?err, "failed to insert new client");
            }
        })?;

    event_loop.handle().insert_source(
        Generic::new(
            display.backend().poll_fd().as_raw_fd(),
            Interest::READ,
            CalloopMode::Level,
        ),
        |_, _, data| {
            data.display.dispatch_clients(&mut data.state)?;
            Ok(PostAction::Continue)
        },
    )?;

    let (mut backend, mut winit) = winit::init::<GlesRenderer>()?;

    let mode = OutputMode {
        size: backend.window_size(),
        refresh: 60_000,
    };
    let smithay_output = SmithayOutput::new(
        "winit".to_string(),
        PhysicalProperties {
            size: (0, 0).into(),
            subpixel: Subpixel::Unknown,
            make: "mosaicwm".into(),
            model: "winit".into(),
        },
    );
    smithay_output.create_global::<MosaicState>(&display.handle());
    smithay_output.change_current_state(
        Some(mode),
        Some(Transform::Normal),
        None,
        Some((0, 0).into()),
    );
    smithay_output.set_preferred(mode);

    let output_id = state
        .root
        .outputs
        .insert(Output::new(OutputId::default(), Rect::new(0, 0, mode.size.w, mode.size.h)));
    if let Some(output) = state.root.outputs.get_mut(output_id) {
        output.arrange_layers();
    }

    let mut damage_tracker = OutputDamageTracker::from_output(&smithay_output);
    let mut pointer_element = PointerElement::<GlesTexture>::new(backend.renderer());

    std::env::set_var("WAYLAND_DISPLAY", &socket_name);
    tracing::info!(socket = %socket_name.to_string_lossy(), "compositor listening");

    // The init file is the one extension point this compositor defines: if
    // it exists, it is spawned once as a process-group leader and signalled
    // on exit. Nothing else here depends on whether one was found.
    let init_process = startup::find_init_file().and_then(|path| match startup::spawn_init(&path) {
        Ok(process) => {
            tracing::info!(pid = process.pid(), path = %path.display(), "spawned init process");
            Some(process)
        }
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "failed to spawn init process");
            None
        }
    });

    let start_time = Instant::now();

    event_loop
        .handle()
        .insert_source(Timer::from_duration(TRANSACTION_TIMEOUT), |_, _, data| {
            data.state.poll_transaction_deadline();
            TimeoutAction::ToDuration(TRANSACTION_TIMEOUT)
        })?;

    event_loop
        .handle()
        .insert_source(Timer::immediate(), move |_, _, data| {
            let LoopData { state, display } = data;

            let mut resized_to: Option<Size<i32, smithay::utils::Physical>> = None;
            winit
                .dispatch_new_events(|event| match event {
                    WinitEvent::Resized { size, .. } => resized_to = Some(size),
                    WinitEvent::Input(event) => handle_input(state, event, output_id, &smithay_output),
                    _ => {}
                })
                .unwrap();

            if let Some(size) = resized_to {
                smithay_output.change_current_state(
                    Some(OutputMode { size, refresh: 60_000 }),
                    None,
                    None,
                    None,
                );
                if let Some(output) = state.root.outputs.get_mut(output_id) {
                    output.geometry = Rect::new(0, 0, size.w, size.h);
                    output.arrange_layers();
                }
                damage_tracker = OutputDamageTracker::from_output(&smithay_output);
            }

            if let Err(err) = backend.bind() {
                tracing::error!(?err, "failed to bind winit backend for rendering");
                return TimeoutAction::ToDuration(Duration::from_millis(16));
            }

            let age = backend.buffer_age().unwrap_or(0);
            match render_output(
                state,
                &smithay_output,
                output_id,
                backend.renderer(),
                age,
                &mut damage_tracker,
                &mut pointer_element,
            ) {
                Ok(()) => {
                    if let Err(err) = backend.submit(None) {
                        tracing::error!(?err, "failed to submit rendered frame");
                    }
                }
                Err(err) => tracing::error!(%err, "failed to render output"),
            }

            send_frame_callbacks(state, &smithay_output, output_id, start_time.elapsed());

            if let Err(err) = display.flush_clients() {
                tracing::warn!(?err, "failed to flush clients");
            }

            TimeoutAction::ToDuration(Duration::from_millis(16))
        })?;

    let mut data = LoopData { state, display };
    event_loop.run(None, &mut data, |_| {})?;

    if let Some(process) = init_process {
        process.terminate();
    }

    Ok(())
}

/// Dispatches one winit input event: keyboard events are forwarded to
/// whatever has keyboard focus unconditionally (this compositor has no
/// built-in keybindings — see `control::protocol`, everything is driven by
/// the control wire protocol instead), and pointer events are routed through
/// [`MosaicState::handle_pointer_motion`]/[`MosaicState::handle_pointer_button`]
/// before being forwarded on a [`PointerRoute::Passthrough`].
fn handle_input(
    state: &mut MosaicState,
    event: InputEvent<winit::WinitInput>,
    output_id: OutputId,
    smithay_output: &SmithayOutput,
) {
    match event {
        InputEvent::Keyboard { event } => {
            if state.is_input_blocked(None) {
                return;
            }
            let serial = SERIAL_COUNTER.next_serial();
            let time = event.time_msec();
            let key_state = event.state();
            let key_code = event.key_code();
            if let Some(keyboard) = state.seat.get_keyboard() {
                keyboard.input::<(), _>(state, key_code, key_state, serial, time, |_, _, _| {
                    FilterResult::Forward
                });
            }
        }
        InputEvent::PointerMotionAbsolute { event, .. } => {
            let size = state
                .root
                .outputs
                .get(output_id)
                .map(|o| Size::from((o.geometry.width, o.geometry.height)))
                .unwrap_or_else(|| smithay_output.current_mode().map(|m| m.size).unwrap_or((0, 0).into()).to_logical(1));
            let location = event.position_transformed(size);

            match state.handle_pointer_motion(location) {
                PointerRoute::Grabbed => {}
                PointerRoute::Passthrough { surface, origin, location } => {
                    if state.is_input_blocked(None) {
                        return;
                    }
                    let Some(pointer) = state.seat.get_pointer() else { return };
                    let serial = SERIAL_COUNTER.next_serial();
                    let focus = surface.zip(origin);
                    pointer.motion(
                        state,
                        focus,
                        &MotionEvent {
                            location,
                            serial,
                            time: event.time_msec(),
                        },
                    );
                    pointer.frame(state);
                }
            }
        }
        InputEvent::PointerButton { event } => {
            let button_code = event.button_code();
            let pressed = event.state() == ButtonState::Pressed;
            let modifier_held = state
                .seat
                .get_keyboard()
                .map(|kb| kb.modifier_state().logo)
                .unwrap_or(false);

            let route = state.handle_pointer_button(map_button(button_code), pressed, modifier_held);
            if let PointerRoute::Passthrough { .. } = route {
                if state.is_input_blocked(None) {
                    return;
                }
                let Some(pointer) = state.seat.get_pointer() else { return };
                let serial = SERIAL_COUNTER.next_serial();
                pointer.button(
                    state,
                    &ButtonEvent {
                        button: button_code,
                        state: event.state(),
                        serial,
                        time: event.time_msec(),
                    },
                );
                pointer.frame(state);
            }
        }
        _ => {}
    }
}
