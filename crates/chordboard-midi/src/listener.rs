//! MIDI input listener: device enumeration, binding, and note normalization.
//!
//! All midir state lives on a dedicated command thread so the public handle
//! stays cheap and `Send`. Parsed note events update the registry first and
//! then fan out to every subscriber channel, so a consumer that snapshots the
//! registry on receipt always observes the post-event state.

use crate::error::{Error, Result};
use crate::event::{NoteEvent, NoteKind};
use crate::registry::NoteRegistry;
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Size of each subscriber channel. Events are dropped (with a debug log)
/// when a consumer falls this far behind.
const SUBSCRIBER_FIFO: usize = 1024;

/// A discovered MIDI input device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

enum ListenerCommand {
    Connect,
    SelectInput(usize),
    Rescan,
    Disconnect,
    Shutdown,
}

/// State shared between the public handle, the command thread, and the
/// midir input callback.
struct ListenerShared {
    registry: Arc<NoteRegistry>,
    subscribers: RwLock<Vec<Sender<NoteEvent>>>,
    devices: ArcSwap<Vec<MidiInputDevice>>,
    bound_device: ArcSwap<Option<String>>,
    is_connected: AtomicBool,
    last_error: ArcSwap<Option<String>>,
}

impl ListenerShared {
    fn new() -> Self {
        Self {
            registry: Arc::new(NoteRegistry::new()),
            subscribers: RwLock::new(Vec::new()),
            devices: ArcSwap::from_pointee(Vec::new()),
            bound_device: ArcSwap::from_pointee(None),
            is_connected: AtomicBool::new(false),
            last_error: ArcSwap::from_pointee(None),
        }
    }

    fn publish(&self, event: NoteEvent) {
        for tx in self.subscribers.read().iter() {
            if tx.try_send(event).is_err() {
                debug!("dropping note event: subscriber queue full or gone");
            }
        }
    }

    /// Route one event: registry update first, then fan-out.
    fn route(&self, event: NoteEvent) {
        match event.kind {
            NoteKind::On => {
                self.registry.insert(event.note);
            }
            NoteKind::Off => {
                self.registry.remove(event.note);
            }
        }
        self.publish(event);
    }

    /// All-notes-off: emit a synthetic Off for every held note.
    fn force_release(&self) {
        for note in self.registry.clear() {
            self.publish(NoteEvent::off(note));
        }
    }

    fn set_error(&self, error: Option<String>) {
        if let Some(ref msg) = error {
            warn!("MIDI listener: {msg}");
        }
        self.last_error.store(Arc::new(error));
    }
}

/// Handle to the MIDI input subsystem.
///
/// `connect`/`select_input`/`disconnect` are processed asynchronously on the
/// command thread; failures surface through [`MidiListener::last_error`]
/// rather than panicking, so a host without MIDI support degrades to a
/// disabled feature.
pub struct MidiListener {
    command_tx: Option<Sender<ListenerCommand>>,
    shared: Arc<ListenerShared>,
}

impl MidiListener {
    pub fn new() -> Self {
        let shared = Arc::new(ListenerShared::new());

        #[cfg(feature = "midi-io")]
        {
            let (command_tx, command_rx) = bounded(64);
            let thread_shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("chordboard-midi-listener".to_string())
                .spawn(move || io_thread::run(command_rx, thread_shared))
                .expect("Failed to spawn MIDI listener thread");
            Self {
                command_tx: Some(command_tx),
                shared,
            }
        }

        #[cfg(not(feature = "midi-io"))]
        Self {
            command_tx: None,
            shared,
        }
    }

    fn send(&self, command: ListenerCommand) -> Result<()> {
        match &self.command_tx {
            Some(tx) => tx.send(command).map_err(|_| Error::NotRunning),
            None => {
                let reason = "MIDI hardware support not compiled in".to_string();
                self.shared.set_error(Some(reason.clone()));
                Err(Error::Unsupported(reason))
            }
        }
    }

    /// Request MIDI access: enumerate input devices and auto-bind the first
    /// one if none is bound yet.
    pub fn connect(&self) -> Result<()> {
        self.send(ListenerCommand::Connect)
    }

    /// Switch to another input device. All held notes are force-released
    /// before the new device is bound.
    pub fn select_input(&self, index: usize) -> Result<()> {
        self.send(ListenerCommand::SelectInput(index))
    }

    /// Re-enumerate devices now (also happens periodically on the command
    /// thread once access was granted).
    pub fn rescan(&self) -> Result<()> {
        self.send(ListenerCommand::Rescan)
    }

    /// Unbind, force-release all notes, and drop MIDI access.
    pub fn disconnect(&self) {
        let _ = self.send(ListenerCommand::Disconnect);
    }

    pub fn devices(&self) -> Vec<MidiInputDevice> {
        self.shared.devices.load().as_ref().clone()
    }

    pub fn bound_device(&self) -> Option<String> {
        self.shared.bound_device.load().as_ref().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected.load(Ordering::Acquire)
    }

    /// Last recoverable error, if any. Cleared on the next successful bind.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.load().as_ref().clone()
    }

    pub fn registry(&self) -> Arc<NoteRegistry> {
        Arc::clone(&self.shared.registry)
    }

    pub fn active_notes(&self) -> Vec<u8> {
        self.shared.registry.snapshot()
    }

    /// Independent event stream; every subscriber sees every note event.
    pub fn subscribe(&self) -> Receiver<NoteEvent> {
        let (tx, rx) = bounded(SUBSCRIBER_FIFO);
        self.shared.subscribers.write().push(tx);
        rx
    }

    /// Feed a synthetic event through the same registry/fan-out path as
    /// hardware input. Intended for virtual input and tests.
    pub fn inject(&self, event: NoteEvent) {
        self.shared.route(event);
    }
}

impl Default for MidiListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiListener {
    fn drop(&mut self) {
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(ListenerCommand::Shutdown);
        }
    }
}

#[cfg(feature = "midi-io")]
mod io_thread {
    use super::*;
    use crossbeam_channel::RecvTimeoutError;
    use midir::{Ignore, MidiInput, MidiInputConnection};
    use std::time::{Duration, Instant};
    use tracing::info;

    const CLIENT_NAME: &str = "chordboard-midi-in";

    /// How often devices are re-enumerated for hot-plug detection.
    const RESCAN_INTERVAL: Duration = Duration::from_secs(1);

    pub(super) fn run(command_rx: Receiver<ListenerCommand>, shared: Arc<ListenerShared>) {
        let mut state = IoState {
            shared,
            connection: None,
            access_granted: false,
            last_scan: Instant::now(),
        };

        loop {
            match command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(ListenerCommand::Connect) => state.connect(),
                Ok(ListenerCommand::SelectInput(index)) => state.select_input(index),
                Ok(ListenerCommand::Rescan) => state.rescan(),
                Ok(ListenerCommand::Disconnect) => state.disconnect(),
                Ok(ListenerCommand::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if state.access_granted && state.last_scan.elapsed() >= RESCAN_INTERVAL {
                        state.rescan();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        state.disconnect();
    }

    struct IoState {
        shared: Arc<ListenerShared>,
        /// Bound device name + live connection.
        connection: Option<(String, MidiInputConnection<()>)>,
        access_granted: bool,
        last_scan: Instant,
    }

    impl IoState {
        fn enumerate(&mut self) -> Result<Vec<MidiInputDevice>> {
            let input = MidiInput::new(CLIENT_NAME)?;
            let devices = input
                .ports()
                .iter()
                .enumerate()
                .map(|(index, port)| MidiInputDevice {
                    index,
                    name: input
                        .port_name(port)
                        .unwrap_or_else(|_| format!("Unknown Device {index}")),
                })
                .collect();
            self.last_scan = Instant::now();
            Ok(devices)
        }

        fn connect(&mut self) {
            match self.enumerate() {
                Ok(devices) => {
                    self.access_granted = true;
                    let have_devices = !devices.is_empty();
                    self.shared.devices.store(Arc::new(devices));
                    self.shared.set_error(None);
                    if self.connection.is_none() {
                        if have_devices {
                            self.bind(0);
                        } else {
                            debug!("no MIDI input devices available");
                        }
                    }
                }
                Err(e) => self.shared.set_error(Some(e.to_string())),
            }
        }

        fn bind(&mut self, index: usize) {
            match self.try_bind(index) {
                Ok(name) => {
                    info!("bound MIDI input device: {name}");
                    self.shared.bound_device.store(Arc::new(Some(name)));
                    self.shared.is_connected.store(true, Ordering::Release);
                    self.shared.set_error(None);
                }
                Err(e) => {
                    self.shared.is_connected.store(false, Ordering::Release);
                    self.shared.bound_device.store(Arc::new(None));
                    self.shared.set_error(Some(e.to_string()));
                }
            }
        }

        fn try_bind(&mut self, index: usize) -> Result<String> {
            let mut input = MidiInput::new(CLIENT_NAME)?;
            input.ignore(Ignore::All);

            let ports = input.ports();
            let port = ports
                .get(index)
                .ok_or_else(|| Error::Device(format!("MIDI input device {index} not found")))?;
            let name = input
                .port_name(port)
                .unwrap_or_else(|_| format!("Device {index}"));

            let callback_shared = Arc::clone(&self.shared);
            let connection = input.connect(
                port,
                "chordboard-input",
                move |_timestamp, bytes, _: &mut ()| {
                    if let Some(event) = NoteEvent::parse(bytes) {
                        callback_shared.route(event);
                    }
                },
                (),
            )?;

            self.connection = Some((name.clone(), connection));
            Ok(name)
        }

        fn select_input(&mut self, index: usize) {
            self.unbind();
            self.bind(index);
        }

        /// Close the current connection. Device switch is an all-notes-off
        /// boundary, so held notes are force-released.
        fn unbind(&mut self) {
            if let Some((name, connection)) = self.connection.take() {
                let _ = connection.close();
                debug!("unbound MIDI input device: {name}");
            }
            self.shared.force_release();
            self.shared.is_connected.store(false, Ordering::Release);
            self.shared.bound_device.store(Arc::new(None));
        }

        fn rescan(&mut self) {
            let devices = match self.enumerate() {
                Ok(devices) => devices,
                Err(e) => {
                    self.shared.set_error(Some(e.to_string()));
                    return;
                }
            };

            let removed_bound = match &self.connection {
                Some((name, _)) => !devices.iter().any(|d| &d.name == name),
                None => false,
            };

            self.shared.devices.store(Arc::new(devices));

            if removed_bound {
                let name = self
                    .connection
                    .as_ref()
                    .map(|(n, _)| n.clone())
                    .unwrap_or_default();
                warn!("bound MIDI input device removed: {name}");
                self.unbind();
                self.shared
                    .set_error(Some(format!("MIDI device disconnected: {name}")));
            }
        }

        fn disconnect(&mut self) {
            self.unbind();
            self.shared.devices.store(Arc::new(Vec::new()));
            self.access_granted = false;
        }
    }
}
