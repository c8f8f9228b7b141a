//! ChordboardEngine that wires MIDI input, chord detection, and playback.
//!
//! Two consumer threads subscribe to the listener's event stream:
//!
//! - the detection thread re-runs chord detection on the registry snapshot
//!   after every note event and publishes the result through an `ArcSwap`,
//! - the playback thread forwards note on/off to the voice manager.
//!
//! Both threads exit when the engine (and with it the listener) is dropped
//! and their event channels disconnect.

use crate::{Result, VoiceManager};
use arc_swap::ArcSwapOption;
use chordboard_audio::{
    AudioSink, InstrumentDescriptor, InstrumentLoader, PlaybackState, CATALOG,
};
use chordboard_midi::{MidiInputDevice, MidiListener, NoteEvent, NoteKind, NoteRegistry};
use chordboard_theory::ChordCandidate;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Main engine coordinating all subsystems.
///
/// MIDI input is inert until [`connect`](Self::connect) requests device
/// access, and audio is inert until [`enable_audio`](Self::enable_audio) is
/// called (hosts typically defer that to a user gesture). Everything else
/// works immediately; without input or output the engine still detects
/// chords on injected events.
///
/// # Example
///
/// ```ignore
/// use chordboard::prelude::*;
///
/// let engine = ChordboardEngine::builder().build()?;
/// engine.connect()?;
/// engine.enable_audio()?;
///
/// // ... play some notes ...
/// if let Some(chord) = engine.chord() {
///     println!("{}", chord.name);
/// }
/// ```
pub struct ChordboardEngine {
    listener: MidiListener,
    registry: Arc<NoteRegistry>,
    chord: Arc<ArcSwapOption<ChordCandidate>>,

    /// `None` until `enable_audio`, and again after `disable_audio`.
    audio: Arc<Mutex<Option<VoiceManager>>>,
    loader: Arc<dyn InstrumentLoader>,
    /// Test/headless override; when unset `enable_audio` opens the device.
    sink: Option<Arc<dyn AudioSink>>,
    default_instrument: String,
}

impl ChordboardEngine {
    /// Create a new engine builder.
    pub fn builder() -> crate::ChordboardEngineBuilder {
        crate::ChordboardEngineBuilder::default()
    }

    pub(crate) fn new(
        listener: MidiListener,
        loader: Arc<dyn InstrumentLoader>,
        sink: Option<Arc<dyn AudioSink>>,
        default_instrument: String,
    ) -> Self {
        let registry = listener.registry();
        let chord = Arc::new(ArcSwapOption::const_empty());
        let audio = Arc::new(Mutex::new(None));

        spawn_detection_thread(listener.subscribe(), Arc::clone(&registry), Arc::clone(&chord));
        spawn_playback_thread(listener.subscribe(), Arc::clone(&audio));

        Self {
            listener,
            registry,
            chord,
            audio,
            loader,
            sink,
            default_instrument,
        }
    }

    // --- MIDI input ---

    /// Request MIDI access and auto-bind the first input device.
    pub fn connect(&self) -> Result<()> {
        self.listener.connect().map_err(Into::into)
    }

    /// Switch to another input device by enumeration index.
    pub fn select_input(&self, index: usize) -> Result<()> {
        self.listener.select_input(index).map_err(Into::into)
    }

    /// Re-enumerate input devices now.
    pub fn rescan(&self) -> Result<()> {
        self.listener.rescan().map_err(Into::into)
    }

    /// Unbind the input device and drop MIDI access.
    pub fn disconnect(&self) {
        self.listener.disconnect();
    }

    pub fn devices(&self) -> Vec<MidiInputDevice> {
        self.listener.devices()
    }

    pub fn bound_device(&self) -> Option<String> {
        self.listener.bound_device()
    }

    pub fn is_connected(&self) -> bool {
        self.listener.is_connected()
    }

    /// Last recoverable MIDI error, if any.
    pub fn midi_error(&self) -> Option<String> {
        self.listener.last_error()
    }

    /// Feed a synthetic note event through the same path as hardware input.
    pub fn inject(&self, event: NoteEvent) {
        self.listener.inject(event);
    }

    // --- State ---

    /// Currently held notes, ascending.
    pub fn active_notes(&self) -> Vec<u8> {
        self.registry.snapshot()
    }

    /// Current chord reading, or `None` when the held notes name no chord.
    pub fn chord(&self) -> Option<ChordCandidate> {
        self.chord.load_full().map(|c| (*c).clone())
    }

    // --- Audio ---

    /// Open the output device (unless a sink was injected at build time) and
    /// load the default instrument. Idempotent while enabled.
    pub fn enable_audio(&self) -> Result<()> {
        let mut audio = self.audio.lock();
        if audio.is_some() {
            return Ok(());
        }

        let sink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => self.open_output()?,
        };

        let mut manager = VoiceManager::new(sink, Arc::clone(&self.loader));
        manager.enable(&self.default_instrument)?;
        *audio = Some(manager);
        Ok(())
    }

    #[cfg(feature = "output")]
    fn open_output(&self) -> Result<Arc<dyn AudioSink>> {
        let output = chordboard_audio::CpalOutput::open()?;
        Ok(output as Arc<dyn AudioSink>)
    }

    #[cfg(not(feature = "output"))]
    fn open_output(&self) -> Result<Arc<dyn AudioSink>> {
        Err(chordboard_audio::Error::OutputUnavailable(
            "audio output support not compiled in".to_string(),
        )
        .into())
    }

    /// Release all voices and drop the output device.
    pub fn disable_audio(&self) {
        let mut audio = self.audio.lock();
        if let Some(manager) = audio.as_mut() {
            manager.disable();
        }
        *audio = None;
    }

    /// Switch instruments. The load runs on a worker thread; when several
    /// switches overlap, only the most recent request's backend is installed.
    pub fn set_instrument(&self, id: &str) -> Result<()> {
        let (token, sink) = {
            let mut audio = self.audio.lock();
            let manager = audio
                .as_mut()
                .ok_or(chordboard_audio::Error::Disabled)?;
            (manager.begin_switch(id)?, manager.sink())
        };

        let audio = Arc::clone(&self.audio);
        let loader = Arc::clone(&self.loader);
        std::thread::Builder::new()
            .name("chordboard-instrument-load".to_string())
            .spawn(move || {
                let result = loader.load(token.descriptor(), &sink);
                if let Some(manager) = audio.lock().as_mut() {
                    let _ = manager.complete_switch(token, result);
                }
            })
            .map_err(crate::Error::Io)?;
        Ok(())
    }

    /// Playback volume in percent (0-100).
    pub fn set_volume(&self, volume: u8) {
        if let Some(manager) = self.audio.lock().as_mut() {
            manager.set_volume(volume);
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        match self.audio.lock().as_ref() {
            Some(manager) => manager.state(),
            None => PlaybackState::disabled(),
        }
    }

    /// The selectable instrument catalog.
    pub fn instruments(&self) -> &'static [InstrumentDescriptor] {
        CATALOG
    }
}

fn spawn_detection_thread(
    events: Receiver<NoteEvent>,
    registry: Arc<NoteRegistry>,
    chord: Arc<ArcSwapOption<ChordCandidate>>,
) {
    std::thread::Builder::new()
        .name("chordboard-detect".to_string())
        .spawn(move || {
            while events.recv().is_ok() {
                let notes = registry.snapshot();
                chord.store(chordboard_theory::detect(&notes).map(Arc::new));
            }
            debug!("detection thread exiting");
        })
        .expect("Failed to spawn detection thread");
}

fn spawn_playback_thread(events: Receiver<NoteEvent>, audio: Arc<Mutex<Option<VoiceManager>>>) {
    std::thread::Builder::new()
        .name("chordboard-playback".to_string())
        .spawn(move || {
            while let Ok(event) = events.recv() {
                let mut audio = audio.lock();
                let Some(manager) = audio.as_mut() else {
                    continue;
                };
                match event.kind {
                    NoteKind::On => manager.play_note(event.note, event.velocity),
                    NoteKind::Off => manager.stop_note(event.note),
                }
            }
            debug!("playback thread exiting");
        })
        .expect("Failed to spawn playback thread");
}
