//! # Chordboard - Live MIDI Chord Detection and Playback
//!
//! Umbrella crate that coordinates:
//! - **chordboard-midi** - MIDI input (device enumeration, hot-plug, note registry)
//! - **chordboard-theory** - Music theory (pitch helpers, chord templates, detection)
//! - **chordboard-audio** - Playback (instrument backends, voice manager, cpal output)
//!
//! ## Quick Start
//!
//! ```ignore
//! use chordboard::prelude::*;
//!
//! let engine = ChordboardEngine::builder().build()?;
//!
//! // Request MIDI access and bind the first input device.
//! engine.connect()?;
//!
//! // Audio starts on demand (typically from a user gesture).
//! engine.enable_audio()?;
//!
//! // Poll the detection result as notes come in.
//! if let Some(chord) = engine.chord() {
//!     println!("{} ({:?})", chord.name, chord.quality);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware MIDI input and audio output
//! - `midi-io` - Hardware MIDI input via midir
//! - `output` - Audio output via cpal
//!
//! Without either feature the engine still runs: events can be injected
//! through [`ChordboardEngine::inject`] and audio routed into a custom
//! [`AudioSink`], which is how headless hosts and tests drive it.

/// Re-export of chordboard-midi for direct access
pub use chordboard_midi as midi;

pub use chordboard_midi::{MidiInputDevice, MidiListener, NoteEvent, NoteKind, NoteRegistry};

/// Re-export of chordboard-theory for direct access
pub use chordboard_theory as theory;

pub use chordboard_theory::{detect, ChordCandidate, Quality};

/// Re-export of chordboard-audio for direct access
pub use chordboard_audio as audio;

pub use chordboard_audio::{
    AudioSink, BackendKind, DirectoryLoader, InstrumentDescriptor, InstrumentLoader,
    NullAudioSink, PlaybackState, VoiceManager, CATALOG, DEFAULT_INSTRUMENT_ID,
};

#[cfg(feature = "output")]
pub use chordboard_audio::CpalOutput;

mod builder;
mod engine;
mod error;

pub use builder::ChordboardEngineBuilder;
pub use engine::ChordboardEngine;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{ChordboardEngine, ChordboardEngineBuilder};

    // Essential types
    pub use crate::{ChordCandidate, NoteEvent, PlaybackState, Quality};

    // MIDI
    pub use crate::midi::{MidiInputDevice, MidiListener};

    // Audio
    pub use crate::audio::{AudioSink, InstrumentDescriptor};
}
