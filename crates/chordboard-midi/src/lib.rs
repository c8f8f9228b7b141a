//! MIDI input subsystem for Chordboard.
//!
//! Device enumeration, input binding with hot-plug rescans, raw message
//! normalization, and the active note registry.
//!
//! Feature gates: `midi-io` (hardware input via midir). Without it the
//! listener still routes injected events, which is what headless tests use.

pub mod error;
pub use error::{Error, Result};

mod event;
pub use event::{NoteEvent, NoteKind};

mod registry;
pub use registry::NoteRegistry;

mod listener;
pub use listener::{MidiInputDevice, MidiListener};
