//! Audio playback for chordboard: instrument backends, voice management,
//! and a cpal output device.
//!
//! The crate is split along one seam: everything above [`AudioSink`] decides
//! *what* should sound (backends, the voice manager), everything below it
//! decides *how* (the mixer inside the cpal callback). Tests run entirely
//! above the seam with [`NullAudioSink`].
//!
//! The `output` feature (on by default) pulls in cpal and the real device;
//! without it the crate still builds for headless and test use.

pub mod error;

mod backend;
mod catalog;
mod loader;
mod manager;
#[cfg(feature = "output")]
mod output;
mod render;
mod sink;

pub use backend::{
    sample_velocity, synth_gain, volume_to_db, BackendKind, InstrumentBackend, SampledBackend,
    SynthBackend, VoiceHandle, SAMPLE_VELOCITY_FLOOR, SYNTH_GAIN_FLOOR,
};
pub use catalog::{find, InstrumentDescriptor, CATALOG, DEFAULT_INSTRUMENT_ID, SYNTH_FALLBACK_ID};
pub use error::{Error, Result};
pub use loader::{DirectoryLoader, InstrumentLoader, SampleBank, SampleData};
pub use manager::{PlaybackState, SwitchToken, VoiceManager};
#[cfg(feature = "output")]
pub use output::CpalOutput;
pub use render::db_to_gain;
pub use sink::{AudioSink, NullAudioSink, VoiceCommand};
