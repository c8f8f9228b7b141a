//! Instrument backends behind a uniform start/stop/volume surface.
//!
//! The voice manager programs only against [`InstrumentBackend`]; the two
//! variants differ in their velocity units and release addressing:
//!
//! - Synthesized: gain in 0-1 with a 0.1 floor, frequency-addressed release,
//!   global volume as a master dB gain.
//! - Sampled: velocity 10-127, per-voice stop handles, volume applied as
//!   velocity scaling on future notes only.

use crate::loader::SampleBank;
use crate::sink::{AudioSink, VoiceCommand};
use chordboard_theory::note_to_hz;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// The concrete rendering strategy behind an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendKind {
    Sampled,
    Synthesized,
}

/// Backend-issued stop handle for one live voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHandle {
    pub id: u64,
}

/// Uniform capability surface over sampled and synthesized rendering.
pub trait InstrumentBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Start a voice. Velocity is the raw MIDI byte (0-127). Returns a stop
    /// handle when the backend addresses voices individually.
    fn start_note(&mut self, note: u8, velocity: u8) -> Option<VoiceHandle>;

    /// Stop a voice. A missing handle is a no-op, not an error.
    fn stop_note(&mut self, note: u8, handle: Option<VoiceHandle>);

    fn release_all(&mut self);

    /// Volume in percent (0-100).
    fn set_volume(&mut self, volume: u8);
}

impl std::fmt::Debug for dyn InstrumentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentBackend")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Gain floor so a synthesized note-on at velocity 0 stays audible.
pub const SYNTH_GAIN_FLOOR: f32 = 0.1;

/// Velocity floor so sampled notes never fall below audibility.
pub const SAMPLE_VELOCITY_FLOOR: u8 = 10;

/// Synthesized velocity mapping: 0-127 -> gain in [0.1, 1.0].
#[inline]
pub fn synth_gain(velocity: u8) -> f32 {
    (velocity.min(127) as f32 / 127.0).max(SYNTH_GAIN_FLOOR)
}

/// Sampled velocity mapping: clamp into [10, 127].
#[inline]
pub fn sample_velocity(velocity: u8) -> u8 {
    velocity.clamp(SAMPLE_VELOCITY_FLOOR, 127)
}

/// Volume percent (0-100) to decibels: linear over [-60, 0], 0 -> -inf.
pub fn volume_to_db(volume: u8) -> f32 {
    if volume == 0 {
        f32::NEG_INFINITY
    } else {
        let v = volume.min(100) as f32;
        -60.0 + 60.0 * v / 100.0
    }
}

/// Additive sine synthesizer voices rendered by the output mixer.
pub struct SynthBackend {
    sink: Arc<dyn AudioSink>,
    next_voice: u64,
}

impl SynthBackend {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            next_voice: 1,
        }
    }
}

impl InstrumentBackend for SynthBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Synthesized
    }

    fn start_note(&mut self, note: u8, velocity: u8) -> Option<VoiceHandle> {
        let id = self.next_voice;
        self.next_voice += 1;
        self.sink.send(VoiceCommand::StartOsc {
            id,
            freq: note_to_hz(note),
            gain: synth_gain(velocity),
        });
        // Releases are frequency-addressed; no per-voice handle.
        None
    }

    fn stop_note(&mut self, note: u8, _handle: Option<VoiceHandle>) {
        self.sink.send(VoiceCommand::ReleaseOsc {
            freq: note_to_hz(note),
        });
    }

    fn release_all(&mut self) {
        self.sink.send(VoiceCommand::ReleaseAll);
    }

    fn set_volume(&mut self, volume: u8) {
        self.sink.send(VoiceCommand::SetSynthDb(volume_to_db(volume)));
    }
}

/// Sample-bank playback with nearest-anchor repitch.
pub struct SampledBackend {
    sink: Arc<dyn AudioSink>,
    bank: SampleBank,
    next_voice: u64,
    /// Volume applied as velocity scaling on future notes; sampled output
    /// has no master gain to adjust after the fact.
    velocity_scale: f32,
}

impl SampledBackend {
    pub fn new(sink: Arc<dyn AudioSink>, bank: SampleBank) -> Self {
        Self {
            sink,
            bank,
            next_voice: 1,
            velocity_scale: 1.0,
        }
    }
}

impl InstrumentBackend for SampledBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sampled
    }

    fn start_note(&mut self, note: u8, velocity: u8) -> Option<VoiceHandle> {
        let Some((anchor, sample)) = self.bank.nearest(note) else {
            debug!("no sample anchor for note {note}");
            return None;
        };

        let semitones = note as f64 - anchor as f64;
        let step =
            (sample.sample_rate as f64 / self.sink.sample_rate()) * (semitones / 12.0).exp2();
        let gain = (sample_velocity(velocity) as f32 / 127.0) * self.velocity_scale;

        let id = self.next_voice;
        self.next_voice += 1;
        self.sink.send(VoiceCommand::StartSample {
            id,
            frames: Arc::clone(&sample.frames),
            step,
            gain,
        });
        Some(VoiceHandle { id })
    }

    fn stop_note(&mut self, _note: u8, handle: Option<VoiceHandle>) {
        if let Some(handle) = handle {
            self.sink.send(VoiceCommand::StopVoice { id: handle.id });
        }
    }

    fn release_all(&mut self) {
        self.sink.send(VoiceCommand::ReleaseAll);
    }

    fn set_volume(&mut self, volume: u8) {
        self.velocity_scale = volume.min(100) as f32 / 100.0;
    }
}
