//! The seam between instrument backends and the output device.
//!
//! Backends never touch cpal directly; they emit [`VoiceCommand`]s into an
//! [`AudioSink`] handed to them at construction. The real sink is
//! `CpalOutput` (behind the `output` feature); [`NullAudioSink`] records
//! commands for tests and headless use.

use parking_lot::Mutex;
use std::sync::Arc;

/// Commands consumed by the render side.
#[derive(Debug, Clone)]
pub enum VoiceCommand {
    /// Start a synthesized oscillator voice.
    StartOsc { id: u64, freq: f32, gain: f32 },
    /// Frequency-addressed release for synthesized voices.
    ReleaseOsc { freq: f32 },
    /// Start a sample playback voice. `step` is the per-frame position
    /// increment (repitch + source/output rate ratio folded together).
    StartSample {
        id: u64,
        frames: Arc<Vec<f32>>,
        step: f64,
        gain: f32,
    },
    /// Release one voice by id (sampled stop handles resolve to this).
    StopVoice { id: u64 },
    /// Release every live voice.
    ReleaseAll,
    /// Master gain for synthesized voices, in dB. `-inf` is silence.
    SetSynthDb(f32),
}

/// Capability handle owning the single audio output path.
pub trait AudioSink: Send + Sync {
    fn send(&self, command: VoiceCommand);
    fn sample_rate(&self) -> f64;
}

/// Records commands instead of rendering them.
#[derive(Debug, Default)]
pub struct NullAudioSink {
    commands: Mutex<Vec<VoiceCommand>>,
}

impl NullAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded commands.
    pub fn drain(&self) -> Vec<VoiceCommand> {
        std::mem::take(&mut self.commands.lock())
    }

    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }
}

impl AudioSink for NullAudioSink {
    fn send(&self, command: VoiceCommand) {
        self.commands.lock().push(command);
    }

    fn sample_rate(&self) -> f64 {
        44_100.0
    }
}
