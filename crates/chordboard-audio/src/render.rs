//! Voice mixer driven by the output callback.
//!
//! Voices carry a linear attack/release envelope to avoid clicks. Oscillator
//! voices are additionally scaled by the master synth gain; sample voices are
//! not (the sampled backend applies volume per note via velocity scaling).

use crate::sink::VoiceCommand;
use std::sync::Arc;

const ATTACK_SECONDS: f64 = 0.005;
const RELEASE_SECONDS: f64 = 0.05;

enum VoiceSource {
    Osc { freq: f32, phase: f32 },
    Sample {
        frames: Arc<Vec<f32>>,
        pos: f64,
        step: f64,
    },
}

struct RenderVoice {
    id: u64,
    source: VoiceSource,
    gain: f32,
    envelope: f32,
    released: bool,
    finished: bool,
}

pub(crate) struct Mixer {
    voices: Vec<RenderVoice>,
    synth_gain: f32,
    sample_rate: f64,
    channels: usize,
    attack_step: f32,
    release_step: f32,
}

impl Mixer {
    pub(crate) fn new(sample_rate: f64, channels: usize) -> Self {
        Self {
            voices: Vec::with_capacity(64),
            synth_gain: 1.0,
            sample_rate,
            channels: channels.max(1),
            attack_step: (1.0 / (ATTACK_SECONDS * sample_rate)) as f32,
            release_step: (1.0 / (RELEASE_SECONDS * sample_rate)) as f32,
        }
    }

    pub(crate) fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::StartOsc { id, freq, gain } => self.voices.push(RenderVoice {
                id,
                source: VoiceSource::Osc { freq, phase: 0.0 },
                gain,
                envelope: 0.0,
                released: false,
                finished: false,
            }),
            VoiceCommand::StartSample {
                id,
                frames,
                step,
                gain,
            } => self.voices.push(RenderVoice {
                id,
                source: VoiceSource::Sample {
                    frames,
                    pos: 0.0,
                    step,
                },
                gain,
                envelope: 0.0,
                released: false,
                finished: false,
            }),
            VoiceCommand::ReleaseOsc { freq } => {
                for voice in &mut self.voices {
                    if let VoiceSource::Osc { freq: f, .. } = voice.source {
                        if (f - freq).abs() < 0.5 {
                            voice.released = true;
                        }
                    }
                }
            }
            VoiceCommand::StopVoice { id } => {
                for voice in &mut self.voices {
                    if voice.id == id {
                        voice.released = true;
                    }
                }
            }
            VoiceCommand::ReleaseAll => {
                for voice in &mut self.voices {
                    voice.released = true;
                }
            }
            VoiceCommand::SetSynthDb(db) => {
                self.synth_gain = db_to_gain(db);
            }
        }
    }

    /// Fill an interleaved output buffer.
    pub(crate) fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let frames = out.len() / self.channels;

        for voice in &mut self.voices {
            let master = match voice.source {
                VoiceSource::Osc { .. } => self.synth_gain,
                VoiceSource::Sample { .. } => 1.0,
            };

            for frame in 0..frames {
                if voice.released {
                    voice.envelope -= self.release_step;
                    if voice.envelope <= 0.0 {
                        voice.finished = true;
                        break;
                    }
                } else if voice.envelope < 1.0 {
                    voice.envelope = (voice.envelope + self.attack_step).min(1.0);
                }

                let value = match &mut voice.source {
                    VoiceSource::Osc { freq, phase } => {
                        let v = (std::f32::consts::TAU * *phase).sin();
                        *phase += *freq / self.sample_rate as f32;
                        if *phase >= 1.0 {
                            *phase -= 1.0;
                        }
                        v
                    }
                    VoiceSource::Sample { frames, pos, step } => {
                        let i = *pos as usize;
                        if i + 1 >= frames.len() {
                            voice.finished = true;
                            break;
                        }
                        let frac = (*pos - i as f64) as f32;
                        let v = frames[i] * (1.0 - frac) + frames[i + 1] * frac;
                        *pos += *step;
                        v
                    }
                };

                let scaled = value * voice.gain * voice.envelope * master;
                let base = frame * self.channels;
                for ch in 0..self.channels {
                    out[base + ch] += scaled;
                }
            }
        }

        self.voices.retain(|v| !v.finished);
    }

    #[cfg(test)]
    fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

/// Linear gain from decibels; `-inf` maps to hard silence.
pub fn db_to_gain(db: f32) -> f32 {
    if db == f32::NEG_INFINITY {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}
