//! Instrument loading: WAV sample banks from disk, synth construction.
//!
//! Sampled instruments live under `<sample_root>/<instrument-id>/` as WAV
//! files named by MIDI note number (e.g. `60.wav` for the middle-C anchor).
//! Decoded files are cached so switching back to an instrument is cheap.

use crate::backend::{InstrumentBackend, SampledBackend, SynthBackend};
use crate::catalog::InstrumentDescriptor;
use crate::error::{Error, Result};
use crate::sink::AudioSink;
use crate::BackendKind;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One decoded sample: mono frames at the source rate.
#[derive(Debug)]
pub struct SampleData {
    pub frames: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

/// Anchor-note indexed sample collection for one instrument.
#[derive(Debug, Default)]
pub struct SampleBank {
    samples: BTreeMap<u8, Arc<SampleData>>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: u8, sample: Arc<SampleData>) {
        self.samples.insert(note, sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The anchor closest to `note` (lower anchor wins a tie).
    pub fn nearest(&self, note: u8) -> Option<(u8, &Arc<SampleData>)> {
        self.samples
            .iter()
            .min_by_key(|(&anchor, _)| (anchor as i16 - note as i16).abs())
            .map(|(&anchor, sample)| (anchor, sample))
    }
}

/// Constructs a ready-to-play backend for a catalog entry.
///
/// Loads run off the manager lock; the generation counter decides whether the
/// result is installed or discarded.
pub trait InstrumentLoader: Send + Sync {
    fn load(
        &self,
        descriptor: &InstrumentDescriptor,
        sink: &Arc<dyn AudioSink>,
    ) -> Result<Box<dyn InstrumentBackend>>;
}

/// Loads sample banks from a directory tree, with a decode cache.
pub struct DirectoryLoader {
    sample_root: PathBuf,
    cache: DashMap<PathBuf, Arc<SampleData>>,
}

impl DirectoryLoader {
    pub fn new(sample_root: impl Into<PathBuf>) -> Self {
        Self {
            sample_root: sample_root.into(),
            cache: DashMap::new(),
        }
    }

    fn load_bank(&self, id: &str) -> Result<SampleBank> {
        let dir = self.sample_root.join(id);
        let entries = std::fs::read_dir(&dir).map_err(|e| Error::InstrumentLoadFailed {
            id: id.to_string(),
            reason: format!("{}: {e}", dir.display()),
        })?;

        let mut bank = SampleBank::new();
        for entry in entries {
            let path = entry.map_err(Error::Io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            let Some(note) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u8>().ok())
                .filter(|&n| n <= 127)
            else {
                debug!("skipping sample with non-note name: {}", path.display());
                continue;
            };

            let sample = match self.cache.get(&path) {
                Some(cached) => Arc::clone(&cached),
                None => {
                    let decoded = Arc::new(decode_wav(&path)?);
                    self.cache.insert(path.clone(), Arc::clone(&decoded));
                    decoded
                }
            };
            bank.insert(note, sample);
        }

        if bank.is_empty() {
            return Err(Error::InstrumentLoadFailed {
                id: id.to_string(),
                reason: format!("no samples in {}", dir.display()),
            });
        }
        info!("loaded {} samples for instrument '{id}'", bank.len());
        Ok(bank)
    }
}

impl InstrumentLoader for DirectoryLoader {
    fn load(
        &self,
        descriptor: &InstrumentDescriptor,
        sink: &Arc<dyn AudioSink>,
    ) -> Result<Box<dyn InstrumentBackend>> {
        match descriptor.kind {
            BackendKind::Synthesized => Ok(Box::new(SynthBackend::new(Arc::clone(sink)))),
            BackendKind::Sampled => {
                let bank = self.load_bank(descriptor.id)?;
                Ok(Box::new(SampledBackend::new(Arc::clone(sink), bank)))
            }
        }
    }
}

/// Decode a WAV file to mono f32 frames.
fn decode_wav(path: &Path) -> Result<SampleData> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let frames: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(SampleData {
        frames: Arc::new(frames),
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::sink::NullAudioSink;
    use tempfile::TempDir;

    fn write_test_wav(path: &Path, frames: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 128) as i16 * 256).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn null_sink() -> Arc<dyn AudioSink> {
        Arc::new(NullAudioSink::new())
    }

    #[test]
    fn test_missing_directory_fails_load() {
        let root = TempDir::new().unwrap();
        let loader = DirectoryLoader::new(root.path());
        let descriptor = catalog::find("grand-piano").unwrap();

        let err = loader.load(descriptor, &null_sink()).unwrap_err();
        assert!(matches!(err, Error::InstrumentLoadFailed { .. }));
    }

    #[test]
    fn test_synth_load_never_touches_disk() {
        let loader = DirectoryLoader::new("/nonexistent");
        let descriptor = catalog::find("polysynth").unwrap();
        let backend = loader.load(descriptor, &null_sink()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Synthesized);
    }

    #[test]
    fn test_sampled_load_builds_bank() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("grand-piano");
        std::fs::create_dir(&dir).unwrap();
        write_test_wav(&dir.join("60.wav"), 1000);
        write_test_wav(&dir.join("72.wav"), 1000);
        std::fs::write(dir.join("README.txt"), "not a sample").unwrap();

        let loader = DirectoryLoader::new(root.path());
        let descriptor = catalog::find("grand-piano").unwrap();
        let backend = loader.load(descriptor, &null_sink()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Sampled);
    }

    #[test]
    fn test_bank_nearest_anchor() {
        let mut bank = SampleBank::new();
        let sample = Arc::new(SampleData {
            frames: Arc::new(vec![0.0; 16]),
            sample_rate: 44_100,
        });
        bank.insert(48, Arc::clone(&sample));
        bank.insert(60, sample);

        assert_eq!(bank.nearest(50).unwrap().0, 48);
        assert_eq!(bank.nearest(58).unwrap().0, 60);
        assert_eq!(bank.nearest(54).unwrap().0, 48);
        assert_eq!(bank.nearest(100).unwrap().0, 60);
    }
}
