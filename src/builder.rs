//! Builder for configuring and constructing a `ChordboardEngine`.

use crate::{ChordboardEngine, Result};
use chordboard_audio::{AudioSink, DirectoryLoader, InstrumentLoader, DEFAULT_INSTRUMENT_ID};
use chordboard_midi::MidiListener;
use std::path::PathBuf;
use std::sync::Arc;

/// Audio stays disabled until `engine.enable_audio()` and MIDI access is
/// only requested on `engine.connect()`, so `build` itself touches no
/// hardware unless `auto_connect` is set.
///
/// # Example
///
/// ```ignore
/// use chordboard::prelude::*;
///
/// let engine = ChordboardEngine::builder()
///     .sample_root("assets/samples")
///     .default_instrument("electric-piano")
///     .build()?;
/// ```
pub struct ChordboardEngineBuilder {
    sample_root: PathBuf,
    default_instrument: String,
    auto_connect: bool,
    sink: Option<Arc<dyn AudioSink>>,
    loader: Option<Arc<dyn InstrumentLoader>>,
}

impl Default for ChordboardEngineBuilder {
    fn default() -> Self {
        Self {
            sample_root: PathBuf::from("assets/samples"),
            default_instrument: DEFAULT_INSTRUMENT_ID.to_string(),
            auto_connect: false,
            sink: None,
            loader: None,
        }
    }
}

impl ChordboardEngineBuilder {
    /// Directory holding one subdirectory of WAV samples per instrument.
    /// Default: `assets/samples`
    pub fn sample_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sample_root = root.into();
        self
    }

    /// Instrument loaded by `enable_audio`. Default: `grand-piano`
    pub fn default_instrument(mut self, id: impl Into<String>) -> Self {
        self.default_instrument = id.into();
        self
    }

    /// Request MIDI access during `build` instead of waiting for `connect`.
    pub fn auto_connect(mut self) -> Self {
        self.auto_connect = true;
        self
    }

    /// Route audio commands into a custom sink instead of opening the output
    /// device. Intended for headless hosts and tests.
    pub fn sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the sample-directory instrument loader.
    pub fn loader(mut self, loader: Arc<dyn InstrumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<ChordboardEngine> {
        let listener = MidiListener::new();
        if self.auto_connect {
            listener.connect()?;
        }

        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(DirectoryLoader::new(self.sample_root)));

        Ok(ChordboardEngine::new(
            listener,
            loader,
            self.sink,
            self.default_instrument,
        ))
    }
}
