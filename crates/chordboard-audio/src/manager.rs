//! The voice manager: one active backend, one handle per sounding note.
//!
//! Instrument switches are guarded by a monotonic generation counter:
//! `begin_switch` hands out a token, and `complete_switch` installs the
//! loaded backend only if no newer switch began in the meantime
//! (last-request-wins). Note events that arrive while a load is pending are
//! dropped, not queued.

use crate::backend::{InstrumentBackend, VoiceHandle};
use crate::catalog::{self, InstrumentDescriptor, SYNTH_FALLBACK_ID};
use crate::error::{Error, Result};
use crate::loader::InstrumentLoader;
use crate::sink::AudioSink;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// UI-facing playback state tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub is_enabled: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub instrument: Option<&'static str>,
    pub volume: u8,
}

impl PlaybackState {
    pub fn disabled() -> Self {
        Self {
            is_enabled: false,
            is_loading: false,
            error: None,
            instrument: None,
            volume: 100,
        }
    }
}

/// Token tying an in-flight instrument load to the switch that started it.
#[derive(Debug, Clone, Copy)]
pub struct SwitchToken {
    generation: u64,
    descriptor: &'static InstrumentDescriptor,
}

impl SwitchToken {
    pub fn descriptor(&self) -> &'static InstrumentDescriptor {
        self.descriptor
    }
}

pub struct VoiceManager {
    sink: Arc<dyn AudioSink>,
    loader: Arc<dyn InstrumentLoader>,
    backend: Option<Box<dyn InstrumentBackend>>,
    /// note -> stop handle for the live voice; `None` for backends that
    /// address releases without handles. Last writer wins on duplicate
    /// note-on, after releasing the previous voice.
    voices: HashMap<u8, Option<VoiceHandle>>,
    generation: u64,
    enabled: bool,
    loading: bool,
    volume: u8,
    error: Option<String>,
    instrument: Option<&'static str>,
}

impl VoiceManager {
    pub fn new(sink: Arc<dyn AudioSink>, loader: Arc<dyn InstrumentLoader>) -> Self {
        Self {
            sink,
            loader,
            backend: None,
            voices: HashMap::new(),
            generation: 0,
            enabled: false,
            loading: false,
            volume: 100,
            error: None,
            instrument: None,
        }
    }

    /// Enable playback and load `default_id`. A failed sampled load degrades
    /// to the synthesized fallback so the system stays usable; the actually
    /// active instrument is observable through [`PlaybackState::instrument`].
    pub fn enable(&mut self, default_id: &str) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        let descriptor = catalog::find(default_id)
            .ok_or_else(|| Error::UnknownInstrument(default_id.to_string()))?;

        self.enabled = true;
        match self.loader.load(descriptor, &self.sink) {
            Ok(backend) => {
                self.install(descriptor, backend);
                Ok(())
            }
            Err(e) => {
                warn!("default instrument failed to load, falling back to synth: {e}");
                let fallback = catalog::find(SYNTH_FALLBACK_ID)
                    .ok_or_else(|| Error::UnknownInstrument(SYNTH_FALLBACK_ID.to_string()))?;
                match self.loader.load(fallback, &self.sink) {
                    Ok(backend) => {
                        self.install(fallback, backend);
                        Ok(())
                    }
                    Err(e) => {
                        self.enabled = false;
                        self.error = Some(e.to_string());
                        Err(e)
                    }
                }
            }
        }
    }

    fn install(&mut self, descriptor: &'static InstrumentDescriptor, mut backend: Box<dyn InstrumentBackend>) {
        backend.set_volume(self.volume);
        self.backend = Some(backend);
        self.instrument = Some(descriptor.id);
        self.error = None;
        info!("instrument active: {}", descriptor.id);
    }

    /// Start an instrument switch: release everything, bump the generation,
    /// and hand out the token the eventual `complete_switch` must present.
    pub fn begin_switch(&mut self, id: &str) -> Result<SwitchToken> {
        if !self.enabled {
            return Err(Error::Disabled);
        }
        let descriptor =
            catalog::find(id).ok_or_else(|| Error::UnknownInstrument(id.to_string()))?;

        self.release_all_voices();
        self.backend = None;
        self.instrument = None;
        self.loading = true;
        self.error = None;
        self.generation += 1;

        Ok(SwitchToken {
            generation: self.generation,
            descriptor,
        })
    }

    /// Install a finished load, or discard it if a newer switch superseded
    /// it. Returns `Ok(true)` when installed, `Ok(false)` when discarded as
    /// stale, and the load error (also recorded in state) on failure.
    pub fn complete_switch(
        &mut self,
        token: SwitchToken,
        result: Result<Box<dyn InstrumentBackend>>,
    ) -> Result<bool> {
        if token.generation != self.generation {
            debug!(
                "discarding stale load of '{}' (generation {} < {})",
                token.descriptor.id, token.generation, self.generation
            );
            if let Ok(mut backend) = result {
                backend.release_all();
            }
            return Ok(false);
        }

        self.loading = false;
        match result {
            Ok(backend) => {
                self.install(token.descriptor, backend);
                Ok(true)
            }
            Err(e) => {
                // The outgoing backend's voices are already cleared; playback
                // stays silent until the user retries.
                warn!("instrument switch to '{}' failed: {e}", token.descriptor.id);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Synchronous switch convenience; the umbrella engine prefers
    /// begin/complete with the load on a worker thread.
    pub fn set_instrument(&mut self, id: &str) -> Result<()> {
        let token = self.begin_switch(id)?;
        let result = self.loader.load(token.descriptor, &self.sink);
        self.complete_switch(token, result).map(|_| ())
    }

    /// Start a voice. Dropped (with a debug log) while disabled or loading.
    pub fn play_note(&mut self, note: u8, velocity: u8) {
        let Some(backend) = self.backend.as_mut() else {
            debug!("dropping note {note}: no active backend");
            return;
        };

        // Repeated note-on before note-off: release the old voice first,
        // then overwrite the handle.
        if let Some(previous) = self.voices.remove(&note) {
            backend.stop_note(note, previous);
        }
        let handle = backend.start_note(note, velocity);
        self.voices.insert(note, handle);
    }

    /// Release a voice. Unknown notes are a no-op.
    pub fn stop_note(&mut self, note: u8) {
        let handle = self.voices.remove(&note).flatten();
        if let Some(backend) = self.backend.as_mut() {
            backend.stop_note(note, handle);
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if let Some(backend) = self.backend.as_mut() {
            backend.set_volume(self.volume);
        }
    }

    /// Force-release all voices and drop the backend.
    pub fn disable(&mut self) {
        self.release_all_voices();
        self.backend = None;
        self.enabled = false;
        self.loading = false;
        self.instrument = None;
    }

    fn release_all_voices(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.release_all();
        }
        self.voices.clear();
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            is_enabled: self.enabled,
            is_loading: self.loading,
            error: self.error.clone(),
            instrument: self.instrument,
            volume: self.volume,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn sink(&self) -> Arc<dyn AudioSink> {
        Arc::clone(&self.sink)
    }

    pub fn loader(&self) -> Arc<dyn InstrumentLoader> {
        Arc::clone(&self.loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, SynthBackend};
    use crate::loader::DirectoryLoader;
    use crate::sink::{NullAudioSink, VoiceCommand};
    use tempfile::TempDir;

    struct Fixture {
        sink: Arc<NullAudioSink>,
        manager: VoiceManager,
        _root: TempDir,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().unwrap();
        let sink = Arc::new(NullAudioSink::new());
        let loader = Arc::new(DirectoryLoader::new(root.path()));
        let manager = VoiceManager::new(
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            loader as Arc<dyn InstrumentLoader>,
        );
        Fixture {
            sink,
            manager,
            _root: root,
        }
    }

    #[test]
    fn test_enable_falls_back_to_synth_when_samples_missing() {
        let mut f = fixture();
        f.manager.enable("grand-piano").unwrap();

        let state = f.manager.state();
        assert!(state.is_enabled);
        // The fallback is observable, not silent.
        assert_eq!(state.instrument, Some("polysynth"));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_enable_unknown_instrument() {
        let mut f = fixture();
        assert!(matches!(
            f.manager.enable("theremin"),
            Err(Error::UnknownInstrument(_))
        ));
        assert!(!f.manager.is_enabled());
    }

    #[test]
    fn test_notes_dropped_until_enabled() {
        let mut f = fixture();
        f.manager.play_note(60, 100);
        assert_eq!(f.manager.active_voice_count(), 0);
        assert!(f.sink.is_empty());
    }

    #[test]
    fn test_duplicate_note_on_releases_previous_voice() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.sink.drain();

        f.manager.play_note(60, 100);
        f.manager.play_note(60, 80);
        assert_eq!(f.manager.active_voice_count(), 1);

        let commands = f.sink.drain();
        // start, release-of-first, start: no leaked second voice.
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], VoiceCommand::StartOsc { .. }));
        assert!(matches!(commands[1], VoiceCommand::ReleaseOsc { .. }));
        assert!(matches!(commands[2], VoiceCommand::StartOsc { .. }));
    }

    #[test]
    fn test_stop_unknown_note_is_noop() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.manager.stop_note(60);
        assert_eq!(f.manager.active_voice_count(), 0);
    }

    #[test]
    fn test_switch_race_last_request_wins() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        let sink = f.manager.sink();

        let token_a = f.manager.begin_switch("polysynth").unwrap();
        let token_b = f.manager.begin_switch("polysynth").unwrap();

        // A resolves first: stale, discarded.
        let backend_a: Result<Box<dyn InstrumentBackend>> =
            Ok(Box::new(SynthBackend::new(Arc::clone(&sink))));
        assert!(!f.manager.complete_switch(token_a, backend_a).unwrap());
        assert!(f.manager.is_loading());

        let backend_b: Result<Box<dyn InstrumentBackend>> =
            Ok(Box::new(SynthBackend::new(sink)));
        assert!(f.manager.complete_switch(token_b, backend_b).unwrap());
        assert!(!f.manager.is_loading());
        assert_eq!(f.manager.state().instrument, Some("polysynth"));
    }

    #[test]
    fn test_switch_race_reversed_completion_order() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        let sink = f.manager.sink();

        let token_a = f.manager.begin_switch("polysynth").unwrap();
        let token_b = f.manager.begin_switch("polysynth").unwrap();

        // B resolves first and is installed; A arrives later and must not
        // clobber it.
        let backend_b: Result<Box<dyn InstrumentBackend>> =
            Ok(Box::new(SynthBackend::new(Arc::clone(&sink))));
        assert!(f.manager.complete_switch(token_b, backend_b).unwrap());

        let backend_a: Result<Box<dyn InstrumentBackend>> =
            Ok(Box::new(SynthBackend::new(sink)));
        assert!(!f.manager.complete_switch(token_a, backend_a).unwrap());
        assert_eq!(f.manager.state().instrument, Some("polysynth"));
        assert!(!f.manager.is_loading());
    }

    #[test]
    fn test_notes_dropped_while_loading() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.sink.drain();

        let _token = f.manager.begin_switch("polysynth").unwrap();
        f.manager.play_note(60, 100);
        assert_eq!(f.manager.active_voice_count(), 0);

        // Only the release-all from begin_switch, no note start.
        let commands = f.sink.drain();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], VoiceCommand::ReleaseAll));
    }

    #[test]
    fn test_failed_switch_leaves_no_backend_until_retry() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();

        // grand-piano has no samples in the empty fixture root.
        assert!(f.manager.set_instrument("grand-piano").is_err());
        let state = f.manager.state();
        assert!(state.error.is_some());
        assert!(state.instrument.is_none());
        assert!(!state.is_loading);

        // Retry with a loadable instrument recovers.
        f.manager.set_instrument("polysynth").unwrap();
        assert_eq!(f.manager.state().instrument, Some("polysynth"));
        assert!(f.manager.state().error.is_none());
    }

    #[test]
    fn test_switch_releases_held_voices() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.manager.play_note(60, 100);
        f.manager.play_note(64, 100);
        assert_eq!(f.manager.active_voice_count(), 2);

        let _ = f.manager.set_instrument("polysynth");
        assert_eq!(f.manager.active_voice_count(), 0);
    }

    #[test]
    fn test_volume_reapplied_to_new_backend() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.manager.set_volume(0);
        f.sink.drain();

        f.manager.set_instrument("polysynth").unwrap();
        let commands = f.sink.drain();
        assert!(commands.iter().any(|c| matches!(
            c,
            VoiceCommand::SetSynthDb(db) if *db == f32::NEG_INFINITY
        )));
    }

    #[test]
    fn test_disable_clears_everything() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.manager.play_note(60, 100);
        f.manager.disable();

        let state = f.manager.state();
        assert!(!state.is_enabled);
        assert!(state.instrument.is_none());
        assert_eq!(f.manager.active_voice_count(), 0);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut f = fixture();
        f.manager.enable("polysynth").unwrap();
        f.manager.enable("grand-piano").unwrap();
        assert_eq!(f.manager.state().instrument, Some("polysynth"));
    }

    #[test]
    fn test_switch_requires_enable() {
        let mut f = fixture();
        assert!(matches!(
            f.manager.begin_switch("polysynth"),
            Err(Error::Disabled)
        ));
        assert_eq!(
            catalog::find("polysynth").unwrap().kind,
            BackendKind::Synthesized
        );
    }
}
