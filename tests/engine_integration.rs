//! End-to-end engine tests: injected note events through detection and
//! playback, with audio routed into a recording sink.
//!
//! Run with:
//! ```bash
//! cargo test -p chordboard --test engine_integration
//! ```

use chordboard::audio::VoiceCommand;
use chordboard::prelude::*;
use chordboard::{NoteEvent, NullAudioSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Create a test engine routed into a recording sink, with `sample_root` as
/// the instrument sample directory.
fn test_engine(sample_root: &std::path::Path) -> (ChordboardEngine, Arc<NullAudioSink>) {
    let sink = Arc::new(NullAudioSink::new());
    let engine = ChordboardEngine::builder()
        .sample_root(sample_root)
        .default_instrument("polysynth")
        .sink(Arc::clone(&sink) as Arc<dyn AudioSink>)
        .build()
        .expect("Failed to create test engine");
    (engine, sink)
}

/// Poll until `predicate` holds or the deadline passes. The consumer threads
/// run asynchronously, so state changes are not visible immediately after
/// `inject` returns.
fn wait_for(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

fn write_test_wav(path: &std::path::Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..4096u32 {
        writer.write_sample(((i % 100) as i16 - 50) * 200).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_notes_flow_through_detection_and_playback() {
    let root = TempDir::new().unwrap();
    let (engine, sink) = test_engine(root.path());
    engine.enable_audio().expect("Failed to enable audio");
    sink.drain();

    engine.inject(NoteEvent::on(60, 100));
    engine.inject(NoteEvent::on(64, 96));
    engine.inject(NoteEvent::on(67, 92));

    assert!(wait_for(|| engine.chord().is_some()));
    let chord = engine.chord().unwrap();
    assert_eq!(chord.name, "C");
    assert_eq!(chord.quality, Quality::Major);
    assert_eq!(engine.active_notes(), vec![60, 64, 67]);

    assert!(wait_for(|| sink.len() >= 3));
    let starts = sink
        .drain()
        .iter()
        .filter(|c| matches!(c, VoiceCommand::StartOsc { .. }))
        .count();
    assert_eq!(starts, 3);

    engine.inject(NoteEvent::off(60));
    engine.inject(NoteEvent::off(64));
    engine.inject(NoteEvent::off(67));

    assert!(wait_for(|| engine.chord().is_none()));
    assert!(engine.active_notes().is_empty());
}

#[test]
fn test_detection_works_without_audio() {
    let root = TempDir::new().unwrap();
    let (engine, sink) = test_engine(root.path());

    engine.inject(NoteEvent::on(57, 100));
    engine.inject(NoteEvent::on(60, 100));
    engine.inject(NoteEvent::on(64, 100));

    assert!(wait_for(|| engine.chord().is_some()));
    assert_eq!(engine.chord().unwrap().name, "Am");

    // Playback stays silent until enable_audio.
    assert!(sink.is_empty());
    assert!(!engine.playback_state().is_enabled);
}

#[test]
fn test_velocity_zero_note_on_releases() {
    let root = TempDir::new().unwrap();
    let (engine, _sink) = test_engine(root.path());

    engine.inject(NoteEvent::on(60, 100));
    engine.inject(NoteEvent::on(64, 100));
    assert!(wait_for(|| engine.active_notes().len() == 2));

    // Raw 0x90 with velocity 0 is a release.
    let event = NoteEvent::parse(&[0x90, 64, 0]).unwrap();
    engine.inject(event);
    assert!(wait_for(|| engine.active_notes() == vec![60]));
}

#[test]
fn test_default_instrument_falls_back_to_synth() {
    let root = TempDir::new().unwrap();
    let sink = Arc::new(NullAudioSink::new());
    let engine = ChordboardEngine::builder()
        .sample_root(root.path())
        .sink(Arc::clone(&sink) as Arc<dyn AudioSink>)
        .build()
        .unwrap();

    // grand-piano has no samples under the empty root; the engine degrades
    // to the synth fallback instead of failing enable.
    engine.enable_audio().unwrap();
    let state = engine.playback_state();
    assert!(state.is_enabled);
    assert_eq!(state.instrument, Some("polysynth"));
    assert!(state.error.is_none());
}

#[test]
fn test_overlapping_switches_install_latest_request() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("grand-piano");
    std::fs::create_dir(&dir).unwrap();
    write_test_wav(&dir.join("60.wav"));

    let (engine, _sink) = test_engine(root.path());
    engine.enable_audio().unwrap();

    engine.set_instrument("grand-piano").unwrap();
    engine.set_instrument("polysynth").unwrap();

    assert!(wait_for(|| {
        let state = engine.playback_state();
        !state.is_loading && state.instrument.is_some()
    }));
    assert_eq!(engine.playback_state().instrument, Some("polysynth"));
}

#[test]
fn test_switch_to_sampled_instrument() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("electric-piano");
    std::fs::create_dir(&dir).unwrap();
    write_test_wav(&dir.join("60.wav"));

    let (engine, sink) = test_engine(root.path());
    engine.enable_audio().unwrap();
    engine.set_instrument("electric-piano").unwrap();

    assert!(wait_for(|| {
        engine.playback_state().instrument == Some("electric-piano")
    }));

    sink.drain();
    engine.inject(NoteEvent::on(72, 127));
    assert!(wait_for(|| !sink.is_empty()));
    assert!(sink
        .drain()
        .iter()
        .any(|c| matches!(c, VoiceCommand::StartSample { .. })));
}

#[test]
fn test_unknown_instrument_is_rejected() {
    let root = TempDir::new().unwrap();
    let (engine, _sink) = test_engine(root.path());
    engine.enable_audio().unwrap();

    assert!(engine.set_instrument("theremin").is_err());
    // The failed request never started a load.
    assert!(!engine.playback_state().is_loading);
}

#[test]
fn test_switch_requires_enabled_audio() {
    let root = TempDir::new().unwrap();
    let (engine, _sink) = test_engine(root.path());
    assert!(engine.set_instrument("polysynth").is_err());
}

#[test]
fn test_volume_reaches_backend() {
    let root = TempDir::new().unwrap();
    let (engine, sink) = test_engine(root.path());
    engine.enable_audio().unwrap();
    sink.drain();

    engine.set_volume(0);
    assert_eq!(engine.playback_state().volume, 0);
    assert!(sink.drain().iter().any(|c| matches!(
        c,
        VoiceCommand::SetSynthDb(db) if *db == f32::NEG_INFINITY
    )));
}

#[test]
fn test_disable_audio_releases_and_resets_state() {
    let root = TempDir::new().unwrap();
    let (engine, sink) = test_engine(root.path());
    engine.enable_audio().unwrap();

    engine.inject(NoteEvent::on(60, 100));
    assert!(wait_for(|| !sink.is_empty()));

    engine.disable_audio();
    assert_eq!(engine.playback_state(), PlaybackState::disabled());

    // Events after disable are detected but not played.
    sink.drain();
    engine.inject(NoteEvent::on(64, 100));
    assert!(wait_for(|| engine.active_notes() == vec![60, 64]));
    assert!(sink.is_empty());
}

#[test]
fn test_instrument_catalog_is_exposed() {
    let root = TempDir::new().unwrap();
    let (engine, _sink) = test_engine(root.path());
    assert!(engine.instruments().iter().any(|d| d.id == "grand-piano"));
    assert!(engine.instruments().iter().any(|d| d.id == "polysynth"));
}
