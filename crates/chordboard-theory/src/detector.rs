//! Chord detection engine: active note set -> at most one best candidate.
//!
//! Deterministic for a fixed note set: the template table order decides ties
//! and the lowest sounding note is the bass tie-break. Absence of a match is
//! a valid state, not an error.

use crate::pitch::{pitch_class, pitch_class_name, PITCH_CLASS_NAMES};
use crate::template::{match_any_root, match_bass_rooted, TemplateMatch};
use serde::Serialize;

/// Display-only quality bucket derived from the matched type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Dominant,
    Other,
}

/// The best chord reading of an active note set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordCandidate {
    /// Full display name, e.g. "Cm7".
    pub name: String,
    /// Root pitch-class name, e.g. "C".
    pub root: String,
    /// Template type tag, e.g. "min7".
    pub kind: &'static str,
    pub quality: Quality,
    /// Pitch-class names of the sounding notes, ascending from the bass.
    pub notes: Vec<String>,
}

/// Substring rules on the type tag, most specific first: `dim`/`aug` before
/// `min` (so "dim" does not read as minor), `min` before `maj` (so "minmaj7"
/// reads as minor).
pub fn classify_quality(tag: &str) -> Quality {
    if tag.contains("dim") {
        Quality::Diminished
    } else if tag.contains("aug") {
        Quality::Augmented
    } else if tag.contains("min") {
        Quality::Minor
    } else if tag.contains("maj") {
        Quality::Major
    } else if tag.contains("dom") || tag.starts_with('7') || tag.starts_with('9') {
        Quality::Dominant
    } else {
        Quality::Other
    }
}

/// Detect the best chord candidate for a set of active MIDI notes.
///
/// 1. Fewer than two distinct notes -> `None`.
/// 2. Octave-aware pass: exact match with the bass note as root.
/// 3. Fallback pass: pitch classes only, every root tried (recovers
///    inversions at the cost of inversion information).
/// 4. No match in either pass -> `None` ("notes only" state).
pub fn detect(notes: &[u8]) -> Option<ChordCandidate> {
    let mut sorted = notes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() < 2 {
        return None;
    }

    let best = match_bass_rooted(&sorted)
        .into_iter()
        .next()
        .or_else(|| match_any_root(&sorted).into_iter().next())?;

    Some(candidate(best, &sorted))
}

fn candidate(m: TemplateMatch, sorted_notes: &[u8]) -> ChordCandidate {
    let root = PITCH_CLASS_NAMES[m.root as usize].to_string();

    // Pitch-class names in sounding order, duplicates collapsed.
    let mut seen = [false; 12];
    let mut note_names = Vec::new();
    for &note in sorted_notes {
        let pc = pitch_class(note);
        if !seen[pc as usize] {
            seen[pc as usize] = true;
            note_names.push(pitch_class_name(note).to_string());
        }
    }

    ChordCandidate {
        name: format!("{root}{}", m.template.suffix),
        root,
        kind: m.template.tag,
        quality: classify_quality(m.template.tag),
        notes: note_names,
    }
}
