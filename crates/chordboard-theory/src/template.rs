//! Chord template table and pitch-class-set matching.
//!
//! A template is a set of semitone intervals measured from the chord root.
//! Matching is exact: the distinct pitch classes of the input must equal the
//! template's interval set transposed to the candidate root. The table is
//! ordered most-specific-first; that order is the tie-break authority when
//! several roots match.

use crate::pitch::pitch_class;

/// One entry of the chord vocabulary.
#[derive(Debug, PartialEq, Eq)]
pub struct ChordTemplate {
    /// Appended to the root name for display, e.g. "m7" -> "Cm7".
    pub suffix: &'static str,
    /// Type tag consumed by quality classification.
    pub tag: &'static str,
    /// Semitone offsets from the root, ascending, 0 first.
    pub intervals: &'static [u8],
}

/// The bounded chord vocabulary: standard triads, sevenths, and extensions.
/// Larger (more specific) templates come first.
pub const TEMPLATES: &[ChordTemplate] = &[
    // Ninths
    ChordTemplate { suffix: "9", tag: "9", intervals: &[0, 2, 4, 7, 10] },
    ChordTemplate { suffix: "maj9", tag: "maj9", intervals: &[0, 2, 4, 7, 11] },
    ChordTemplate { suffix: "m9", tag: "min9", intervals: &[0, 2, 3, 7, 10] },
    // Sevenths and sixths
    ChordTemplate { suffix: "7", tag: "7", intervals: &[0, 4, 7, 10] },
    ChordTemplate { suffix: "maj7", tag: "maj7", intervals: &[0, 4, 7, 11] },
    ChordTemplate { suffix: "m7", tag: "min7", intervals: &[0, 3, 7, 10] },
    ChordTemplate { suffix: "m7b5", tag: "min7b5", intervals: &[0, 3, 6, 10] },
    ChordTemplate { suffix: "dim7", tag: "dim7", intervals: &[0, 3, 6, 9] },
    ChordTemplate { suffix: "mMaj7", tag: "minmaj7", intervals: &[0, 3, 7, 11] },
    ChordTemplate { suffix: "6", tag: "6", intervals: &[0, 4, 7, 9] },
    ChordTemplate { suffix: "m6", tag: "min6", intervals: &[0, 3, 7, 9] },
    ChordTemplate { suffix: "add9", tag: "add9", intervals: &[0, 2, 4, 7] },
    ChordTemplate { suffix: "7sus4", tag: "7sus4", intervals: &[0, 5, 7, 10] },
    // Triads
    ChordTemplate { suffix: "", tag: "maj", intervals: &[0, 4, 7] },
    ChordTemplate { suffix: "m", tag: "min", intervals: &[0, 3, 7] },
    ChordTemplate { suffix: "dim", tag: "dim", intervals: &[0, 3, 6] },
    ChordTemplate { suffix: "aug", tag: "aug", intervals: &[0, 4, 8] },
    ChordTemplate { suffix: "sus2", tag: "sus2", intervals: &[0, 2, 7] },
    ChordTemplate { suffix: "sus4", tag: "sus4", intervals: &[0, 5, 7] },
    // Dyads
    ChordTemplate { suffix: "5", tag: "5", intervals: &[0, 7] },
];

/// A template matched at a concrete root pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Root pitch class (0-11).
    pub root: u8,
    pub template: &'static ChordTemplate,
}

/// Distinct pitch classes of a note set, ascending.
pub fn pitch_class_set(notes: &[u8]) -> Vec<u8> {
    let mut classes: Vec<u8> = notes.iter().map(|&n| pitch_class(n)).collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

fn interval_set(root: u8, classes: &[u8]) -> Vec<u8> {
    let mut intervals: Vec<u8> = classes.iter().map(|&pc| (pc + 12 - root) % 12).collect();
    intervals.sort_unstable();
    intervals
}

fn matches_at_root(root: u8, classes: &[u8]) -> impl Iterator<Item = TemplateMatch> {
    let intervals = interval_set(root, classes);
    TEMPLATES
        .iter()
        .filter(move |t| t.intervals == intervals.as_slice())
        .map(move |template| TemplateMatch { root, template })
}

/// Octave-aware pass: the lowest sounding note is the only candidate root.
///
/// Recognizes root-position voicings; inversions fall through to
/// [`match_any_root`].
pub fn match_bass_rooted(notes: &[u8]) -> Vec<TemplateMatch> {
    let Some(&bass) = notes.iter().min() else {
        return Vec::new();
    };
    let classes = pitch_class_set(notes);
    matches_at_root(pitch_class(bass), &classes).collect()
}

/// Pitch-class fallback pass: every present pitch class is tried as root.
///
/// Ranked bass-root-first, then table order. Deliberately loses inversion
/// information in exchange for a higher match rate.
pub fn match_any_root(notes: &[u8]) -> Vec<TemplateMatch> {
    let Some(&bass) = notes.iter().min() else {
        return Vec::new();
    };
    let bass_pc = pitch_class(bass);
    let classes = pitch_class_set(notes);

    let mut roots = vec![bass_pc];
    roots.extend(classes.iter().copied().filter(|&pc| pc != bass_pc));

    let mut matches = Vec::new();
    for root in roots {
        matches.extend(matches_at_root(root, &classes));
    }
    matches
}
