//! Pitch-class and note-name helpers.
//!
//! Notes are MIDI numbers (0-127) in scientific pitch notation: middle C
//! (MIDI 60) is C4, concert A (MIDI 69, 440 Hz) is A4.

/// The twelve chromatic pitch classes, sharp spelling.
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note identity modulo octave (0 = C ... 11 = B).
#[inline]
pub fn pitch_class(note: u8) -> u8 {
    note % 12
}

#[inline]
pub fn octave(note: u8) -> i8 {
    (note / 12) as i8 - 1
}

/// Pitch-class name of a note, e.g. 60 -> "C".
#[inline]
pub fn pitch_class_name(note: u8) -> &'static str {
    PITCH_CLASS_NAMES[pitch_class(note) as usize]
}

/// Octave-aware note name, e.g. 60 -> "C4".
pub fn note_name(note: u8) -> String {
    format!("{}{}", pitch_class_name(note), octave(note))
}

/// Equal-tempered frequency, A4 = 440 Hz.
#[inline]
pub fn note_to_hz(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}
