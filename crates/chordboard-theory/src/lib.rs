//! Music theory subsystem for Chordboard.
//!
//! Pure, I/O-free: pitch-class helpers, the bounded chord template
//! vocabulary, and the detection engine mapping an active note set to at
//! most one chord candidate.

pub mod pitch;
pub use pitch::{note_name, note_to_hz, pitch_class, pitch_class_name, PITCH_CLASS_NAMES};

pub mod template;
pub use template::{ChordTemplate, TemplateMatch, TEMPLATES};

mod detector;
pub use detector::{classify_quality, detect, ChordCandidate, Quality};
