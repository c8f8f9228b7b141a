//! Normalized note events parsed from raw MIDI messages.

use serde::{Deserialize, Serialize};

/// Direction of a note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    On,
    Off,
}

/// A normalized note message from the bound input device.
///
/// Velocity is the raw MIDI byte (0-127). Consumers convert at their own
/// edge: the synthesized backend scales to gain, the sampled backend clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub note: u8,
    pub velocity: u8,
    pub kind: NoteKind,
}

impl NoteEvent {
    #[inline]
    pub fn on(note: u8, velocity: u8) -> Self {
        Self {
            note: note & 0x7F,
            velocity: velocity & 0x7F,
            kind: NoteKind::On,
        }
    }

    #[inline]
    pub fn off(note: u8) -> Self {
        Self {
            note: note & 0x7F,
            velocity: 0,
            kind: NoteKind::Off,
        }
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.kind == NoteKind::On
    }

    /// Parse a raw MIDI message into a note event.
    ///
    /// Only note-on (0x9n) and note-off (0x8n) are of interest; everything
    /// else returns `None`. Note-on with velocity 0 is normalized to note-off
    /// per the MIDI spec.
    pub fn parse(bytes: &[u8]) -> Option<NoteEvent> {
        if bytes.len() < 3 {
            return None;
        }
        let status = bytes[0] & 0xF0;
        let note = bytes[1] & 0x7F;
        let velocity = bytes[2] & 0x7F;
        match status {
            0x90 if velocity > 0 => Some(NoteEvent::on(note, velocity)),
            0x90 | 0x80 => Some(NoteEvent::off(note)),
            _ => None,
        }
    }
}
