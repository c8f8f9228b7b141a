//! Static instrument catalog.

use crate::backend::BackendKind;
use serde::Serialize;

/// One selectable instrument. The catalog is fixed at compile time and never
/// mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstrumentDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub kind: BackendKind,
}

/// Default instrument tried on enable.
pub const DEFAULT_INSTRUMENT_ID: &str = "grand-piano";

/// Synthesized fallback when a sampled load fails during enable.
pub const SYNTH_FALLBACK_ID: &str = "polysynth";

pub const CATALOG: &[InstrumentDescriptor] = &[
    InstrumentDescriptor {
        id: "grand-piano",
        display_name: "Grand Piano",
        kind: BackendKind::Sampled,
    },
    InstrumentDescriptor {
        id: "electric-piano",
        display_name: "Electric Piano",
        kind: BackendKind::Sampled,
    },
    InstrumentDescriptor {
        id: "harpsichord",
        display_name: "Harpsichord",
        kind: BackendKind::Sampled,
    },
    InstrumentDescriptor {
        id: "polysynth",
        display_name: "Poly Synth",
        kind: BackendKind::Synthesized,
    },
];

pub fn find(id: &str) -> Option<&'static InstrumentDescriptor> {
    CATALOG.iter().find(|d| d.id == id)
}
