//! Error types for the audio subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("failed to load instrument '{id}': {reason}")]
    InstrumentLoadFailed { id: String, reason: String },

    #[error("sample decode error: {0}")]
    SampleDecode(String),

    #[error("audio playback is not enabled")]
    Disabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::SampleDecode(e.to_string())
    }
}

#[cfg(feature = "output")]
impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::OutputUnavailable(e.to_string())
    }
}

#[cfg(feature = "output")]
impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::OutputUnavailable(e.to_string())
    }
}

#[cfg(feature = "output")]
impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::OutputUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
