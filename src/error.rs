//! Error types for opuscast
//!
//! Defines engine-specific error types using thiserror for clear error
//! propagation, plus the stable status-code set exposed to hosting layers.

use thiserror::Error;

/// Main error type for the streaming engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid argument (malformed track info, zero-sized buffer, ...)
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    /// Operation not valid from the player's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Audio decoding errors (source open, packet decode, seek)
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio encoding errors
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// Sample rate conversion errors
    #[error("Resample error: {0}")]
    Resample(String),

    /// Packetized source errors (demuxer-side failures)
    #[error("Source error: {0}")]
    Source(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stable status codes for a hosting process or binding layer.
///
/// The binding layer itself is out of scope here; this is the fixed
/// vocabulary it would translate [`Error`] values into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    InvalidArg = 1,
    OutOfMemory = 2,
    InvalidState = 3,
    DecodeFailed = 4,
    EncodeFailed = 5,
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidArg(_) => Status::InvalidArg,
            Error::InvalidState(_) => Status::InvalidState,
            Error::Decode(_) | Error::Source(_) => Status::DecodeFailed,
            Error::Encode(_) => Status::EncodeFailed,
            Error::Resample(_) | Error::Internal(_) => Status::DecodeFailed,
        }
    }
}

impl Error {
    /// Status code for this error, for handle-based callers
    pub fn status(&self) -> Status {
        Status::from(self)
    }
}
