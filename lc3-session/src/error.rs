use thiserror::Error;

use crate::SessionKind;

/// Status of a successful encode or decode.
pub const STATUS_OK: i32 = 0;
/// Status of a decode that had to conceal a missing frame.
pub const STATUS_CONCEALED: i32 = 1;
/// Bad buffer, size or configuration supplied by the caller.
pub const STATUS_INVALID_ARGUMENT: i32 = -1;
/// Null, stale or wrongly typed session handle.
pub const STATUS_INVALID_HANDLE: i32 = -2;
/// The transform engine failed.
pub const STATUS_ENGINE_FAILURE: i32 = -3;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported configuration: {dt_us} us frames at {sr_hz} Hz")]
    UnsupportedConfig { dt_us: u32, sr_hz: u32 },
    #[error("failed to allocate {0} bytes of codec state")]
    OutOfMemory(usize),
    #[error("transform engine rejected its state block")]
    EngineRejected,
    #[error("no session handles left")]
    HandlesExhausted,
    #[error("invalid session handle")]
    InvalidHandle,
    #[error("handle refers to a {actual:?} session, expected {expected:?}")]
    KindMismatch {
        expected: SessionKind,
        actual: SessionKind,
    },
    #[error("session is in use by another caller")]
    Busy,
    #[error("session was poisoned by a panic")]
    Poisoned,
    #[error("frame holds {actual} samples, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
    #[error("invalid frame size of {0} bytes")]
    FrameBytes(usize),
    #[error("missing {0} buffer")]
    NullBuffer(&'static str),
    #[error(transparent)]
    Engine(#[from] lc3_transform::Error),
}

impl Error {
    /// Negative status code reported across the host boundary.
    pub fn status(&self) -> i32 {
        match self {
            Self::InvalidHandle | Self::KindMismatch { .. } => STATUS_INVALID_HANDLE,
            Self::Engine(_) | Self::EngineRejected | Self::Poisoned => STATUS_ENGINE_FAILURE,
            Self::UnsupportedConfig { .. }
            | Self::OutOfMemory(_)
            | Self::HandlesExhausted
            | Self::Busy
            | Self::FrameSize { .. }
            | Self::FrameBytes(_)
            | Self::NullBuffer(_) => STATUS_INVALID_ARGUMENT,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
