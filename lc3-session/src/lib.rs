//! Session management for LC3-style frame codecs.
//!
//! A session is one configured encoder or decoder together with the state
//! block it runs in. Sessions are set up from a [`SessionBuilder`] (or the
//! `setup` shortcuts), used one frame at a time and reclaim their state
//! when released or dropped. [`SessionRegistry`] puts them behind opaque,
//! never reused handles for callers that cannot hold Rust values.

mod alloc;
mod engine;
mod error;
mod geometry;
mod registry;
mod session;
mod trace;

pub use alloc::{AllocStats, HeapAllocator, StateAllocator, TrackingAllocator};
pub use engine::{Lc3Engine, TransformEngine};
pub use error::{
    Error, Result, STATUS_CONCEALED, STATUS_ENGINE_FAILURE, STATUS_INVALID_ARGUMENT,
    STATUS_INVALID_HANDLE, STATUS_OK,
};
pub use geometry::{
    decoder_size, delay_samples, encoder_size, frame_bytes, frame_samples, resolve_bitrate,
    FrameGeometry, CHANNEL_COUNT,
};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{DecodeStatus, DecoderSession, EncoderSession, SessionBuilder, SessionKind};
#[cfg(feature = "log")]
pub use trace::LogTrace;
pub use trace::{Trace, TraceEvent};

pub use lc3_transform::{
    Config, FrameDuration, Outcome, SampleRate, StateBlock, MAX_BITRATE, MAX_FRAME_BYTES,
    MIN_BITRATE, MIN_FRAME_BYTES,
};
