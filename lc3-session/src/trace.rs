//! Observability hook. Sessions never log on their own; whoever wants to see
//! what they do installs a [`Trace`].

use std::fmt;

use crate::{DecodeStatus, Error, FrameGeometry, SessionKind};

#[derive(Clone, Copy, Debug)]
pub enum TraceEvent<'a> {
    Created {
        kind: SessionKind,
        geometry: &'a FrameGeometry,
    },
    SetupFailed {
        kind: SessionKind,
        dt_us: u32,
        sr_hz: u32,
        error: &'a Error,
    },
    Encoded {
        bytes: usize,
    },
    Decoded {
        status: DecodeStatus,
        bytes: Option<usize>,
    },
    Failed {
        kind: SessionKind,
        error: &'a Error,
    },
    Released {
        kind: SessionKind,
    },
}

impl TraceEvent<'_> {
    /// Whether the event reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SetupFailed { .. } | Self::Failed { .. })
    }
}

impl fmt::Display for TraceEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { kind, geometry } => write!(
                f,
                "{kind:?} set up: {} us at {} Hz, {} samples, {} bytes of state",
                geometry.frame_duration_us(),
                geometry.sample_rate_hz(),
                geometry.samples_per_frame(),
                geometry.footprint(*kind),
            ),
            Self::SetupFailed {
                kind,
                dt_us,
                sr_hz,
                error,
            } => write!(f, "{kind:?} setup failed for {dt_us} us at {sr_hz} Hz: {error}"),
            Self::Encoded { bytes } => write!(f, "encoded {bytes} bytes"),
            Self::Decoded {
                status: DecodeStatus::Decoded,
                bytes,
            } => write!(f, "decoded {} bytes", bytes.unwrap_or(0)),
            Self::Decoded {
                status: DecodeStatus::Concealed,
                bytes: Some(bytes),
            } => write!(f, "concealed corrupted frame of {bytes} bytes"),
            Self::Decoded {
                status: DecodeStatus::Concealed,
                bytes: None,
            } => f.write_str("concealed lost frame"),
            Self::Failed { kind, error } => write!(f, "{kind:?} failed: {error}"),
            Self::Released { kind } => write!(f, "{kind:?} released"),
        }
    }
}

pub trait Trace: Send + Sync {
    fn event(&self, event: &TraceEvent<'_>);
}

impl<F> Trace for F
where
    F: Fn(&TraceEvent<'_>) + Send + Sync,
{
    fn event(&self, event: &TraceEvent<'_>) {
        self(event)
    }
}

/// Forwards events to the `log` facade: failures at error level,
/// concealment at info, everything else at debug.
#[cfg(feature = "log")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTrace;

#[cfg(feature = "log")]
impl Trace for LogTrace {
    fn event(&self, event: &TraceEvent<'_>) {
        match event {
            e if e.is_error() => log::error!("{e}"),
            e @ TraceEvent::Decoded {
                status: DecodeStatus::Concealed,
                ..
            } => log::info!("{e}"),
            e => log::debug!("{e}"),
        }
    }
}
