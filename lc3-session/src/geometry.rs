//! Frame geometry: what a (frame duration, sample rate) pair implies.
//!
//! Every query recomputes its answer; the free functions return 0 for
//! configurations the engine does not support.

use lc3_transform::Config;

use crate::engine::{Lc3Engine, TransformEngine};
use crate::SessionKind;

/// Mono only.
pub const CHANNEL_COUNT: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameGeometry {
    config: Config,
    samples_per_frame: usize,
    encoder_footprint: usize,
    decoder_footprint: usize,
}

impl FrameGeometry {
    pub fn resolve(dt_us: u32, sr_hz: u32) -> Option<Self> {
        Self::resolve_with(&Lc3Engine, dt_us, sr_hz)
    }

    /// Resolves against a specific engine. `None` when the pair is not in
    /// the supported set or the engine reports a zero size for it.
    pub fn resolve_with<E: TransformEngine>(engine: &E, dt_us: u32, sr_hz: u32) -> Option<Self> {
        let config = Config::new(dt_us, sr_hz)?;
        let geometry = Self {
            config,
            samples_per_frame: engine.frame_samples(config),
            encoder_footprint: engine.encoder_size(config),
            decoder_footprint: engine.decoder_size(config),
        };
        if geometry.samples_per_frame == 0
            || geometry.encoder_footprint == 0
            || geometry.decoder_footprint == 0
        {
            return None;
        }
        Some(geometry)
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn frame_duration_us(&self) -> u32 {
        self.config.duration.as_us()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.config.sample_rate.as_hz()
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn encoder_footprint(&self) -> usize {
        self.encoder_footprint
    }

    pub fn decoder_footprint(&self) -> usize {
        self.decoder_footprint
    }

    pub fn footprint(&self, kind: SessionKind) -> usize {
        match kind {
            SessionKind::Encoder => self.encoder_footprint,
            SessionKind::Decoder => self.decoder_footprint,
        }
    }

    pub fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }
}

pub fn frame_samples(dt_us: u32, sr_hz: u32) -> usize {
    FrameGeometry::resolve(dt_us, sr_hz).map_or(0, |g| g.samples_per_frame())
}

pub fn encoder_size(dt_us: u32, sr_hz: u32) -> usize {
    FrameGeometry::resolve(dt_us, sr_hz).map_or(0, |g| g.encoder_footprint())
}

pub fn decoder_size(dt_us: u32, sr_hz: u32) -> usize {
    FrameGeometry::resolve(dt_us, sr_hz).map_or(0, |g| g.decoder_footprint())
}

pub use lc3_transform::{delay_samples, frame_bytes, resolve_bitrate};
