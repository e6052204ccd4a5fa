//! MDCT transform codec working on LC3 frame geometries.
//!
//! Encoders and decoders keep their whole working set in a caller supplied
//! [`StateBlock`] whose size is given by [`encoder_size`] / [`decoder_size`],
//! so the owner of a codec decides how that memory is obtained and reclaimed.

mod bits;
mod block;
mod config;
mod dec;
mod enc;
mod error;
mod mdct;
mod spectrum;

pub use block::StateBlock;
pub use config::{Config, FrameDuration, SampleRate};
pub use dec::{Decoder, Outcome};
pub use enc::Encoder;
pub use error::{Error, Result};

pub const MIN_FRAME_BYTES: usize = 20;
pub const MAX_FRAME_BYTES: usize = 400;
pub const MIN_BITRATE: u32 = 16000;
pub const MAX_BITRATE: u32 = 320000;

/// Samples per frame, 0 for an unsupported configuration.
pub fn frame_samples(dt_us: u32, sr_hz: u32) -> usize {
    Config::new(dt_us, sr_hz).map_or(0, |c| c.frame_samples())
}

/// Bytes of [`StateBlock`] an encoder needs, 0 for an unsupported
/// configuration.
pub fn encoder_size(dt_us: u32, sr_hz: u32) -> usize {
    Config::new(dt_us, sr_hz).map_or(0, |c| c.encoder_size())
}

/// Bytes of [`StateBlock`] a decoder needs, 0 for an unsupported
/// configuration.
pub fn decoder_size(dt_us: u32, sr_hz: u32) -> usize {
    Config::new(dt_us, sr_hz).map_or(0, |c| c.decoder_size())
}

/// Algorithmic delay in samples, 0 for an unsupported configuration.
pub fn delay_samples(dt_us: u32, sr_hz: u32) -> usize {
    Config::new(dt_us, sr_hz).map_or(0, |c| c.delay_samples())
}

/// Frame size in bytes for `bitrate`, clamped to the valid frame sizes.
/// 0 for an unsupported frame duration.
pub fn frame_bytes(dt_us: u32, bitrate: u32) -> usize {
    if FrameDuration::from_us(dt_us).is_none() {
        return 0;
    }
    let bytes = u64::from(bitrate) * u64::from(dt_us) / 8_000_000;
    (bytes as usize).clamp(MIN_FRAME_BYTES, MAX_FRAME_BYTES)
}

/// Bitrate carried by frames of `nbytes`, after clamping `nbytes` to the
/// valid frame sizes. 0 for an unsupported frame duration.
pub fn resolve_bitrate(dt_us: u32, nbytes: usize) -> u32 {
    if FrameDuration::from_us(dt_us).is_none() {
        return 0;
    }
    let nbytes = nbytes.clamp(MIN_FRAME_BYTES, MAX_FRAME_BYTES) as u64;
    (nbytes * 8 * 1_000_000 / u64::from(dt_us)) as u32
}
