use std::mem::size_of;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Frame durations understood by the transform, in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum FrameDuration {
    Us7500 = 7500,
    Us10000 = 10000,
}

impl FrameDuration {
    pub const ALL: [FrameDuration; 2] = [Self::Us7500, Self::Us10000];

    pub fn from_us(dt_us: u32) -> Option<Self> {
        Self::from_u32(dt_us)
    }

    pub fn as_us(&self) -> u32 {
        *self as u32
    }
}

/// Sampling rates understood by the transform, in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum SampleRate {
    Hz8000 = 8000,
    Hz16000 = 16000,
    Hz24000 = 24000,
    Hz32000 = 32000,
    Hz48000 = 48000,
}

impl SampleRate {
    pub const ALL: [SampleRate; 5] = [
        Self::Hz8000,
        Self::Hz16000,
        Self::Hz24000,
        Self::Hz32000,
        Self::Hz48000,
    ];

    pub fn from_hz(sr_hz: u32) -> Option<Self> {
        Self::from_u32(sr_hz)
    }

    pub fn as_hz(&self) -> u32 {
        *self as u32
    }
}

/// A validated (frame duration, sample rate) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    pub duration: FrameDuration,
    pub sample_rate: SampleRate,
}

/// Words of state kept by an encoder, per sample of frame:
/// window (2), twiddles (8), history (1), scratch (2), spectrum (1).
const ENCODER_WORDS_PER_SAMPLE: usize = 14;
/// Decoder: window (2), twiddles (8), overlap (1), last good spectrum (1),
/// scratch (2), spectrum (1).
const DECODER_WORDS_PER_SAMPLE: usize = 15;

impl Config {
    pub fn new(dt_us: u32, sr_hz: u32) -> Option<Self> {
        Some(Self {
            duration: FrameDuration::from_us(dt_us)?,
            sample_rate: SampleRate::from_hz(sr_hz)?,
        })
    }

    /// Iterates every supported configuration.
    pub fn all() -> impl Iterator<Item = Config> {
        FrameDuration::ALL.into_iter().flat_map(|duration| {
            SampleRate::ALL.into_iter().map(move |sample_rate| Config {
                duration,
                sample_rate,
            })
        })
    }

    /// Number of PCM samples in one frame.
    pub fn frame_samples(&self) -> usize {
        self.duration.as_us() as usize * self.sample_rate.as_hz() as usize / 1_000_000
    }

    /// Algorithmic delay: the MDCT overlaps two frames, so output lags
    /// input by exactly one frame.
    pub fn delay_samples(&self) -> usize {
        self.frame_samples()
    }

    pub(crate) fn encoder_words(&self) -> usize {
        ENCODER_WORDS_PER_SAMPLE * self.frame_samples()
    }

    pub(crate) fn decoder_words(&self) -> usize {
        DECODER_WORDS_PER_SAMPLE * self.frame_samples()
    }

    pub fn encoder_size(&self) -> usize {
        self.encoder_words() * size_of::<f32>()
    }

    pub fn decoder_size(&self) -> usize {
        self.decoder_words() * size_of::<f32>()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_samples() {
        let cases = [
            (7500, 8000, 60),
            (7500, 16000, 120),
            (7500, 48000, 360),
            (10000, 8000, 80),
            (10000, 16000, 160),
            (10000, 24000, 240),
            (10000, 32000, 320),
            (10000, 48000, 480),
        ];
        for (dt, sr, ns) in cases {
            assert_eq!(Config::new(dt, sr).unwrap().frame_samples(), ns);
        }
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(Config::new(5000, 16000).is_none());
        assert!(Config::new(10000, 44100).is_none());
        assert!(Config::new(0, 0).is_none());
    }

    #[test]
    fn test_all_configs() {
        assert_eq!(Config::all().count(), 10);
        for config in Config::all() {
            assert!(config.encoder_size() > 0);
            assert!(config.decoder_size() > config.encoder_size());
        }
    }
}
