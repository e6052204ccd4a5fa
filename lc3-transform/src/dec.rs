use crate::block::{carve, StateBlock};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::{mdct, spectrum, MAX_FRAME_BYTES, MIN_FRAME_BYTES};

/// Per-frame attenuation applied while frames keep getting lost.
const PLC_ATTENUATION: f32 = 0.8;
const PLC_SEED: u16 = 24607;

/// Result of a successful [`Decoder::decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The frame was decoded from its payload.
    Decoded,
    /// No usable payload; the frame was synthesized from history.
    Concealed,
}

/// Noise substitution from the last good spectrum.
#[derive(Clone, Copy, Debug)]
struct Concealment {
    lost: u32,
    seed: u16,
}

impl Concealment {
    fn new() -> Self {
        Self {
            lost: 0,
            seed: PLC_SEED,
        }
    }

    fn recovered(&mut self) {
        self.lost = 0;
    }

    fn synthesize(&mut self, last: &[f32], coefs: &mut [f32]) {
        self.lost = self.lost.saturating_add(1);
        let gain = PLC_ATTENUATION.powi(self.lost.min(64) as i32);
        for (c, l) in coefs.iter_mut().zip(last) {
            self.seed = 16831u16.wrapping_add(self.seed.wrapping_mul(12821));
            let sign = if self.seed & 0x8000 != 0 { -1.0 } else { 1.0 };
            *c = l * gain * sign;
        }
    }
}

/// Decoder state. Everything but the concealment counters lives inside its
/// [`StateBlock`].
#[derive(Debug)]
pub struct Decoder {
    config: Config,
    block: StateBlock,
    plc: Concealment,
}

impl Decoder {
    /// Sets up a decoder in `block`. The block is handed back when it is
    /// too small for `config`.
    pub fn new(config: Config, mut block: StateBlock) -> std::result::Result<Self, StateBlock> {
        if block.len_words() < config.decoder_words() {
            return Err(block);
        }
        let n = config.frame_samples();
        block.words_mut().fill(0.0);
        let [window, twiddles] = carve(block.words_mut(), [2 * n, 8 * n]);
        mdct::init(window, twiddles, n);

        Ok(Self {
            config,
            block,
            plc: Concealment::new(),
        })
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Decodes one frame into `pcm`, which must hold exactly one frame.
    ///
    /// `None` asks for packet loss concealment. A payload of valid length
    /// that cannot be parsed is concealed as well; only argument errors
    /// fail.
    pub fn decode(&mut self, data: Option<&[u8]>, pcm: &mut [i16]) -> Result<Outcome> {
        let n = self.config.frame_samples();
        if pcm.len() != n {
            return Err(Error::FrameSize {
                expected: n,
                actual: pcm.len(),
            });
        }
        if let Some(data) = data {
            if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&data.len()) {
                return Err(Error::FrameBytes(data.len()));
            }
        }

        let [window, twiddles, overlap, last, scratch, coefs] =
            carve(self.block.words_mut(), [2 * n, 8 * n, n, n, 2 * n, n]);

        let outcome = match data.map(|data| spectrum::read(data, coefs)) {
            Some(Ok(())) => Outcome::Decoded,
            Some(Err(_)) | None => Outcome::Concealed,
        };
        match outcome {
            Outcome::Decoded => {
                last.copy_from_slice(coefs);
                self.plc.recovered();
            }
            Outcome::Concealed => self.plc.synthesize(last, coefs),
        }

        mdct::inverse(window, twiddles, coefs, scratch);

        let (head, tail) = scratch.split_at(n);
        for (((out, o), h), t) in pcm.iter_mut().zip(overlap.iter_mut()).zip(head).zip(tail) {
            *out = (*o + h).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            *o = *t;
        }

        Ok(outcome)
    }

    /// Gives the working memory back to the caller.
    pub fn into_block(self) -> StateBlock {
        self.block
    }
}
