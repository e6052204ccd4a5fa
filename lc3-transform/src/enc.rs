use crate::bits::BitWriter;
use crate::block::{carve, StateBlock};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::{mdct, spectrum, MAX_FRAME_BYTES, MIN_FRAME_BYTES};

/// Encoder state. Everything it needs lives inside its [`StateBlock`].
#[derive(Debug)]
pub struct Encoder {
    config: Config,
    block: StateBlock,
}

impl Encoder {
    /// Sets up an encoder in `block`. The block is handed back when it is
    /// too small for `config`.
    pub fn new(config: Config, mut block: StateBlock) -> std::result::Result<Self, StateBlock> {
        if block.len_words() < config.encoder_words() {
            return Err(block);
        }
        let n = config.frame_samples();
        block.words_mut().fill(0.0);
        let [window, twiddles] = carve(block.words_mut(), [2 * n, 8 * n]);
        mdct::init(window, twiddles, n);

        Ok(Self { config, block })
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Encodes one frame of `pcm` into exactly `out.len()` bytes.
    pub fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<()> {
        let n = self.config.frame_samples();
        if pcm.len() != n {
            return Err(Error::FrameSize {
                expected: n,
                actual: pcm.len(),
            });
        }
        if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&out.len()) {
            return Err(Error::FrameBytes(out.len()));
        }

        let [window, twiddles, history, scratch, coefs] =
            carve(self.block.words_mut(), [2 * n, 8 * n, n, 2 * n, n]);

        let (past, present) = scratch.split_at_mut(n);
        past.copy_from_slice(history);
        for ((x, h), s) in present.iter_mut().zip(history.iter_mut()).zip(pcm) {
            *x = f32::from(*s);
            *h = *x;
        }

        mdct::forward(window, twiddles, scratch, coefs);

        let gain = spectrum::choose_gain(coefs, out.len() * 8);
        let mut writer = BitWriter::new(out);
        spectrum::write(coefs, gain, &mut writer)
    }

    /// Gives the working memory back to the caller.
    pub fn into_block(self) -> StateBlock {
        self.block
    }
}
