//! Contract between sessions and the code doing the actual transform.

use lc3_transform::{Config, Decoder, Encoder, Outcome, StateBlock};

/// A transform engine runs encoders and decoders inside blocks it is handed.
///
/// Setup either succeeds or gives the block back, so the session layer can
/// return it to the allocator that produced it.
pub trait TransformEngine: Clone + Send + Sync + 'static {
    type Encoder: Send + 'static;
    type Decoder: Send + 'static;

    fn frame_samples(&self, config: Config) -> usize;
    fn encoder_size(&self, config: Config) -> usize;
    fn decoder_size(&self, config: Config) -> usize;

    fn setup_encoder(&self, config: Config, block: StateBlock)
        -> Result<Self::Encoder, StateBlock>;
    fn setup_decoder(&self, config: Config, block: StateBlock)
        -> Result<Self::Decoder, StateBlock>;

    /// Encodes exactly `out.len()` bytes.
    fn encode(
        &self,
        encoder: &mut Self::Encoder,
        pcm: &[i16],
        out: &mut [u8],
    ) -> lc3_transform::Result<()>;

    /// Decodes one frame into `pcm`; `None` requests concealment.
    fn decode(
        &self,
        decoder: &mut Self::Decoder,
        data: Option<&[u8]>,
        pcm: &mut [i16],
    ) -> lc3_transform::Result<Outcome>;

    fn reclaim_encoder(&self, encoder: Self::Encoder) -> StateBlock;
    fn reclaim_decoder(&self, decoder: Self::Decoder) -> StateBlock;
}

/// The MDCT engine from `lc3-transform`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lc3Engine;

impl TransformEngine for Lc3Engine {
    type Encoder = Encoder;
    type Decoder = Decoder;

    fn frame_samples(&self, config: Config) -> usize {
        config.frame_samples()
    }

    fn encoder_size(&self, config: Config) -> usize {
        config.encoder_size()
    }

    fn decoder_size(&self, config: Config) -> usize {
        config.decoder_size()
    }

    fn setup_encoder(&self, config: Config, block: StateBlock) -> Result<Encoder, StateBlock> {
        Encoder::new(config, block)
    }

    fn setup_decoder(&self, config: Config, block: StateBlock) -> Result<Decoder, StateBlock> {
        Decoder::new(config, block)
    }

    fn encode(
        &self,
        encoder: &mut Encoder,
        pcm: &[i16],
        out: &mut [u8],
    ) -> lc3_transform::Result<()> {
        encoder.encode(pcm, out)
    }

    fn decode(
        &self,
        decoder: &mut Decoder,
        data: Option<&[u8]>,
        pcm: &mut [i16],
    ) -> lc3_transform::Result<Outcome> {
        decoder.decode(data, pcm)
    }

    fn reclaim_encoder(&self, encoder: Encoder) -> StateBlock {
        encoder.into_block()
    }

    fn reclaim_decoder(&self, decoder: Decoder) -> StateBlock {
        decoder.into_block()
    }
}
