pub mod dec;
pub mod format;
pub mod header;

pub use dec::{Decoder as Lc3Decoder, CODEC_TYPE_LC3};
pub use format::Lc3Reader;
pub use header::{Lc3Header, Lc3Writer};
