use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("frame holds {actual} samples, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
    #[error("frame size of {0} bytes is outside 20..=400")]
    FrameBytes(usize),
    #[error("bitstream overflow at bit {0}")]
    Overflow(usize),
    #[error("corrupted frame: {0}")]
    Corrupt(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
