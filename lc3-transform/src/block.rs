use std::mem::size_of;

const WORD: usize = size_of::<f32>();

/// Working memory of one encoder or decoder.
///
/// The block is handed to [`crate::Encoder::new`] / [`crate::Decoder::new`]
/// and given back by `into_block`, so whoever allocated it can reclaim it.
#[derive(Debug)]
pub struct StateBlock {
    words: Box<[f32]>,
}

impl StateBlock {
    /// Allocates a zeroed block, returning `None` when `bytes` is not a
    /// whole number of words or the allocation cannot be satisfied.
    pub fn try_zeroed(bytes: usize) -> Option<Self> {
        if bytes == 0 || bytes % WORD != 0 {
            return None;
        }
        let mut words = Vec::new();
        words.try_reserve_exact(bytes / WORD).ok()?;
        words.resize(bytes / WORD, 0.0);
        Some(Self {
            words: words.into_boxed_slice(),
        })
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * WORD
    }

    /// Address of the block, only meaningful as an identity.
    pub fn as_ptr(&self) -> *const f32 {
        self.words.as_ptr()
    }

    pub(crate) fn len_words(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn words_mut(&mut self) -> &mut [f32] {
        &mut self.words
    }
}

/// Splits `words` into consecutive regions of the given sizes.
pub(crate) fn carve<const R: usize>(words: &mut [f32], sizes: [usize; R]) -> [&mut [f32]; R] {
    let mut rest = words;
    sizes.map(|n| {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(n);
        rest = tail;
        head
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_try_zeroed() {
        let block = StateBlock::try_zeroed(64).unwrap();
        assert_eq!(block.len_bytes(), 64);
        assert_eq!(block.len_words(), 16);
        assert!(StateBlock::try_zeroed(0).is_none());
        assert!(StateBlock::try_zeroed(63).is_none());
    }

    #[test]
    fn test_carve() {
        let mut block = StateBlock::try_zeroed(10 * WORD).unwrap();
        let [a, b, c] = carve(block.words_mut(), [2, 3, 5]);
        a.fill(1.0);
        b.fill(2.0);
        c.fill(3.0);
        assert_eq!(
            &*block.words,
            &[1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0, 3.0]
        );
    }
}
