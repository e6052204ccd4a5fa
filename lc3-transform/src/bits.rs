use bitvec::prelude::*;

use crate::error::{Error, Result};

/// MSB-first bit writer over a caller buffer.
pub(crate) struct BitWriter<'a> {
    bits: &'a mut BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitWriter<'a> {
    /// Clears `buf`; unwritten bits are zero padding.
    pub fn new(buf: &'a mut [u8]) -> Self {
        buf.fill(0);
        Self {
            bits: buf.view_bits_mut::<Msb0>(),
            pos: 0,
        }
    }

    pub fn put_bit(&mut self, bit: bool) -> Result<()> {
        if self.pos >= self.bits.len() {
            return Err(Error::Overflow(self.pos));
        }
        self.bits.set(self.pos, bit);
        self.pos += 1;
        Ok(())
    }

    pub fn put(&mut self, value: u32, nbits: u32) -> Result<()> {
        for i in (0..nbits).rev() {
            self.put_bit((value >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// Order-0 Exp-Golomb code of `value`.
    pub fn put_exp_golomb(&mut self, value: u32) -> Result<()> {
        let x = value + 1;
        let len = u32::BITS - x.leading_zeros();
        self.put(0, len - 1)?;
        self.put(x, len)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Length in bits of [`BitWriter::put_exp_golomb`] for `value`.
pub(crate) fn exp_golomb_len(value: u32) -> usize {
    let len = (u32::BITS - (value + 1).leading_zeros()) as usize;
    2 * len - 1
}

/// MSB-first bit reader; every read returns `None` past the end.
pub(crate) struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            bits: buf.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    pub fn bit(&mut self) -> Option<bool> {
        let bit = *self.bits.get(self.pos)?;
        self.pos += 1;
        Some(bit)
    }

    pub fn get(&mut self, nbits: u32) -> Option<u32> {
        let mut value = 0;
        for _ in 0..nbits {
            value = (value << 1) | self.bit()? as u32;
        }
        Some(value)
    }

    pub fn exp_golomb(&mut self) -> Option<u32> {
        let mut zeros = 0;
        while !self.bit()? {
            zeros += 1;
            if zeros >= u32::BITS {
                return None;
            }
        }
        let rest = self.get(zeros)?;
        Some(((1 << zeros) | rest) - 1)
    }
}
