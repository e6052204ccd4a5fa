//! Spectrum quantisation and its bitstream.
//!
//! A frame is `gain:8 | count:10 | coefficient*` followed by zero padding.
//! Only the first `count` coefficients are coded; each one is `0` when it
//! quantises to zero, otherwise `1`, a sign bit and `ExpGolomb0(|q| - 1)`.

use crate::bits::{exp_golomb_len, BitReader, BitWriter};
use crate::error::{Error, Result};

const GAIN_BITS: u32 = 8;
const COUNT_BITS: u32 = 10;
const HEADER_BITS: usize = (GAIN_BITS + COUNT_BITS) as usize;

/// Rounding offset of the quantiser, biased towards zero.
const DEADZONE: f32 = 0.375;
const MAX_MAGNITUDE: f32 = (1 << 30) as f32;

/// Quantiser step for a gain index, from 2^-2 up to about 2^30.
fn step(gain: u8) -> f32 {
    (f32::from(gain) / 8.0 - 2.0).exp2()
}

fn quantize(x: f32, inv_step: f32) -> i32 {
    let magnitude = (x.abs() * inv_step + DEADZONE).floor().min(MAX_MAGNITUDE) as i32;
    if x < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

fn coefficient_bits(q: i32) -> usize {
    match q.unsigned_abs() {
        0 => 1,
        m => 2 + exp_golomb_len(m - 1),
    }
}

/// Bits needed to code `spectrum` at `gain`.
fn coded_bits(spectrum: &[f32], gain: u8) -> usize {
    let inv_step = step(gain).recip();
    let mut running = 0;
    let mut through_last = 0;
    for x in spectrum {
        let q = quantize(*x, inv_step);
        running += coefficient_bits(q);
        if q != 0 {
            through_last = running;
        }
    }
    HEADER_BITS + through_last
}

/// Smallest gain index whose coded size fits in `budget` bits.
pub(crate) fn choose_gain(spectrum: &[f32], budget: usize) -> u8 {
    let fits = |gain: u8| coded_bits(spectrum, gain) <= budget;

    let (mut lo, mut hi) = (u8::MIN, u8::MAX);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    // The size is only roughly monotonic in the gain.
    while lo < u8::MAX && !fits(lo) {
        lo += 1;
    }
    lo
}

pub(crate) fn write(spectrum: &[f32], gain: u8, writer: &mut BitWriter) -> Result<()> {
    let inv_step = step(gain).recip();
    let count = spectrum
        .iter()
        .rposition(|x| quantize(*x, inv_step) != 0)
        .map_or(0, |last| last + 1);

    writer.put(gain as u32, GAIN_BITS)?;
    writer.put(count as u32, COUNT_BITS)?;
    for x in &spectrum[..count] {
        let q = quantize(*x, inv_step);
        if q == 0 {
            writer.put_bit(false)?;
            continue;
        }
        writer.put_bit(true)?;
        writer.put_bit(q < 0)?;
        writer.put_exp_golomb(q.unsigned_abs() - 1)?;
    }
    Ok(())
}

/// Reconstructs `spectrum` from `data`. On error the contents of `spectrum`
/// are unspecified.
pub(crate) fn read(data: &[u8], spectrum: &mut [f32]) -> Result<()> {
    let truncated = Error::Corrupt("truncated frame");
    let mut reader = BitReader::new(data);

    let gain = reader.get(GAIN_BITS).ok_or(truncated)? as u8;
    let count = reader.get(COUNT_BITS).ok_or(truncated)? as usize;
    if count > spectrum.len() {
        return Err(Error::Corrupt("coefficient count out of range"));
    }

    let step = step(gain);
    spectrum.fill(0.0);
    for coef in &mut spectrum[..count] {
        if !reader.bit().ok_or(truncated)? {
            continue;
        }
        let negative = reader.bit().ok_or(truncated)?;
        let magnitude = reader.exp_golomb().ok_or(truncated)? as f32 + 1.0;
        *coef = step * if negative { -magnitude } else { magnitude };
    }
    Ok(())
}
