//! Direct-form MDCT over `2N` windowed samples.
//!
//! All cosines of the transform are of the form `cos(2π m / 8N)`, so a single
//! table of `8N` entries serves both directions and no trigonometry runs per
//! frame.

use std::f64::consts::PI;

/// Fills the sine window (`2n` entries) and the twiddle table (`8n` entries).
pub(crate) fn init(window: &mut [f32], twiddles: &mut [f32], n: usize) {
    debug_assert_eq!(window.len(), 2 * n);
    debug_assert_eq!(twiddles.len(), 8 * n);

    for (i, w) in window.iter_mut().enumerate() {
        *w = (PI * (i as f64 + 0.5) / (2 * n) as f64).sin() as f32;
    }
    for (m, t) in twiddles.iter_mut().enumerate() {
        *t = (2.0 * PI * m as f64 / (8 * n) as f64).cos() as f32;
    }
}

/// Windows `block` in place and writes its `n` MDCT coefficients to
/// `spectrum`.
pub(crate) fn forward(window: &[f32], twiddles: &[f32], block: &mut [f32], spectrum: &mut [f32]) {
    let n = spectrum.len();
    let modulo = twiddles.len();
    debug_assert_eq!(block.len(), 2 * n);

    for (x, w) in block.iter_mut().zip(window) {
        *x *= w;
    }

    for (k, coef) in spectrum.iter_mut().enumerate() {
        let odd = 2 * k + 1;
        let stride = 2 * odd;
        let mut idx = ((n + 1) * odd) % modulo;
        let mut acc = 0f32;
        for x in block.iter() {
            acc += x * twiddles[idx];
            idx += stride;
            if idx >= modulo {
                idx -= modulo;
            }
        }
        *coef = acc;
    }
}

/// Writes the windowed inverse transform of `spectrum` (`2n` samples) to
/// `block`. Overlap-adding the second half of one call with the first half of
/// the next reconstructs the signal.
pub(crate) fn inverse(window: &[f32], twiddles: &[f32], spectrum: &[f32], block: &mut [f32]) {
    let n = spectrum.len();
    let modulo = twiddles.len();
    let scale = 2.0 / n as f32;
    debug_assert_eq!(block.len(), 2 * n);

    for (i, (y, w)) in block.iter_mut().zip(window).enumerate() {
        let phase = (2 * i + 1 + n) % modulo;
        let stride = (2 * phase) % modulo;
        let mut idx = phase;
        let mut acc = 0f32;
        for coef in spectrum {
            acc += coef * twiddles[idx];
            idx += stride;
            if idx >= modulo {
                idx -= modulo;
            }
        }
        *y = acc * scale * w;
    }
}
