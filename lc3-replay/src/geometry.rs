use std::io::{Result, Write};

use lc3_session::{
    decoder_size, delay_samples, encoder_size, frame_samples, resolve_bitrate, Config,
    MAX_FRAME_BYTES, MIN_FRAME_BYTES,
};

/// Prints one line per supported configuration.
pub fn print<W: Write>(w: &mut W) -> Result<()> {
    writeln!(
        w,
        "{:>8} {:>8} {:>8} {:>6} {:>9} {:>9} {:>16}",
        "dt (us)", "sr (Hz)", "samples", "delay", "enc (B)", "dec (B)", "bitrate (bps)"
    )?;
    for config in Config::all() {
        let (dt, sr) = (config.duration.as_us(), config.sample_rate.as_hz());
        let bitrates = format!(
            "{}-{}",
            resolve_bitrate(dt, MIN_FRAME_BYTES),
            resolve_bitrate(dt, MAX_FRAME_BYTES)
        );
        writeln!(
            w,
            "{:>8} {:>8} {:>8} {:>6} {:>9} {:>9} {:>16}",
            dt,
            sr,
            frame_samples(dt, sr),
            delay_samples(dt, sr),
            encoder_size(dt, sr),
            decoder_size(dt, sr),
            bitrates
        )?;
    }
    Ok(())
}
