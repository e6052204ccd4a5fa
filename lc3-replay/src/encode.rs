use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, ensure, Context};
use clap::ArgMatches;
use lc3_session::{
    delay_samples, frame_bytes, resolve_bitrate, FrameGeometry, LogTrace, SessionBuilder,
};
use log::{info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia_bundle_lc3::{Lc3Header, Lc3Writer};

use crate::{do_verification, get, ignore_end_of_stream_error};

pub fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let input = get::<PathBuf>(args, "input")?;
    let output = get::<PathBuf>(args, "output")?;
    let dt = *get::<u32>(args, "frame-us")?;
    let bitrate = *get::<u32>(args, "bitrate")?;
    let verify = args.get_flag("verify");

    let (sr, mut pcm) = read_first_channel(input, verify)?;
    let geometry = FrameGeometry::resolve(dt, sr)
        .with_context(|| format!("cannot encode {dt} us frames at {sr} Hz"))?;
    let n = geometry.samples_per_frame();
    let nbytes = frame_bytes(dt, bitrate);
    let samples = u32::try_from(pcm.len()).context("input too long")?;

    let mut encoder = SessionBuilder::default()
        .trace(Arc::new(LogTrace))
        .encoder(dt, sr)?;

    let header = Lc3Header {
        sample_rate_hz: sr,
        bitrate: resolve_bitrate(dt, nbytes),
        channels: 1,
        frame_duration_us: dt,
        samples,
    };
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = Lc3Writer::new(BufWriter::new(file), &header)?;

    // Flush the codec delay out of the encoder as well.
    let total = pcm.len() + delay_samples(dt, sr);
    pcm.resize(total.div_ceil(n) * n, 0);
    for frame in pcm.chunks(n) {
        let payload = encoder.encode(frame, nbytes)?;
        writer.write_frame(Some(payload.as_slice()))?;
    }

    let frames = writer.frames();
    writer.into_inner()?;
    info!(
        "encoded {samples} samples into {frames} frames of {nbytes} bytes ({} bps)",
        header.bitrate
    );
    Ok(())
}

/// Decodes the default track of an audio file, keeping the first channel.
/// With `verify`, a codec that can check its output (FLAC's MD5) must pass.
fn read_first_channel(path: &Path, verify: bool) -> anyhow::Result<(u32, Vec<i16>)> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let mut reader = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?
        .format;

    let track = reader.default_track().context("no audio track")?;
    let track_id = track.id;
    let sr = track.codec_params.sample_rate.context("unknown sample rate")?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions { verify })?;

    let mut pcm = vec![];
    let result = loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(err) => break Err(err),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                let mut samples = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                pcm.extend(samples.samples().iter().step_by(channels.max(1)).copied());
            }
            Err(Error::DecodeError(err)) => warn!("decode error: {}", err),
            Err(err) => break Err(err),
        }
    };
    ignore_end_of_stream_error(result)?;
    if do_verification(decoder.finalize())? != 0 {
        bail!("{} failed verification", path.display());
    }

    ensure!(!pcm.is_empty(), "{} holds no audio", path.display());
    Ok((sr, pcm))
}
