use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::ArgMatches;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecRegistry, DecoderOptions};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, Probe};
use symphonia_bundle_lc3::{Lc3Decoder, Lc3Reader};

use crate::{get, ignore_end_of_stream_error, wav};

/// Replaces packets by empty (lost) ones at a given rate.
struct LossSimulator {
    rate: f64,
    rng: StdRng,
}

impl LossSimulator {
    fn new(percent: u8, seed: u64) -> Self {
        Self {
            rate: f64::from(percent) / 100.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn apply(&mut self, packet: Packet) -> (Packet, bool) {
        if self.rate > 0.0 && self.rng.gen_bool(self.rate) {
            let lost = Packet::new_from_slice(packet.track_id(), packet.ts(), packet.dur(), &[]);
            (lost, true)
        } else {
            (packet, false)
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    frames: usize,
    dropped: usize,
    concealed: usize,
    errors: usize,
}

pub fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let input = get::<PathBuf>(args, "input")?;
    let output = get::<PathBuf>(args, "output")?;
    let mut loss = LossSimulator::new(*get::<u8>(args, "loss")?, *get::<u64>(args, "seed")?);

    let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut probe = Probe::default();
    probe.register_all::<Lc3Reader>();
    let mut hint = Hint::new();
    hint.with_extension("lc3");
    let reader = probe
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?
        .format;

    let mut registry = CodecRegistry::new();
    registry.register_all::<Lc3Decoder>();

    let (sr, pcm, stats) = decode_all(reader, &registry, &mut loss)?;
    wav::create(output, sr, &pcm)?;
    info!(
        "decoded {} frames into {} samples: {} dropped, {} concealed, {} errors",
        stats.frames,
        pcm.len(),
        stats.dropped,
        stats.concealed,
        stats.errors
    );
    Ok(())
}

fn decode_all(
    mut reader: Box<dyn FormatReader>,
    registry: &CodecRegistry,
    loss: &mut LossSimulator,
) -> anyhow::Result<(u32, Vec<i16>, Stats)> {
    let track = reader.default_track().context("no lc3 track")?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let sr = params.sample_rate.context("unknown sample rate")?;
    let mut decoder = registry.make(&params, &DecoderOptions::default())?;

    // The first `delay` samples only hold the codec's warm-up.
    let mut skip = params.delay.unwrap_or(0) as usize;
    let mut pcm = vec![];
    let mut stats = Stats::default();

    // Decode all packets, ignoring all decode errors.
    let result = loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(err) => break Err(err),
        };
        if packet.track_id() != track_id {
            continue;
        }
        stats.frames += 1;

        let (packet, dropped) = loss.apply(packet);
        stats.dropped += usize::from(dropped);
        if packet.buf().is_empty() {
            stats.concealed += 1;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut samples =
                    SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                samples.copy_interleaved_ref(decoded);
                let samples = samples.samples();
                let warmup = skip.min(samples.len());
                skip -= warmup;
                pcm.extend_from_slice(&samples[warmup..]);
            }
            Err(Error::DecodeError(err)) => {
                stats.errors += 1;
                warn!("decode error: {}", err)
            }
            Err(err) => break Err(err),
        }
    };

    // Return if a fatal error occured.
    ignore_end_of_stream_error(result)?;

    if let Some(n_frames) = params.n_frames {
        pcm.truncate(n_frames as usize);
    }
    Ok((sr, pcm, stats))
}
