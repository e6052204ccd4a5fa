use lc3_session::{delay_samples, FrameGeometry};
use symphonia_core::audio::Channels;
use symphonia_core::codecs::CodecParameters;
use symphonia_core::errors::{decode_error, seek_error, unsupported_error, Result, SeekErrorKind};
use symphonia_core::formats::{
    Cue, FormatOptions, FormatReader, Packet, SeekMode, SeekTo, SeekedTo, Track,
};
use symphonia_core::io::{MediaSourceStream, ReadBytes};
use symphonia_core::meta::{Metadata, MetadataLog};
use symphonia_core::probe::{Descriptor, Instantiate, QueryDescriptor};
use symphonia_core::support_format;
use symphonia_core::units::TimeBase;

use crate::dec::CODEC_TYPE_LC3;
use crate::header::{Lc3Header, HEADER_SIZE, LC3_MAGIC};

/// LC3 format reader.
///
/// `Lc3Reader` implements a demuxer for the `.lc3` container of the liblc3
/// tools. Lost frames come out as empty packets.
pub struct Lc3Reader {
    reader: MediaSourceStream,
    tracks: Vec<Track>,
    cues: Vec<Cue>,
    metadata: MetadataLog,
    header: Lc3Header,
    frame_samples: u64,
    ts: u64,
}

impl Lc3Reader {
    pub fn header(&self) -> &Lc3Header {
        &self.header
    }
}

impl QueryDescriptor for Lc3Reader {
    fn query() -> &'static [Descriptor] {
        &[support_format!(
            "lc3",
            "Low Complexity Communication Codec",
            &["lc3"],
            &["audio/lc3"],
            &[LC3_MAGIC]
        )]
    }

    fn score(_context: &[u8]) -> u8 {
        255
    }
}

impl FormatReader for Lc3Reader {
    fn try_new(mut source: MediaSourceStream, _options: &FormatOptions) -> Result<Self> {
        let fixed = source.read_boxed_slice_exact(HEADER_SIZE)?;
        let (header, header_size) = match Lc3Header::parse(&fixed) {
            Ok(parsed) => parsed,
            Err(_) => return decode_error("lc3: invalid header"),
        };
        source.ignore_bytes((header_size - HEADER_SIZE) as u64)?;

        if header.channels != 1 {
            return unsupported_error("lc3: only mono streams are supported");
        }
        let Some(geometry) = FrameGeometry::resolve(header.frame_duration_us, header.sample_rate_hz)
        else {
            return unsupported_error("lc3: unsupported frame duration or sample rate");
        };
        let frame_samples = geometry.samples_per_frame() as u64;
        let delay = delay_samples(header.frame_duration_us, header.sample_rate_hz);

        let mut codec_params = CodecParameters::new();
        codec_params
            .for_codec(CODEC_TYPE_LC3)
            .with_sample_rate(header.sample_rate_hz)
            .with_time_base(TimeBase::new(1, header.sample_rate_hz))
            .with_channels(Channels::FRONT_CENTRE)
            .with_max_frames_per_packet(frame_samples)
            .with_n_frames(u64::from(header.samples))
            .with_delay(delay as u32);

        log::debug!(
            "lc3: {} Hz, {} us frames, {} bps, {} samples",
            header.sample_rate_hz,
            header.frame_duration_us,
            header.bitrate,
            header.samples
        );

        Ok(Self {
            reader: source,
            tracks: vec![Track::new(0, codec_params)],
            cues: Default::default(),
            metadata: Default::default(),
            header,
            frame_samples,
            ts: 0,
        })
    }

    fn next_packet(&mut self) -> Result<Packet> {
        let len = self.reader.read_u16()?;
        let data = self.reader.read_boxed_slice_exact(len as usize)?;

        let pkt = Packet::new_from_boxed_slice(0, self.ts, self.frame_samples, data);
        self.ts += self.frame_samples;
        Ok(pkt)
    }

    fn metadata(&mut self) -> Metadata<'_> {
        self.metadata.metadata()
    }

    fn cues(&self) -> &[Cue] {
        &self.cues
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn seek(&mut self, _mode: SeekMode, _to: SeekTo) -> Result<SeekedTo> {
        seek_error(SeekErrorKind::Unseekable)
    }

    fn into_inner(self: Box<Self>) -> MediaSourceStream {
        self.reader
    }
}
