use std::sync::Arc;

use lc3_session::{DecoderSession, FrameGeometry, LogTrace, SessionBuilder};
use symphonia_core::audio::{
    AsAudioBufferRef, AudioBuffer, AudioBufferRef, Channels, Signal, SignalSpec,
};
use symphonia_core::codecs::{
    decl_codec_type, CodecDescriptor, CodecParameters, CodecType, Decoder as D, DecoderOptions,
    FinalizeResult,
};
use symphonia_core::errors::{decode_error, unsupported_error, Result};
use symphonia_core::formats::Packet;
use symphonia_core::support_codec;

pub const CODEC_TYPE_LC3: CodecType = decl_codec_type(b"lc3");

/// Frame duration assumed when the codec parameters do not say.
const DEFAULT_FRAME_US: u32 = 10000;

/// LC3 decoder.
///
/// One packet carries one mono frame. An empty packet stands for a lost
/// frame and is concealed.
pub struct Decoder {
    decoded_data: AudioBuffer<i16>,
    params: CodecParameters,
    geometry: FrameGeometry,
    session: DecoderSession,
}

impl Decoder {
    fn session(geometry: &FrameGeometry) -> Result<DecoderSession> {
        SessionBuilder::default()
            .trace(Arc::new(LogTrace))
            .decoder(geometry.frame_duration_us(), geometry.sample_rate_hz())
            .or_else(|e| {
                log::error!("lc3: {e}");
                unsupported_error("lc3: failed to set up decoder")
            })
    }

    /// Frame geometry of `params`. The frame duration follows from
    /// `max_frames_per_packet`, the number of samples in one packet.
    fn resolve_geometry(params: &CodecParameters) -> Result<FrameGeometry> {
        let Some(sr) = params.sample_rate else {
            return unsupported_error("lc3: sample rate is required");
        };
        if params.channels.map_or(false, |c| c.count() != 1) {
            return unsupported_error("lc3: only mono streams are supported");
        }
        let dt = match params.max_frames_per_packet {
            Some(frames) => {
                let dt = frames
                    .checked_mul(1_000_000)
                    .and_then(|us| u32::try_from(us / u64::from(sr.max(1))).ok());
                match dt {
                    Some(dt) => dt,
                    None => return unsupported_error("lc3: frame duration out of range"),
                }
            }
            None => DEFAULT_FRAME_US,
        };
        match FrameGeometry::resolve(dt, sr) {
            Some(geometry) => Ok(geometry),
            None => unsupported_error("lc3: unsupported frame duration or sample rate"),
        }
    }

    pub fn frame_geometry(&self) -> &FrameGeometry {
        &self.geometry
    }
}

impl D for Decoder {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> Result<Self>
    where
        Self: Sized,
    {
        let geometry = Self::resolve_geometry(params)?;
        let session = Self::session(&geometry)?;
        Ok(Self {
            decoded_data: AudioBuffer::new(
                geometry.samples_per_frame() as u64,
                SignalSpec::new(geometry.sample_rate_hz(), Channels::FRONT_CENTRE),
            ),
            params: params.clone(),
            geometry,
            session,
        })
    }

    fn reset(&mut self) {
        match Self::session(&self.geometry) {
            Ok(session) => self.session = session,
            Err(e) => log::warn!("lc3: keeping decoder state across reset: {e}"),
        }
        self.decoded_data.clear();
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[support_codec!(
            CODEC_TYPE_LC3,
            "lc3",
            "Low Complexity Communication Codec"
        )]
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef> {
        self.decoded_data.clear();
        self.decoded_data
            .render_reserved(Some(self.geometry.samples_per_frame()));

        let data = packet.buf();
        let data = (!data.is_empty()).then_some(data);
        if let Err(e) = self.session.decode(data, self.decoded_data.chan_mut(0)) {
            log::warn!("lc3: dropping packet at ts {}: {e}", packet.ts());
            return decode_error("lc3: invalid frame");
        }

        Ok(self.decoded_data.as_audio_buffer_ref())
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> AudioBufferRef {
        self.decoded_data.as_audio_buffer_ref()
    }
}
