use std::sync::Arc;

use lc3_transform::{Config, Outcome, StateBlock, MAX_FRAME_BYTES, MIN_FRAME_BYTES};

use crate::alloc::{HeapAllocator, StateAllocator};
use crate::engine::{Lc3Engine, TransformEngine};
use crate::error::{Error, Result, STATUS_CONCEALED, STATUS_OK};
use crate::geometry::FrameGeometry;
use crate::trace::{Trace, TraceEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Encoder,
    Decoder,
}

/// Successful outcome of [`DecoderSession::decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStatus {
    Decoded,
    /// The frame was synthesized because its payload was missing or
    /// unusable. Successful, but degraded.
    Concealed,
}

impl DecodeStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::Decoded => STATUS_OK,
            Self::Concealed => STATUS_CONCEALED,
        }
    }
}

impl From<Outcome> for DecodeStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Decoded => Self::Decoded,
            Outcome::Concealed => Self::Concealed,
        }
    }
}

/// Everything a session needs besides its geometry: the engine, the
/// allocator its block comes from and an optional trace hook.
pub struct SessionBuilder<E: TransformEngine = Lc3Engine> {
    engine: E,
    allocator: Arc<dyn StateAllocator>,
    trace: Option<Arc<dyn Trace>>,
}

impl Default for SessionBuilder<Lc3Engine> {
    fn default() -> Self {
        Self::with_engine(Lc3Engine)
    }
}

impl<E: TransformEngine> SessionBuilder<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            allocator: Arc::new(HeapAllocator),
            trace: None,
        }
    }

    pub fn allocator(mut self, allocator: Arc<dyn StateAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn trace(mut self, trace: Arc<dyn Trace>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub(crate) fn set_trace(&mut self, trace: Option<Arc<dyn Trace>>) {
        self.trace = trace;
    }

    pub fn resolve(&self, dt_us: u32, sr_hz: u32) -> Option<FrameGeometry> {
        FrameGeometry::resolve_with(&self.engine, dt_us, sr_hz)
    }

    pub fn encoder(&self, dt_us: u32, sr_hz: u32) -> Result<EncoderSession<E>> {
        let (geometry, state) = self.setup(SessionKind::Encoder, dt_us, sr_hz, E::setup_encoder)?;
        Ok(EncoderSession {
            core: self.core(geometry, SessionKind::Encoder),
            state: Some(state),
        })
    }

    pub fn decoder(&self, dt_us: u32, sr_hz: u32) -> Result<DecoderSession<E>> {
        let (geometry, state) = self.setup(SessionKind::Decoder, dt_us, sr_hz, E::setup_decoder)?;
        Ok(DecoderSession {
            core: self.core(geometry, SessionKind::Decoder),
            state: Some(state),
        })
    }

    fn core(&self, geometry: FrameGeometry, kind: SessionKind) -> Core<E> {
        let core = Core {
            engine: self.engine.clone(),
            geometry,
            allocator: self.allocator.clone(),
            trace: self.trace.clone(),
        };
        core.emit(&TraceEvent::Created {
            kind,
            geometry: &core.geometry,
        });
        core
    }

    fn setup<S>(
        &self,
        kind: SessionKind,
        dt_us: u32,
        sr_hz: u32,
        init: impl FnOnce(&E, Config, StateBlock) -> std::result::Result<S, StateBlock>,
    ) -> Result<(FrameGeometry, S)> {
        let result = self.try_setup(kind, dt_us, sr_hz, init);
        if let (Err(error), Some(trace)) = (&result, &self.trace) {
            trace.event(&TraceEvent::SetupFailed {
                kind,
                dt_us,
                sr_hz,
                error,
            });
        }
        result
    }

    /// Resolve, acquire, initialise. Every failure leaves the allocator as
    /// it found it.
    fn try_setup<S>(
        &self,
        kind: SessionKind,
        dt_us: u32,
        sr_hz: u32,
        init: impl FnOnce(&E, Config, StateBlock) -> std::result::Result<S, StateBlock>,
    ) -> Result<(FrameGeometry, S)> {
        let geometry = self
            .resolve(dt_us, sr_hz)
            .ok_or(Error::UnsupportedConfig { dt_us, sr_hz })?;
        let bytes = geometry.footprint(kind);
        let block = self
            .allocator
            .acquire(bytes)
            .ok_or(Error::OutOfMemory(bytes))?;

        match init(&self.engine, geometry.config(), block) {
            Ok(state) => Ok((geometry, state)),
            Err(block) => {
                self.allocator.release(block);
                Err(Error::EngineRejected)
            }
        }
    }
}

/// Parts shared by both session kinds.
struct Core<E> {
    engine: E,
    geometry: FrameGeometry,
    allocator: Arc<dyn StateAllocator>,
    trace: Option<Arc<dyn Trace>>,
}

impl<E> Core<E> {
    fn emit(&self, event: &TraceEvent<'_>) {
        if let Some(trace) = &self.trace {
            trace.event(event);
        }
    }

    fn fail(&self, kind: SessionKind, error: Error) -> Error {
        self.emit(&TraceEvent::Failed {
            kind,
            error: &error,
        });
        error
    }
}

/// One configured encoder. Its state block goes back to its allocator when
/// the session is released or dropped.
pub struct EncoderSession<E: TransformEngine = Lc3Engine> {
    core: Core<E>,
    state: Option<E::Encoder>,
}

impl EncoderSession<Lc3Engine> {
    /// Sets up an encoder with the default engine and heap allocation.
    pub fn setup(dt_us: u32, sr_hz: u32) -> Result<Self> {
        SessionBuilder::default().encoder(dt_us, sr_hz)
    }
}

impl<E: TransformEngine> EncoderSession<E> {
    pub fn geometry(&self) -> &FrameGeometry {
        &self.core.geometry
    }

    /// Encodes one frame into `out`, using `min(out.len(), 400)` bytes.
    /// Returns the number of bytes written.
    pub fn encode_into(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        let result = self.try_encode(pcm, out);
        match &result {
            Ok(bytes) => self.core.emit(&TraceEvent::Encoded { bytes: *bytes }),
            Err(error) => self.core.emit(&TraceEvent::Failed {
                kind: SessionKind::Encoder,
                error,
            }),
        }
        result
    }

    /// Encodes one frame into a fresh buffer of `nbytes`.
    pub fn encode(&mut self, pcm: &[i16], nbytes: usize) -> Result<Vec<u8>> {
        if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&nbytes) {
            return Err(self.core.fail(SessionKind::Encoder, Error::FrameBytes(nbytes)));
        }
        let mut out = vec![0; nbytes];
        self.encode_into(pcm, &mut out)?;
        Ok(out)
    }

    fn try_encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        let expected = self.core.geometry.samples_per_frame();
        if pcm.len() != expected {
            return Err(Error::FrameSize {
                expected,
                actual: pcm.len(),
            });
        }
        if out.len() < MIN_FRAME_BYTES {
            return Err(Error::FrameBytes(out.len()));
        }
        let nbytes = out.len().min(MAX_FRAME_BYTES);
        let state = self.state.as_mut().ok_or(Error::InvalidHandle)?;
        self.core.engine.encode(state, pcm, &mut out[..nbytes])?;
        Ok(nbytes)
    }

    /// Releases the session and its state block.
    pub fn release(self) {}
}

impl<E: TransformEngine> Drop for EncoderSession<E> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let block = self.core.engine.reclaim_encoder(state);
            self.core.allocator.release(block);
            self.core.emit(&TraceEvent::Released {
                kind: SessionKind::Encoder,
            });
        }
    }
}

/// One configured decoder. Its state block goes back to its allocator when
/// the session is released or dropped.
pub struct DecoderSession<E: TransformEngine = Lc3Engine> {
    core: Core<E>,
    state: Option<E::Decoder>,
}

impl DecoderSession<Lc3Engine> {
    /// Sets up a decoder with the default engine and heap allocation.
    pub fn setup(dt_us: u32, sr_hz: u32) -> Result<Self> {
        SessionBuilder::default().decoder(dt_us, sr_hz)
    }
}

impl<E: TransformEngine> DecoderSession<E> {
    pub fn geometry(&self) -> &FrameGeometry {
        &self.core.geometry
    }

    /// Decodes one frame into the first `samples_per_frame` samples of `pcm`.
    ///
    /// `data == None` means the frame was lost and is concealed. On success
    /// exactly one frame of `pcm` is written.
    pub fn decode(&mut self, data: Option<&[u8]>, pcm: &mut [i16]) -> Result<DecodeStatus> {
        let result = self.try_decode(data, pcm);
        match &result {
            Ok(status) => self.core.emit(&TraceEvent::Decoded {
                status: *status,
                bytes: data.map(<[u8]>::len),
            }),
            Err(error) => self.core.emit(&TraceEvent::Failed {
                kind: SessionKind::Decoder,
                error,
            }),
        }
        result
    }

    /// Decodes one frame into a fresh buffer.
    pub fn decode_to_vec(&mut self, data: Option<&[u8]>) -> Result<(DecodeStatus, Vec<i16>)> {
        let mut pcm = vec![0; self.core.geometry.samples_per_frame()];
        let status = self.decode(data, &mut pcm)?;
        Ok((status, pcm))
    }

    fn try_decode(&mut self, data: Option<&[u8]>, pcm: &mut [i16]) -> Result<DecodeStatus> {
        let expected = self.core.geometry.samples_per_frame();
        if pcm.len() < expected {
            return Err(Error::FrameSize {
                expected,
                actual: pcm.len(),
            });
        }
        if let Some(data) = data {
            if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&data.len()) {
                return Err(Error::FrameBytes(data.len()));
            }
        }
        let state = self.state.as_mut().ok_or(Error::InvalidHandle)?;
        let outcome = self
            .core
            .engine
            .decode(state, data, &mut pcm[..expected])?;
        Ok(outcome.into())
    }

    /// Releases the session and its state block.
    pub fn release(self) {}
}

impl<E: TransformEngine> Drop for DecoderSession<E> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let block = self.core.engine.reclaim_decoder(state);
            self.core.allocator.release(block);
            self.core.emit(&TraceEvent::Released {
                kind: SessionKind::Decoder,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::alloc::TrackingAllocator;

    fn tracked() -> (Arc<TrackingAllocator>, SessionBuilder) {
        let allocator = Arc::new(TrackingAllocator::new());
        let builder = SessionBuilder::default().allocator(allocator.clone());
        (allocator, builder)
    }

    /// Engine whose initialiser always refuses the block.
    #[derive(Clone)]
    struct Refusing;

    impl TransformEngine for Refusing {
        type Encoder = lc3_transform::Encoder;
        type Decoder = lc3_transform::Decoder;

        fn frame_samples(&self, config: Config) -> usize {
            Lc3Engine.frame_samples(config)
        }
        fn encoder_size(&self, config: Config) -> usize {
            Lc3Engine.encoder_size(config)
        }
        fn decoder_size(&self, config: Config) -> usize {
            Lc3Engine.decoder_size(config)
        }
        fn setup_encoder(
            &self,
            _: Config,
            block: StateBlock,
        ) -> std::result::Result<Self::Encoder, StateBlock> {
            Err(block)
        }
        fn setup_decoder(
            &self,
            _: Config,
            block: StateBlock,
        ) -> std::result::Result<Self::Decoder, StateBlock> {
            Err(block)
        }
        fn encode(
            &self,
            encoder: &mut Self::Encoder,
            pcm: &[i16],
            out: &mut [u8],
        ) -> lc3_transform::Result<()> {
            Lc3Engine.encode(encoder, pcm, out)
        }
        fn decode(
            &self,
            decoder: &mut Self::Decoder,
            data: Option<&[u8]>,
            pcm: &mut [i16],
        ) -> lc3_transform::Result<Outcome> {
            Lc3Engine.decode(decoder, data, pcm)
        }
        fn reclaim_encoder(&self, encoder: Self::Encoder) -> StateBlock {
            encoder.into_block()
        }
        fn reclaim_decoder(&self, decoder: Self::Decoder) -> StateBlock {
            decoder.into_block()
        }
    }

    #[test]
    fn test_example_scenario() {
        let mut encoder = EncoderSession::setup(10000, 16000).unwrap();
        let mut decoder = DecoderSession::setup(10000, 16000).unwrap();
        assert_eq!(encoder.geometry().samples_per_frame(), 160);

        let mut payload = [0u8; 40];
        let written = encoder.encode_into(&[0; 160], &mut payload).unwrap();
        assert!(written <= 40);

        let (status, pcm) = decoder.decode_to_vec(Some(&payload[..written])).unwrap();
        assert_eq!(status, DecodeStatus::Decoded);
        assert_eq!(status.code(), 0);
        assert_eq!(pcm.len(), 160);
    }

    #[test]
    fn test_roundtrip_length() {
        for (dt, sr) in [(7500, 8000), (10000, 24000), (7500, 48000)] {
            let mut encoder = EncoderSession::setup(dt, sr).unwrap();
            let mut decoder = DecoderSession::setup(dt, sr).unwrap();
            let n = encoder.geometry().samples_per_frame();
            let frame: Vec<i16> = (0..n).map(|i| ((i * 97) % 2000) as i16 - 1000).collect();

            let payload = encoder.encode(&frame, 60).unwrap();
            assert_eq!(payload.len(), 60);
            let (status, pcm) = decoder.decode_to_vec(Some(&payload[..])).unwrap();
            assert_eq!(status, DecodeStatus::Decoded);
            assert_eq!(pcm.len(), frame.len());
        }
    }

    #[test]
    fn test_roundtrip_keeps_signal() {
        let mut encoder = EncoderSession::setup(10000, 16000).unwrap();
        let mut decoder = DecoderSession::setup(10000, 16000).unwrap();
        let n = encoder.geometry().samples_per_frame();
        let input: Vec<i16> = (0..n * 12)
            .map(|i| {
                let t = i as f32 / 16000.0;
                (6000.0 * (2.0 * std::f32::consts::PI * 500.0 * t).sin()) as i16
            })
            .collect();

        let mut output = Vec::with_capacity(input.len());
        for frame in input.chunks(n) {
            let payload = encoder.encode(frame, 120).unwrap();
            let (status, pcm) = decoder.decode_to_vec(Some(&payload[..])).unwrap();
            assert_eq!(status, DecodeStatus::Decoded);
            output.extend(pcm);
        }

        // output lags by one frame, the first frame is warm-up
        let (mut signal, mut noise) = (0f64, 0f64);
        for (out, expected) in output[2 * n..].iter().zip(&input[n..]) {
            signal += f64::from(*expected).powi(2);
            noise += (f64::from(*out) - f64::from(*expected)).powi(2);
        }
        let snr = 10.0 * (signal / noise.max(1.0)).log10();
        assert!(snr > 15.0, "snr {snr} dB");
    }

    #[test]
    fn test_capacity_is_clamped() {
        let mut encoder = EncoderSession::setup(10000, 48000).unwrap();
        let mut out = vec![0u8; 1000];
        assert_eq!(encoder.encode_into(&[0; 480], &mut out), Ok(MAX_FRAME_BYTES));

        let mut small = [0u8; 19];
        assert_eq!(
            encoder.encode_into(&[0; 480], &mut small),
            Err(Error::FrameBytes(19))
        );
        assert_eq!(encoder.encode(&[0; 480], 0), Err(Error::FrameBytes(0)));
    }

    #[test]
    fn test_invalid_use() {
        let mut encoder = EncoderSession::setup(10000, 16000).unwrap();
        let mut out = [0u8; 40];
        let err = encoder.encode_into(&[], &mut out).unwrap_err();
        assert_eq!(
            err,
            Error::FrameSize {
                expected: 160,
                actual: 0
            }
        );
        assert!(err.status() < 0);

        let mut decoder = DecoderSession::setup(10000, 16000).unwrap();
        let mut pcm = [0i16; 100];
        assert!(decoder.decode(None, &mut pcm).is_err());
        let mut pcm = [0i16; 160];
        assert_eq!(
            decoder.decode(Some(&[0u8; 0][..]), &mut pcm),
            Err(Error::FrameBytes(0))
        );
    }

    #[test]
    fn test_conceal_fresh_decoder() {
        let mut decoder = DecoderSession::setup(10000, 16000).unwrap();
        let mut pcm = [i16::MIN; 200];
        assert_eq!(decoder.decode(None, &mut pcm), Ok(DecodeStatus::Concealed));
        assert!(pcm[..160].iter().all(|s| *s == 0));
        // Past one frame the buffer is untouched.
        assert!(pcm[160..].iter().all(|s| *s == i16::MIN));
    }

    #[test]
    fn test_unsupported_config_never_allocates() {
        let (allocator, builder) = tracked();
        assert_eq!(
            builder.encoder(10000, 44100).err(),
            Some(Error::UnsupportedConfig {
                dt_us: 10000,
                sr_hz: 44100
            })
        );
        assert!(builder.decoder(0, 16000).is_err());
        assert_eq!(allocator.stats().acquired, 0);
        assert_eq!(allocator.stats().failed, 0);
    }

    #[test]
    fn test_allocation_failure_leaks_nothing() {
        let (allocator, builder) = tracked();
        allocator.fail_next(1);
        let footprint = builder.resolve(10000, 16000).unwrap().encoder_footprint();
        assert_eq!(
            builder.encoder(10000, 16000).err(),
            Some(Error::OutOfMemory(footprint))
        );
        let stats = allocator.stats();
        assert_eq!((stats.failed, stats.live, stats.live_bytes), (1, 0, 0));

        let decoder = builder.decoder(10000, 16000).unwrap();
        assert_eq!(allocator.stats().live, 1);
        decoder.release();
        assert_eq!(allocator.stats().live, 0);
    }

    #[test]
    fn test_engine_rejection_returns_block() {
        let allocator = Arc::new(TrackingAllocator::new());
        let builder = SessionBuilder::with_engine(Refusing).allocator(allocator.clone());
        assert_eq!(
            builder.encoder(10000, 16000).err(),
            Some(Error::EngineRejected)
        );
        assert_eq!(builder.decoder(7500, 8000).err(), Some(Error::EngineRejected));
        let stats = allocator.stats();
        assert_eq!((stats.acquired, stats.released, stats.live), (2, 2, 0));
        assert_eq!(stats.foreign, 0);
    }

    #[test]
    fn test_release_returns_block_to_its_allocator() {
        let (allocator, builder) = tracked();
        let encoder = builder.encoder(10000, 16000).unwrap();
        let decoder = builder.decoder(10000, 16000).unwrap();
        let geometry = *encoder.geometry();
        assert_eq!(
            allocator.stats().live_bytes,
            geometry.encoder_footprint() + geometry.decoder_footprint()
        );
        // Never used: still reclaimed.
        encoder.release();
        drop(decoder);
        let stats = allocator.stats();
        assert_eq!((stats.released, stats.live, stats.foreign), (2, 0, 0));
    }

    #[test]
    fn test_trace_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let builder = SessionBuilder::default().trace(Arc::new(move |e: &TraceEvent<'_>| {
            sink.lock().unwrap().push(e.to_string())
        }));

        let mut decoder = builder.decoder(10000, 16000).unwrap();
        decoder.decode_to_vec(None).unwrap();
        decoder.release();
        assert!(builder.encoder(1, 1).is_err());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(events[0].starts_with("Decoder set up"));
        assert_eq!(events[1], "concealed lost frame");
        assert_eq!(events[2], "Decoder released");
        assert!(events[3].starts_with("Encoder setup failed"));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let input: Vec<i16> = (0..160 * 8)
            .map(|i| ((i as f32 * 0.07).sin() * 6000.0) as i16)
            .collect();

        let run = |input: &[i16]| -> Vec<Vec<i16>> {
            let mut encoder = EncoderSession::setup(10000, 16000).unwrap();
            let mut decoder = DecoderSession::setup(10000, 16000).unwrap();
            input
                .chunks(160)
                .enumerate()
                .map(|(i, frame)| {
                    let payload = encoder.encode(frame, 50).unwrap();
                    let data = (i % 3 != 2).then_some(payload.as_slice());
                    decoder.decode_to_vec(data).unwrap().1
                })
                .collect()
        };

        let sequential = (run(&input), run(&input));
        let concurrent = std::thread::scope(|s| {
            let a = s.spawn(|| run(&input));
            let b = s.spawn(|| run(&input));
            (a.join().unwrap(), b.join().unwrap())
        });
        assert_eq!(sequential, concurrent);
    }
}
