//! Maps opaque handles to live sessions.
//!
//! Handles are plain `u64` ids handed out from a monotonic counter, so a
//! released handle is never issued again. Decoder ids carry the top bit,
//! which lets a handle of the wrong kind be rejected without a lookup.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use crate::engine::{Lc3Engine, TransformEngine};
use crate::error::{Error, Result};
use crate::geometry::FrameGeometry;
use crate::session::{DecodeStatus, DecoderSession, EncoderSession, SessionBuilder, SessionKind};
use crate::trace::Trace;

const DECODER_TAG: u64 = 1 << 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(NonZeroU64);

impl SessionHandle {
    /// `None` for the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn into_raw(self) -> u64 {
        self.0.get()
    }

    pub fn kind(&self) -> SessionKind {
        if self.0.get() & DECODER_TAG != 0 {
            SessionKind::Decoder
        } else {
            SessionKind::Encoder
        }
    }
}

enum Slot<E: TransformEngine> {
    Encoder(Arc<Mutex<EncoderSession<E>>>),
    Decoder(Arc<Mutex<DecoderSession<E>>>),
}

impl<E: TransformEngine> Clone for Slot<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Encoder(session) => Self::Encoder(session.clone()),
            Self::Decoder(session) => Self::Decoder(session.clone()),
        }
    }
}

/// Thread safe handle table.
///
/// The table lock only covers lookups, inserts and removals. Each session
/// has its own lock which is never waited on: a second caller on a session
/// that is already busy gets [`Error::Busy`].
pub struct SessionRegistry<E: TransformEngine = Lc3Engine> {
    builder: RwLock<SessionBuilder<E>>,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionHandle, Slot<E>>>,
}

impl Default for SessionRegistry<Lc3Engine> {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry<Lc3Engine> {
    pub fn new() -> Self {
        Self::with_builder(SessionBuilder::default())
    }
}

impl<E: TransformEngine> SessionRegistry<E> {
    pub fn with_builder(builder: SessionBuilder<E>) -> Self {
        Self {
            builder: RwLock::new(builder),
            next_id: AtomicU64::new(1),
            sessions: Mutex::default(),
        }
    }

    /// Installs (or removes) the trace hook for sessions set up from now on.
    pub fn set_trace(&self, trace: Option<Arc<dyn Trace>>) {
        self.builder
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_trace(trace);
    }

    pub fn setup_encoder(&self, dt_us: u32, sr_hz: u32) -> Result<SessionHandle> {
        let handle = self.next_handle(SessionKind::Encoder)?;
        let session = self.builder().encoder(dt_us, sr_hz)?;
        self.insert(handle, Slot::Encoder(Arc::new(Mutex::new(session))));
        Ok(handle)
    }

    pub fn setup_decoder(&self, dt_us: u32, sr_hz: u32) -> Result<SessionHandle> {
        let handle = self.next_handle(SessionKind::Decoder)?;
        let session = self.builder().decoder(dt_us, sr_hz)?;
        self.insert(handle, Slot::Decoder(Arc::new(Mutex::new(session))));
        Ok(handle)
    }

    /// Encodes one frame with the encoder behind `handle`. See
    /// [`EncoderSession::encode_into`].
    pub fn encode(&self, handle: SessionHandle, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        match self.lookup(handle)? {
            Slot::Encoder(session) => {
                let mut session = try_lock(&session)?;
                session.encode_into(pcm, out)
            }
            Slot::Decoder(_) => Err(Error::KindMismatch {
                expected: SessionKind::Encoder,
                actual: SessionKind::Decoder,
            }),
        }
    }

    /// Decodes one frame with the decoder behind `handle`. See
    /// [`DecoderSession::decode`].
    pub fn decode(
        &self,
        handle: SessionHandle,
        data: Option<&[u8]>,
        pcm: &mut [i16],
    ) -> Result<DecodeStatus> {
        match self.lookup(handle)? {
            Slot::Decoder(session) => {
                let mut session = try_lock(&session)?;
                session.decode(data, pcm)
            }
            Slot::Encoder(_) => Err(Error::KindMismatch {
                expected: SessionKind::Decoder,
                actual: SessionKind::Encoder,
            }),
        }
    }

    /// Geometry of the session behind `handle`.
    pub fn geometry(&self, handle: SessionHandle) -> Result<FrameGeometry> {
        let geometry = match self.lookup(handle)? {
            Slot::Encoder(session) => {
                let session = try_lock(&session)?;
                *session.geometry()
            }
            Slot::Decoder(session) => {
                let session = try_lock(&session)?;
                *session.geometry()
            }
        };
        Ok(geometry)
    }

    /// Removes the session and reclaims its state. Unknown handles are
    /// ignored; returns whether a session was removed.
    ///
    /// A call still running on the session keeps it alive until it
    /// returns, after which the state is reclaimed.
    pub fn release(&self, handle: SessionHandle) -> bool {
        let slot = self.table().remove(&handle);
        // Dropped outside the table lock.
        slot.is_some()
    }

    /// Like [`release`](Self::release), but ignores decoder handles.
    pub fn release_encoder(&self, handle: SessionHandle) -> bool {
        handle.kind() == SessionKind::Encoder && self.release(handle)
    }

    /// Like [`release`](Self::release), but ignores encoder handles.
    pub fn release_decoder(&self, handle: SessionHandle) -> bool {
        handle.kind() == SessionKind::Decoder && self.release(handle)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn builder(&self) -> std::sync::RwLockReadGuard<'_, SessionBuilder<E>> {
        self.builder.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<SessionHandle, Slot<E>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves the next id. Ids are consumed even when the setup that
    /// asked for them fails.
    fn next_handle(&self, kind: SessionKind) -> Result<SessionHandle> {
        let id = self
            .next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                (id < DECODER_TAG).then_some(id + 1)
            })
            .map_err(|_| Error::HandlesExhausted)?;
        let raw = match kind {
            SessionKind::Encoder => id,
            SessionKind::Decoder => id | DECODER_TAG,
        };
        SessionHandle::from_raw(raw).ok_or(Error::HandlesExhausted)
    }

    fn insert(&self, handle: SessionHandle, slot: Slot<E>) {
        self.table().insert(handle, slot);
    }

    fn lookup(&self, handle: SessionHandle) -> Result<Slot<E>> {
        self.table()
            .get(&handle)
            .cloned()
            .ok_or(Error::InvalidHandle)
    }

    #[cfg(test)]
    fn skip_to(&self, id: u64) {
        self.next_id.store(id, Ordering::Relaxed);
    }
}

fn try_lock<T>(session: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    session.try_lock().map_err(|e| match e {
        TryLockError::WouldBlock => Error::Busy,
        TryLockError::Poisoned(_) => Error::Poisoned,
    })
}
