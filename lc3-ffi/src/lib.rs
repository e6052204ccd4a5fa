//! C ABI over `lc3-session`.
//!
//! # Symbol prefix
//!
//! All functions are exported as `lc3_*`.
//!
//! # Handles
//!
//! Sessions are referenced by opaque `u64` handles; 0 is the null handle and
//! is what a failed setup returns. Handles are never reused, so releasing a
//! handle twice is harmless.
//!
//! # Status codes
//!
//! `encode` / `decode` return 0 on success, 1 when a decoded frame had to be
//! concealed, and a negative code on failure: -1 for a bad argument, -2 for
//! an invalid handle, -3 for an engine failure.
//!
//! # Thread safety
//!
//! Every function may be called from any thread. Calls on distinct sessions
//! run in parallel; overlapping calls on one session fail with -1 instead of
//! blocking.

mod guard;

use std::ffi::{c_char, c_int, c_void, CString};
use std::slice;
use std::sync::Arc;

use lazy_static::lazy_static;
use lc3_session::{
    DecodeStatus, Error, LogTrace, SessionBuilder, SessionHandle, SessionRegistry, Trace,
    TraceEvent, MAX_FRAME_BYTES, STATUS_ENGINE_FAILURE,
};

use crate::guard::{guard_void, guard_with_default};

pub use lc3_session::{STATUS_CONCEALED, STATUS_OK};

/// Trace levels passed to an [`Lc3TraceCallback`]; same numbering as the
/// `log` crate.
pub const LC3_TRACE_ERROR: c_int = 1;
pub const LC3_TRACE_INFO: c_int = 3;
pub const LC3_TRACE_DEBUG: c_int = 4;

/// Receives one NUL terminated message per session event. The message is
/// only valid for the duration of the call.
pub type Lc3TraceCallback =
    extern "C" fn(user_data: *mut c_void, level: c_int, message: *const c_char);

lazy_static! {
    static ref REGISTRY: SessionRegistry =
        SessionRegistry::with_builder(SessionBuilder::default().trace(Arc::new(LogTrace)));
}

struct CallbackTrace {
    callback: Lc3TraceCallback,
    user_data: usize,
}

impl Trace for CallbackTrace {
    fn event(&self, event: &TraceEvent<'_>) {
        let level = match event {
            e if e.is_error() => LC3_TRACE_ERROR,
            TraceEvent::Decoded {
                status: DecodeStatus::Concealed,
                ..
            } => LC3_TRACE_INFO,
            _ => LC3_TRACE_DEBUG,
        };
        if let Ok(message) = CString::new(event.to_string()) {
            (self.callback)(self.user_data as *mut c_void, level, message.as_ptr());
        }
    }
}

fn int_arg(value: c_int) -> Option<u32> {
    u32::try_from(value).ok()
}

/// Negative lengths are treated as empty buffers.
fn len_arg(value: c_int) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn size_ret(value: usize) -> c_int {
    c_int::try_from(value).unwrap_or(0)
}

fn status(result: Result<c_int, Error>) -> c_int {
    match result {
        Ok(code) => code,
        Err(e) => e.status(),
    }
}

/// Samples per channel in one frame, 0 if the configuration is not
/// supported.
#[no_mangle]
pub extern "C" fn lc3_get_frame_samples(dt_us: c_int, sr_hz: c_int) -> c_int {
    guard_with_default("lc3_get_frame_samples", 0, || match (int_arg(dt_us), int_arg(sr_hz)) {
        (Some(dt), Some(sr)) => size_ret(lc3_session::frame_samples(dt, sr)),
        _ => 0,
    })
}

/// Bytes of state an encoder needs, 0 if the configuration is not
/// supported.
#[no_mangle]
pub extern "C" fn lc3_get_encoder_size(dt_us: c_int, sr_hz: c_int) -> c_int {
    guard_with_default("lc3_get_encoder_size", 0, || match (int_arg(dt_us), int_arg(sr_hz)) {
        (Some(dt), Some(sr)) => size_ret(lc3_session::encoder_size(dt, sr)),
        _ => 0,
    })
}

/// Bytes of state a decoder needs, 0 if the configuration is not
/// supported.
#[no_mangle]
pub extern "C" fn lc3_get_decoder_size(dt_us: c_int, sr_hz: c_int) -> c_int {
    guard_with_default("lc3_get_decoder_size", 0, || match (int_arg(dt_us), int_arg(sr_hz)) {
        (Some(dt), Some(sr)) => size_ret(lc3_session::decoder_size(dt, sr)),
        _ => 0,
    })
}

/// Algorithmic delay in samples, 0 if the configuration is not supported.
#[no_mangle]
pub extern "C" fn lc3_get_delay_samples(dt_us: c_int, sr_hz: c_int) -> c_int {
    guard_with_default("lc3_get_delay_samples", 0, || match (int_arg(dt_us), int_arg(sr_hz)) {
        (Some(dt), Some(sr)) => size_ret(lc3_session::delay_samples(dt, sr)),
        _ => 0,
    })
}

/// Frame size in bytes for a bitrate, clamped to 20..=400. 0 for an
/// unsupported frame duration.
#[no_mangle]
pub extern "C" fn lc3_get_frame_bytes(dt_us: c_int, bitrate: c_int) -> c_int {
    guard_with_default("lc3_get_frame_bytes", 0, || {
        match int_arg(dt_us) {
            Some(dt) => size_ret(lc3_session::frame_bytes(dt, int_arg(bitrate).unwrap_or(0))),
            None => 0,
        }
    })
}

/// Bitrate carried by frames of `nbytes`. 0 for an unsupported frame
/// duration.
#[no_mangle]
pub extern "C" fn lc3_resolve_bitrate(dt_us: c_int, nbytes: c_int) -> c_int {
    guard_with_default("lc3_resolve_bitrate", 0, || {
        match int_arg(dt_us) {
            Some(dt) => {
                c_int::try_from(lc3_session::resolve_bitrate(dt, len_arg(nbytes))).unwrap_or(0)
            }
            None => 0,
        }
    })
}

/// Sets up an encoder. Returns its handle, or 0 on failure.
#[no_mangle]
pub extern "C" fn lc3_setup_encoder(dt_us: c_int, sr_hz: c_int) -> u64 {
    guard_with_default("lc3_setup_encoder", 0, || {
        let (Some(dt), Some(sr)) = (int_arg(dt_us), int_arg(sr_hz)) else {
            return 0;
        };
        REGISTRY
            .setup_encoder(dt, sr)
            .map_or(0, SessionHandle::into_raw)
    })
}

/// Sets up a decoder. Returns its handle, or 0 on failure.
#[no_mangle]
pub extern "C" fn lc3_setup_decoder(dt_us: c_int, sr_hz: c_int) -> u64 {
    guard_with_default("lc3_setup_decoder", 0, || {
        let (Some(dt), Some(sr)) = (int_arg(dt_us), int_arg(sr_hz)) else {
            return 0;
        };
        REGISTRY
            .setup_decoder(dt, sr)
            .map_or(0, SessionHandle::into_raw)
    })
}

unsafe fn encode(
    handle: u64,
    pcm: *const i16,
    nsamples: c_int,
    nbytes: c_int,
    out: *mut u8,
) -> Result<c_int, Error> {
    let handle = SessionHandle::from_raw(handle).ok_or(Error::InvalidHandle)?;
    if pcm.is_null() {
        return Err(Error::NullBuffer("pcm"));
    }
    if out.is_null() {
        return Err(Error::NullBuffer("output"));
    }
    // no way to report a shorter write, so oversized frames are refused
    let nbytes = len_arg(nbytes);
    if nbytes > MAX_FRAME_BYTES {
        return Err(Error::FrameBytes(nbytes));
    }
    let pcm = slice::from_raw_parts(pcm, len_arg(nsamples));
    let out = slice::from_raw_parts_mut(out, nbytes);
    REGISTRY.encode(handle, pcm, out)?;
    Ok(STATUS_OK)
}

unsafe fn decode(
    handle: u64,
    data: *const u8,
    nbytes: c_int,
    pcm: *mut i16,
    nsamples: c_int,
) -> Result<c_int, Error> {
    let handle = SessionHandle::from_raw(handle).ok_or(Error::InvalidHandle)?;
    if pcm.is_null() {
        return Err(Error::NullBuffer("pcm"));
    }
    let data = if data.is_null() {
        None
    } else {
        Some(slice::from_raw_parts(data, len_arg(nbytes)))
    };
    let pcm = slice::from_raw_parts_mut(pcm, len_arg(nsamples));
    let decoded = REGISTRY.decode(handle, data, pcm)?;
    Ok(decoded.code())
}

/// Encodes one frame of `nsamples` samples into exactly `nbytes` bytes of
/// `out`. `nbytes` must lie within 20..=400.
///
/// # Safety
///
/// `pcm` must point to `nsamples` readable samples and `out` to `nbytes`
/// writable bytes, unless they are null.
#[no_mangle]
pub unsafe extern "C" fn lc3_encode(
    handle: u64,
    pcm: *const i16,
    nsamples: c_int,
    nbytes: c_int,
    out: *mut u8,
) -> c_int {
    guard_with_default("lc3_encode", STATUS_ENGINE_FAILURE, || {
        status(encode(handle, pcm, nsamples, nbytes, out))
    })
}

/// Decodes one frame into `pcm`. A null `data` pointer signals a lost
/// frame, which is concealed; the call then returns 1.
///
/// # Safety
///
/// `data` must point to `nbytes` readable bytes unless it is null, and
/// `pcm` to `nsamples` writable samples unless it is null.
#[no_mangle]
pub unsafe extern "C" fn lc3_decode(
    handle: u64,
    data: *const u8,
    nbytes: c_int,
    pcm: *mut i16,
    nsamples: c_int,
) -> c_int {
    guard_with_default("lc3_decode", STATUS_ENGINE_FAILURE, || {
        status(decode(handle, data, nbytes, pcm, nsamples))
    })
}

/// Releases an encoder. Null, unknown and decoder handles are ignored.
#[no_mangle]
pub extern "C" fn lc3_release_encoder(handle: u64) {
    guard_void("lc3_release_encoder", || {
        if let Some(handle) = SessionHandle::from_raw(handle) {
            REGISTRY.release_encoder(handle);
        }
    })
}

/// Releases a decoder. Null, unknown and encoder handles are ignored.
#[no_mangle]
pub extern "C" fn lc3_release_decoder(handle: u64) {
    guard_void("lc3_release_decoder", || {
        if let Some(handle) = SessionHandle::from_raw(handle) {
            REGISTRY.release_decoder(handle);
        }
    })
}

/// Routes the events of sessions set up from now on to `callback`. A null
/// callback restores the default, which forwards to the `log` crate.
///
/// # Safety
///
/// `callback` must be callable from any thread with `user_data` for as
/// long as a session set up after this call is alive.
#[no_mangle]
pub unsafe extern "C" fn lc3_set_trace_callback(
    callback: Option<Lc3TraceCallback>,
    user_data: *mut c_void,
) {
    guard_void("lc3_set_trace_callback", || {
        let trace: Arc<dyn Trace> = match callback {
            Some(callback) => Arc::new(CallbackTrace {
                callback,
                user_data: user_data as usize,
            }),
            None => Arc::new(LogTrace),
        };
        REGISTRY.set_trace(Some(trace));
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use lc3_session::{STATUS_INVALID_ARGUMENT, STATUS_INVALID_HANDLE};

    #[test]
    fn test_argument_conversion() {
        assert_eq!(int_arg(-1), None);
        assert_eq!(int_arg(16000), Some(16000));
        assert_eq!(len_arg(-5), 0);
        assert_eq!(size_ret(usize::MAX), 0);
        assert_eq!(status(Err(Error::InvalidHandle)), STATUS_INVALID_HANDLE);
        assert_eq!(status(Err(Error::NullBuffer("pcm"))), STATUS_INVALID_ARGUMENT);
    }

    #[test]
    fn test_negative_arguments() {
        assert_eq!(lc3_get_frame_samples(-10000, 16000), 0);
        assert_eq!(lc3_get_encoder_size(10000, -16000), 0);
        assert_eq!(lc3_setup_encoder(-1, -1), 0);
        assert_eq!(lc3_get_frame_bytes(-10000, 32000), 0);
        assert_eq!(lc3_get_frame_bytes(10000, -1), 20);
        assert_eq!(lc3_resolve_bitrate(10000, -1), 16000);
    }
}
