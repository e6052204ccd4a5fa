use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::sync::Mutex;

use lc3_ffi::*;

#[test]
fn test_example_scenario() {
    assert_eq!(lc3_get_frame_samples(10000, 16000), 160);
    assert!(lc3_get_encoder_size(10000, 16000) > 0);
    assert!(lc3_get_decoder_size(10000, 16000) > 0);

    let enc = lc3_setup_encoder(10000, 16000);
    let dec = lc3_setup_decoder(10000, 16000);
    assert_ne!(enc, 0);
    assert_ne!(dec, 0);
    assert_ne!(enc, dec);

    let pcm = [0i16; 160];
    let mut payload = [0u8; 40];
    let status = unsafe { lc3_encode(enc, pcm.as_ptr(), 160, 40, payload.as_mut_ptr()) };
    assert_eq!(status, STATUS_OK);

    let mut out = [0x7fi16; 160];
    let status = unsafe { lc3_decode(dec, payload.as_ptr(), 40, out.as_mut_ptr(), 160) };
    assert_eq!(status, STATUS_OK);

    lc3_release_encoder(enc);
    lc3_release_decoder(dec);
}

#[test]
fn test_unsupported_configuration() {
    for (dt, sr) in [(5000, 16000), (10000, 44100), (0, 0)] {
        assert_eq!(lc3_get_frame_samples(dt, sr), 0);
        assert_eq!(lc3_get_encoder_size(dt, sr), 0);
        assert_eq!(lc3_get_decoder_size(dt, sr), 0);
        assert_eq!(lc3_get_delay_samples(dt, sr), 0);
        assert_eq!(lc3_setup_encoder(dt, sr), 0);
        assert_eq!(lc3_setup_decoder(dt, sr), 0);
    }
}

#[test]
fn test_codec_queries() {
    assert_eq!(lc3_get_delay_samples(10000, 48000), 480);
    assert_eq!(lc3_get_frame_bytes(10000, 32000), 40);
    assert_eq!(lc3_get_frame_bytes(7500, 1_000_000), 400);
    assert_eq!(lc3_resolve_bitrate(10000, 40), 32000);
    assert_eq!(lc3_resolve_bitrate(7500, 0), lc3_resolve_bitrate(7500, 20));
    assert_eq!(lc3_resolve_bitrate(2500, 40), 0);
}

#[test]
fn test_null_handle_and_buffers() {
    let pcm = [0i16; 160];
    let mut payload = [0u8; 40];
    let mut out = [0i16; 160];
    unsafe {
        assert_eq!(lc3_encode(0, pcm.as_ptr(), 160, 40, payload.as_mut_ptr()), -2);
        assert_eq!(lc3_decode(0, ptr::null(), 0, out.as_mut_ptr(), 160), -2);
    }

    let enc = lc3_setup_encoder(10000, 16000);
    let dec = lc3_setup_decoder(10000, 16000);
    unsafe {
        assert_eq!(lc3_encode(enc, ptr::null(), 160, 40, payload.as_mut_ptr()), -1);
        assert_eq!(lc3_encode(enc, pcm.as_ptr(), 160, 40, ptr::null_mut()), -1);
        assert_eq!(lc3_encode(enc, pcm.as_ptr(), 160, 0, payload.as_mut_ptr()), -1);
        assert_eq!(lc3_encode(enc, pcm.as_ptr(), 160, -4, payload.as_mut_ptr()), -1);
        assert_eq!(lc3_encode(enc, pcm.as_ptr(), 100, 40, payload.as_mut_ptr()), -1);
        assert_eq!(lc3_decode(dec, ptr::null(), 0, ptr::null_mut(), 160), -1);
        assert_eq!(lc3_decode(dec, ptr::null(), 0, out.as_mut_ptr(), 80), -1);
        // Handles of the wrong kind.
        assert_eq!(lc3_encode(dec, pcm.as_ptr(), 160, 40, payload.as_mut_ptr()), -2);
        assert_eq!(lc3_decode(enc, ptr::null(), 0, out.as_mut_ptr(), 160), -2);
    }
    lc3_release_encoder(enc);
    lc3_release_decoder(dec);
}

#[test]
fn test_oversized_frame_is_refused() {
    let enc = lc3_setup_encoder(10000, 16000);
    let dec = lc3_setup_decoder(10000, 16000);
    let pcm = [0i16; 160];
    let mut payload = [0xaau8; 500];
    let mut out = [0i16; 160];
    unsafe {
        assert_eq!(lc3_encode(enc, pcm.as_ptr(), 160, 500, payload.as_mut_ptr()), -1);
        assert!(payload.iter().all(|b| *b == 0xaa));

        // Every accepted frame size round trips through the decoder.
        for nbytes in [20, 400] {
            let status = lc3_encode(enc, pcm.as_ptr(), 160, nbytes, payload.as_mut_ptr());
            assert_eq!(status, STATUS_OK);
            let status = lc3_decode(dec, payload.as_ptr(), nbytes, out.as_mut_ptr(), 160);
            assert_eq!(status, STATUS_OK);
        }
    }
    lc3_release_encoder(enc);
    lc3_release_decoder(dec);
}

#[test]
fn test_lost_frame_is_concealed() {
    let dec = lc3_setup_decoder(7500, 48000);
    let n = lc3_get_frame_samples(7500, 48000) as usize;
    let mut out = vec![-1i16; n];
    let status = unsafe { lc3_decode(dec, ptr::null(), 0, out.as_mut_ptr(), n as c_int) };
    assert_eq!(status, STATUS_CONCEALED);
    assert!(out.iter().all(|s| *s == 0));
    lc3_release_decoder(dec);
}

#[test]
fn test_release_is_idempotent() {
    lc3_release_encoder(0);
    lc3_release_decoder(0);

    let enc = lc3_setup_encoder(7500, 8000);
    let dec = lc3_setup_decoder(7500, 8000);
    // Wrong kind: nothing happens.
    lc3_release_encoder(dec);
    lc3_release_decoder(enc);

    let pcm = [0i16; 60];
    let mut payload = [0u8; 20];
    let status = unsafe { lc3_encode(enc, pcm.as_ptr(), 60, 20, payload.as_mut_ptr()) };
    assert_eq!(status, STATUS_OK);

    lc3_release_encoder(enc);
    lc3_release_encoder(enc);
    lc3_release_decoder(dec);
    lc3_release_decoder(dec);

    let status = unsafe { lc3_encode(enc, pcm.as_ptr(), 60, 20, payload.as_mut_ptr()) };
    assert_eq!(status, -2);
    // Released handles are not handed out again.
    let next = lc3_setup_encoder(7500, 8000);
    assert!(next != enc && next != dec);
    lc3_release_encoder(next);
}

static TRACED: Mutex<Vec<(usize, c_int, String)>> = Mutex::new(Vec::new());

extern "C" fn record(user_data: *mut c_void, level: c_int, message: *const c_char) {
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
    if let Ok(mut traced) = TRACED.lock() {
        traced.push((user_data as usize, level, message));
    }
}

#[test]
fn test_trace_callback() {
    unsafe { lc3_set_trace_callback(Some(record as Lc3TraceCallback), 0x1c3 as *mut c_void) };
    let dec = lc3_setup_decoder(7500, 32000);
    unsafe { lc3_set_trace_callback(None, ptr::null_mut()) };

    let mut out = [0i16; 240];
    let status = unsafe { lc3_decode(dec, ptr::null(), 0, out.as_mut_ptr(), 240) };
    assert_eq!(status, STATUS_CONCEALED);
    lc3_release_decoder(dec);

    let traced = TRACED.lock().unwrap();
    assert!(traced.iter().all(|(user_data, _, _)| *user_data == 0x1c3));
    let seen = |level: c_int, prefix: &str| {
        traced
            .iter()
            .any(|(_, l, m)| *l == level && m.starts_with(prefix))
    };
    assert!(seen(LC3_TRACE_DEBUG, "Decoder set up: 7500 us at 32000 Hz"));
    assert!(seen(LC3_TRACE_INFO, "concealed lost frame"));
    assert!(seen(LC3_TRACE_DEBUG, "Decoder released"));
}
