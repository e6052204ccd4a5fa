//! Panic guards for the exported functions. A panic never unwinds into the
//! host; it is logged and the call reports its failure value instead.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Runs `f`, returning `default` if it panics.
pub(crate) fn guard_with_default<T>(op: &'static str, default: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(val) => val,
        Err(payload) => {
            log::error!("panic in `{op}`: {}", panic_message(payload));
            default
        }
    }
}

pub(crate) fn guard_void(op: &'static str, f: impl FnOnce()) {
    guard_with_default(op, (), f)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_guard_with_default() {
        assert_eq!(guard_with_default("ok", -1, || 7), 7);
        assert_eq!(guard_with_default("boom", -1, || panic!("boom")), -1);
        guard_void("boom", || panic!("{}", String::from("owned")));
    }

    #[test]
    fn test_panic_message() {
        let payload = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload), "static");
        let payload = catch_unwind(|| std::panic::panic_any(3u8)).unwrap_err();
        assert_eq!(panic_message(payload), "non-string panic payload");
    }
}
