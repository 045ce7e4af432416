//! Zeroization with a fixed order of preference.
//!
//! Each [`WipeStrategy`] reports whether it could run at all; the eraser then
//! checks the buffer itself. Anything short of an all-zero buffer falls
//! through to the next strategy and finally to [`OverwriteFallback`], which
//! always runs when nothing before it succeeded.

use std::ptr;
use std::sync::atomic::{compiler_fence, Ordering};

use rand_core::{OsRng, RngCore};
use tracing::{debug, trace, warn};
use zeroize::Zeroize;

use crate::error::EraseBestEffortFailure;

pub trait WipeStrategy: Sync {
    fn name(&self) -> &'static str;

    /// Zero `buf`. Returns `false` if the primitive is not available here.
    fn wipe(&self, buf: &mut [u8]) -> bool;
}

/// The platform's non-elidable zeroing call: `explicit_bzero` on Linux and
/// the BSDs, `explicit_memset` on NetBSD, `memset_s` on Apple targets, and
/// the volatile loop behind `RtlSecureZeroMemory` on Windows.
pub struct OsSecureZero;

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd", target_os = "dragonfly"))]
mod os {
    extern "C" {
        fn explicit_bzero(s: *mut libc::c_void, n: libc::size_t);
    }

    pub(super) const NAME: &str = "explicit_bzero";

    pub(super) fn secure_zero(buf: &mut [u8]) -> bool {
        // SAFETY: pointer and length come from a live exclusive slice.
        unsafe { explicit_bzero(buf.as_mut_ptr().cast(), buf.len()) };
        true
    }
}

#[cfg(target_os = "netbsd")]
mod os {
    extern "C" {
        fn explicit_memset(s: *mut libc::c_void, c: libc::c_int, n: libc::size_t) -> *mut libc::c_void;
    }

    pub(super) const NAME: &str = "explicit_memset";

    pub(super) fn secure_zero(buf: &mut [u8]) -> bool {
        // SAFETY: pointer and length come from a live exclusive slice.
        unsafe { explicit_memset(buf.as_mut_ptr().cast(), 0, buf.len()) };
        true
    }
}

#[cfg(target_vendor = "apple")]
mod os {
    extern "C" {
        fn memset_s(s: *mut libc::c_void, smax: libc::size_t, c: libc::c_int, n: libc::size_t) -> libc::c_int;
    }

    pub(super) const NAME: &str = "memset_s";

    pub(super) fn secure_zero(buf: &mut [u8]) -> bool {
        // SAFETY: pointer and length come from a live exclusive slice; smax == n.
        unsafe { memset_s(buf.as_mut_ptr().cast(), buf.len(), 0, buf.len()) == 0 }
    }
}

#[cfg(windows)]
mod os {
    use std::ptr;
    use std::sync::atomic::{compiler_fence, Ordering};

    // RtlSecureZeroMemory is a header inline, not an export; this is its body.
    pub(super) const NAME: &str = "RtlSecureZeroMemory";

    pub(super) fn secure_zero(buf: &mut [u8]) -> bool {
        for b in buf.iter_mut() {
            // SAFETY: `b` is a valid, aligned, exclusive reference into `buf`.
            unsafe { ptr::write_volatile(b, 0) };
        }
        compiler_fence(Ordering::SeqCst);
        true
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_vendor = "apple",
    windows
)))]
mod os {
    pub(super) const NAME: &str = "none";

    pub(super) fn secure_zero(_buf: &mut [u8]) -> bool {
        false
    }
}

impl WipeStrategy for OsSecureZero {
    fn name(&self) -> &'static str {
        os::NAME
    }

    fn wipe(&self, buf: &mut [u8]) -> bool {
        if buf.is_empty() {
            return true;
        }
        os::secure_zero(buf)
    }
}

/// The `zeroize` crate's volatile zero.
pub struct ExplicitZero;

impl WipeStrategy for ExplicitZero {
    fn name(&self) -> &'static str {
        "zeroize"
    }

    fn wipe(&self, buf: &mut [u8]) -> bool {
        buf.zeroize();
        true
    }
}

/// Pattern passes, one random pass, then zeros. Every pass is a volatile
/// full-length write followed by a compiler fence.
pub struct OverwriteFallback;

const PATTERNS: [u8; 2] = [0xFF, 0xA5];

impl WipeStrategy for OverwriteFallback {
    fn name(&self) -> &'static str {
        "overwrite"
    }

    fn wipe(&self, buf: &mut [u8]) -> bool {
        for pattern in PATTERNS {
            volatile_fill(buf, pattern);
        }
        random_pass(buf);
        volatile_fill(buf, 0);
        true
    }
}

fn volatile_fill(buf: &mut [u8], byte: u8) {
    for b in buf.iter_mut() {
        // SAFETY: `b` is a valid, aligned, exclusive reference into `buf`.
        unsafe { ptr::write_volatile(b, byte) };
    }
    compiler_fence(Ordering::SeqCst);
}

fn random_pass(buf: &mut [u8]) {
    let mut noise = [0u8; 64];
    for chunk in buf.chunks_mut(noise.len()) {
        let noise = &mut noise[..chunk.len()];
        if OsRng.try_fill_bytes(noise).is_err() {
            // Still non-zero data, which is all this pass needs.
            noise.fill(0x5A);
        }
        for (dst, src) in chunk.iter_mut().zip(noise.iter()) {
            // SAFETY: `dst` is a valid, aligned, exclusive reference into `buf`.
            unsafe { ptr::write_volatile(dst, *src) };
        }
    }
    noise.zeroize();
    compiler_fence(Ordering::SeqCst);
}

fn remaining_nonzero(buf: &[u8]) -> usize {
    buf.iter()
        // SAFETY: `b` points into a live slice.
        .filter(|b| unsafe { ptr::read_volatile(*b) } != 0)
        .count()
}

static STANDARD: &[&dyn WipeStrategy] = &[&OsSecureZero, &ExplicitZero];

/// Ordered list of wipe primitives with a mandatory overwrite fallback.
#[derive(Clone, Copy)]
pub struct SecureEraser<'a> {
    strategies: &'a [&'a dyn WipeStrategy],
}

impl SecureEraser<'static> {
    /// OS primitive first, then `zeroize`. Static, so it never allocates.
    pub fn standard() -> Self {
        Self { strategies: STANDARD }
    }
}

impl Default for SecureEraser<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> SecureEraser<'a> {
    pub fn with_strategies(strategies: &'a [&'a dyn WipeStrategy]) -> Self {
        Self { strategies }
    }

    /// Leave every byte of `buf` at zero. Never fails and never panics; a
    /// buffer that still verifies non-zero after the fallback is only logged.
    pub fn wipe(&self, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }

        for strategy in self.strategies {
            if strategy.wipe(buf) && remaining_nonzero(buf) == 0 {
                trace!(strategy = strategy.name(), len = buf.len(), "buffer wiped");
                return;
            }
            debug!(strategy = strategy.name(), "wipe primitive unavailable or incomplete");
        }

        OverwriteFallback.wipe(buf);

        let remaining = remaining_nonzero(buf);
        if remaining == 0 {
            trace!(strategy = OverwriteFallback.name(), len = buf.len(), "buffer wiped");
        } else {
            let err = EraseBestEffortFailure { len: buf.len(), remaining };
            warn!(error = %err, "secure erase incomplete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Unavailable;
    impl WipeStrategy for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }
        fn wipe(&self, _buf: &mut [u8]) -> bool {
            false
        }
    }

    /// Claims success without touching the buffer.
    struct Liar(AtomicUsize);
    impl WipeStrategy for Liar {
        fn name(&self) -> &'static str {
            "liar"
        }
        fn wipe(&self, _buf: &mut [u8]) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn standard_eraser_zeroes() {
        let mut buf = vec![0xABu8; 97];
        SecureEraser::standard().wipe(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd", target_vendor = "apple", windows))]
    #[test]
    fn os_secure_zero_is_available_on_this_host() {
        let mut buf = vec![0xC3u8; 61];
        assert!(OsSecureZero.wipe(&mut buf), "{} reported unavailable", OsSecureZero.name());
        assert!(buf.iter().all(|&b| b == 0));
        assert_ne!(OsSecureZero.name(), "none");
    }

    #[test]
    fn fallback_runs_when_no_primitive_is_available() {
        let list: [&dyn WipeStrategy; 1] = [&Unavailable];
        let mut buf = vec![0x11u8; 200];
        SecureEraser::with_strategies(&list).wipe(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn fallback_runs_when_primitive_leaves_data() {
        let liar = Liar(AtomicUsize::new(0));
        let list: [&dyn WipeStrategy; 1] = [&liar];
        let mut buf = [7u8; 32];
        SecureEraser::with_strategies(&list).wipe(&mut buf);
        assert_eq!(liar.0.load(Ordering::SeqCst), 1);
        assert_eq!(buf, [0u8; 32]);
    }

    #[test]
    fn empty_strategy_list_still_wipes() {
        let mut buf = [0xFFu8; 5];
        SecureEraser::with_strategies(&[]).wipe(&mut buf);
        assert_eq!(buf, [0u8; 5]);
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut buf: [u8; 0] = [];
        SecureEraser::standard().wipe(&mut buf);
    }

    #[test]
    fn overwrite_fallback_ends_at_zero() {
        let mut buf = [0x42u8; 130];
        assert!(OverwriteFallback.wipe(&mut buf));
        assert_eq!(remaining_nonzero(&buf), 0);
    }
}
