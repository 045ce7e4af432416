//! Page locking so key bytes stay out of swap and core dumps.

use std::io;

/// Lock the pages backing `buf` into RAM.
#[cfg(unix)]
pub fn lock(buf: &mut [u8]) -> io::Result<()> {
    if buf.is_empty() {
        return Ok(());
    }

    #[cfg(target_os = "linux")]
    // SAFETY: pointer and length come from a live exclusive slice. madvise
    // rounds to page boundaries itself; failure here is advisory only.
    unsafe {
        libc::madvise(buf.as_mut_ptr().cast::<libc::c_void>(), buf.len(), libc::MADV_DONTDUMP);
    }

    // SAFETY: as above.
    let rc = unsafe { libc::mlock(buf.as_ptr().cast::<libc::c_void>(), buf.len()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
pub fn unlock(buf: &mut [u8]) -> io::Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    // SAFETY: pointer and length come from a live exclusive slice.
    let rc = unsafe { libc::munlock(buf.as_ptr().cast::<libc::c_void>(), buf.len()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
pub fn lock(buf: &mut [u8]) -> io::Result<()> {
    use windows_sys::Win32::System::Memory::VirtualLock;

    if buf.is_empty() {
        return Ok(());
    }
    // SAFETY: pointer and length come from a live exclusive slice.
    let ok = unsafe { VirtualLock(buf.as_ptr().cast(), buf.len()) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
pub fn unlock(buf: &mut [u8]) -> io::Result<()> {
    use windows_sys::Win32::System::Memory::VirtualUnlock;

    if buf.is_empty() {
        return Ok(());
    }
    // SAFETY: pointer and length come from a live exclusive slice.
    let ok = unsafe { VirtualUnlock(buf.as_ptr().cast(), buf.len()) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
pub fn lock(_buf: &mut [u8]) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "memory locking not supported on this platform"))
}

#[cfg(not(any(unix, windows)))]
pub fn unlock(_buf: &mut [u8]) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, any(unix, windows)))]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_is_fine() {
        let mut buf: [u8; 0] = [];
        assert!(lock(&mut buf).is_ok());
        assert!(unlock(&mut buf).is_ok());
    }

    #[test]
    fn lock_then_unlock_small_buffer() {
        // RLIMIT_MEMLOCK may be zero in sandboxes; only a successful lock has
        // to be undoable.
        let mut buf = vec![1u8; 32];
        if lock(&mut buf).is_ok() {
            assert!(unlock(&mut buf).is_ok());
        }
    }
}
