use std::fmt;

use rand_core::{CryptoRng, OsRng, RngCore};
use tracing::{debug, warn};

use super::eraser::SecureEraser;
use super::pin;
use crate::error::SecretError;

/// Owned, fixed-size key material.
///
/// Not `Clone`, and `Debug` never prints the contents. Every exit path ends
/// in [`SecretBuffer::erase`]: explicitly, or through `Drop`.
pub struct SecretBuffer {
    bytes: Box<[u8]>,
    pinned: bool,
    erased: bool,
}

impl SecretBuffer {
    /// `len` bytes from the OS CSPRNG.
    pub fn allocate(len: usize) -> Result<Self, SecretError> {
        Self::allocate_from(len, &mut OsRng)
    }

    /// Like [`allocate`](Self::allocate), but the pages are locked before the
    /// random bytes are written into them.
    pub fn allocate_pinned(len: usize) -> Result<Self, SecretError> {
        let mut buf = Self::zeroed(len)?;
        buf.pin();
        buf.fill_from(&mut OsRng)?;
        Ok(buf)
    }

    pub fn allocate_from<R: RngCore + CryptoRng>(len: usize, rng: &mut R) -> Result<Self, SecretError> {
        let mut buf = Self::zeroed(len)?;
        buf.fill_from(rng)?;
        Ok(buf)
    }

    fn zeroed(len: usize) -> Result<Self, SecretError> {
        if len == 0 {
            return Err(SecretError::InvalidLength);
        }
        Ok(Self {
            bytes: vec![0u8; len].into_boxed_slice(),
            pinned: false,
            erased: false,
        })
    }

    fn fill_from<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<(), SecretError> {
        if let Err(e) = rng.try_fill_bytes(&mut self.bytes) {
            self.erase();
            return Err(SecretError::RandomnessUnavailable(e.to_string()));
        }
        Ok(())
    }

    /// Best-effort page lock. Failure is logged and otherwise ignored.
    pub fn pin(&mut self) -> bool {
        if self.erased {
            return false;
        }
        if self.pinned {
            return true;
        }
        match pin::lock(&mut self.bytes) {
            Ok(()) => {
                debug!(len = self.bytes.len(), "secret pages locked");
                self.pinned = true;
            }
            Err(e) => warn!(error = %e, "could not lock secret pages, continuing unpinned"),
        }
        self.pinned
    }

    pub fn expose(&self) -> Result<&[u8], SecretError> {
        if self.erased {
            return Err(SecretError::UseAfterErase);
        }
        Ok(&self.bytes)
    }

    pub fn expose_mut(&mut self) -> Result<&mut [u8], SecretError> {
        if self.erased {
            return Err(SecretError::UseAfterErase);
        }
        Ok(&mut self.bytes)
    }

    pub fn erase(&mut self) {
        self.erase_with(&SecureEraser::standard());
    }

    /// Wipe, unlock and retire the buffer. Calling it again does nothing.
    pub fn erase_with(&mut self, eraser: &SecureEraser<'_>) {
        if self.erased {
            return;
        }
        eraser.wipe(&mut self.bytes);
        if self.pinned {
            if let Err(e) = pin::unlock(&mut self.bytes) {
                debug!(error = %e, "munlock failed");
            }
            self.pinned = false;
        }
        self.erased = true;
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    #[cfg(test)]
    pub(crate) fn backing(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.erase();
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .field("pinned", &self.pinned)
            .field("erased", &self.erased)
            .finish_non_exhaustive()
    }
}
