use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use super::buffer::SecretBuffer;
use crate::defaults::Defaults;
use crate::error::SecretError;

/// Lowercase hex rendering of a secret: the one textual copy that is allowed
/// to exist. Zeroized when erased or dropped.
pub struct HexView {
    text: Zeroizing<String>,
}

impl HexView {
    /// Encode straight into a pre-sized buffer, so no untracked
    /// intermediate string or reallocation ever holds the key.
    pub fn encode(secret: &SecretBuffer) -> Result<Self, SecretError> {
        let bytes = secret.expose()?;
        let mut out = Zeroizing::new(vec![0u8; bytes.len() * 2]);
        hex::encode_to_slice(bytes, &mut out)?;
        let mut text = Zeroizing::new(String::with_capacity(out.len()));
        for &c in out.iter() {
            text.push(char::from(c));
        }
        Ok(Self { text })
    }

    pub fn decode(&self) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        let mut out = Zeroizing::new(vec![0u8; self.text.len() / 2]);
        hex::decode_to_slice(self.text.as_str(), &mut out)?;
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Placeholder shown in place of the key.
    pub fn masked(&self) -> &'static str {
        Defaults::MASKED_KEY
    }

    pub fn erase(&mut self) {
        self.text.zeroize();
    }
}

impl fmt::Debug for HexView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HexView").field("len", &self.text.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_before_erasure() {
        for len in [1usize, 16, 32, 64] {
            let secret = SecretBuffer::allocate(len).unwrap();
            let view = HexView::encode(&secret).unwrap();
            assert_eq!(view.len(), len * 2);
            assert_eq!(view.decode().unwrap().as_slice(), secret.expose().unwrap());
        }
    }

    #[test]
    fn lowercase_hex() {
        let mut secret = SecretBuffer::allocate(3).unwrap();
        secret.expose_mut().unwrap().copy_from_slice(&[0xAB, 0x01, 0xFF]);
        let view = HexView::encode(&secret).unwrap();
        assert_eq!(view.as_str(), "ab01ff");
    }

    #[test]
    fn encoding_an_erased_secret_fails() {
        let mut secret = SecretBuffer::allocate(32).unwrap();
        secret.erase();
        assert!(matches!(HexView::encode(&secret), Err(SecretError::UseAfterErase)));
    }

    #[test]
    fn erase_empties_the_view() {
        let secret = SecretBuffer::allocate(32).unwrap();
        let mut view = HexView::encode(&secret).unwrap();
        view.erase();
        assert!(view.is_empty());
        assert_eq!(view.masked(), Defaults::MASKED_KEY);
    }

    #[test]
    fn debug_output_is_redacted() {
        let mut secret = SecretBuffer::allocate(2).unwrap();
        secret.expose_mut().unwrap().copy_from_slice(&[0xCA, 0xFE]);
        let view = HexView::encode(&secret).unwrap();
        assert!(!format!("{view:?}").contains("cafe"));
    }
}
