//! Owned secret byte buffers with guaranteed erasure.
//!
//! Every buffer that holds a private exponent, a private scalar, the raw
//! shared secret, or bytes derived from it lives in a [`SecretBuf`]. The
//! buffer is zeroized when dropped, and can be wiped in place earlier so
//! that a finished exchange keeps an inspectable, all-zero husk instead of
//! live key material.

use zeroize::Zeroize;

use crate::error::Error;

/// A heap buffer of secret bytes, zeroized on drop.
///
/// Growth never leaves a stale copy behind: when more capacity is needed
/// the contents are moved into a fresh allocation and the old one is
/// zeroized before it is released.
pub struct SecretBuf {
    bytes: Vec<u8>,
    wiped: bool,
}

impl SecretBuf {
    /// Take ownership of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            wiped: false,
        }
    }

    /// An empty buffer with room for `capacity` bytes.
    ///
    /// Returns `Error::OutOfMemory` instead of aborting when the
    /// allocation cannot be satisfied.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self::new(bytes))
    }

    /// Copy `data` into a new secret buffer.
    pub fn try_copy_from(data: &[u8]) -> Result<Self, Error> {
        let mut buf = Self::try_with_capacity(data.len())?;
        buf.bytes.extend_from_slice(data);
        Ok(buf)
    }

    /// Append `data`, moving to a larger allocation if needed.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        let needed = self
            .bytes
            .len()
            .checked_add(data.len())
            .ok_or(Error::OutOfMemory)?;
        if needed > self.bytes.capacity() {
            let mut grown = Vec::new();
            grown
                .try_reserve_exact(needed)
                .map_err(|_| Error::OutOfMemory)?;
            grown.extend_from_slice(&self.bytes);
            self.bytes.zeroize();
            self.bytes = grown;
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Shorten the buffer, zeroizing the discarded tail.
    pub fn truncate(&mut self, len: usize) {
        if len < self.bytes.len() {
            self.bytes[len..].zeroize();
            self.bytes.truncate(len);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Overwrite every byte with zero, keeping the length.
    ///
    /// Idempotent. After this call [`is_wiped`](Self::is_wiped) reports
    /// `true`.
    pub fn wipe(&mut self) {
        self.bytes.as_mut_slice().zeroize();
        self.wiped = true;
    }

    /// Whether [`wipe`](Self::wipe) has run and the contents are all zero.
    pub fn is_wiped(&self) -> bool {
        self.wiped && self.bytes.iter().all(|b| *b == 0)
    }
}

impl Drop for SecretBuf {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl core::fmt::Debug for SecretBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SecretBuf({} bytes, [REDACTED])", self.bytes.len())
    }
}
