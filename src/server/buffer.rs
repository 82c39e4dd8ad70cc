//! Fixed-capacity byte accumulator.
//!
//! Both per-connection buffers are instances of [`FixedBuf`]. Overflow is an
//! explicit error kind checked before any copy, never inferred afterwards
//! from length equality.

use thiserror::Error;

/// Capacity of each connection buffer, in bytes.
pub const BUF_CAPACITY: usize = 4096;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer capacity exceeded")]
    Overflow,
}

/// A bounded append-only byte buffer. `len <= BUF_CAPACITY` always holds.
pub struct FixedBuf {
    data: Box<[u8; BUF_CAPACITY]>,
    len: usize,
}

impl FixedBuf {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; BUF_CAPACITY]),
            len: 0,
        }
    }

    /// Appends `bytes`, failing without writing anything if they do not fit.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if bytes.len() > self.remaining() {
            return Err(BufferError::Overflow);
        }

        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();

        Ok(())
    }

    /// The unfilled tail, for direct `read(2)` fills. Pair with
    /// [`add_len`](Self::add_len).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Marks `n` bytes of the spare tail as filled.
    pub fn add_len(&mut self, n: usize) {
        debug_assert!(self.len + n <= BUF_CAPACITY);
        self.len += n;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == BUF_CAPACITY
    }

    pub fn remaining(&self) -> usize {
        BUF_CAPACITY - self.len
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for FixedBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_accumulates() {
        let mut buf = FixedBuf::new();
        buf.extend(b"hello ").unwrap();
        buf.extend(b"world").unwrap();

        assert_eq!(buf.as_slice(), b"hello world");
        assert_eq!(buf.remaining(), BUF_CAPACITY - 11);
    }

    #[test]
    fn overflow_is_checked_before_the_copy() {
        let mut buf = FixedBuf::new();
        buf.extend(&[1; BUF_CAPACITY - 1]).unwrap();

        assert_eq!(buf.extend(&[2, 2]), Err(BufferError::Overflow));
        // The failed append left the buffer untouched.
        assert_eq!(buf.len(), BUF_CAPACITY - 1);

        buf.extend(&[3]).unwrap();
        assert!(buf.is_full());
        assert_eq!(buf.extend(&[4]), Err(BufferError::Overflow));
    }

    #[test]
    fn spare_fill_round_trip() {
        let mut buf = FixedBuf::new();
        let spare = buf.spare_mut();
        assert_eq!(spare.len(), BUF_CAPACITY);
        spare[..4].copy_from_slice(b"abcd");
        buf.add_len(4);

        assert_eq!(buf.as_slice(), b"abcd");
        assert_eq!(buf.spare_mut().len(), BUF_CAPACITY - 4);

        buf.clear();
        assert!(buf.is_empty());
    }
}
