//! Big-endian byte cursor over class-file data.

use crate::error::ClassFileError;

/// A bounds-checked big-endian reader.
///
/// Offsets reported in errors are absolute within the original input, even
/// for readers created with [`sub_reader`](Self::sub_reader).
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consumes `len` bytes and returns them as a slice.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let available = self.remaining();
        if len > available {
            return Err(ClassFileError::Truncated {
                offset: self.offset(),
                needed: len - available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ClassFileError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.array::<1>()?[0])
    }

    /// Reads a big-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, ClassFileError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Reads a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32, ClassFileError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Reads a big-endian `u64`.
    pub fn u64(&mut self) -> Result<u64, ClassFileError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Splits off the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<ByteReader<'a>, ClassFileError> {
        let base = self.offset();
        let data = self.bytes(len)?;
        Ok(ByteReader { data, pos: 0, base })
    }

    /// Fails if any bytes are left unread.
    pub fn finish(&self, context: &'static str) -> Result<(), ClassFileError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(ClassFileError::TrailingBytes { context, count }),
        }
    }
}
