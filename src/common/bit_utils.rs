use num_traits::PrimInt;

use super::error::{BarcodeError, BarcodeResult};

// Bit writer
//------------------------------------------------------------------------------

/// Big endian bit sink with a fixed budget. A write that doesn't fit fails with
/// `CapacityExceeded` and leaves the writer untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
    limit: usize,
}

impl BitWriter {
    pub fn with_limit(limit: usize) -> Self {
        Self { bytes: Vec::with_capacity(limit.div_ceil(8)), len: 0, limit }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bits that can still be written.
    pub fn free(&self) -> usize {
        self.limit - self.len
    }

    /// Written bits packed MSB first. A partial last byte is zero padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes the `width` low bits of `value`, most significant first.
    pub fn write<T: PrimInt>(&mut self, value: T, width: usize) -> BarcodeResult<()> {
        let value = value.to_u64().unwrap_or_default();
        debug_assert!(width <= 32, "Fields are at most 32 bits wide: Width {width}");
        debug_assert!(
            value.checked_shr(width as u32).unwrap_or(0) == 0,
            "Value doesn't fit its field: Value {value}, Width {width}"
        );
        if width > self.free() {
            return Err(BarcodeError::CapacityExceeded);
        }
        for i in (0..width).rev() {
            self.put((value >> i) & 1 == 1);
        }
        Ok(())
    }

    pub fn write_bit(&mut self, bit: bool) -> BarcodeResult<()> {
        self.write(bit as u8, 1)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> BarcodeResult<()> {
        if bytes.len() * 8 > self.free() {
            return Err(BarcodeError::CapacityExceeded);
        }
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(bytes);
            self.len += bytes.len() * 8;
            return Ok(());
        }
        bytes.iter().try_for_each(|&b| self.write(b, 8))
    }

    fn put(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if let (true, Some(last)) = (bit, self.bytes.last_mut()) {
            *last |= 0x80 >> offset;
        }
        self.len += 1;
    }
}

#[cfg(test)]
mod bit_writer_tests {
    use super::{BitReader, BitWriter};
    use crate::common::error::BarcodeError;

    #[test]
    fn test_write() {
        let mut bw = BitWriter::with_limit(32);
        bw.write(0b0100u8, 4).unwrap();
        bw.write(5u16, 9).unwrap();
        bw.write(0u8, 0).unwrap();
        bw.write_bit(true).unwrap();
        assert_eq!(bw.len(), 14);
        assert_eq!(bw.free(), 18);
        assert_eq!(bw.as_bytes(), [0b0100_0000, 0b0010_1100]);
    }

    #[test]
    fn test_write_past_limit() {
        let mut bw = BitWriter::with_limit(12);
        bw.write(0xabu8, 8).unwrap();
        assert_eq!(bw.write(0x1fu8, 5), Err(BarcodeError::CapacityExceeded));
        assert_eq!(bw.write_bytes(&[0]), Err(BarcodeError::CapacityExceeded));
        assert_eq!(bw.len(), 8);
        assert_eq!(bw.as_bytes(), [0xab]);
        bw.write(0xfu8, 4).unwrap();
        assert_eq!(bw.write_bit(false), Err(BarcodeError::CapacityExceeded));
    }

    #[test]
    fn test_write_bytes() {
        let mut aligned = BitWriter::with_limit(24);
        aligned.write_bytes(&[0x12, 0x34]).unwrap();
        assert_eq!(aligned.into_bytes(), [0x12, 0x34]);

        let mut shifted = BitWriter::with_limit(24);
        shifted.write(0b1010u8, 4).unwrap();
        shifted.write_bytes(&[0xff, 0x00]).unwrap();
        assert_eq!(shifted.as_bytes(), [0b1010_1111, 0b1111_0000, 0]);
        assert_eq!(shifted.len(), 20);
    }

    #[test]
    fn test_fields_read_back() {
        let fields: [(u32, usize); 8] =
            [(1, 1), (0b101, 3), (0x3ff, 10), (0, 7), (0xbeef, 16), (6, 4), (0x1f_ffff, 21), (2, 2)];
        let mut bw = BitWriter::with_limit(64);
        for (value, width) in fields {
            bw.write(value, width).unwrap();
        }
        let mut br = BitReader::new(bw.as_bytes());
        for (value, width) in fields {
            assert_eq!(br.read(width), Some(value), "width {width}");
        }
        assert_eq!(br.remaining(), 0);
    }
}

// Bit reader
//------------------------------------------------------------------------------

/// Big endian bit source over a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() * 8 - self.pos
    }

    /// Next `width` bits as a number, or None when fewer are left.
    pub fn read(&mut self, width: usize) -> Option<u32> {
        debug_assert!(width <= 32, "Fields are at most 32 bits wide: Width {width}");
        if width > self.remaining() {
            return None;
        }
        let value = (self.pos..self.pos + width)
            .fold(0u32, |acc, i| (acc << 1) | ((self.bytes[i >> 3] >> (7 - (i & 7))) & 1) as u32);
        self.pos += width;
        Some(value)
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        self.read(1).map(|b| b == 1)
    }
}

impl Iterator for BitReader<'_> {
    type Item = bool;
    fn next(&mut self) -> Option<Self::Item> {
        self.read_bit()
    }
}
