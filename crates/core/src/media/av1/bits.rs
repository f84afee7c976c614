//! MSB-first bit reader and LEB128 helpers used by the OBU parsers.

use crate::error::BitstreamErrorKind;

pub(crate) type BitResult<T> = std::result::Result<T, BitstreamErrorKind>;

/// Reads AV1 syntax elements (`f(n)`, `uvlc()`) from a byte slice.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bits_left(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    /// Read `n` bits (at most 32), most significant first.
    pub fn read_bits(&mut self, n: u32) -> BitResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(BitstreamErrorKind::InvalidValue("bit count"));
        }
        if n as usize > self.bits_left() {
            return Err(BitstreamErrorKind::UnexpectedEnd);
        }

        let mut value: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let byte = self.data[self.bit_pos / 8];
            let bit_offset = (self.bit_pos % 8) as u32;
            let available = 8 - bit_offset;
            let take = remaining.min(available);
            let shift = available - take;
            let bits = (u32::from(byte) >> shift) & ((1u32 << take) - 1);

            value = (value << take) | bits;
            self.bit_pos += take as usize;
            remaining -= take;
        }
        Ok(value)
    }

    pub fn read_flag(&mut self) -> BitResult<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    pub fn skip_bits(&mut self, n: usize) -> BitResult<()> {
        if n > self.bits_left() {
            return Err(BitstreamErrorKind::UnexpectedEnd);
        }
        self.bit_pos += n;
        Ok(())
    }

    /// Variable length unsigned code, `uvlc()` in the AV1 bitstream syntax.
    pub fn read_uvlc(&mut self) -> BitResult<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_flag()? {
            leading_zeros += 1;
        }
        if leading_zeros >= 32 {
            return Ok(u32::MAX);
        }
        let value = self.read_bits(leading_zeros)?;
        Ok(value + ((1u32 << leading_zeros) - 1))
    }
}

/// Decode an unsigned LEB128 value. Returns `(value, bytes consumed)`.
///
/// AV1 limits `leb128()` to 8 bytes and values that fit in 32 bits.
pub fn read_leb128(buf: &[u8]) -> BitResult<(usize, usize)> {
    let mut value: u64 = 0;
    for (i, byte) in buf.iter().copied().enumerate().take(8) {
        value |= u64::from(byte & 0x7f) << (i * 7);
        if byte & 0x80 == 0 {
            if value > u64::from(u32::MAX) {
                return Err(BitstreamErrorKind::Leb128Overflow);
            }
            return Ok((value as usize, i + 1));
        }
    }
    if buf.len() < 8 {
        Err(BitstreamErrorKind::UnexpectedEnd)
    } else {
        Err(BitstreamErrorKind::Leb128Overflow)
    }
}

/// Number of bytes [`encode_leb128`] produces for `value`.
pub fn leb128_size(mut value: usize) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Append `value` as unsigned LEB128.
pub fn encode_leb128(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}
