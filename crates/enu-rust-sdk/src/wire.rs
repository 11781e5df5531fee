//! Binary wire format for chain structures.
//!
//! Everything the chain hashes or ships over the network is laid out with the
//! little-endian, varuint-length-prefixed encoding implemented here.

use crate::error::{EnuError, EnuResult};
use crate::types::{Asset, Name, Symbol, TimePointSec};

/// Append-only buffer for building wire-format byte strings.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer and returns the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Writes a little-endian u16.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian u32.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian u64.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian i8.
    pub fn write_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian i16.
    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian i32.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a little-endian i64.
    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an LEB128 variable-length unsigned integer.
    pub fn write_varuint32(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a varuint32 length prefix followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varuint32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Writes a base32-packed account/action/permission name.
    pub fn write_name(&mut self, name: &Name) {
        self.write_u64(name.raw());
    }

    /// Writes a symbol as its packed u64 form.
    pub fn write_symbol(&mut self, symbol: &Symbol) {
        self.write_u64(symbol.raw());
    }

    /// Writes an asset: amount then symbol.
    pub fn write_asset(&mut self, asset: &Asset) {
        self.write_i64(asset.amount());
        self.write_symbol(asset.symbol());
    }

    /// Writes a time point as seconds since the epoch.
    pub fn write_time_point_sec(&mut self, t: TimePointSec) {
        self.write_u32(t.secs());
    }

    /// Writes a fixed 32-byte checksum.
    pub fn write_checksum256(&mut self, digest: &[u8; 32]) {
        self.buf.extend_from_slice(digest);
    }
}

/// Cursor over a wire-format byte string.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> EnuResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(EnuError::serialize(format!(
                "unexpected end of input: need {n} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> EnuResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian u16.
    pub fn read_u16(&mut self) -> EnuResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&mut self) -> EnuResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian u64.
    pub fn read_u64(&mut self) -> EnuResult<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a little-endian i8.
    pub fn read_i8(&mut self) -> EnuResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian i16.
    pub fn read_i16(&mut self) -> EnuResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a little-endian i32.
    pub fn read_i32(&mut self) -> EnuResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a little-endian i64.
    pub fn read_i64(&mut self) -> EnuResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads an LEB128 variable-length unsigned integer.
    pub fn read_varuint32(&mut self) -> EnuResult<u32> {
        let mut result: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            if shift >= 32 {
                return Err(EnuError::serialize("varuint32 overflows 32 bits"));
            }
            result |= ((byte & 0x7f) as u32) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    /// Reads `n` raw bytes.
    pub fn read_raw(&mut self, n: usize) -> EnuResult<&'a [u8]> {
        self.take(n)
    }

    /// Reads a varuint32-prefixed byte string.
    pub fn read_bytes(&mut self) -> EnuResult<&'a [u8]> {
        let len = self.read_varuint32()? as usize;
        self.take(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> EnuResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| EnuError::serialize("string is not valid UTF-8"))
    }

    /// Reads a base32-packed name.
    pub fn read_name(&mut self) -> EnuResult<Name> {
        Ok(Name::from_raw(self.read_u64()?))
    }

    /// Reads a packed symbol.
    pub fn read_symbol(&mut self) -> EnuResult<Symbol> {
        Symbol::from_raw(self.read_u64()?)
    }

    /// Reads an asset: amount then symbol.
    pub fn read_asset(&mut self) -> EnuResult<Asset> {
        let amount = self.read_i64()?;
        let symbol = self.read_symbol()?;
        Ok(Asset::new(amount, symbol))
    }

    /// Reads a time point as seconds since the epoch.
    pub fn read_time_point_sec(&mut self) -> EnuResult<TimePointSec> {
        Ok(TimePointSec::from_secs(self.read_u32()?))
    }

    /// Reads a fixed 32-byte checksum.
    pub fn read_checksum256(&mut self) -> EnuResult<[u8; 32]> {
        let b = self.take(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(b);
        Ok(out)
    }
}
