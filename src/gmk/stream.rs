//! Growable byte cursor used by every project codec.
//!
//! All fixed-width values are little-endian. Reads are bounds-checked and fail with
//! [`GmkError::StreamTruncated`]; writes grow the buffer on demand.
use crate::gmk::project::GmString;
use crate::types::GmkError;
use anyhow::Result;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time of the timestamp epoch, 1899-12-30 23:59:59 UTC.
pub const TIMESTAMP_EPOCH: i64 = -2209075201;

const SECONDS_PER_DAY: f64 = 86400.0;

/// Converts a stored day count to whole Unix seconds.
pub fn days_to_unix(days: f64) -> i64 {
    TIMESTAMP_EPOCH + (days * SECONDS_PER_DAY).trunc() as i64
}

/// Converts Unix seconds to the stored day count.
pub fn unix_to_days(unix: i64) -> f64 {
    (unix - TIMESTAMP_EPOCH) as f64 / SECONDS_PER_DAY
}

#[derive(Clone, Default, PartialEq)]
pub struct GmkStream {
    buffer: Vec<u8>,
    position: usize,
}

impl std::fmt::Debug for GmkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmkStream")
            .field("length", &self.buffer.len())
            .field("position", &self.position)
            .finish()
    }
}

impl GmkStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing buffer with the cursor at offset 0.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor. Positions past the end are rejected.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(self.truncated(position - self.position).into());
        }
        self.position = position;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes from the cursor to the end of the buffer.
    pub fn unread(&self) -> &[u8] {
        &self.buffer[self.position..]
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    fn truncated(&self, wanted: usize) -> GmkError {
        GmkError::StreamTruncated {
            position: self.position,
            wanted,
            length: self.buffer.len(),
        }
    }

    fn check_read(&self, len: usize) -> Result<(), GmkError> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        Ok(())
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_read(buf.len())?;
        buf.copy_from_slice(&self.buffer[self.position..self.position + buf.len()]);
        self.position += buf.len();
        Ok(())
    }

    pub fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        self.check_read(len)?;
        let data = self.buffer[self.position..self.position + len].to_vec();
        self.position += len;
        Ok(data)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Booleans occupy a full dword; any non-zero value is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    /// Reads a dword length followed by that many raw bytes.
    pub fn read_string(&mut self) -> Result<GmString> {
        let len = self.read_u32()? as usize;
        Ok(GmString::from(self.read_exact_vec(len)?))
    }

    /// Reads a day-count timestamp and returns whole Unix seconds.
    pub fn read_timestamp(&mut self) -> Result<i64> {
        Ok(days_to_unix(self.read_f64()?))
    }

    /// Skips `count` dwords without reading them.
    pub fn skip_fields(&mut self, count: usize) -> Result<()> {
        self.skip_bytes(count.saturating_mul(4))
    }

    pub fn skip_bytes(&mut self, count: usize) -> Result<()> {
        self.check_read(count)?;
        self.position += count;
        Ok(())
    }

    /// Reads a dword length and skips that many bytes.
    pub fn skip_blob(&mut self) -> Result<()> {
        let len = self.read_u32()? as usize;
        self.skip_bytes(len)
    }

    /// Writes at the cursor, overwriting existing bytes and growing the buffer as needed.
    pub fn write_bytes(&mut self, data: &[u8]) {
        let end = self.position + data.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(data);
        self.position = end;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(value as u32);
    }

    pub fn write_string(&mut self, value: &GmString) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value.as_bytes());
    }

    /// Writes the current time as a day-count timestamp.
    pub fn write_timestamp(&mut self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.write_f64(unix_to_days(now));
    }

    /// Appends every unread byte of `src` at the cursor. `src` is left untouched.
    pub fn copy_from(&mut self, src: &GmkStream) {
        self.write_bytes(src.unread());
    }

    /// Appends the whole buffer of `src` and marks it fully consumed.
    pub fn append_consuming(&mut self, src: &mut GmkStream) {
        self.write_bytes(&src.buffer);
        src.position = src.buffer.len();
    }

    /// Takes over the unread region of `src` as this cursor's whole buffer.
    ///
    /// The previous buffer is dropped and `src`'s storage moves here.
    pub fn replace_buffer(&mut self, mut src: GmkStream) {
        src.buffer.drain(..src.position);
        self.buffer = src.buffer;
        self.position = 0;
    }

    /// Replaces the buffer with its zlib-compressed form.
    pub fn compress(&mut self) -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&self.buffer)?;
        self.buffer = encoder.finish()?;
        self.position = 0;
        Ok(())
    }

    /// Replaces the buffer with its inflated form.
    pub fn decompress(&mut self) -> Result<()> {
        let mut decoder = ZlibDecoder::new(&self.buffer[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| GmkError::DecompressionFailed(e.to_string()))?;
        self.buffer = out;
        self.position = 0;
        Ok(())
    }

    /// Writes this whole stream as `[length][payload]` into `dest`, compressing the payload
    /// first when asked.
    pub fn write_block(mut self, dest: &mut GmkStream, compress: bool) -> Result<()> {
        if compress {
            self.compress()?;
        }
        dest.write_u32(self.buffer.len() as u32);
        dest.append_consuming(&mut self);
        Ok(())
    }

    /// Reads a `[length][payload]` block into a fresh stream, inflating it when asked.
    pub fn read_block(&mut self, decompress: bool) -> Result<GmkStream> {
        let len = self.read_u32()? as usize;
        let mut block = GmkStream::from_vec(self.read_exact_vec(len)?);
        if decompress {
            block.decompress()?;
        }
        Ok(block)
    }
}
