//! The two transforms protecting game data inside a compiled executable.
//!
//! 8.1 games first wrap everything after a short header in a seeded XOR stream; both 8.0 and
//! 8.1 then hide the main resource block behind a byte swap table.
use crate::gmk::stream::GmkStream;
use crate::types::GmkError;
use crate::utils::crc32::Crc32;
use anyhow::Result;

/// Absolute offset where the 8.1 garbage table starts.
pub const GARBAGE_OFFSET: usize = 0x0039FBC4;
/// Version tag that must come out of the 8.1 validation dword.
pub const XOR_STREAM_VERSION: u32 = 810;

const XOR_MULTIPLIER_1: u32 = 0x9069;
const XOR_MULTIPLIER_2: u32 = 0x4650;

/// Turns the key dword into the second generator seed.
///
/// The key is rendered as `_MJD<signed decimal>#RWK`, widened to UTF-16LE and checksummed.
pub fn derive_seed(key: u32) -> u32 {
    let text = format!("_MJD{}#RWK", key as i32);
    let widened: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    Crc32::compute(&widened)
}

/// Value XORed into the validation dword read at `offset`.
///
/// A shifted position of zero becomes 3. The old decompiler tested the raw position before
/// the shift instead; that raw value is always `4k - 1` so its test never fired, and a
/// signature at the first scan word gave it key 0 where this gives 3. Both sides have to
/// change together.
pub fn version_key(offset: usize) -> u32 {
    let pos = ((offset as i64 - GARBAGE_OFFSET as i64 - 0x11) as i32) >> 2;
    if pos == 0 { 3 } else { pos as u32 }
}

#[derive(Clone, Debug)]
pub struct XorStream {
    seed1: u32,
    seed2: u32,
}

impl XorStream {
    pub fn new(seed1: u32, seed2: u32) -> Self {
        Self { seed1, seed2 }
    }

    pub fn next_mask(&mut self) -> u32 {
        self.seed1 = (self.seed1 & 0xFFFF)
            .wrapping_mul(XOR_MULTIPLIER_1)
            .wrapping_add(self.seed1 >> 16);
        self.seed2 = (self.seed2 & 0xFFFF)
            .wrapping_mul(XOR_MULTIPLIER_2)
            .wrapping_add(self.seed2 >> 16);
        (self.seed1 << 16).wrapping_add(self.seed2 & 0xFFFF)
    }
}

/// Removes the 8.1 XOR layer. The cursor must sit on the key dword.
///
/// On success the stream holds the plaintext with the cursor at 0. A trailing partial word
/// becomes a zero dword; it is runner padding and never real data.
pub fn decrypt_xor_stream(stream: &mut GmkStream) -> Result<()> {
    let key = stream.read_u32()?;
    let seed2 = derive_seed(key);
    let seed1 = stream.read_u32()?;
    log::debug!("xor stream seeds: {:#010x} {:#010x}", seed1, seed2);

    let offset = stream.position();
    let version = stream.read_u32()? ^ version_key(offset);
    if version != XOR_STREAM_VERSION {
        return Err(GmkError::UnsupportedVersion(version).into());
    }

    let mut out = GmkStream::new();
    let plain_len = (seed2 & 0xFF) as usize + 6;
    out.write_bytes(&stream.read_exact_vec(plain_len)?);

    let mut xor = XorStream::new(seed1, seed2);
    while stream.remaining() > 0 {
        if stream.remaining() < 4 {
            out.write_u32(0);
            break;
        }
        let word = stream.read_u32()?;
        out.write_u32(xor.next_mask() ^ word);
    }
    out.set_position(0)?;
    stream.replace_buffer(out);
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapTable {
    forward: [u8; 256],
    reverse: [u8; 256],
}

impl SwapTable {
    pub fn from_forward(forward: [u8; 256]) -> Self {
        let mut reverse = [0u8; 256];
        for (i, &v) in forward.iter().enumerate() {
            reverse[v as usize] = i as u8;
        }
        Self { forward, reverse }
    }

    /// Reads `[skip1][skip2]`, skips `skip1` dwords, reads the table, then skips `skip2` dwords.
    pub fn read(stream: &mut GmkStream) -> Result<Self> {
        let skip1 = stream.read_u32()? as usize;
        let skip2 = stream.read_u32()? as usize;
        stream.skip_fields(skip1)?;
        let mut forward = [0u8; 256];
        stream.read_into(&mut forward)?;
        stream.skip_fields(skip2)?;
        Ok(Self::from_forward(forward))
    }

    pub fn forward(&self) -> &[u8; 256] {
        &self.forward
    }

    pub fn reverse(&self) -> &[u8; 256] {
        &self.reverse
    }

    /// Each step reads a lower index that has not been rewritten yet, so the loop must run
    /// from the top down.
    pub(crate) fn unmix(&self, data: &mut [u8]) {
        for i in (1..data.len()).rev() {
            data[i] = self.reverse[data[i] as usize]
                .wrapping_sub(data[i - 1])
                .wrapping_sub(i as u8);
        }
    }

    pub(crate) fn unswap(&self, data: &mut [u8]) {
        for i in (0..data.len()).rev() {
            let a = self.forward[i & 0xFF] as usize;
            data.swap(i, i.saturating_sub(a));
        }
    }

    pub fn decrypt(&self, data: &mut [u8]) {
        self.unmix(data);
        self.unswap(data);
    }

    /// Inverse of [`SwapTable::decrypt`], for building fixtures.
    #[cfg(test)]
    pub(crate) fn encrypt(&self, plain: &[u8]) -> Vec<u8> {
        let mut data = plain.to_vec();
        for i in 0..data.len() {
            let a = self.forward[i & 0xFF] as usize;
            data.swap(i, i.saturating_sub(a));
        }
        let mut out = data.clone();
        for i in 1..data.len() {
            let v = data[i].wrapping_add(out[i - 1]).wrapping_add(i as u8);
            out[i] = self.forward[v as usize];
        }
        out
    }
}

/// Decrypts the main resource block. The cursor must sit on the swap table header.
///
/// The stream is replaced by the plaintext block with the cursor at 0.
pub fn decrypt_game_data(stream: &mut GmkStream) -> Result<()> {
    let table = SwapTable::read(stream)?;
    let block = stream.read_block(false)?;
    let mut data = block.into_inner();
    log::debug!("swap table block: {} bytes", data.len());
    table.decrypt(&mut data);
    stream.replace_buffer(GmkStream::from_vec(data));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmk::obfuscation::ObfuscationTable;

    fn identity() -> SwapTable {
        let mut forward = [0u8; 256];
        for (i, v) in forward.iter_mut().enumerate() {
            *v = i as u8;
        }
        SwapTable::from_forward(forward)
    }

    #[test]
    fn test_identity_fixture() {
        let table = identity();
        let mut data: Vec<u8> = (0..=255u8).collect();
        table.unmix(&mut data);
        assert_eq!(data[0], 0);
        // reverse[255] - byte[254] - 255
        assert_eq!(data[255], 255u8.wrapping_sub(254).wrapping_sub(255));
        for i in 1..256usize {
            assert_eq!(data[i], 1u8.wrapping_sub(i as u8));
        }
        table.unswap(&mut data);
        assert_eq!(data[0], 0);
        for i in 1..255usize {
            assert_eq!(data[i], (256 - i) as u8);
        }
        assert_eq!(data[255], 0);
    }

    #[test]
    fn test_decrypt_inverts_encrypt() {
        let table = SwapTable::from_forward(*ObfuscationTable::new(31337).forward());
        let plain: Vec<u8> = (0..2000u32).map(|i| (i * 7 + i / 3) as u8).collect();
        let mut data = table.encrypt(&plain);
        assert_ne!(data, plain);
        table.decrypt(&mut data);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_decrypt_game_data_reads_layout() {
        let table = SwapTable::from_forward(*ObfuscationTable::new(7).forward());
        let plain = b"hello game data, this is the plaintext".to_vec();
        let cipher = table.encrypt(&plain);
        let mut s = GmkStream::new();
        s.write_u32(2);
        s.write_u32(1);
        s.write_u32(0xAAAAAAAA);
        s.write_u32(0xBBBBBBBB);
        s.write_bytes(table.forward());
        s.write_u32(0xCCCCCCCC);
        s.write_u32(cipher.len() as u32);
        s.write_bytes(&cipher);
        s.write_u32(0x12345678);
        s.set_position(0).unwrap();
        decrypt_game_data(&mut s).unwrap();
        assert_eq!(s.as_slice(), &plain[..]);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn test_version_key() {
        assert_eq!(version_key(GARBAGE_OFFSET + 0x11), 3);
        assert_eq!(version_key(GARBAGE_OFFSET + 0x11 + 3), 3);
        assert_eq!(version_key(GARBAGE_OFFSET + 0x11 + 8), 2);
        assert_eq!(version_key(GARBAGE_OFFSET + 0x11 - 4), u32::MAX);
        // Signature at scan word 1: two signature words, key and seed put the check at +20.
        assert_eq!(version_key(GARBAGE_OFFSET + 4 + 16), 3);
    }

    fn build_xor_image(key: u32, seed1: u32, words: &[u32], tail: &[u8]) -> GmkStream {
        let seed2 = derive_seed(key);
        let mut s = GmkStream::new();
        s.write_u32(key);
        s.write_u32(seed1);
        s.write_u32(XOR_STREAM_VERSION ^ version_key(8));
        for i in 0..(seed2 & 0xFF) as usize + 6 {
            s.write_u8(i as u8);
        }
        let mut xor = XorStream::new(seed1, seed2);
        for w in words {
            s.write_u32(xor.next_mask() ^ w);
        }
        s.write_bytes(tail);
        s.set_position(0).unwrap();
        s
    }

    #[test]
    fn test_xor_stream_decrypts() {
        let words = [1234321u32, 800, 0xDEADBEEF, 0];
        let mut s = build_xor_image(0x00C0FFEE, 0x13572468, &words, &[]);
        let plain_len = (derive_seed(0x00C0FFEE) & 0xFF) as usize + 6;
        decrypt_xor_stream(&mut s).unwrap();
        assert_eq!(s.position(), 0);
        assert_eq!(s.len(), plain_len + words.len() * 4);
        for i in 0..plain_len {
            assert_eq!(s.read_u8().unwrap(), i as u8);
        }
        for w in words {
            assert_eq!(s.read_u32().unwrap(), w);
        }
    }

    #[test]
    fn test_xor_stream_tail_is_zero_padded() {
        let words = [0x11111111u32, 0x22222222];
        let mut s = build_xor_image(99, 1, &words, &[0xAB, 0xCD, 0xEF]);
        let plain_len = (derive_seed(99) & 0xFF) as usize + 6;
        decrypt_xor_stream(&mut s).unwrap();
        assert_eq!(s.len(), plain_len + 3 * 4);
        s.skip_bytes(plain_len + 8).unwrap();
        assert_eq!(s.read_u32().unwrap(), 0);
    }

    #[test]
    fn test_xor_stream_rejects_bad_version() {
        let mut s = GmkStream::new();
        s.write_u32(1);
        s.write_u32(2);
        s.write_u32(800 ^ version_key(8));
        s.write_bytes(&[0; 300]);
        s.set_position(0).unwrap();
        let err = decrypt_xor_stream(&mut s).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GmkError>(),
            Some(GmkError::UnsupportedVersion(800))
        ));
    }

    #[test]
    fn test_masks_are_deterministic() {
        let mut a = XorStream::new(5, 6);
        let mut b = XorStream::new(5, 6);
        for _ in 0..16 {
            assert_eq!(a.next_mask(), b.next_mask());
        }
    }
}
