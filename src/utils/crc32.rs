//! Reflected CRC-32 as used by the 8.1 runner to derive its cipher seed.
//!
//! The runner never applies the final one's complement, so [`Crc32::value`] returns the raw
//! register. Existing games depend on this, do not "fix" it.
use lazy_static::lazy_static;

const CRC32_POLYNOMIAL: u32 = 0x04C11DB7;

fn get_crc32_table() -> [u32; 256] {
    let reflected = CRC32_POLYNOMIAL.reverse_bits();
    let mut table = [0; 256];
    for i in 0..256u32 {
        let mut c = i;
        for _ in 0..8 {
            if c & 1 != 0 {
                c = (c >> 1) ^ reflected;
            } else {
                c >>= 1;
            }
        }
        table[i as usize] = c;
    }
    table
}

lazy_static! {
    pub static ref CRC32_TABLE: [u32; 256] = get_crc32_table();
}

pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Crc32 { crc: 0xFFFFFFFF }
    }

    pub fn update_crc(init_crc: u32, data: &[u8]) -> u32 {
        let mut crc = init_crc;
        for &byte in data {
            crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
        }
        crc
    }

    pub fn update(&mut self, data: &[u8]) {
        self.crc = Self::update_crc(self.crc, data);
    }

    pub fn value(&self) -> u32 {
        self.crc
    }

    /// One-shot checksum of `data`.
    pub fn compute(data: &[u8]) -> u32 {
        Self::update_crc(0xFFFFFFFF, data)
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value_without_complement() {
        // The canonical CRC-32 of "123456789" is 0xCBF43926.
        assert_eq!(Crc32::compute(b"123456789"), 0x340BC6D9);
    }

    #[test]
    fn test_matches_complement_of_standard_crc() {
        for data in [&b""[..], b"a", b"_MJD12345#RWK", &[0u8, 0xFF, 0x80, 0x7F]] {
            assert_eq!(Crc32::compute(data), !crc32fast::hash(data));
        }
    }

    #[test]
    fn test_incremental_update() {
        let mut crc = Crc32::new();
        crc.update(b"12345");
        crc.update(b"6789");
        assert_eq!(crc.value(), Crc32::compute(b"123456789"));
    }
}
