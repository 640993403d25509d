//! Seeded byte-substitution table used by compiled extension packages.
//!
//! Only the table generator lives here; the package format itself is not decoded.

const SWAP_ROUNDS: u32 = 10000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObfuscationTable {
    forward: [u8; 256],
    reverse: [u8; 256],
}

impl ObfuscationTable {
    pub fn new(seed: u32) -> Self {
        let a = seed % 250 + 6;
        let b = seed / 250;
        let mut forward = [0u8; 256];
        for (i, v) in forward.iter_mut().enumerate() {
            *v = i as u8;
        }
        for i in 1..=SWAP_ROUNDS {
            // j stays in 1..=254 so j + 1 never leaves the table
            let j = 1 + (i.wrapping_mul(a).wrapping_add(b) % 254) as usize;
            forward.swap(j, j + 1);
        }
        let mut reverse = [0u8; 256];
        for (i, &v) in forward.iter().enumerate() {
            reverse[v as usize] = i as u8;
        }
        Self { forward, reverse }
    }

    pub fn forward(&self) -> &[u8; 256] {
        &self.forward
    }

    pub fn reverse(&self) -> &[u8; 256] {
        &self.reverse
    }

    pub fn encode_byte(&self, b: u8) -> u8 {
        self.forward[b as usize]
    }

    pub fn decode_byte(&self, b: u8) -> u8 {
        self.reverse[b as usize]
    }
}
