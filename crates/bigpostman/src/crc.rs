//! CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320).
//!
//! Frames carry the CRC of their payload as four little-endian bytes. Running
//! the CRC over payload and checksum together always lands on
//! [`CRC_RESIDUE`](crate::CRC_RESIDUE), which is how receivers check frames.

/// CRC32 polynomial (IEEE 802.3, reflected).
const CRC32_POLYNOMIAL: u32 = 0xEDB88320;

/// Incremental CRC-32 calculator.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Creates a calculator in its initial all-ones state.
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Feeds bytes into the register, one bit at a time.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state ^= byte as u32;
            for _ in 0..8 {
                self.state = if self.state & 1 != 0 {
                    (self.state >> 1) ^ CRC32_POLYNOMIAL
                } else {
                    self.state >> 1
                };
            }
        }
    }

    /// Returns the checksum of everything fed so far.
    pub const fn finalize(self) -> u32 {
        !self.state
    }
}

/// Computes the CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}
