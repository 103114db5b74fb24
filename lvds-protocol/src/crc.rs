//! CRC-16/CCITT-FALSE
//!
//! Polynomial 0x1021, initial value 0xFFFF, no reflection, no final XOR.
//! Computed byte-at-a-time through a 256-entry table built at compile time.

/// Generator polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// Initial register value
pub const CRC16_INIT: u16 = 0xFFFF;

/// Byte-indexed lookup table
pub static CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC over `data`
#[inline]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |crc, &byte| {
        let idx = ((crc >> 8) as u8 ^ byte) as usize;
        (crc << 8) ^ CRC16_TABLE[idx]
    })
}
