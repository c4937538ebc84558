//! CRC-16 used for optional frame checksums.
//!
//! Seed `0xFFFF`, reflected polynomial `0xA001`, processed one bit at a
//! time with no final XOR (the CRC-16/MODBUS parameter set).

use maquette_common::consts::{CRC16_POLY, CRC16_SEED};

/// Compute the frame checksum over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = CRC16_SEED;
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ CRC16_POLY
            } else {
                crc >> 1
            };
        }
    }
    crc
}
