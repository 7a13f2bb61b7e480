// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame checksums of the serial line bindings.
//!
//! The CRC is returned as the register value. On the wire it is sent
//! low byte first, i.e. `crc.to_le_bytes()`.

const CRC16_POLYNOMIAL: u16 = 0xA001;
const CRC16_INIT: u16 = 0xFFFF;

const CRC16_TABLE: [u16; 256] = crc16_table();

const fn crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ CRC16_POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Longitudinal redundancy check of Modbus ASCII.
///
/// The two's complement of the byte sum, so that the sum of all bytes
/// including the checksum is `0` (mod 256).
#[must_use]
pub fn compute_lrc(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
        .wrapping_neg()
}

#[must_use]
pub fn validate_lrc(bytes: &[u8], expected: u8) -> bool {
    compute_lrc(bytes) == expected
}

/// CRC-16/MODBUS using a precomputed table.
#[must_use]
pub fn compute_crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(CRC16_INIT, |crc, byte| {
        let index = usize::from((crc ^ u16::from(*byte)) & 0x00FF);
        (crc >> 8) ^ CRC16_TABLE[index]
    })
}

/// CRC-16/MODBUS computed bit by bit.
///
/// Yields the same results as [`compute_crc16`].
#[must_use]
pub fn compute_crc16_bitwise(bytes: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    for byte in bytes {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= CRC16_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[must_use]
pub fn validate_crc16(bytes: &[u8], expected: u16) -> bool {
    compute_crc16(bytes) == expected
}
