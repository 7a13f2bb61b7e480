// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII-hex representation used by the Modbus ASCII binding.

use crate::{Error, Result};

/// Two uppercase hex digits per byte.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    ::hex::encode_upper(bytes)
}

/// Decodes pairs of hex digits.
///
/// Lowercase digits are accepted, too.
pub fn decode_hex(chars: &[u8]) -> Result<Vec<u8>> {
    ::hex::decode(chars).map_err(|err| match err {
        ::hex::FromHexError::OddLength => {
            Error::format(format!("odd number of hex digits: {}", chars.len()))
        }
        err => Error::format(err.to_string()),
    })
}
