// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::{fmt, io};

use thiserror::Error;

use crate::{
    frame::{ExceptionResponse, FunctionCode, Response},
    slave::Slave,
};

/// The checksum algorithm of a serial frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// Longitudinal redundancy check (ASCII)
    Lrc,
    /// CRC-16/MODBUS (RTU)
    Crc16,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lrc => f.write_str("LRC"),
            Self::Crc16 => f.write_str("CRC16"),
        }
    }
}

/// Request parameters that are rejected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A quantity, length or count is outside of the allowed range.
    #[error("{field} of {function:?} is {value}, expected {min}..={max}")]
    OutOfRange {
        function: FunctionCode,
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    /// The encoded request would not fit into a single PDU.
    #[error("request PDU of {function:?} has {size} bytes")]
    PduTooLarge { function: FunctionCode, size: usize },

    /// The slave address cannot be used with this request or transport.
    #[error("slave {slave} is not addressable with {function:?}")]
    InvalidSlave { slave: Slave, function: FunctionCode },

    /// The settings are inconsistent.
    #[error("invalid settings: {0}")]
    Settings(String),
}

/// A response that does not fit the request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The header of the response does not match the request.
    #[error("mismatching headers: {message} {result:?}")]
    HeaderMismatch {
        message: String,
        result: std::result::Result<Response, ExceptionResponse>,
    },

    /// The function code of the response does not match the request.
    #[error("mismatching function codes: {request} {result:?}")]
    FunctionCodeMismatch {
        request: FunctionCode,
        result: std::result::Result<Response, ExceptionResponse>,
    },

    /// The MBAP header carries a protocol identifier other than `0`.
    #[error("invalid protocol identifier: 0x{0:04X}")]
    InvalidProtocolId(u16),

    /// The data echoed by the server differs from the request.
    #[error("unexpected response: {response:?}")]
    UnexpectedResponse { response: Response },
}

/// Every failure of a _Modbus_ transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// Request parameters are out of range.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed frame or PDU.
    #[error("malformed frame: {0}")]
    Format(String),

    /// The checksum of a received frame is wrong.
    #[error("{kind} mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    Checksum {
        kind: ChecksumKind,
        expected: u16,
        received: u16,
    },

    /// No valid response arrived within the configured number of attempts.
    #[error("no response after {attempts} attempt(s): {source}")]
    Timeout {
        attempts: usize,
        #[source]
        source: io::Error,
    },

    /// The underlying stream has been closed or is unusable.
    #[error("connection closed: {0}")]
    Connection(#[source] io::Error),

    /// The server responded with a _Modbus_ exception.
    #[error("exception: {0}")]
    Exception(#[from] ExceptionResponse),

    /// The response doesn't match the request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport has already been closed.
    #[error("transport disposed")]
    Disposed,

    /// The request has been cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// A transient I/O failure, e.g. a read timeout.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Whether another attempt of the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Turns the error of the final attempt into [`Error::Timeout`].
    pub(crate) fn into_timeout(self, attempts: usize) -> Self {
        match self {
            Self::Transport(source) => Self::Timeout { attempts, source },
            err => err,
        }
    }

    /// Whether the error is a read or write timeout of a single attempt.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(err) => err.kind() == io::ErrorKind::TimedOut,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind::*;
        match err.kind() {
            UnexpectedEof | ConnectionReset | ConnectionAborted | BrokenPipe | NotConnected => {
                Self::Connection(err)
            }
            WouldBlock => Self::Transport(io::Error::new(TimedOut, err)),
            _ => Self::Transport(err),
        }
    }
}

/// Specialized [`std::result::Result`] type for _Modbus_ master operations.
pub type Result<T> = std::result::Result<T, Error>;
