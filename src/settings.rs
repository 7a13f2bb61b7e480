// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master configuration

use std::time::Duration;

use crate::error::ValidationError;

const DEFAULT_RETRY_COUNT: u8 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_ASCII_START_DELIMITER: &str = ":";
const DEFAULT_ASCII_END_DELIMITER: &str = "\r\n";
const DEFAULT_RTU_INTER_CHAR_TIMEOUT: Duration = Duration::from_millis(2);
const DEFAULT_RTU_INTER_FRAME_TIMEOUT: Duration = Duration::from_millis(5);

/// Bits per RTU character: start bit, 8 data bits, parity or 2nd stop bit, stop bit.
const RTU_BITS_PER_CHAR: u64 = 11;

/// Above this baud rate the character timing is fixed.
const RTU_FIXED_TIMING_BAUD_RATE: u32 = 19_200;
const RTU_FIXED_INTER_CHAR: Duration = Duration::from_micros(750);
const RTU_FIXED_INTER_FRAME: Duration = Duration::from_micros(1_750);

/// Configuration of a single master.
///
/// Cloned into each transport when it is created and never modified
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Number of additional attempts after a failed one.
    pub retry_count: u8,
    /// Pause between two attempts.
    pub retry_delay: Duration,
    /// Timeout of each read operation.
    pub read_timeout: Duration,
    /// Timeout of each write operation.
    pub write_timeout: Duration,
    pub ascii_start_delimiter: String,
    pub ascii_end_delimiter: String,
    /// Maximum silence between two characters of an RTU frame.
    pub rtu_inter_char_timeout: Duration,
    /// Minimum silence between two RTU frames.
    pub rtu_inter_frame_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            ascii_start_delimiter: DEFAULT_ASCII_START_DELIMITER.to_owned(),
            ascii_end_delimiter: DEFAULT_ASCII_END_DELIMITER.to_owned(),
            rtu_inter_char_timeout: DEFAULT_RTU_INTER_CHAR_TIMEOUT,
            rtu_inter_frame_timeout: DEFAULT_RTU_INTER_FRAME_TIMEOUT,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u8) -> Self {
        self.retry_count = retry_count;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    #[must_use]
    pub fn with_ascii_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.ascii_start_delimiter = start.into();
        self.ascii_end_delimiter = end.into();
        self
    }

    #[must_use]
    pub fn with_rtu_timing(mut self, inter_char: Duration, inter_frame: Duration) -> Self {
        self.rtu_inter_char_timeout = inter_char;
        self.rtu_inter_frame_timeout = inter_frame;
        self
    }

    /// Derives the RTU silence intervals from the baud rate.
    ///
    /// 1.5 character times between characters and 3.5 character times
    /// between frames, rounded up to whole milliseconds. Above 19200 baud
    /// the fixed values 750 µs and 1750 µs apply.
    #[must_use]
    pub fn with_rtu_timing_for_baud_rate(self, baud_rate: u32) -> Self {
        let (inter_char, inter_frame) = rtu_timing_for_baud_rate(baud_rate);
        self.with_rtu_timing(inter_char, inter_frame)
    }

    /// Total number of attempts per request.
    #[must_use]
    pub fn attempts(&self) -> usize {
        usize::from(self.retry_count) + 1
    }

    /// Checks the consistency of the settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(ValidationError::Settings(
                "read and write timeouts must be positive".to_owned(),
            ));
        }
        if self.ascii_start_delimiter.is_empty() || self.ascii_end_delimiter.is_empty() {
            return Err(ValidationError::Settings(
                "ASCII delimiters must not be empty".to_owned(),
            ));
        }
        if self.rtu_inter_char_timeout.is_zero() || self.rtu_inter_frame_timeout.is_zero() {
            return Err(ValidationError::Settings(
                "RTU timeouts must be positive".to_owned(),
            ));
        }
        if self.rtu_inter_char_timeout >= self.read_timeout
            || self.rtu_inter_frame_timeout >= self.read_timeout
        {
            return Err(ValidationError::Settings(format!(
                "RTU timeouts ({:?}, {:?}) must be shorter than the read timeout ({:?})",
                self.rtu_inter_char_timeout, self.rtu_inter_frame_timeout, self.read_timeout
            )));
        }
        Ok(())
    }
}

fn rtu_timing_for_baud_rate(baud_rate: u32) -> (Duration, Duration) {
    if baud_rate == 0 || baud_rate > RTU_FIXED_TIMING_BAUD_RATE {
        return (
            ceil_millis(RTU_FIXED_INTER_CHAR),
            ceil_millis(RTU_FIXED_INTER_FRAME),
        );
    }
    let char_micros = RTU_BITS_PER_CHAR * 1_000_000 / u64::from(baud_rate);
    let inter_char = Duration::from_micros(char_micros * 3 / 2);
    let inter_frame = Duration::from_micros(char_micros * 7 / 2);
    (ceil_millis(inter_char), ceil_millis(inter_frame))
}

// Serial ports time out with millisecond resolution.
fn ceil_millis(duration: Duration) -> Duration {
    let millis = (duration.as_micros() + 999) / 1_000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
