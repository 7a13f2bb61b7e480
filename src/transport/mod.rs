// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking transports
//!
//! Each transport owns exactly one connection and performs one
//! request/response exchange at a time. The retry policy is shared
//! by all bindings, see [`Transport::send_and_receive`].

use std::{
    fmt,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

use tokio_util::codec::Decoder;

use crate::{
    bytes::{Bytes, BytesMut},
    frame::{
        adu::{RequestContext, ResponseAdu},
        Request, Response,
    },
    settings::Settings,
    slave::Slave,
    Error, Result,
};

#[cfg(feature = "ascii")]
pub mod ascii;

#[cfg(feature = "rtu")]
pub mod rtu;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

/// A byte stream to a single device or gateway.
///
/// Read timeouts must be reported as [`io::ErrorKind::TimedOut`] or
/// [`io::ErrorKind::WouldBlock`].
pub trait Connection: Read + Write + Send + fmt::Debug {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Releases the underlying resource.
    fn close(&mut self) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        TcpStream::set_read_timeout(self, Some(timeout))
    }

    fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        TcpStream::set_write_timeout(self, Some(timeout))
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // The peer might have closed the connection already
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            res => res,
        }
    }
}

/// An opened serial port.
#[cfg(feature = "serial")]
pub struct SerialConnection {
    port: Box<dyn tokio_serial::SerialPort>,
}

#[cfg(feature = "serial")]
impl SerialConnection {
    /// Opens the serial port described by `builder`.
    pub fn open(builder: &tokio_serial::SerialPortBuilder) -> Result<Self> {
        let port = builder.clone().open().map_err(io::Error::from)?;
        Ok(Self { port })
    }

    /// The current baud rate of the port.
    pub fn baud_rate(&self) -> Result<u32> {
        self.port.baud_rate().map_err(|err| io::Error::from(err).into())
    }
}

#[cfg(feature = "serial")]
impl From<Box<dyn tokio_serial::SerialPort>> for SerialConnection {
    fn from(port: Box<dyn tokio_serial::SerialPort>) -> Self {
        Self { port }
    }
}

#[cfg(feature = "serial")]
impl fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialConnection")
            .field("name", &self.port.name())
            .finish()
    }
}

#[cfg(feature = "serial")]
impl Read for SerialConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

#[cfg(feature = "serial")]
impl Write for SerialConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

#[cfg(feature = "serial")]
impl Connection for SerialConnection {
    // Serial ports only have a single timeout for both directions.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }

    fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }

    fn close(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

/// The wire format of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Hex encoded frames with LRC
    Ascii,
    /// Binary frames with CRC, delimited by silence
    Rtu,
    /// MBAP encapsulated frames
    Tcp,
}

impl TransportKind {
    /// Serial line bindings address slaves 0 - 247 and support broadcasts.
    #[must_use]
    pub const fn is_serial(self) -> bool {
        matches!(self, Self::Ascii | Self::Rtu)
    }
}

/// An encoded request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub(crate) context: RequestContext,
    pub(crate) bytes: Bytes,
}

impl RequestFrame {
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The complete frame on the wire.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Transport independent blocking request/response exchange.
pub trait Transport: Send + fmt::Debug {
    fn kind(&self) -> TransportKind;

    fn settings(&self) -> &Settings;

    /// Encodes `request` into the frame of this transport.
    fn build_request_frame(&self, slave: Slave, request: &Request<'_>) -> Result<RequestFrame>;

    /// Performs a single attempt: Sends the frame and receives the response.
    fn exchange(&mut self, frame: &RequestFrame) -> Result<Response>;

    /// Sends the frame without waiting for a response.
    fn send_frame(&mut self, frame: &RequestFrame) -> Result<()>;

    /// Closes the connection.
    ///
    /// Closing an already closed transport is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_disposed(&self) -> bool;

    /// Sends the request and waits for the response.
    ///
    /// Transient I/O errors are retried [`Settings::retry_count`] times.
    /// If the last attempt fails too, an [`Error::Timeout`] is returned.
    /// All other errors are returned immediately.
    fn send_and_receive(&mut self, slave: Slave, request: &Request<'_>) -> Result<Response> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        log::debug!("Call {:?}", request);
        let frame = self.build_request_frame(slave, request)?;
        let attempts = self.settings().attempts();
        let retry_delay = self.settings().retry_delay;
        let mut attempt = 1;
        loop {
            match self.exchange(&frame) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    if attempt >= attempts {
                        return Err(err.into_timeout(attempts));
                    }
                    log::warn!(
                        "Attempt {attempt}/{attempts} of {} failed: {err}",
                        frame.context.function_code()
                    );
                    std::thread::sleep(retry_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sends the request without reading a response, e.g. a broadcast.
    fn send_fire_and_forget(&mut self, slave: Slave, request: &Request<'_>) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        log::debug!("Send {:?}", request);
        let frame = self.build_request_frame(slave, request)?;
        self.send_frame(&frame)
    }
}

pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Writes the frame within the write timeout.
///
/// The timeout is applied before every write, serial ports share a
/// single timeout with the reads of the previous exchange.
pub(crate) fn write_frame<C>(conn: &mut C, frame: &RequestFrame, settings: &Settings) -> Result<()>
where
    C: Connection + ?Sized,
{
    conn.set_write_timeout(settings.write_timeout)?;
    log::trace!("Sending frame: {:02X?}", &frame.bytes[..]);
    conn.write_all(&frame.bytes)?;
    conn.flush()?;
    Ok(())
}

/// Reads chunks from the connection until the decoder yields a frame.
pub(crate) fn read_frame<C, D>(conn: &mut C, decoder: &mut D, buf: &mut BytesMut) -> Result<ResponseAdu>
where
    C: Read + ?Sized,
    D: Decoder<Item = ResponseAdu, Error = Error>,
{
    let mut chunk = [0u8; 256];
    loop {
        if let Some(adu) = decoder.decode(buf)? {
            return Ok(adu);
        }
        let len = conn.read(&mut chunk)?;
        if len == 0 {
            return Err(Error::Connection(io::ErrorKind::UnexpectedEof.into()));
        }
        buf.extend_from_slice(&chunk[..len]);
    }
}

/// Writes the request and decodes the response of a single attempt.
pub(crate) fn exchange_frame<C, D>(
    conn: &mut C,
    decoder: &mut D,
    buf: &mut BytesMut,
    frame: &RequestFrame,
    settings: &Settings,
) -> Result<Response>
where
    C: Connection + ?Sized,
    D: Decoder<Item = ResponseAdu, Error = Error>,
{
    // Drop leftovers of previous attempts
    buf.clear();
    write_frame(conn, frame, settings)?;
    conn.set_read_timeout(settings.read_timeout)?;
    let adu = read_frame(conn, decoder, buf)?;
    adu.try_into_response(frame.context)
}

pub(crate) fn apply_timeouts<C>(conn: &mut C, settings: &Settings) -> Result<()>
where
    C: Connection + ?Sized,
{
    conn.set_read_timeout(settings.read_timeout)?;
    conn.set_write_timeout(settings.write_timeout)?;
    Ok(())
}

pub(crate) fn close_connection<C>(conn: &mut Option<C>) -> Result<()>
where
    C: Connection,
{
    if let Some(mut conn) = conn.take() {
        log::debug!("Closing connection {conn:?}");
        conn.close()?;
    }
    Ok(())
}
