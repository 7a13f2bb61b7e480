// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus RTU over a blocking byte stream
//!
//! RTU frames are delimited by silence on the line. The timing can only
//! be kept with blocking reads, so there is no asynchronous variant.

use std::io::{self, Read};

use tokio_util::codec::{Decoder as _, Encoder as _};

use crate::{
    bytes::{BufMut as _, BytesMut},
    codec::{
        self,
        rtu::{response_frame_len, MIN_ADU_LEN},
        MAX_PDU_SIZE,
    },
    frame::{
        adu::{Header, RequestAdu, ResponseAdu},
        Request, Response,
    },
    settings::Settings,
    slave::Slave,
    Error, Result,
};

use super::{
    apply_timeouts, close_connection, is_timeout, write_frame, Connection, RequestFrame,
    Transport, TransportKind,
};

// Upper bound for bytes that are kept for the next frame
const MAX_PENDING_LEN: usize = MAX_PDU_SIZE + MIN_ADU_LEN;

/// Modbus RTU transport
#[derive(Debug)]
pub struct RtuTransport<C> {
    conn: Option<C>,
    settings: Settings,
    /// Bytes received after the end of the previous frame.
    pending: BytesMut,
}

impl<C> RtuTransport<C>
where
    C: Connection,
{
    /// Takes ownership of an opened connection.
    pub fn new(mut conn: C, settings: Settings) -> Result<Self> {
        settings.validate()?;
        apply_timeouts(&mut conn, &settings)?;
        Ok(Self {
            conn: Some(conn),
            settings,
            pending: BytesMut::new(),
        })
    }
}

fn read_byte<C>(conn: &mut C) -> io::Result<u8>
where
    C: Read + ?Sized,
{
    let mut byte = [0u8];
    if conn.read(&mut byte)? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(byte[0])
}

/// Receives a single frame.
///
/// Bytes that arrive within the inter-frame window after a complete
/// frame are kept in `buf` as the beginning of the next frame.
fn read_rtu_frame<C>(conn: &mut C, buf: &mut BytesMut, settings: &Settings) -> Result<ResponseAdu>
where
    C: Connection + ?Sized,
{
    let mut codec = codec::rtu::ClientCodec;

    if buf.is_empty() {
        conn.set_read_timeout(settings.read_timeout)?;
        buf.put_u8(read_byte(conn)?);
    } else {
        log::debug!("Continuing with {} pending byte(s)", buf.len());
    }

    conn.set_read_timeout(settings.rtu_inter_char_timeout)?;
    let result = loop {
        if matches!(response_frame_len(buf), Some(len) if buf.len() >= len) {
            break codec.decode(buf);
        }
        match read_byte(conn) {
            Ok(byte) => buf.put_u8(byte),
            Err(err) if is_timeout(&err) => {
                // The line went silent before the expected length was reached
                let result = codec.decode_eof(buf);
                buf.clear();
                return result?.ok_or_else(|| Error::format("empty RTU frame"));
            }
            Err(err) => {
                buf.clear();
                return Err(err.into());
            }
        }
    };

    conn.set_read_timeout(settings.rtu_inter_frame_timeout)?;
    while buf.len() < MAX_PENDING_LEN {
        match read_byte(conn) {
            Ok(byte) => buf.put_u8(byte),
            Err(err) if is_timeout(&err) => break,
            Err(err) => {
                // Reported by the next exchange
                log::warn!("Failed to read after the end of the frame: {err}");
                break;
            }
        }
    }
    if !buf.is_empty() {
        log::warn!(
            "Received {} byte(s) within the inter-frame window: {:02X?}",
            buf.len(),
            &buf[..]
        );
    }

    result?.ok_or_else(|| Error::format("incomplete RTU frame"))
}

impl<C> Transport for RtuTransport<C>
where
    C: Connection,
{
    fn kind(&self) -> TransportKind {
        TransportKind::Rtu
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn build_request_frame(&self, slave: Slave, request: &Request<'_>) -> Result<RequestFrame> {
        let adu = RequestAdu::new(Header::serial(slave), request.clone());
        let context = adu.context();
        let mut buf = BytesMut::new();
        codec::rtu::ClientCodec.encode(adu, &mut buf)?;
        Ok(RequestFrame {
            context,
            bytes: buf.freeze(),
        })
    }

    fn exchange(&mut self, frame: &RequestFrame) -> Result<Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::Disposed);
        };
        write_frame(conn, frame, &self.settings)?;
        let adu = read_rtu_frame(conn, &mut self.pending, &self.settings)?;
        adu.try_into_response(frame.context)
    }

    fn send_frame(&mut self, frame: &RequestFrame) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::Disposed);
        };
        write_frame(conn, frame, &self.settings)
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        close_connection(&mut self.conn)
    }

    fn is_disposed(&self) -> bool {
        self.conn.is_none()
    }
}
