// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus ASCII over a blocking byte stream

use crate::{
    bytes::BytesMut,
    codec,
    frame::{
        adu::{Header, RequestAdu},
        Request, Response,
    },
    settings::Settings,
    slave::Slave,
    Error, Result,
};

use super::{
    apply_timeouts, close_connection, exchange_frame, write_frame, Connection, RequestFrame,
    Transport, TransportKind,
};

/// Modbus ASCII transport
#[derive(Debug)]
pub struct AsciiTransport<C> {
    conn: Option<C>,
    codec: codec::ascii::ClientCodec,
    settings: Settings,
    buf: BytesMut,
}

impl<C> AsciiTransport<C>
where
    C: Connection,
{
    /// Takes ownership of an opened connection.
    pub fn new(mut conn: C, settings: Settings) -> Result<Self> {
        settings.validate()?;
        apply_timeouts(&mut conn, &settings)?;
        let codec = codec::ascii::ClientCodec::new(&settings);
        Ok(Self {
            conn: Some(conn),
            codec,
            settings,
            buf: BytesMut::new(),
        })
    }
}

impl<C> Transport for AsciiTransport<C>
where
    C: Connection,
{
    fn kind(&self) -> TransportKind {
        TransportKind::Ascii
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn build_request_frame(&self, slave: Slave, request: &Request<'_>) -> Result<RequestFrame> {
        let adu = RequestAdu::new(Header::serial(slave), request.clone());
        let context = adu.context();
        let mut buf = BytesMut::new();
        self.codec.encode_adu(adu, &mut buf)?;
        Ok(RequestFrame {
            context,
            bytes: buf.freeze(),
        })
    }

    fn exchange(&mut self, frame: &RequestFrame) -> Result<Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::Disposed);
        };
        exchange_frame(conn, &mut self.codec, &mut self.buf, frame, &self.settings)
    }

    fn send_frame(&mut self, frame: &RequestFrame) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::Disposed);
        };
        write_frame(conn, frame, &self.settings)
    }

    fn close(&mut self) -> Result<()> {
        close_connection(&mut self.conn)
    }

    fn is_disposed(&self) -> bool {
        self.conn.is_none()
    }
}
