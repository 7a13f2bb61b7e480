// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus TCP over a blocking socket

use std::{
    net::{SocketAddr, TcpStream},
    sync::atomic::{AtomicU16, Ordering},
};

use tokio_util::codec::Encoder as _;

use crate::{
    bytes::BytesMut,
    codec,
    frame::{
        adu::{Header, RequestAdu, TransactionId},
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

const INITIAL_TRANSACTION_ID: TransactionId = 0;

/// Modbus TCP transport
#[derive(Debug)]
pub struct TcpTransport<C = TcpStream> {
    conn: Option<C>,
    settings: Settings,
    buf: BytesMut,
    transaction_id: AtomicU16,
}

impl TcpTransport<TcpStream> {
    /// Connects to a Modbus TCP device or gateway.
    ///
    /// The read timeout also limits the time for establishing the connection.
    pub fn connect(socket_addr: SocketAddr, settings: Settings) -> Result<Self> {
        settings.validate()?;
        log::debug!("Connecting to {socket_addr}");
        let stream =
            TcpStream::connect_timeout(&socket_addr, settings.read_timeout).map_err(Error::Connection)?;
        stream.set_nodelay(true)?;
        Self::new(stream, settings)
    }
}

impl<C> TcpTransport<C>
where
    C: Connection,
{
    /// Takes ownership of an established connection.
    pub fn new(mut conn: C, settings: Settings) -> Result<Self> {
        settings.validate()?;
        apply_timeouts(&mut conn, &settings)?;
        Ok(Self {
            conn: Some(conn),
            settings,
            buf: BytesMut::new(),
            transaction_id: AtomicU16::new(INITIAL_TRANSACTION_ID),
        })
    }

    fn next_transaction_id(&self) -> TransactionId {
        self.transaction_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl<C> Transport for TcpTransport<C>
where
    C: Connection,
{
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn build_request_frame(&self, slave: Slave, request: &Request<'_>) -> Result<RequestFrame> {
        let hdr = Header::tcp(slave, self.next_transaction_id());
        let adu = RequestAdu::new(hdr, request.clone());
        let context = adu.context();
        let mut buf = BytesMut::new();
        codec::tcp::ClientCodec.encode(adu, &mut buf)?;
        Ok(RequestFrame {
            context,
            bytes: buf.freeze(),
        })
    }

    fn exchange(&mut self, frame: &RequestFrame) -> Result<Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::Disposed);
        };
        exchange_frame(
            conn,
            &mut codec::tcp::ClientCodec,
            &mut self.buf,
            frame,
            &self.settings,
        )
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
