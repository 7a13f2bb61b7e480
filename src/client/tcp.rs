// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus TCP context

use std::{fmt, io, net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use crate::{service, settings::Settings, Error, Result};

use super::*;

/// Establish a direct connection to a Modbus TCP coupler.
pub async fn connect(socket_addr: SocketAddr, settings: Settings) -> Result<Context> {
    connect_slave(socket_addr, Slave::tcp_device(), settings).await
}

/// Connect to a physical, broadcast, or custom Modbus device,
/// probably through a Modbus TCP gateway that is forwarding
/// messages to/from the corresponding slave device.
///
/// The read timeout also limits the time for establishing the connection.
pub async fn connect_slave(
    socket_addr: SocketAddr,
    slave: Slave,
    settings: Settings,
) -> Result<Context> {
    settings.validate()?;
    log::debug!("Connecting to {socket_addr}");
    let stream = tokio::time::timeout(settings.read_timeout, TcpStream::connect(socket_addr))
        .await
        .map_err(|_| Error::Connection(io::ErrorKind::TimedOut.into()))?
        .map_err(Error::Connection)?;
    stream.set_nodelay(true)?;
    attach_slave(stream, slave, settings)
}

/// Attach a new client context to a direct transport connection.
pub fn attach<T>(transport: T, settings: Settings) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    attach_slave(transport, Slave::tcp_device(), settings)
}

/// Attach a new client context to a transport connection.
pub fn attach_slave<T>(transport: T, slave: Slave, settings: Settings) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    let client = service::tcp::Client::new(transport, settings)?;
    Ok(Context::new(Arc::new(client), slave))
}
