// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::net::SocketAddr;

use super::{Context, Result};

use crate::{
    settings::Settings,
    slave::Slave,
    transport::{tcp::TcpTransport, Connection},
};

/// Establish a direct connection to a Modbus TCP coupler.
pub fn connect(socket_addr: SocketAddr, settings: Settings) -> Result<Context> {
    connect_slave(socket_addr, Slave::tcp_device(), settings)
}

/// Connect to any kind of Modbus slave device, probably through a Modbus TCP/RTU
/// gateway that is forwarding messages to/from the corresponding unit identified
/// by the slave parameter.
pub fn connect_slave(socket_addr: SocketAddr, slave: Slave, settings: Settings) -> Result<Context> {
    let transport = TcpTransport::connect(socket_addr, settings)?;
    Ok(Context::new(Box::new(transport), slave))
}

/// Attach a new client context to an established connection.
pub fn attach_slave<C>(conn: C, slave: Slave, settings: Settings) -> Result<Context>
where
    C: Connection + 'static,
{
    let transport = TcpTransport::new(conn, settings)?;
    Ok(Context::new(Box::new(transport), slave))
}
