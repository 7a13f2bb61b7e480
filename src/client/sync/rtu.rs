// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Context, Result};

use crate::{
    settings::Settings,
    slave::Slave,
    transport::{rtu::RtuTransport, Connection},
};

/// Attach a new client context for `slave` to a serial line.
///
/// Requests to [`Slave::broadcast()`] are only sent and never answered.
pub fn attach_slave<C>(conn: C, slave: Slave, settings: Settings) -> Result<Context>
where
    C: Connection + 'static,
{
    let transport = RtuTransport::new(conn, settings)?;
    Ok(Context::new(Box::new(transport), slave))
}

/// Open a serial port and connect to any kind of Modbus slave device.
///
/// The RTU timing is derived from the baud rate of `builder`.
#[cfg(feature = "serial")]
pub fn connect_slave(
    builder: &tokio_serial::SerialPortBuilder,
    slave: Slave,
    settings: Settings,
) -> Result<Context> {
    let conn = crate::transport::SerialConnection::open(builder)?;
    let baud_rate = conn.baud_rate()?;
    attach_slave(conn, slave, settings.with_rtu_timing_for_baud_rate(baud_rate))
}
