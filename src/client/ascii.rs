// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus ASCII context

use std::{fmt, sync::Arc};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{service, settings::Settings, Result};

use super::*;

/// Attach a new client context to a serial line, e.g. a serial port
/// or a TCP connection to a serial device server.
pub fn attach<T>(transport: T, settings: Settings) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    attach_slave(transport, Slave::min_device(), settings)
}

/// Attach a new client context for `slave` to a serial line.
///
/// Requests to [`Slave::broadcast()`] are only sent and never answered.
pub fn attach_slave<T>(transport: T, slave: Slave, settings: Settings) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    let client = service::ascii::Client::new(transport, settings)?;
    Ok(Context::new(Arc::new(client), slave))
}

/// Open a serial port and attach a new client context for `slave`.
#[cfg(feature = "serial")]
pub fn open_slave(
    builder: &tokio_serial::SerialPortBuilder,
    slave: Slave,
    settings: Settings,
) -> Result<Context> {
    log::debug!("Opening {builder:?}");
    let port = tokio_serial::SerialStream::open(builder).map_err(std::io::Error::from)?;
    attach_slave(port, slave, settings)
}
