// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [Modbus](https://en.wikipedia.org/wiki/Modbus) master (client) library
//! for the ASCII, RTU and TCP transmission modes.
//!
//! Modbus is based on a [master/slave](https://en.wikipedia.org/wiki/Master/slave_(technology))
//! model. The master sends requests to a slave device that is identified by
//! its address on a serial line or by its unit identifier on TCP.
//!
//! ## Features
//!
//! - Modbus ASCII with LRC, Modbus RTU with CRC and Modbus TCP with MBAP header
//! - Blocking transports for all three modes, see [`client::sync`]
//! - Asynchronous transports for ASCII and TCP based on
//!   [tokio](https://tokio.rs), see [`client`]
//! - Configurable retries and timeouts, see [`Settings`]
//!
//! RTU is only available as a blocking transport, because frames are
//! delimited by silence on the line. Run it on a dedicated thread, e.g.
//! with `tokio::task::spawn_blocking`.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "tcp")]
//! # async fn read() -> modbus_master::Result<()> {
//! use modbus_master::{prelude::*, Settings};
//!
//! let socket_addr = "192.168.0.222:502".parse().unwrap();
//! let mut ctx = tcp::connect(socket_addr, Settings::default()).await?;
//! let words = ctx.read_holding_registers(0x1000, 7).await?;
//! println!("{words:?}");
//! ctx.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol-Specification
//!
//! - [MODBUS Application Protocol Specification v1.1b3 (PDF)](http://modbus.org/docs/Modbus_Application_Protocol_V1_1b3.pdf)
//! - [MODBUS over serial line specification and implementation guide v1.02 (PDF)](http://modbus.org/docs/Modbus_over_serial_line_V1_02.pdf)
//! - [MODBUS Messaging on TCP/IP Implementation Guide v1.0b (PDF)](http://modbus.org/docs/Modbus_Messaging_Implementation_Guide_V1_0b.pdf)

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

// Re-export the `bytes` crate
pub use bytes;

pub mod prelude;

pub mod checksum;
pub mod client;
pub mod service;
pub mod transport;

mod codec;
pub use self::codec::hex;

mod error;
pub use self::error::{ChecksumKind, Error, ProtocolError, Result, ValidationError};

mod frame;
pub use self::frame::{
    adu::{RequestContext, TransactionId},
    *,
};

mod settings;
pub use self::settings::Settings;

mod slave;
pub use self::slave::{Slave, SlaveContext, SlaveId};
