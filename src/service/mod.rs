// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous transports
//!
//! Only ASCII and TCP are available asynchronously, RTU requires
//! blocking reads to keep the timing of the serial line.

use std::{fmt, future::Future, io, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    frame::{FunctionCode, Request, Response},
    settings::Settings,
    slave::Slave,
    transport::TransportKind,
    Error, Result,
};

#[cfg(feature = "ascii")]
pub(crate) mod ascii;

#[cfg(feature = "tcp")]
pub(crate) mod tcp;

/// Transport independent asynchronous request/response exchange.
///
/// All methods take `&self`, concurrent requests are serialized.
#[async_trait]
pub trait AsyncTransport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    fn settings(&self) -> &Settings;

    /// Sends the request and waits for the response.
    ///
    /// Retries like [`crate::transport::Transport::send_and_receive`].
    /// Cancelling `cancel` aborts the current wait immediately and
    /// results in [`Error::Cancelled`].
    async fn send_and_receive(
        &self,
        slave: Slave,
        request: Request<'_>,
        cancel: &CancellationToken,
    ) -> Result<Response>;

    /// Sends the request without reading a response.
    async fn send_fire_and_forget(&self, slave: Slave, request: Request<'_>) -> Result<()>;

    /// Shuts down the connection.
    ///
    /// Closing an already closed transport is a no-op.
    async fn close(&self) -> Result<()>;

    async fn is_disposed(&self) -> bool;
}

/// Applies the retry policy of `settings` to `attempt`.
pub(crate) async fn with_retries<F, Fut>(
    settings: &Settings,
    function: FunctionCode,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let attempts = settings.attempts();
    let mut count = 1;
    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = attempt() => result,
        };
        match result {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() => {
                if count >= attempts {
                    return Err(err.into_timeout(attempts));
                }
                log::warn!("Attempt {count}/{attempts} of {function} failed: {err}");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(settings.retry_delay) => (),
                }
                count += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Limits a single I/O operation.
pub(crate) async fn with_timeout<T, Fut>(
    timeout: Duration,
    operation: &'static str,
    future: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, future).await.map_err(|_| {
        Error::Transport(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{operation} timed out after {timeout:?}"),
        ))
    })?
}
