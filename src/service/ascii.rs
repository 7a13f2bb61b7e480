// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, io};

use async_trait::async_trait;
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt as _},
    sync::Mutex,
};
use tokio_util::{codec::Framed, sync::CancellationToken};

use crate::{
    codec,
    frame::{
        adu::{Header, RequestAdu},
        Request, Response,
    },
    settings::Settings,
    slave::Slave,
    transport::TransportKind,
    Error, Result,
};

use super::{with_retries, with_timeout, AsyncTransport};

/// Modbus ASCII client
#[derive(Debug)]
pub(crate) struct Client<T> {
    framed: Mutex<Option<Framed<T, codec::ascii::ClientCodec>>>,
    settings: Settings,
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(transport: T, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let framed = Framed::new(transport, codec::ascii::ClientCodec::new(&settings));
        Ok(Self {
            framed: Mutex::new(Some(framed)),
            settings,
        })
    }

    async fn exchange(&self, req_adu: &RequestAdu<'_>) -> Result<Response> {
        let mut framed = self.framed.lock().await;
        let framed = framed.as_mut().ok_or(Error::Disposed)?;

        framed.read_buffer_mut().clear();

        with_timeout(
            self.settings.write_timeout,
            "write",
            framed.send(req_adu.clone()),
        )
        .await?;
        let res_adu = with_timeout(self.settings.read_timeout, "read", async {
            framed
                .next()
                .await
                .unwrap_or_else(|| Err(Error::Connection(io::ErrorKind::UnexpectedEof.into())))
        })
        .await?;

        res_adu.try_into_response(req_adu.context())
    }
}

#[async_trait]
impl<T> AsyncTransport for Client<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    fn kind(&self) -> TransportKind {
        TransportKind::Ascii
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn send_and_receive(
        &self,
        slave: Slave,
        req: Request<'_>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        log::debug!("Call {:?}", req);
        let function = req.function_code();
        let req_adu = RequestAdu::new(Header::serial(slave), req);
        with_retries(&self.settings, function, cancel, || self.exchange(&req_adu)).await
    }

    async fn send_fire_and_forget(&self, slave: Slave, req: Request<'_>) -> Result<()> {
        log::debug!("Send {:?}", req);
        let req_adu = RequestAdu::new(Header::serial(slave), req);
        let mut framed = self.framed.lock().await;
        let framed = framed.as_mut().ok_or(Error::Disposed)?;
        with_timeout(self.settings.write_timeout, "write", framed.send(req_adu)).await
    }

    async fn close(&self) -> Result<()> {
        let Some(framed) = self.framed.lock().await.take() else {
            return Ok(());
        };
        log::debug!("Closing connection");
        let mut transport = framed.into_inner();
        transport.shutdown().await.map_err(Into::into)
    }

    async fn is_disposed(&self) -> bool {
        self.framed.lock().await.is_none()
    }
}
