// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus clients

use std::{borrow::Cow, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{error::ValidationError, frame::*, service::AsyncTransport, slave::*, Result};

#[cfg(feature = "ascii")]
pub mod ascii;

#[cfg(feature = "tcp")]
pub mod tcp;

pub mod sync;

pub(crate) mod response;
pub(crate) mod validation;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: SlaveContext + Send + Debug {
    /// Invokes a _Modbus_ function.
    ///
    /// Exception responses of the slave are returned as
    /// [`crate::Error::Exception`].
    async fn call(&mut self, request: Request<'_>) -> Result<Response>;

    /// Disconnects the client.
    ///
    /// Permanently disconnects the client by shutting down the
    /// underlying stream in a graceful manner. All subsequent
    /// requests fail with [`crate::Error::Disposed`].
    async fn disconnect(&mut self) -> Result<()>;
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple coils (0x01)
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple discrete inputs (0x02)
    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple holding registers (0x03)
    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read and write multiple holding registers (0x17)
    ///
    /// The write operation is performed before the read unlike
    /// the name of the operation might suggest!
    async fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>>;

    /// Read the eight exception status outputs (0x07)
    async fn read_exception_status(&mut self) -> Result<u8>;

    /// Run a diagnostic sub-function and return its data (0x08)
    async fn diagnostics(&mut self, sub_function: Word, data: &[Word]) -> Result<Vec<Word>>;

    /// Read the status word and the event counter (0x0B)
    async fn get_comm_event_counter(&mut self) -> Result<(Word, Word)>;

    /// Read the communication event log (0x0C)
    async fn get_comm_event_log(&mut self) -> Result<CommEventLog>;

    /// Read the server id, the run indicator and additional data (0x11)
    async fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)>;

    /// Read groups of file registers (0x14)
    async fn read_file_record(&mut self, refs: &[FileRecordRef]) -> Result<Vec<Vec<Word>>>;

    /// Read the contents of a FIFO queue (0x18)
    async fn read_fifo_queue(&mut self, addr: Address) -> Result<Vec<Word>>;

    /// Read device identification objects (0x2B / 0x0E)
    async fn read_device_identification(
        &mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse>;
}

/// Asynchronous Modbus writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single coil (0x05)
    async fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()>;

    /// Write a single holding register (0x06)
    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple coils (0x0F)
    async fn write_multiple_coils(&mut self, addr: Address, coils: &'_ [Coil]) -> Result<()>;

    /// Write multiple holding registers (0x10)
    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;

    /// Set or clear individual bits of a holding register (0x16)
    async fn masked_write_register(
        &mut self,
        addr: Address,
        and_mask: Word,
        or_mask: Word,
    ) -> Result<()>;

    /// Write groups of file registers (0x15)
    async fn write_file_record(&mut self, records: &[FileRecord]) -> Result<()>;
}

/// Asynchronous Modbus client context
///
/// Cloned contexts share the same transport, e.g. for addressing
/// multiple slaves behind a gateway.
#[derive(Debug, Clone)]
pub struct Context {
    transport: Arc<dyn AsyncTransport>,
    slave: Slave,
    cancel: CancellationToken,
}

impl Context {
    /// Creates a context for `slave` on top of a shared transport.
    #[must_use]
    pub fn new(transport: Arc<dyn AsyncTransport>, slave: Slave) -> Self {
        Self {
            transport,
            slave,
            cancel: CancellationToken::new(),
        }
    }

    /// Aborts all pending and subsequent requests when `cancel` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn slave(&self) -> Slave {
        self.slave
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn AsyncTransport> {
        &self.transport
    }
}

#[async_trait]
impl Client for Context {
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        let kind = self.transport.kind();
        let function = request.function_code();
        validation::validate_slave(kind, self.slave, function)?;
        validation::validate_request(&request)?;
        if validation::is_fire_and_forget(kind, self.slave) {
            let echo = response::write_echo(&request).ok_or(ValidationError::InvalidSlave {
                slave: self.slave,
                function,
            })?;
            self.transport
                .send_fire_and_forget(self.slave, request)
                .await?;
            return Ok(echo);
        }
        self.transport
            .send_and_receive(self.slave, request, &self.cancel)
            .await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.transport.close().await
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

#[async_trait]
impl Reader for Context {
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        let rsp = self.call(Request::ReadCoils(addr, cnt)).await?;
        response::coils(rsp, cnt)
    }

    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        let rsp = self.call(Request::ReadDiscreteInputs(addr, cnt)).await?;
        response::coils(rsp, cnt)
    }

    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadHoldingRegisters(addr, cnt)).await?;
        response::words(rsp, cnt)
    }

    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadInputRegisters(addr, cnt)).await?;
        response::words(rsp, cnt)
    }

    async fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        let rsp = self
            .call(Request::ReadWriteMultipleRegisters(
                read_addr,
                read_count,
                write_addr,
                Cow::Borrowed(write_data),
            ))
            .await?;
        response::words(rsp, read_count)
    }

    async fn read_exception_status(&mut self) -> Result<u8> {
        let rsp = self.call(Request::ReadExceptionStatus).await?;
        response::exception_status(rsp)
    }

    async fn diagnostics(&mut self, sub_function: Word, data: &[Word]) -> Result<Vec<Word>> {
        let rsp = self
            .call(Request::Diagnostics(sub_function, Cow::Borrowed(data)))
            .await?;
        response::diagnostics(rsp, sub_function)
    }

    async fn get_comm_event_counter(&mut self) -> Result<(Word, Word)> {
        let rsp = self.call(Request::GetCommEventCounter).await?;
        response::comm_event_counter(rsp)
    }

    async fn get_comm_event_log(&mut self) -> Result<CommEventLog> {
        let rsp = self.call(Request::GetCommEventLog).await?;
        response::comm_event_log(rsp)
    }

    async fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)> {
        let rsp = self.call(Request::ReportServerId).await?;
        response::server_id(rsp)
    }

    async fn read_file_record(&mut self, refs: &[FileRecordRef]) -> Result<Vec<Vec<Word>>> {
        let rsp = self.call(Request::ReadFileRecord(Cow::Borrowed(refs))).await?;
        response::file_records(rsp, refs)
    }

    async fn read_fifo_queue(&mut self, addr: Address) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadFifoQueue(addr)).await?;
        response::fifo_queue(rsp)
    }

    async fn read_device_identification(
        &mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse> {
        let rsp = self
            .call(Request::ReadDeviceIdentification(read_code, object_id))
            .await?;
        response::device_identification(rsp)
    }
}

#[async_trait]
impl Writer for Context {
    async fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        let req = Request::WriteSingleCoil(addr, coil);
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }

    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        let req = Request::WriteSingleRegister(addr, word);
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }

    async fn write_multiple_coils(&mut self, addr: Address, coils: &[Coil]) -> Result<()> {
        let req = Request::WriteMultipleCoils(addr, Cow::Borrowed(coils));
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }

    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        let req = Request::WriteMultipleRegisters(addr, Cow::Borrowed(words));
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }

    async fn masked_write_register(
        &mut self,
        addr: Address,
        and_mask: Word,
        or_mask: Word,
    ) -> Result<()> {
        let req = Request::MaskWriteRegister(addr, and_mask, or_mask);
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }

    async fn write_file_record(&mut self, records: &[FileRecord]) -> Result<()> {
        let req = Request::WriteFileRecord(Cow::Borrowed(records));
        let rsp = self.call(req.clone()).await?;
        response::check_write_echo(&req, rsp)
    }
}
