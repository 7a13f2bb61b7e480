// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus context access

#[cfg(feature = "ascii")]
pub mod ascii;

#[cfg(feature = "rtu")]
pub mod rtu;

#[cfg(feature = "tcp")]
pub mod tcp;

use std::borrow::Cow;

use super::{response, validation, SlaveContext};

use crate::{error::ValidationError, frame::*, slave::*, transport::Transport, Result};

/// A transport independent synchronous client trait.
pub trait Client: SlaveContext {
    fn call(&mut self, req: Request<'_>) -> Result<Response>;

    fn disconnect(&mut self) -> Result<()>;
}

/// A transport independent synchronous reader trait.
pub trait Reader: Client {
    fn read_coils(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_discrete_inputs(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_input_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_holding_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_write_multiple_registers(
        &mut self,
        _: Address,
        _: Quantity,
        _: Address,
        _: &[Word],
    ) -> Result<Vec<Word>>;
    fn read_exception_status(&mut self) -> Result<u8>;
    fn diagnostics(&mut self, sub_function: Word, data: &[Word]) -> Result<Vec<Word>>;
    fn get_comm_event_counter(&mut self) -> Result<(Word, Word)>;
    fn get_comm_event_log(&mut self) -> Result<CommEventLog>;
    fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)>;
    fn read_file_record(&mut self, _: &[FileRecordRef]) -> Result<Vec<Vec<Word>>>;
    fn read_fifo_queue(&mut self, _: Address) -> Result<Vec<Word>>;
    fn read_device_identification(
        &mut self,
        _: ReadCode,
        _: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse>;
}

/// A transport independent synchronous writer trait.
pub trait Writer: Client {
    fn write_single_coil(&mut self, _: Address, _: Coil) -> Result<()>;
    fn write_multiple_coils(&mut self, _: Address, _: &[Coil]) -> Result<()>;
    fn write_single_register(&mut self, _: Address, _: Word) -> Result<()>;
    fn write_multiple_registers(&mut self, _: Address, _: &[Word]) -> Result<()>;
    fn masked_write_register(&mut self, _: Address, _: Word, _: Word) -> Result<()>;
    fn write_file_record(&mut self, _: &[FileRecord]) -> Result<()>;
}

/// A synchronous Modbus client context.
///
/// Requests block the calling thread until the response has been
/// received or all attempts have failed.
#[derive(Debug)]
pub struct Context {
    transport: Box<dyn Transport>,
    slave: Slave,
}

impl Context {
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, slave: Slave) -> Self {
        Self { transport, slave }
    }

    #[must_use]
    pub fn slave(&self) -> Slave {
        self.slave
    }

    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn write(&mut self, req: &Request<'_>) -> Result<()> {
        let rsp = self.call(req.clone())?;
        response::check_write_echo(req, rsp)
    }
}

impl Client for Context {
    fn call(&mut self, req: Request<'_>) -> Result<Response> {
        let kind = self.transport.kind();
        let function = req.function_code();
        validation::validate_slave(kind, self.slave, function)?;
        validation::validate_request(&req)?;
        if validation::is_fire_and_forget(kind, self.slave) {
            let echo = response::write_echo(&req).ok_or(ValidationError::InvalidSlave {
                slave: self.slave,
                function,
            })?;
            self.transport.send_fire_and_forget(self.slave, &req)?;
            return Ok(echo);
        }
        self.transport.send_and_receive(self.slave, &req)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.transport.close()
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

impl Reader for Context {
    fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        let rsp = self.call(Request::ReadCoils(addr, cnt))?;
        response::coils(rsp, cnt)
    }

    fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        let rsp = self.call(Request::ReadDiscreteInputs(addr, cnt))?;
        response::coils(rsp, cnt)
    }

    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadInputRegisters(addr, cnt))?;
        response::words(rsp, cnt)
    }

    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadHoldingRegisters(addr, cnt))?;
        response::words(rsp, cnt)
    }

    fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_cnt: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadWriteMultipleRegisters(
            read_addr,
            read_cnt,
            write_addr,
            Cow::Borrowed(write_data),
        ))?;
        response::words(rsp, read_cnt)
    }

    fn read_exception_status(&mut self) -> Result<u8> {
        let rsp = self.call(Request::ReadExceptionStatus)?;
        response::exception_status(rsp)
    }

    fn diagnostics(&mut self, sub_function: Word, data: &[Word]) -> Result<Vec<Word>> {
        let rsp = self.call(Request::Diagnostics(sub_function, Cow::Borrowed(data)))?;
        response::diagnostics(rsp, sub_function)
    }

    fn get_comm_event_counter(&mut self) -> Result<(Word, Word)> {
        let rsp = self.call(Request::GetCommEventCounter)?;
        response::comm_event_counter(rsp)
    }

    fn get_comm_event_log(&mut self) -> Result<CommEventLog> {
        let rsp = self.call(Request::GetCommEventLog)?;
        response::comm_event_log(rsp)
    }

    fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)> {
        let rsp = self.call(Request::ReportServerId)?;
        response::server_id(rsp)
    }

    fn read_file_record(&mut self, refs: &[FileRecordRef]) -> Result<Vec<Vec<Word>>> {
        let rsp = self.call(Request::ReadFileRecord(Cow::Borrowed(refs)))?;
        response::file_records(rsp, refs)
    }

    fn read_fifo_queue(&mut self, addr: Address) -> Result<Vec<Word>> {
        let rsp = self.call(Request::ReadFifoQueue(addr))?;
        response::fifo_queue(rsp)
    }

    fn read_device_identification(
        &mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse> {
        let rsp = self.call(Request::ReadDeviceIdentification(read_code, object_id))?;
        response::device_identification(rsp)
    }
}

impl Writer for Context {
    fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        self.write(&Request::WriteSingleCoil(addr, coil))
    }

    fn write_multiple_coils(&mut self, addr: Address, coils: &[Coil]) -> Result<()> {
        self.write(&Request::WriteMultipleCoils(addr, Cow::Borrowed(coils)))
    }

    fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        self.write(&Request::WriteSingleRegister(addr, word))
    }

    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        self.write(&Request::WriteMultipleRegisters(addr, Cow::Borrowed(words)))
    }

    fn masked_write_register(&mut self, addr: Address, and_mask: Word, or_mask: Word) -> Result<()> {
        self.write(&Request::MaskWriteRegister(addr, and_mask, or_mask))
    }

    fn write_file_record(&mut self, records: &[FileRecord]) -> Result<()> {
        self.write(&Request::WriteFileRecord(Cow::Borrowed(records)))
    }
}
