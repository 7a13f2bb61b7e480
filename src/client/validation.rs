// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request validation before any I/O happens

use std::ops::RangeInclusive;

use crate::{
    codec::request_pdu_size,
    error::ValidationError,
    frame::{FileRecord, FileRecordRef, FunctionCode, Request},
    slave::Slave,
    transport::TransportKind,
};

const READ_COILS: RangeInclusive<usize> = 1..=2000;
const READ_REGISTERS: RangeInclusive<usize> = 1..=125;
const WRITE_COILS: RangeInclusive<usize> = 1..=1968;
const WRITE_REGISTERS: RangeInclusive<usize> = 1..=123;
const READ_WRITE_WRITE_REGISTERS: RangeInclusive<usize> = 1..=121;

/// Each sub-request of "Read File Record" occupies 7 bytes, the
/// byte count must not exceed 0xF5.
const READ_FILE_RECORD_REFS: RangeInclusive<usize> = 1..=35;

/// A single record of a "Read File Record" response must fit into
/// the response byte count.
const READ_FILE_RECORD_LENGTH: RangeInclusive<usize> = 1..=121;

/// Sub-request header (reference type, file number, record number and
/// record length) plus at least one register.
const WRITE_FILE_RECORD_BYTES: RangeInclusive<usize> = 9..=244;

fn check_range(
    function: FunctionCode,
    field: &'static str,
    value: usize,
    range: &RangeInclusive<usize>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        function,
        field,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

fn check_read_file_record(function: FunctionCode, refs: &[FileRecordRef]) -> Result<(), ValidationError> {
    check_range(function, "sub-request count", refs.len(), &READ_FILE_RECORD_REFS)?;
    for file_ref in refs {
        check_range(
            function,
            "record length",
            file_ref.record_length.into(),
            &READ_FILE_RECORD_LENGTH,
        )?;
    }
    Ok(())
}

fn check_write_file_record(function: FunctionCode, records: &[FileRecord]) -> Result<(), ValidationError> {
    let mut byte_count = 0;
    for record in records {
        check_range(
            function,
            "record length",
            record.data.len(),
            &(1..=*WRITE_FILE_RECORD_BYTES.end()),
        )?;
        byte_count += 7 + record.data.len() * 2;
    }
    check_range(function, "byte count", byte_count, &WRITE_FILE_RECORD_BYTES)
}

/// Checks the quantities of a request against the limits of the protocol.
pub(crate) fn validate_request(request: &Request<'_>) -> Result<(), ValidationError> {
    use Request::*;

    let function = request.function_code();
    match request {
        ReadCoils(_, cnt) | ReadDiscreteInputs(_, cnt) => {
            check_range(function, "quantity", (*cnt).into(), &READ_COILS)?;
        }
        ReadHoldingRegisters(_, cnt) | ReadInputRegisters(_, cnt) => {
            check_range(function, "quantity", (*cnt).into(), &READ_REGISTERS)?;
        }
        WriteMultipleCoils(_, coils) => {
            check_range(function, "quantity", coils.len(), &WRITE_COILS)?;
        }
        WriteMultipleRegisters(_, words) => {
            check_range(function, "quantity", words.len(), &WRITE_REGISTERS)?;
        }
        ReadWriteMultipleRegisters(_, read_cnt, _, words) => {
            check_range(function, "read quantity", (*read_cnt).into(), &READ_REGISTERS)?;
            check_range(
                function,
                "write quantity",
                words.len(),
                &READ_WRITE_WRITE_REGISTERS,
            )?;
        }
        ReadFileRecord(refs) => check_read_file_record(function, refs)?,
        WriteFileRecord(records) => check_write_file_record(function, records)?,
        ReadExceptionStatus
        | Diagnostics(_, _)
        | GetCommEventCounter
        | GetCommEventLog
        | ReportServerId
        | WriteSingleCoil(_, _)
        | WriteSingleRegister(_, _)
        | MaskWriteRegister(_, _, _)
        | ReadFifoQueue(_)
        | ReadDeviceIdentification(_, _)
        | Custom(_, _) => (),
    }
    request_pdu_size(request).map(|_| ())
}

/// Checks if `slave` can be addressed with `function` on a transport of `kind`.
///
/// A serial line accepts the addresses `0..=247`, but a broadcast is
/// only allowed for writes. Any unit identifier can be used with TCP.
pub(crate) fn validate_slave(
    kind: TransportKind,
    slave: Slave,
    function: FunctionCode,
) -> Result<(), ValidationError> {
    if !kind.is_serial() {
        return Ok(());
    }
    if slave.is_reserved() || (slave.is_broadcast() && !function.is_write()) {
        return Err(ValidationError::InvalidSlave { slave, function });
    }
    Ok(())
}

/// Broadcasts are not answered by any slave.
pub(crate) fn is_fire_and_forget(kind: TransportKind, slave: Slave) -> bool {
    kind.is_serial() && slave.is_broadcast()
}
