// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extracting the data of typed responses

use crate::{
    error::ProtocolError,
    frame::{
        Coil, CommEventLog, FileRecordRef, Quantity, ReadDeviceIdentificationResponse, Request,
        Response, Word,
    },
    Error, Result,
};

fn unexpected(response: Response) -> Error {
    ProtocolError::UnexpectedResponse { response }.into()
}

/// The response a slave would send for a write request.
///
/// Used to check the echo of regular writes and as the result of
/// broadcasts that are never answered.
pub(crate) fn write_echo(request: &Request<'_>) -> Option<Response> {
    let echo = match request {
        Request::WriteSingleCoil(addr, coil) => Response::WriteSingleCoil(*addr, *coil),
        Request::WriteSingleRegister(addr, word) => Response::WriteSingleRegister(*addr, *word),
        Request::WriteMultipleCoils(addr, coils) => {
            Response::WriteMultipleCoils(*addr, coils.len().try_into().ok()?)
        }
        Request::WriteMultipleRegisters(addr, words) => {
            Response::WriteMultipleRegisters(*addr, words.len().try_into().ok()?)
        }
        Request::MaskWriteRegister(addr, and_mask, or_mask) => {
            Response::MaskWriteRegister(*addr, *and_mask, *or_mask)
        }
        Request::WriteFileRecord(records) => Response::WriteFileRecord(records.to_vec()),
        _ => return None,
    };
    Some(echo)
}

pub(crate) fn check_write_echo(request: &Request<'_>, response: Response) -> Result<()> {
    if write_echo(request).as_ref() == Some(&response) {
        Ok(())
    } else {
        Err(unexpected(response))
    }
}

/// The protocol always returns entire bytes, i.e. a multiple of 8 coils.
pub(crate) fn coils(response: Response, cnt: Quantity) -> Result<Vec<Coil>> {
    let cnt = usize::from(cnt);
    match response {
        Response::ReadCoils(mut coils) | Response::ReadDiscreteInputs(mut coils)
            if coils.len() >= cnt =>
        {
            coils.truncate(cnt);
            Ok(coils)
        }
        response => Err(unexpected(response)),
    }
}

pub(crate) fn words(response: Response, cnt: Quantity) -> Result<Vec<Word>> {
    match response {
        Response::ReadHoldingRegisters(words)
        | Response::ReadInputRegisters(words)
        | Response::ReadWriteMultipleRegisters(words)
            if words.len() == usize::from(cnt) =>
        {
            Ok(words)
        }
        response => Err(unexpected(response)),
    }
}

pub(crate) fn exception_status(response: Response) -> Result<u8> {
    match response {
        Response::ReadExceptionStatus(status) => Ok(status),
        response => Err(unexpected(response)),
    }
}

/// The slave must echo the sub-function of the request.
pub(crate) fn diagnostics(response: Response, sub_function: Word) -> Result<Vec<Word>> {
    match response {
        Response::Diagnostics(echo, data) if echo == sub_function => Ok(data),
        response => Err(unexpected(response)),
    }
}

pub(crate) fn comm_event_counter(response: Response) -> Result<(Word, Word)> {
    match response {
        Response::GetCommEventCounter(status, event_count) => Ok((status, event_count)),
        response => Err(unexpected(response)),
    }
}

pub(crate) fn comm_event_log(response: Response) -> Result<CommEventLog> {
    match response {
        Response::GetCommEventLog(log) => Ok(log),
        response => Err(unexpected(response)),
    }
}

pub(crate) fn server_id(response: Response) -> Result<(u8, bool, Vec<u8>)> {
    match response {
        Response::ReportServerId(server_id, run_indication, data) => {
            Ok((server_id, run_indication, data))
        }
        response => Err(unexpected(response)),
    }
}

/// Each record must contain exactly the requested number of registers.
pub(crate) fn file_records(response: Response, refs: &[FileRecordRef]) -> Result<Vec<Vec<Word>>> {
    match response {
        Response::ReadFileRecord(records)
            if records.len() == refs.len()
                && records
                    .iter()
                    .zip(refs)
                    .all(|(record, file_ref)| record.len() == usize::from(file_ref.record_length)) =>
        {
            Ok(records)
        }
        response => Err(unexpected(response)),
    }
}

pub(crate) fn fifo_queue(response: Response) -> Result<Vec<Word>> {
    match response {
        Response::ReadFifoQueue(words) => Ok(words),
        response => Err(unexpected(response)),
    }
}

pub(crate) fn device_identification(response: Response) -> Result<ReadDeviceIdentificationResponse> {
    match response {
        Response::ReadDeviceIdentification(identification) => Ok(identification),
        response => Err(unexpected(response)),
    }
}
