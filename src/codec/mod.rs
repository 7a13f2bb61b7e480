// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDU encoding and decoding, shared by all transports.

use std::{
    convert::TryFrom,
    io::{self, BufRead as _, Cursor, ErrorKind},
};

use byteorder::{BigEndian, ReadBytesExt as _};

use crate::{
    bytes::{Buf as _, BufMut as _, Bytes, BytesMut},
    error::ValidationError,
    frame::{
        CommEventLog, ConformityLevel, DeviceIdObject, FileRecord, FileRecordRef, ReadCode,
        ReadDeviceIdentificationResponse, RequestPdu, ResponsePdu, Word,
        FILE_RECORD_REFERENCE_TYPE, MEI_TYPE_READ_DEVICE_IDENTIFICATION,
    },
    Coil, Error, ExceptionCode, ExceptionResponse, FunctionCode, Request, Response,
};

#[cfg(feature = "ascii")]
pub(crate) mod ascii;

pub mod hex;

#[cfg(feature = "rtu")]
pub(crate) mod rtu;

#[cfg(feature = "tcp")]
pub(crate) mod tcp;

/// Maximum request/response PDU size.
///
/// As defined by the protocol for all transports.
pub(crate) const MAX_PDU_SIZE: usize = 253;

/// Maximum number of registers in a FIFO queue.
const MAX_FIFO_COUNT: u16 = 31;

#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, message.into())
}

pub(crate) fn encode_request_pdu(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::frame::Request::*;
    buf.put_u8(request.function_code().value());
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadInputRegisters(address, quantity)
        | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteMultipleCoils(address, coils) => {
            buf.put_u16(*address);
            buf.put_u16(u16_len(coils.len()));
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(buf, coils);
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            encode_words(buf, words);
        }
        ReadExceptionStatus | GetCommEventCounter | GetCommEventLog | ReportServerId => {}
        Diagnostics(sub_function, data) => {
            buf.put_u16(*sub_function);
            encode_words(buf, data);
        }
        ReadFileRecord(refs) => {
            buf.put_u8(u8_len(refs.len() * 7));
            for file_ref in refs.as_ref() {
                buf.put_u8(FILE_RECORD_REFERENCE_TYPE);
                buf.put_u16(file_ref.file_number);
                buf.put_u16(file_ref.record_number);
                buf.put_u16(file_ref.record_length);
            }
        }
        WriteFileRecord(records) => {
            buf.put_u8(u8_len(file_records_size(records)));
            encode_file_records(buf, records);
        }
        MaskWriteRegister(address, and_mask, or_mask) => {
            buf.put_u16(*address);
            buf.put_u16(*and_mask);
            buf.put_u16(*or_mask);
        }
        ReadWriteMultipleRegisters(read_address, quantity, write_address, words) => {
            buf.put_u16(*read_address);
            buf.put_u16(*quantity);
            buf.put_u16(*write_address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            encode_words(buf, words);
        }
        ReadFifoQueue(address) => {
            buf.put_u16(*address);
        }
        ReadDeviceIdentification(read_code, object_id) => {
            buf.put_u8(MEI_TYPE_READ_DEVICE_IDENTIFICATION);
            buf.put_u8(read_code.value());
            buf.put_u8(*object_id);
        }
        Custom(_, custom_data) => {
            buf.put_slice(custom_data.as_ref());
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_response_pdu(buf: &mut BytesMut, response: &Response) {
    use crate::frame::Response::*;
    buf.put_u8(response.function_code().value());
    match response {
        ReadCoils(coils) | ReadDiscreteInputs(coils) => {
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(buf, coils);
        }
        ReadInputRegisters(registers)
        | ReadHoldingRegisters(registers)
        | ReadWriteMultipleRegisters(registers) => {
            buf.put_u8(u8_len(registers.len() * 2));
            encode_words(buf, registers);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteMultipleCoils(address, quantity) | WriteMultipleRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        ReadExceptionStatus(status) => buf.put_u8(*status),
        Diagnostics(sub_function, data) => {
            buf.put_u16(*sub_function);
            encode_words(buf, data);
        }
        GetCommEventCounter(status, event_count) => {
            buf.put_u16(*status);
            buf.put_u16(*event_count);
        }
        GetCommEventLog(log) => {
            buf.put_u8(u8_len(6 + log.events.len()));
            buf.put_u16(log.status);
            buf.put_u16(log.event_count);
            buf.put_u16(log.message_count);
            buf.put_slice(&log.events);
        }
        ReportServerId(server_id, run_indication, additional_data) => {
            buf.put_u8(2 + u8_len(additional_data.len()));
            buf.put_u8(*server_id);
            buf.put_u8(if *run_indication { 0xFF } else { 0x00 });
            buf.put_slice(additional_data);
        }
        ReadFileRecord(records) => {
            let len = records.iter().map(|data| 2 + data.len() * 2).sum();
            buf.put_u8(u8_len(len));
            for data in records {
                buf.put_u8(u8_len(1 + data.len() * 2));
                buf.put_u8(FILE_RECORD_REFERENCE_TYPE);
                encode_words(buf, data);
            }
        }
        WriteFileRecord(records) => {
            buf.put_u8(u8_len(file_records_size(records)));
            encode_file_records(buf, records);
        }
        MaskWriteRegister(address, and_mask, or_mask) => {
            buf.put_u16(*address);
            buf.put_u16(*and_mask);
            buf.put_u16(*or_mask);
        }
        ReadFifoQueue(values) => {
            buf.put_u16(u16_len(2 + values.len() * 2));
            buf.put_u16(u16_len(values.len()));
            encode_words(buf, values);
        }
        ReadDeviceIdentification(rsp) => {
            buf.put_u8(MEI_TYPE_READ_DEVICE_IDENTIFICATION);
            buf.put_u8(rsp.read_code.value());
            buf.put_u8(rsp.conformity_level.value());
            buf.put_u8(if rsp.more_follows { 0xFF } else { 0x00 });
            buf.put_u8(rsp.next_object_id);
            buf.put_u8(u8_len(rsp.device_id_objects.len()));
            for object in &rsp.device_id_objects {
                buf.put_u8(object.id);
                buf.put_u8(u8_len(object.value.len()));
                buf.put_slice(&object.value);
            }
        }
        Custom(_, custom_data) => {
            buf.put_slice(custom_data);
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_exception_response_pdu(buf: &mut BytesMut, rsp: ExceptionResponse) {
    debug_assert!(rsp.function.value() < 0x80);
    buf.put_u8(rsp.function.value() + 0x80);
    buf.put_u8(rsp.exception.into());
}

fn encode_words(buf: &mut BytesMut, words: &[Word]) {
    for w in words {
        buf.put_u16(*w);
    }
}

fn file_records_size(records: &[FileRecord]) -> usize {
    records.iter().map(|record| 7 + record.data.len() * 2).sum()
}

fn encode_file_records(buf: &mut BytesMut, records: &[FileRecord]) {
    for record in records {
        buf.put_u8(FILE_RECORD_REFERENCE_TYPE);
        buf.put_u16(record.file_number);
        buf.put_u16(record.record_number);
        buf.put_u16(u16_len(record.data.len()));
        encode_words(buf, &record.data);
    }
}

fn read_u16_be(reader: &mut impl io::Read) -> io::Result<u16> {
    reader.read_u16::<BigEndian>()
}

fn read_words(reader: &mut impl io::Read, quantity: usize) -> io::Result<Vec<Word>> {
    let mut data = Vec::with_capacity(quantity);
    for _ in 0..quantity {
        data.push(read_u16_be(reader)?);
    }
    Ok(data)
}

/// Verifies that exactly `byte_count` bytes follow the header of `header_len` bytes.
fn check_byte_count(bytes: &[u8], header_len: usize, byte_count: usize) -> io::Result<()> {
    let received = bytes.len().saturating_sub(header_len);
    if received != byte_count {
        return Err(invalid_data(format!(
            "byte count mismatch: {byte_count} announced, {received} received"
        )));
    }
    Ok(())
}

/// Words following the function code and the sub-function of a
/// "Diagnostics" PDU.
fn read_diagnostic_data(bytes: &Bytes) -> io::Result<Vec<Word>> {
    let data = bytes.get(3..).unwrap_or_default();
    if data.len() % 2 != 0 {
        return Err(invalid_data("invalid diagnostic data length"));
    }
    Ok(data
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]))
        .collect())
}

fn decode_file_records(rdr: &mut Cursor<&Bytes>, data_len: usize) -> io::Result<Vec<FileRecord>> {
    let end = rdr.position() + data_len as u64;
    let mut records = Vec::new();
    while rdr.position() < end {
        let ref_type = rdr.read_u8()?;
        if ref_type != FILE_RECORD_REFERENCE_TYPE {
            return Err(invalid_data(format!(
                "invalid reference type: 0x{ref_type:02X}"
            )));
        }
        let file_number = read_u16_be(rdr)?;
        let record_number = read_u16_be(rdr)?;
        let record_length = read_u16_be(rdr)?;
        let data = read_words(rdr, record_length.into())?;
        records.push(FileRecord {
            file_number,
            record_number,
            data,
        });
    }
    if rdr.position() != end {
        return Err(invalid_data("invalid file record length"));
    }
    Ok(records)
}

impl TryFrom<Bytes> for Request<'static> {
    type Error = io::Error;

    #[allow(clippy::too_many_lines)]
    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Request::*;
        if bytes.len() > MAX_PDU_SIZE {
            return Err(invalid_data("request PDU size exceeded"));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let req = match fn_code {
            0x01 => ReadCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x02 => ReadDiscreteInputs(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x05 => WriteSingleCoil(read_u16_be(rdr)?, coil_to_bool(read_u16_be(rdr)?)?),
            0x0F => {
                let address = read_u16_be(rdr)?;
                let quantity = read_u16_be(rdr)?;
                let byte_count = usize::from(rdr.read_u8()?);
                check_byte_count(&bytes, 6, byte_count)?;
                if byte_count != packed_coils_len(quantity) {
                    return Err(invalid_data("invalid quantity"));
                }
                rdr.consume(byte_count);
                let packed_coils = &bytes[6..6 + byte_count];
                WriteMultipleCoils(address, decode_packed_coils(packed_coils, quantity).into())
            }
            0x04 => ReadInputRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x03 => ReadHoldingRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x06 => WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x07 => ReadExceptionStatus,
            0x08 => {
                let sub_function = read_u16_be(rdr)?;
                let data = read_diagnostic_data(&bytes)?;
                rdr.consume(data.len() * 2);
                Diagnostics(sub_function, data.into())
            }
            0x0B => GetCommEventCounter,
            0x0C => GetCommEventLog,
            0x10 => {
                let address = read_u16_be(rdr)?;
                let quantity = read_u16_be(rdr)?;
                let byte_count = rdr.read_u8()?;
                if usize::from(byte_count) != usize::from(quantity) * 2 {
                    return Err(invalid_data("invalid quantity"));
                }
                let data = read_words(rdr, quantity.into())?;
                WriteMultipleRegisters(address, data.into())
            }
            0x11 => ReportServerId,
            0x14 => {
                let byte_count = usize::from(rdr.read_u8()?);
                if byte_count % 7 != 0 {
                    return Err(invalid_data("invalid byte count"));
                }
                let mut refs = Vec::with_capacity(byte_count / 7);
                for _ in 0..byte_count / 7 {
                    let ref_type = rdr.read_u8()?;
                    if ref_type != FILE_RECORD_REFERENCE_TYPE {
                        return Err(invalid_data(format!(
                            "invalid reference type: 0x{ref_type:02X}"
                        )));
                    }
                    refs.push(FileRecordRef {
                        file_number: read_u16_be(rdr)?,
                        record_number: read_u16_be(rdr)?,
                        record_length: read_u16_be(rdr)?,
                    });
                }
                ReadFileRecord(refs.into())
            }
            0x15 => {
                let data_len = usize::from(rdr.read_u8()?);
                check_byte_count(&bytes, 2, data_len)?;
                WriteFileRecord(decode_file_records(rdr, data_len)?.into())
            }
            0x16 => {
                let address = read_u16_be(rdr)?;
                let and_mask = read_u16_be(rdr)?;
                let or_mask = read_u16_be(rdr)?;
                MaskWriteRegister(address, and_mask, or_mask)
            }
            0x17 => {
                let read_address = read_u16_be(rdr)?;
                let read_quantity = read_u16_be(rdr)?;
                let write_address = read_u16_be(rdr)?;
                let write_quantity = read_u16_be(rdr)?;
                let write_count = rdr.read_u8()?;
                if usize::from(write_count) != usize::from(write_quantity) * 2 {
                    return Err(invalid_data("invalid write quantity"));
                }
                let data = read_words(rdr, write_quantity.into())?;
                ReadWriteMultipleRegisters(read_address, read_quantity, write_address, data.into())
            }
            0x18 => ReadFifoQueue(read_u16_be(rdr)?),
            0x2B => {
                let mei_type = rdr.read_u8()?;
                if mei_type != MEI_TYPE_READ_DEVICE_IDENTIFICATION {
                    return Ok(Custom(fn_code, bytes[1..].to_vec().into()));
                }
                let read_code = read_code(rdr.read_u8()?)?;
                let object_id = rdr.read_u8()?;
                ReadDeviceIdentification(read_code, object_id)
            }
            fn_code if fn_code < 0x80 => {
                // Consume all remaining bytes as custom data.
                return Ok(Custom(fn_code, bytes[1..].to_vec().into()));
            }
            fn_code => {
                return Err(invalid_data(format!(
                    "invalid function code: 0x{fn_code:02X}"
                )));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(invalid_data("undecoded request data"));
        }
        Ok(req)
    }
}

impl TryFrom<Bytes> for RequestPdu<'static> {
    type Error = io::Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let pdu = Request::try_from(bytes)?.into();
        Ok(pdu)
    }
}

impl TryFrom<Bytes> for Response {
    type Error = io::Error;

    #[allow(clippy::too_many_lines)]
    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Response::*;
        if bytes.len() > MAX_PDU_SIZE {
            return Err(invalid_data("response PDU size exceeded"));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let rsp = match fn_code {
            0x01 | 0x02 => {
                let byte_count = usize::from(rdr.read_u8()?);
                check_byte_count(&bytes, 2, byte_count)?;
                let packed_coils = &bytes[2..2 + byte_count];
                rdr.consume(byte_count);
                // Here we have no information about the exact requested quantity so we just
                // unpack the whole byte.
                let coils = decode_packed_coils(packed_coils, u16_len(byte_count * 8));
                if fn_code == 0x01 {
                    ReadCoils(coils)
                } else {
                    ReadDiscreteInputs(coils)
                }
            }
            0x05 => WriteSingleCoil(read_u16_be(rdr)?, coil_to_bool(read_u16_be(rdr)?)?),
            0x0F => WriteMultipleCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x03 | 0x04 | 0x17 => {
                let byte_count = usize::from(rdr.read_u8()?);
                if byte_count % 2 != 0 {
                    return Err(invalid_data("invalid quantity"));
                }
                check_byte_count(&bytes, 2, byte_count)?;
                let data = read_words(rdr, byte_count / 2)?;
                match fn_code {
                    0x03 => ReadHoldingRegisters(data),
                    0x04 => ReadInputRegisters(data),
                    _ => ReadWriteMultipleRegisters(data),
                }
            }
            0x06 => WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x07 => ReadExceptionStatus(rdr.read_u8()?),
            0x08 => {
                let sub_function = read_u16_be(rdr)?;
                let data = read_diagnostic_data(&bytes)?;
                rdr.consume(data.len() * 2);
                Diagnostics(sub_function, data)
            }
            0x0B => GetCommEventCounter(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x0C => {
                let byte_count = usize::from(rdr.read_u8()?);
                if byte_count < 6 {
                    return Err(invalid_data("too short"));
                }
                check_byte_count(&bytes, 2, byte_count)?;
                let status = read_u16_be(rdr)?;
                let event_count = read_u16_be(rdr)?;
                let message_count = read_u16_be(rdr)?;
                let events = bytes[8..].to_vec();
                rdr.consume(events.len());
                GetCommEventLog(CommEventLog {
                    status,
                    event_count,
                    message_count,
                    events,
                })
            }
            0x10 => WriteMultipleRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x11 => {
                let byte_count = rdr.read_u8()?;
                if byte_count < 2 {
                    return Err(invalid_data("too short"));
                }
                check_byte_count(&bytes, 2, byte_count.into())?;
                let server_id = rdr.read_u8()?;
                let run_indication_status = match rdr.read_u8()? {
                    0x00 => false,
                    0xFF => true,
                    status => {
                        return Err(invalid_data(format!(
                            "invalid run indication status: 0x{status:02X}"
                        )));
                    }
                };
                let data = bytes[4..].to_vec();
                rdr.consume(data.len());
                ReportServerId(server_id, run_indication_status, data)
            }
            0x14 => {
                let data_len = usize::from(rdr.read_u8()?);
                check_byte_count(&bytes, 2, data_len)?;
                let mut records = Vec::new();
                while rdr.has_remaining() {
                    let file_rsp_len = usize::from(rdr.read_u8()?);
                    if file_rsp_len % 2 == 0 {
                        return Err(invalid_data("invalid file response length"));
                    }
                    let ref_type = rdr.read_u8()?;
                    if ref_type != FILE_RECORD_REFERENCE_TYPE {
                        return Err(invalid_data(format!(
                            "invalid reference type: 0x{ref_type:02X}"
                        )));
                    }
                    records.push(read_words(rdr, (file_rsp_len - 1) / 2)?);
                }
                ReadFileRecord(records)
            }
            0x15 => {
                let data_len = usize::from(rdr.read_u8()?);
                check_byte_count(&bytes, 2, data_len)?;
                WriteFileRecord(decode_file_records(rdr, data_len)?)
            }
            0x16 => {
                let address = read_u16_be(rdr)?;
                let and_mask = read_u16_be(rdr)?;
                let or_mask = read_u16_be(rdr)?;
                MaskWriteRegister(address, and_mask, or_mask)
            }
            0x18 => {
                let byte_count = usize::from(read_u16_be(rdr)?);
                check_byte_count(&bytes, 3, byte_count)?;
                let fifo_count = read_u16_be(rdr)?;
                if fifo_count > MAX_FIFO_COUNT || byte_count != 2 + usize::from(fifo_count) * 2
                {
                    return Err(invalid_data(format!("invalid FIFO count: {fifo_count}")));
                }
                ReadFifoQueue(read_words(rdr, fifo_count.into())?)
            }
            0x2B if bytes.get(1) == Some(&MEI_TYPE_READ_DEVICE_IDENTIFICATION) => {
                rdr.consume(1);
                ReadDeviceIdentification(decode_device_identification(rdr)?)
            }
            _ => {
                // Consume all remaining bytes as custom data.
                let mut bytes = bytes;
                return Ok(Custom(fn_code, bytes.split_off(1)));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(invalid_data("undecoded response data"));
        }
        Ok(rsp)
    }
}

fn read_code(value: u8) -> io::Result<ReadCode> {
    ReadCode::try_from_value(value)
        .ok_or_else(|| invalid_data(format!("invalid read device ID code: 0x{value:02X}")))
}

fn decode_device_identification(
    rdr: &mut Cursor<&Bytes>,
) -> io::Result<ReadDeviceIdentificationResponse> {
    let read_code = read_code(rdr.read_u8()?)?;
    let conformity_level = rdr.read_u8()?;
    let conformity_level = ConformityLevel::try_from_value(conformity_level).ok_or_else(|| {
        invalid_data(format!("invalid conformity level: 0x{conformity_level:02X}"))
    })?;
    let more_follows = match rdr.read_u8()? {
        0x00 => false,
        0xFF => true,
        value => {
            return Err(invalid_data(format!(
                "invalid more follows value: 0x{value:02X}"
            )));
        }
    };
    let next_object_id = rdr.read_u8()?;
    let number_of_objects = rdr.read_u8()?;
    let mut device_id_objects = Vec::with_capacity(number_of_objects.into());
    for _ in 0..number_of_objects {
        let id = rdr.read_u8()?;
        let len = usize::from(rdr.read_u8()?);
        let start = usize::try_from(rdr.position()).map_err(|_| invalid_data("too long"))?;
        let value = rdr
            .get_ref()
            .get(start..start + len)
            .ok_or_else(|| invalid_data("too short"))?;
        let value = Bytes::copy_from_slice(value);
        rdr.consume(len);
        device_id_objects.push(DeviceIdObject { id, value });
    }
    Ok(ReadDeviceIdentificationResponse {
        read_code,
        conformity_level,
        more_follows,
        next_object_id,
        device_id_objects,
    })
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = io::Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let mut rdr = Cursor::new(&bytes);
        let fn_err_code = rdr.read_u8()?;
        if fn_err_code < 0x80 {
            return Err(invalid_data("Invalid exception function code"));
        }
        if bytes.len() != 2 {
            return Err(invalid_data(format!(
                "invalid exception response length: {}",
                bytes.len()
            )));
        }
        let function = fn_err_code - 0x80;
        let exception = ExceptionCode::new(rdr.read_u8()?);
        Ok(ExceptionResponse {
            function: FunctionCode::new(function),
            exception,
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let Some(fn_code) = bytes.first().copied() else {
            return Err(Error::format("empty PDU"));
        };
        let pdu = if fn_code < 0x80 {
            Response::try_from(bytes).map_err(pdu_error)?.into()
        } else {
            ExceptionResponse::try_from(bytes).map_err(pdu_error)?.into()
        };
        Ok(pdu)
    }
}

/// Any defect of a received PDU is structural.
fn pdu_error(err: io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        Error::format("PDU too short")
    } else {
        Error::format(err.to_string())
    }
}

fn bool_to_coil(state: bool) -> u16 {
    if state {
        0xFF00
    } else {
        0x0000
    }
}

fn coil_to_bool(coil: u16) -> io::Result<bool> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(invalid_data(format!("Invalid coil value: 0x{coil:04X}"))),
    }
}

fn packed_coils_size(coils: &[Coil]) -> usize {
    (coils.len() + 7) / 8
}

fn packed_coils_len(quantity: u16) -> usize {
    (usize::from(quantity) + 7) / 8
}

pub(crate) fn encode_packed_coils(buf: &mut BytesMut, coils: &[Coil]) -> usize {
    let packed_coils_size = packed_coils_size(coils);
    let offset = buf.len();
    buf.resize(offset + packed_coils_size, 0);
    let buf = &mut buf[offset..];
    for (i, b) in coils.iter().enumerate() {
        let v = u8::from(*b); // 0 or 1
        buf[i / 8] |= v << (i % 8);
    }
    packed_coils_size
}

fn decode_packed_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let mut res = Vec::with_capacity(count.into());
    for i in 0usize..count.into() {
        res.push((bytes[i / 8] >> (i % 8)) & 0b1 > 0);
    }
    res
}

/// Size of the encoded request PDU.
///
/// Fails if the PDU would exceed [`MAX_PDU_SIZE`].
pub(crate) fn request_pdu_size(req: &Request<'_>) -> Result<usize, ValidationError> {
    use crate::frame::Request::*;
    let size = match req {
        ReadCoils(_, _)
        | ReadDiscreteInputs(_, _)
        | ReadInputRegisters(_, _)
        | ReadHoldingRegisters(_, _)
        | WriteSingleRegister(_, _)
        | WriteSingleCoil(_, _) => 5,
        WriteMultipleCoils(_, coils) => 6 + packed_coils_size(coils),
        WriteMultipleRegisters(_, data) => 6 + data.len() * 2,
        ReadExceptionStatus | GetCommEventCounter | GetCommEventLog | ReportServerId => 1,
        Diagnostics(_, data) => 3 + data.len() * 2,
        ReadFileRecord(refs) => 2 + refs.len() * 7,
        WriteFileRecord(records) => 2 + file_records_size(records),
        MaskWriteRegister(_, _, _) => 7,
        ReadWriteMultipleRegisters(_, _, _, data) => 10 + data.len() * 2,
        ReadFifoQueue(_) => 3,
        ReadDeviceIdentification(_, _) => 4,
        Custom(_, data) => 1 + data.len(),
    };
    if size > MAX_PDU_SIZE {
        return Err(ValidationError::PduTooLarge {
            function: req.function_code(),
            size,
        });
    }
    Ok(size)
}

#[cfg(test)]
fn request_pdu_bytes(req: &Request<'_>) -> Result<Bytes, ValidationError> {
    let mut buf = BytesMut::with_capacity(request_pdu_size(req)?);
    encode_request_pdu(&mut buf, req);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {

    use std::borrow::Cow;

    use super::*;

    fn encode_request_pdu_to_bytes(request: &Request<'_>) -> Bytes {
        let mut buf = BytesMut::new();
        encode_request_pdu(&mut buf, request);
        buf.freeze()
    }

    fn encode_response_pdu_to_bytes(response: &Response) -> Bytes {
        let mut buf = BytesMut::new();
        encode_response_pdu(&mut buf, response);
        buf.freeze()
    }

    fn encode_exception_response_pdu_to_bytes(response: ExceptionResponse) -> Bytes {
        let mut buf = BytesMut::new();
        encode_exception_response_pdu(&mut buf, response);
        buf.freeze()
    }

    fn encode_packed_coils_to_bytes(coils: &[Coil]) -> Bytes {
        let mut buf = BytesMut::new();
        encode_packed_coils(&mut buf, coils);
        buf.freeze()
    }

    #[test]
    fn convert_bool_to_coil() {
        assert_eq!(bool_to_coil(true), 0xFF00);
        assert_eq!(bool_to_coil(false), 0x0000);
    }

    #[test]
    fn convert_coil_to_bool() {
        assert!(coil_to_bool(0xFF00).unwrap());
        assert!(!coil_to_bool(0x0000).unwrap());
        assert!(coil_to_bool(0x1234).is_err());
    }

    #[test]
    fn convert_booleans_to_bytes() {
        assert_eq!(&encode_packed_coils_to_bytes(&[])[..], &[]);
        assert_eq!(&encode_packed_coils_to_bytes(&[true])[..], &[0b1]);
        assert_eq!(&encode_packed_coils_to_bytes(&[false])[..], &[0b0]);
        assert_eq!(&encode_packed_coils_to_bytes(&[true, false])[..], &[0b_01]);
        assert_eq!(&encode_packed_coils_to_bytes(&[false, true])[..], &[0b_10]);
        assert_eq!(
            &encode_packed_coils_to_bytes(&[true, false, true, true, false, false, false, false])
                [..],
            &[0x0D]
        );
        assert_eq!(&encode_packed_coils_to_bytes(&[true; 9])[..], &[255, 1]);
        assert_eq!(&encode_packed_coils_to_bytes(&[false; 9])[..], &[0, 0]);
    }

    #[test]
    fn test_unpack_bits() {
        assert_eq!(decode_packed_coils(&[], 0), &[]);
        assert_eq!(decode_packed_coils(&[0, 0], 0), &[]);
        assert_eq!(decode_packed_coils(&[0b1], 1), &[true]);
        assert_eq!(decode_packed_coils(&[0b01], 2), &[true, false]);
        assert_eq!(decode_packed_coils(&[0b10], 2), &[false, true]);
        assert_eq!(decode_packed_coils(&[0b101], 3), &[true, false, true]);
        assert_eq!(decode_packed_coils(&[0xff, 0b11], 10), &[true; 10]);
    }

    #[test]
    fn exception_response_into_bytes() {
        let bytes = encode_exception_response_pdu_to_bytes(ExceptionResponse {
            function: FunctionCode::ReadHoldingRegisters,
            exception: ExceptionCode::IllegalDataAddress,
        });
        assert_eq!(&bytes[..], &[0x83, 0x02]);
    }

    #[test]
    fn exception_response_from_bytes() {
        assert!(ExceptionResponse::try_from(Bytes::from(vec![0x79, 0x02])).is_err());
        assert!(ExceptionResponse::try_from(Bytes::from(vec![0x83, 0x02, 0x00])).is_err());

        let bytes = Bytes::from(vec![0x83, 0x02]);
        let rsp = ExceptionResponse::try_from(bytes).unwrap();
        assert_eq!(
            rsp,
            ExceptionResponse {
                function: FunctionCode::ReadHoldingRegisters,
                exception: ExceptionCode::IllegalDataAddress,
            }
        );
    }

    #[test]
    fn exception_pdu_short_circuits() {
        let pdu = ResponsePdu::try_from(Bytes::from_static(&[0x83, 0x02])).unwrap();
        assert_eq!(
            pdu.0,
            Err(ExceptionResponse {
                function: FunctionCode::ReadHoldingRegisters,
                exception: ExceptionCode::IllegalDataAddress,
            })
        );
    }

    #[test]
    fn malformed_pdus_are_format_errors() {
        assert!(matches!(
            ResponsePdu::try_from(Bytes::new()),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            ResponsePdu::try_from(Bytes::from_static(&[0x03, 0x04, 0x00, 0x01])),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            ResponsePdu::try_from(Bytes::from_static(&[0x06, 0x00])),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn request_pdu_size_limit() {
        let words = [0u16; 123];
        let req = Request::WriteMultipleRegisters(0, Cow::Borrowed(&words));
        assert_eq!(request_pdu_size(&req).unwrap(), 252);

        let req = Request::Custom(0x41, Cow::Owned(vec![0; 253]));
        assert!(matches!(
            request_pdu_size(&req),
            Err(ValidationError::PduTooLarge { size: 254, .. })
        ));
    }

    #[test]
    fn request_pdu_size_of_oversized_coils() {
        // Given
        let coils = vec![true; 70_000];
        let req = Request::WriteMultipleCoils(0, Cow::Borrowed(&coils));

        // When
        let size = request_pdu_size(&req);

        // Then
        assert!(matches!(
            size,
            Err(ValidationError::PduTooLarge {
                function: FunctionCode::WriteMultipleCoils,
                size: 8756,
            })
        ));
    }

    #[test]
    fn request_pdu_size_matches_encoding() {
        let words = [0xABCD, 0xEF12];
        let records = [FileRecord {
            file_number: 4,
            record_number: 7,
            data: vec![0x06AF, 0x04BE, 0x100D],
        }];
        let refs = [FileRecordRef {
            file_number: 4,
            record_number: 1,
            record_length: 2,
        }];
        let requests = [
            Request::ReadCoils(0, 1),
            Request::WriteMultipleCoils(0, Cow::Borrowed(&[true; 11])),
            Request::WriteMultipleRegisters(0, Cow::Borrowed(&words)),
            Request::ReadWriteMultipleRegisters(0, 1, 2, Cow::Borrowed(&words)),
            Request::ReadExceptionStatus,
            Request::Diagnostics(0x0000, Cow::Borrowed(&words)),
            Request::ReadFileRecord(Cow::Borrowed(&refs)),
            Request::WriteFileRecord(Cow::Borrowed(&records)),
            Request::ReadFifoQueue(0x04DE),
            Request::ReadDeviceIdentification(ReadCode::Basic, 0),
        ];
        for req in &requests {
            let bytes = request_pdu_bytes(req).unwrap();
            assert_eq!(bytes.len(), request_pdu_size(req).unwrap(), "{req:?}");
        }
    }

    mod serialize_requests {

        use super::*;

        #[test]
        fn read_coils() {
            let bytes = encode_request_pdu_to_bytes(&Request::ReadCoils(0x12, 4));
            assert_eq!(&bytes[..], &[0x01, 0x00, 0x12, 0x00, 0x04]);
        }

        #[test]
        fn read_holding_registers() {
            let bytes = encode_request_pdu_to_bytes(&Request::ReadHoldingRegisters(0x00, 6));
            assert_eq!(&bytes[..], &[0x03, 0x00, 0x00, 0x00, 0x06]);
        }

        #[test]
        fn write_single_coil() {
            let bytes = encode_request_pdu_to_bytes(&Request::WriteSingleCoil(0x1234, true));
            assert_eq!(&bytes[..], &[0x05, 0x12, 0x34, 0xFF, 0x00]);
        }

        #[test]
        fn write_multiple_coils() {
            let states = [true, false, true, true];
            let bytes = encode_request_pdu_to_bytes(&Request::WriteMultipleCoils(
                0x3311,
                Cow::Borrowed(&states),
            ));
            assert_eq!(
                &bytes[..],
                &[0x0F, 0x33, 0x11, 0x00, 0x04, 0x01, 0b_0000_1101]
            );
        }

        #[test]
        fn write_multiple_registers() {
            let bytes = encode_request_pdu_to_bytes(&Request::WriteMultipleRegisters(
                0x06,
                Cow::Borrowed(&[0xABCD, 0xEF12]),
            ));

            // function code
            assert_eq!(bytes[0], 0x10);

            // write starting address
            assert_eq!(bytes[1], 0x00);
            assert_eq!(bytes[2], 0x06);

            // quantity to write
            assert_eq!(bytes[3], 0x00);
            assert_eq!(bytes[4], 0x02);

            // write byte count
            assert_eq!(bytes[5], 0x04);

            // values
            assert_eq!(&bytes[6..], &[0xAB, 0xCD, 0xEF, 0x12]);
        }

        #[test]
        fn serial_line_diagnostics() {
            assert_eq!(
                &encode_request_pdu_to_bytes(&Request::ReadExceptionStatus)[..],
                &[0x07]
            );
            assert_eq!(
                &encode_request_pdu_to_bytes(&Request::GetCommEventCounter)[..],
                &[0x0B]
            );
            assert_eq!(
                &encode_request_pdu_to_bytes(&Request::GetCommEventLog)[..],
                &[0x0C]
            );
            assert_eq!(
                &encode_request_pdu_to_bytes(&Request::ReportServerId)[..],
                &[0x11]
            );
        }

        #[test]
        fn diagnostics() {
            let bytes = encode_request_pdu_to_bytes(&Request::Diagnostics(
                0x0000,
                Cow::Borrowed(&[0xA537]),
            ));
            assert_eq!(&bytes[..], &[0x08, 0x00, 0x00, 0xA5, 0x37]);
        }

        #[test]
        fn read_file_record() {
            let refs = [
                FileRecordRef {
                    file_number: 4,
                    record_number: 1,
                    record_length: 2,
                },
                FileRecordRef {
                    file_number: 3,
                    record_number: 9,
                    record_length: 2,
                },
            ];
            let bytes = encode_request_pdu_to_bytes(&Request::ReadFileRecord(Cow::Borrowed(&refs)));
            assert_eq!(
                &bytes[..],
                &[
                    0x14, 0x0E, 0x06, 0x00, 0x04, 0x00, 0x01, 0x00, 0x02, 0x06, 0x00, 0x03, 0x00,
                    0x09, 0x00, 0x02
                ]
            );
        }

        #[test]
        fn write_file_record() {
            let records = [FileRecord {
                file_number: 4,
                record_number: 7,
                data: vec![0x06AF, 0x04BE, 0x100D],
            }];
            let bytes =
                encode_request_pdu_to_bytes(&Request::WriteFileRecord(Cow::Borrowed(&records)));
            assert_eq!(
                &bytes[..],
                &[
                    0x15, 0x0D, 0x06, 0x00, 0x04, 0x00, 0x07, 0x00, 0x03, 0x06, 0xAF, 0x04, 0xBE,
                    0x10, 0x0D
                ]
            );
        }

        #[test]
        fn masked_write_register() {
            let bytes =
                encode_request_pdu_to_bytes(&Request::MaskWriteRegister(0xABCD, 0xEF12, 0x2345));
            assert_eq!(&bytes[..], &[0x16, 0xAB, 0xCD, 0xEF, 0x12, 0x23, 0x45]);
        }

        #[test]
        fn read_write_multiple_registers() {
            let data = [0xABCD, 0xEF12];
            let bytes = encode_request_pdu_to_bytes(&Request::ReadWriteMultipleRegisters(
                0x05,
                51,
                0x03,
                Cow::Borrowed(&data),
            ));

            // function code
            assert_eq!(bytes[0], 0x17);

            // read starting address
            assert_eq!(bytes[1], 0x00);
            assert_eq!(bytes[2], 0x05);

            // quantity to read
            assert_eq!(bytes[3], 0x00);
            assert_eq!(bytes[4], 0x33);

            // write starting address
            assert_eq!(bytes[5], 0x00);
            assert_eq!(bytes[6], 0x03);

            // quantity to write
            assert_eq!(bytes[7], 0x00);
            assert_eq!(bytes[8], 0x02);

            // write byte count
            assert_eq!(bytes[9], 0x04);

            // values
            assert_eq!(&bytes[10..], &[0xAB, 0xCD, 0xEF, 0x12]);
        }

        #[test]
        fn read_fifo_queue() {
            let bytes = encode_request_pdu_to_bytes(&Request::ReadFifoQueue(0x04DE));
            assert_eq!(&bytes[..], &[0x18, 0x04, 0xDE]);
        }

        #[test]
        fn read_device_identification() {
            let bytes = encode_request_pdu_to_bytes(&Request::ReadDeviceIdentification(
                ReadCode::Basic,
                0x00,
            ));
            assert_eq!(&bytes[..], &[0x2B, 0x0E, 0x01, 0x00]);
        }

        #[test]
        fn custom() {
            let bytes = encode_request_pdu_to_bytes(&Request::Custom(
                0x55,
                Cow::Borrowed(&[0xCC, 0x88, 0xAA, 0xFF]),
            ));
            assert_eq!(&bytes[..], &[0x55, 0xCC, 0x88, 0xAA, 0xFF]);
        }
    }

    mod deserialize_requests {

        use super::*;

        #[test]
        fn empty_request() {
            assert!(Request::try_from(Bytes::from(vec![])).is_err());
        }

        #[test]
        fn read_coils() {
            assert!(Request::try_from(Bytes::from(vec![0x01])).is_err());
            assert!(Request::try_from(Bytes::from(vec![0x01, 0x0, 0x0, 0x22])).is_err());

            let bytes = Bytes::from(vec![0x01, 0x00, 0x12, 0x0, 0x4]);
            let req = Request::try_from(bytes).unwrap();
            assert_eq!(req, Request::ReadCoils(0x12, 4));
        }

        #[test]
        fn write_multiple_coils() {
            assert!(Request::try_from(Bytes::from(vec![
                0x0F,
                0x33,
                0x11,
                0x00,
                0x04,
                0x02,
                0b_0000_1101,
            ]))
            .is_err());

            let bytes = Bytes::from(vec![0x0F, 0x33, 0x11, 0x00, 0x04, 0x01, 0b_0000_1101]);
            let req = Request::try_from(bytes).unwrap();
            assert_eq!(
                req,
                Request::WriteMultipleCoils(0x3311, Cow::Borrowed(&[true, false, true, true]))
            );
        }

        #[test]
        fn write_multiple_registers() {
            assert!(Request::try_from(Bytes::from(vec![
                0x10, 0x00, 0x06, 0x00, 0x02, 0x05, 0xAB, 0xCD, 0xEF, 0x12,
            ]))
            .is_err());

            let bytes = Bytes::from(vec![
                0x10, 0x00, 0x06, 0x00, 0x02, 0x04, 0xAB, 0xCD, 0xEF, 0x12,
            ]);
            let req = Request::try_from(bytes).unwrap();
            assert_eq!(
                req,
                Request::WriteMultipleRegisters(0x06, Cow::Borrowed(&[0xABCD, 0xEF12]))
            );
        }

        #[test]
        fn mirror_of_encoding() {
            let records = [FileRecord {
                file_number: 4,
                record_number: 7,
                data: vec![0x06AF, 0x04BE, 0x100D],
            }];
            let refs = [FileRecordRef {
                file_number: 4,
                record_number: 1,
                record_length: 2,
            }];
            let requests = [
                Request::ReadDiscreteInputs(0x03, 19),
                Request::ReadInputRegisters(0x09, 77),
                Request::WriteSingleRegister(0x07, 0xABCD),
                Request::ReadExceptionStatus,
                Request::Diagnostics(0x000A, Cow::Borrowed(&[0x0000])),
                Request::GetCommEventCounter,
                Request::GetCommEventLog,
                Request::ReportServerId,
                Request::ReadFileRecord(Cow::Borrowed(&refs)),
                Request::WriteFileRecord(Cow::Borrowed(&records)),
                Request::MaskWriteRegister(0xABCD, 0xEF12, 0x2345),
                Request::ReadWriteMultipleRegisters(0x05, 51, 0x03, Cow::Borrowed(&[0xABCD])),
                Request::ReadFifoQueue(0x04DE),
                Request::ReadDeviceIdentification(ReadCode::Specific, 0x05),
            ];
            for req in requests {
                let bytes = encode_request_pdu_to_bytes(&req);
                assert_eq!(Request::try_from(bytes).unwrap(), req);
            }
        }

        #[test]
        fn custom() {
            let bytes = Bytes::from(vec![0x55, 0xCC, 0x88, 0xAA, 0xFF]);
            let req = Request::try_from(bytes).unwrap();
            assert_eq!(
                req,
                Request::Custom(0x55, Cow::Borrowed(&[0xCC, 0x88, 0xAA, 0xFF]))
            );
        }
    }

    mod serialize_responses {

        use super::*;

        #[test]
        fn read_coils() {
            let bytes = encode_response_pdu_to_bytes(&Response::ReadCoils(vec![
                true, false, false, true, false,
            ]));
            assert_eq!(&bytes[..], &[1, 1, 0b_0000_1001]);
        }

        #[test]
        fn read_holding_registers() {
            let bytes =
                encode_response_pdu_to_bytes(&Response::ReadHoldingRegisters(vec![0xAA00, 0x1111]));
            assert_eq!(&bytes[..], &[3, 0x04, 0xAA, 0x00, 0x11, 0x11]);
        }

        #[test]
        fn read_fifo_queue() {
            let bytes = encode_response_pdu_to_bytes(&Response::ReadFifoQueue(vec![0x01B8, 0x1284]));
            assert_eq!(
                &bytes[..],
                &[0x18, 0x00, 0x06, 0x00, 0x02, 0x01, 0xB8, 0x12, 0x84]
            );
        }
    }

    mod deserialize_responses {

        use super::*;

        #[test]
        fn read_coils() {
            let bytes = Bytes::from(vec![1, 1, 0b_0000_1001]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::ReadCoils(vec![true, false, false, true, false, false, false, false])
            );
        }

        #[test]
        fn read_coils_max_quantity() {
            let quantity = 2000;
            let byte_count = quantity / 8;
            let mut raw: Vec<u8> = vec![1, u8_len(byte_count)];
            let mut values: Vec<u8> = (0..byte_count).map(|_| 0b_1111_1111).collect();
            raw.append(&mut values);
            let bytes = Bytes::from(raw);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReadCoils(vec![true; quantity]));
        }

        #[test]
        fn read_coils_with_wrong_byte_count() {
            assert!(Response::try_from(Bytes::from(vec![1, 2, 0b_0000_1001])).is_err());
            assert!(Response::try_from(Bytes::from(vec![1, 1, 0x01, 0x02])).is_err());
        }

        #[test]
        fn read_discrete_inputs() {
            let bytes = Bytes::from(vec![2, 1, 0b_0000_1001]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::ReadDiscreteInputs(vec![
                    true, false, false, true, false, false, false, false,
                ],)
            );
        }

        #[test]
        fn read_holding_registers() {
            let bytes = Bytes::from(vec![3, 0x04, 0xAA, 0x00, 0x11, 0x11]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReadHoldingRegisters(vec![0xAA00, 0x1111]));
        }

        #[test]
        fn read_holding_registers_with_wrong_byte_count() {
            // byte count announces 4 bytes, but 6 follow
            let bytes = Bytes::from(vec![3, 0x04, 0xAA, 0x00, 0x11, 0x11, 0x22, 0x22]);
            let err = Response::try_from(bytes).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);

            // odd byte count
            let bytes = Bytes::from(vec![3, 0x03, 0xAA, 0x00, 0x11]);
            assert!(Response::try_from(bytes).is_err());
        }

        #[test]
        fn read_input_registers() {
            let bytes = Bytes::from(vec![4, 0x06, 0xAA, 0x00, 0xCC, 0xBB, 0xEE, 0xDD]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::ReadInputRegisters(vec![0xAA00, 0xCCBB, 0xEEDD])
            );
        }

        #[test]
        fn write_single_coil() {
            let bytes = Bytes::from(vec![5, 0x00, 0x33, 0xFF, 0x00]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::WriteSingleCoil(0x33, true));
        }

        #[test]
        fn write_multiple_registers() {
            let bytes = Bytes::from(vec![0x10, 0x00, 0x06, 0x00, 0x02]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::WriteMultipleRegisters(0x06, 2));
        }

        #[test]
        fn read_exception_status() {
            let bytes = Bytes::from(vec![0x07, 0x6D]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReadExceptionStatus(0x6D));
        }

        #[test]
        fn diagnostics() {
            let bytes = Bytes::from(vec![0x08, 0x00, 0x00, 0xA5, 0x37]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::Diagnostics(0x0000, vec![0xA537]));

            let bytes = Bytes::from(vec![0x08, 0x00, 0x0B, 0x00, 0x02, 0x00, 0x03]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::Diagnostics(0x000B, vec![0x0002, 0x0003]));

            assert!(Response::try_from(Bytes::from(vec![0x08, 0x00, 0x00, 0xA5])).is_err());
            assert!(Response::try_from(Bytes::from(vec![0x08, 0x00])).is_err());
        }

        #[test]
        fn get_comm_event_counter() {
            let bytes = Bytes::from(vec![0x0B, 0xFF, 0xFF, 0x01, 0x08]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::GetCommEventCounter(0xFFFF, 0x0108));
        }

        #[test]
        fn get_comm_event_log() {
            let bytes = Bytes::from(vec![
                0x0C, 0x08, 0x00, 0x00, 0x01, 0x08, 0x01, 0x21, 0x20, 0x00,
            ]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::GetCommEventLog(CommEventLog {
                    status: 0x0000,
                    event_count: 0x0108,
                    message_count: 0x0121,
                    events: vec![0x20, 0x00],
                })
            );
        }

        #[test]
        fn report_server_id() {
            let bytes = Bytes::from(vec![0x11, 0x04, 0x42, 0xFF, 0x10, 0x20]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReportServerId(0x42, true, vec![0x10, 0x20]));
        }

        #[test]
        fn read_file_record() {
            let bytes = Bytes::from(vec![
                0x14, 0x0C, 0x05, 0x06, 0x0D, 0xFE, 0x00, 0x20, 0x05, 0x06, 0x33, 0xCD, 0x00,
                0x40,
            ]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::ReadFileRecord(vec![vec![0x0DFE, 0x0020], vec![0x33CD, 0x0040]])
            );
        }

        #[test]
        fn write_file_record() {
            let bytes = Bytes::from(vec![
                0x15, 0x0D, 0x06, 0x00, 0x04, 0x00, 0x07, 0x00, 0x03, 0x06, 0xAF, 0x04, 0xBE,
                0x10, 0x0D,
            ]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::WriteFileRecord(vec![FileRecord {
                    file_number: 4,
                    record_number: 7,
                    data: vec![0x06AF, 0x04BE, 0x100D],
                }])
            );
        }

        #[test]
        fn masked_write_register() {
            let bytes = Bytes::from(vec![0x16, 0x00, 0x06, 0x80, 0x01, 0x40, 0x02]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::MaskWriteRegister(6, 0x8001, 0x4002));
        }

        #[test]
        fn read_write_multiple_registers() {
            let bytes = Bytes::from(vec![0x17, 0x02, 0x12, 0x34]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReadWriteMultipleRegisters(vec![0x1234]));
        }

        #[test]
        fn read_fifo_queue() {
            let bytes = Bytes::from(vec![0x18, 0x00, 0x06, 0x00, 0x02, 0x01, 0xB8, 0x12, 0x84]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(rsp, Response::ReadFifoQueue(vec![0x01B8, 0x1284]));

            let bytes = Bytes::from(vec![0x18, 0x00, 0x06, 0x00, 0x03, 0x01, 0xB8, 0x12, 0x84]);
            assert!(Response::try_from(bytes).is_err());
        }

        #[test]
        fn read_device_identification() {
            let bytes = Bytes::from(vec![
                0x2B, 0x0E, 0x01, 0x01, 0x00, 0x00, 0x02, 0x00, 0x03, b'A', b'B', b'C', 0x01, 0x01,
                b'X',
            ]);
            let rsp = Response::try_from(bytes).unwrap();
            let Response::ReadDeviceIdentification(rsp) = rsp else {
                panic!("unexpected response");
            };
            assert_eq!(rsp.read_code, ReadCode::Basic);
            assert_eq!(
                rsp.conformity_level,
                ConformityLevel::BasicIdentificationStreamOnly
            );
            assert!(!rsp.more_follows);
            assert_eq!(rsp.device_id_objects.len(), 2);
            assert_eq!(rsp.device_id_objects[0].value_as_str(), Some("ABC"));
            assert_eq!(rsp.device_id_objects[1].id, 0x01);
            assert_eq!(rsp.device_id_objects[1].value_as_str(), Some("X"));
        }

        #[test]
        fn custom() {
            let bytes = Bytes::from(vec![0x55, 0xCC, 0x88, 0xAA, 0xFF]);
            let rsp = Response::try_from(bytes).unwrap();
            assert_eq!(
                rsp,
                Response::Custom(0x55, Bytes::from_static(&[0xCC, 0x88, 0xAA, 0xFF]))
            );
        }
    }
}
