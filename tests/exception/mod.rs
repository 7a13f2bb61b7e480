// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use modbus_master::{
    checksum::{compute_crc16, compute_lrc},
    client::{self, sync},
    hex::{decode_hex, encode_hex},
    Error, ExceptionCode, ExceptionResponse, FunctionCode,
};

/// Answers every request with an exception that depends on the function code.
pub fn exception_for(function: u8) -> ExceptionCode {
    match function {
        0x01 => ExceptionCode::Acknowledge,
        0x02 => ExceptionCode::GatewayPathUnavailable,
        0x03 => ExceptionCode::IllegalFunction,
        0x04 => ExceptionCode::IllegalDataValue,
        0x05 => ExceptionCode::GatewayTargetDevice,
        0x06 => ExceptionCode::MemoryParityError,
        0x0F => ExceptionCode::IllegalDataAddress,
        0x10 => ExceptionCode::SlaveDeviceBusy,
        0x16 => ExceptionCode::SlaveDeviceFailure,
        0x18 => ExceptionCode::NegativeAcknowledge,
        _ => ExceptionCode::IllegalFunction,
    }
}

/// Response PDU of the test slave.
pub fn handle_pdu(pdu: &[u8]) -> Vec<u8> {
    vec![pdu[0] | 0x80, exception_for(pdu[0]).value()]
}

/// Wraps a response PDU into the MBAP header of the request.
pub fn tcp_response(request_header: &[u8; 7], pdu: &[u8]) -> Vec<u8> {
    let len = u16::try_from(pdu.len() + 1).unwrap();
    let mut frame = request_header[..4].to_vec();
    frame.extend_from_slice(&len.to_be_bytes());
    frame.push(request_header[6]);
    frame.extend_from_slice(pdu);
    frame
}

/// Length of an RTU request frame, derived from the first bytes.
pub fn rtu_request_len(frame: &[u8]) -> Option<usize> {
    match *frame.get(1)? {
        0x01..=0x06 => Some(8),
        0x0F | 0x10 => frame.get(6).map(|byte_count| 9 + usize::from(*byte_count)),
        0x16 => Some(10),
        0x18 => Some(6),
        _ => None,
    }
}

pub fn rtu_response(slave: u8, pdu: &[u8]) -> Vec<u8> {
    let mut frame = vec![slave];
    frame.extend_from_slice(pdu);
    let crc = compute_crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Splits a received ASCII line into slave address and PDU.
pub fn ascii_request(line: &[u8]) -> (u8, Vec<u8>) {
    let line = line.strip_prefix(b":").unwrap();
    let line = line.strip_suffix(b"\r\n").unwrap();
    let mut data = decode_hex(line).unwrap();
    let lrc = data.pop().unwrap();
    assert_eq!(compute_lrc(&data), lrc);
    let pdu = data.split_off(1);
    (data[0], pdu)
}

pub fn ascii_response(slave: u8, pdu: &[u8]) -> Vec<u8> {
    let mut data = vec![slave];
    data.extend_from_slice(pdu);
    data.push(compute_lrc(&data));
    format!(":{}\r\n", encode_hex(&data)).into_bytes()
}

fn assert_exception(err: &Error, function: FunctionCode) {
    let Error::Exception(ExceptionResponse {
        function: rsp_function,
        exception,
    }) = err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(*rsp_function, function);
    assert_eq!(*exception, exception_for(function.value()));
}

pub async fn check_client_context(mut ctx: client::Context) {
    use modbus_master::client::{Client as _, Reader as _, Writer as _};

    let err = ctx.read_coils(0x00, 2).await.unwrap_err();
    assert_exception(&err, FunctionCode::ReadCoils);

    let err = ctx.read_discrete_inputs(0x00, 2).await.unwrap_err();
    assert_exception(&err, FunctionCode::ReadDiscreteInputs);

    let err = ctx.write_single_coil(0x00, true).await.unwrap_err();
    assert_exception(&err, FunctionCode::WriteSingleCoil);

    let err = ctx
        .write_multiple_coils(0x00, &[true, false])
        .await
        .unwrap_err();
    assert_exception(&err, FunctionCode::WriteMultipleCoils);

    let err = ctx.read_input_registers(0x00, 2).await.unwrap_err();
    assert_exception(&err, FunctionCode::ReadInputRegisters);

    let err = ctx.read_holding_registers(0x00, 2).await.unwrap_err();
    assert_exception(&err, FunctionCode::ReadHoldingRegisters);

    let err = ctx.write_single_register(0x00, 42).await.unwrap_err();
    assert_exception(&err, FunctionCode::WriteSingleRegister);

    let err = ctx
        .write_multiple_registers(0x00, &[42, 43])
        .await
        .unwrap_err();
    assert_exception(&err, FunctionCode::WriteMultipleRegisters);

    let err = ctx.masked_write_register(0x00, 0, 0).await.unwrap_err();
    assert_exception(&err, FunctionCode::MaskWriteRegister);

    let err = ctx.read_fifo_queue(0x00).await.unwrap_err();
    assert_exception(&err, FunctionCode::ReadFifoQueue);

    ctx.disconnect().await.unwrap();
}

pub fn check_sync_context(mut ctx: sync::Context) {
    use modbus_master::client::sync::{Client as _, Reader as _, Writer as _};

    let err = ctx.read_coils(0x00, 2).unwrap_err();
    assert_exception(&err, FunctionCode::ReadCoils);

    let err = ctx.read_discrete_inputs(0x00, 2).unwrap_err();
    assert_exception(&err, FunctionCode::ReadDiscreteInputs);

    let err = ctx.write_single_coil(0x00, true).unwrap_err();
    assert_exception(&err, FunctionCode::WriteSingleCoil);

    let err = ctx.write_multiple_coils(0x00, &[true, false]).unwrap_err();
    assert_exception(&err, FunctionCode::WriteMultipleCoils);

    let err = ctx.read_input_registers(0x00, 2).unwrap_err();
    assert_exception(&err, FunctionCode::ReadInputRegisters);

    let err = ctx.read_holding_registers(0x00, 2).unwrap_err();
    assert_exception(&err, FunctionCode::ReadHoldingRegisters);

    let err = ctx.write_single_register(0x00, 42).unwrap_err();
    assert_exception(&err, FunctionCode::WriteSingleRegister);

    let err = ctx.write_multiple_registers(0x00, &[42, 43]).unwrap_err();
    assert_exception(&err, FunctionCode::WriteMultipleRegisters);

    let err = ctx.masked_write_register(0x00, 0, 0).unwrap_err();
    assert_exception(&err, FunctionCode::MaskWriteRegister);

    let err = ctx.read_fifo_queue(0x00).unwrap_err();
    assert_exception(&err, FunctionCode::ReadFifoQueue);

    ctx.disconnect().unwrap();
}
