// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use byteorder::{BigEndian, ByteOrder as _};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::{BufMut as _, BytesMut},
    checksum::{compute_crc16, validate_crc16},
    error::ChecksumKind,
    frame::{
        adu::{Header, RequestAdu, ResponseAdu},
        Request, ResponsePdu,
    },
    slave::Slave,
    Error, Result,
};

use super::{encode_request_pdu, request_pdu_size};

// address + function + CRC
pub(crate) const MIN_ADU_LEN: usize = 1 + 1 + 2;

// address + function + byte count + CRC
const BYTE_COUNT_OVERHEAD: usize = 1 + 1 + 1 + 2;

// address + function + sub-function + one data word + CRC
const DIAGNOSTICS_ECHO_LEN: usize = 1 + 1 + 2 + 2 + 2;

/// Most diagnostic sub-functions answer with a single data word. Other
/// lengths are only detected by silence on the line.
fn diagnostics_frame_len(buf: &[u8]) -> Option<usize> {
    let frame = buf.get(..DIAGNOSTICS_ECHO_LEN)?;
    let (data, crc) = frame.split_at(DIAGNOSTICS_ECHO_LEN - 2);
    validate_crc16(data, u16::from_le_bytes([crc[0], crc[1]])).then_some(DIAGNOSTICS_ECHO_LEN)
}

/// Expected length of a response frame, derived from its first bytes.
///
/// Returns `None` if fewer than [`MIN_ADU_LEN`] bytes have been received
/// or if the length cannot be derived from the function code. The end of
/// such frames is only detected by silence on the line.
pub(crate) fn response_frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < MIN_ADU_LEN {
        return None;
    }
    let len = match buf[1] {
        0x01..=0x04 | 0x0C | 0x11 | 0x14 | 0x15 | 0x17 => {
            BYTE_COUNT_OVERHEAD + usize::from(buf[2])
        }
        0x05 | 0x06 | 0x0B | 0x0F | 0x10 => 8,
        0x07 => 5,
        0x08 => return diagnostics_frame_len(buf),
        0x16 => 10,
        0x18 => 1 + 1 + 2 + usize::from(BigEndian::read_u16(&buf[2..4])) + 2,
        fn_code if fn_code & 0x80 != 0 => 5,
        _ => return None,
    };
    Some(len)
}

/// Modbus RTU client codec
///
/// The RTU framing relies on the timing of the serial line. Bytes are
/// only consumed if a complete frame is available, the caller has to
/// invoke [`Decoder::decode_eof`] after the line went silent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientCodec;

impl ClientCodec {
    fn decode_frame(buf: &mut BytesMut, len: usize) -> Result<ResponseAdu> {
        let adu = buf.split_to(len);
        log::trace!("Received RTU frame: {:02X?}", &adu[..]);
        let (data, crc) = adu.split_at(len - 2);
        let received = u16::from_le_bytes([crc[0], crc[1]]);
        if !validate_crc16(data, received) {
            return Err(Error::Checksum {
                kind: ChecksumKind::Crc16,
                expected: compute_crc16(data),
                received,
            });
        }
        let slave = Slave(data[0]);
        let pdu = adu.freeze().slice(1..len - 2);
        let pdu = ResponsePdu::try_from(pdu)?;
        Ok(ResponseAdu {
            hdr: Header::serial(slave),
            pdu,
        })
    }
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        match response_frame_len(buf) {
            Some(len) if buf.len() >= len => Self::decode_frame(buf, len).map(Some),
            _ => Ok(None),
        }
    }

    /// Decodes the received bytes after the line went silent.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        if buf.is_empty() {
            return Ok(None);
        }
        if buf.len() < MIN_ADU_LEN {
            let len = buf.len();
            buf.clear();
            return Err(Error::format(format!("RTU frame too short: {len} byte(s)")));
        }
        let len = match response_frame_len(buf) {
            Some(len) if buf.len() < len => {
                let received = buf.len();
                buf.clear();
                return Err(Error::format(format!(
                    "truncated RTU frame: {received} of {len} byte(s)"
                )));
            }
            Some(len) => len,
            None => buf.len(),
        };
        Self::decode_frame(buf, len).map(Some)
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let request: Request<'_> = pdu.into();
        let offset = buf.len();
        buf.reserve(request_pdu_size(&request)? + 3);
        buf.put_u8(hdr.slave.into());
        encode_request_pdu(buf, &request);
        let crc = compute_crc16(&buf[offset..]);
        buf.put_slice(&crc.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use crate::frame::{ExceptionCode, ExceptionResponse, FunctionCode, Response};

    use super::*;

    #[test]
    fn test_response_frame_len() {
        assert_eq!(response_frame_len(&[]), None);
        assert_eq!(response_frame_len(&[0x12, 0x01, 0x04]), None);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x12, 0x01, 0x04, 0x00, 0x00, 0x00]);
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x02;
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x03;
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x04;
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x05;
        assert_eq!(response_frame_len(&buf), Some(8));

        buf[1] = 0x06;
        assert_eq!(response_frame_len(&buf), Some(8));

        buf[1] = 0x07;
        assert_eq!(response_frame_len(&buf), Some(5));

        buf[1] = 0x08;
        assert_eq!(response_frame_len(&buf), None);

        buf[1] = 0x0B;
        assert_eq!(response_frame_len(&buf), Some(8));

        buf[1] = 0x0C;
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x0F;
        assert_eq!(response_frame_len(&buf), Some(8));

        buf[1] = 0x10;
        assert_eq!(response_frame_len(&buf), Some(8));

        buf[1] = 0x16;
        assert_eq!(response_frame_len(&buf), Some(10));

        buf[1] = 0x17;
        assert_eq!(response_frame_len(&buf), Some(9));

        buf[1] = 0x18;
        buf[2] = 0x00; // byte count Hi
        buf[3] = 0x06; // byte count Lo
        assert_eq!(response_frame_len(&buf), Some(12));

        buf[1] = 0x2B;
        assert_eq!(response_frame_len(&buf), None);

        buf[1] = 0x41;
        assert_eq!(response_frame_len(&buf), None);

        for i in 0x81..0xFF {
            buf[1] = i;
            assert_eq!(response_frame_len(&buf), Some(5));
        }
    }

    #[test]
    fn decode_diagnostics_echo() {
        // Given
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x01, 0x08, 0x00, 0x00, 0x12, 0x34]);
        let crc = compute_crc16(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        // When
        let adu = codec.decode(&mut buf).unwrap().unwrap();

        // Then
        assert_eq!(adu.hdr, Header::serial(Slave(1)));
        assert_eq!(
            adu.pdu,
            ResponsePdu(Ok(Response::Diagnostics(0x0000, vec![0x1234])))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_longer_diagnostics_response_after_silence() {
        // Given
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x01, 0x08, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78]);
        let crc = compute_crc16(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        // When
        let pending = codec.decode(&mut buf).unwrap();
        let adu = codec.decode_eof(&mut buf).unwrap().unwrap();

        // Then
        assert!(pending.is_none());
        assert_eq!(
            adu.pdu,
            ResponsePdu(Ok(Response::Diagnostics(0x0000, vec![0x1234, 0x5678])))
        );
    }

    #[test]
    fn decode_partly_received_client_message() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(
            &[
                0x12, // slave address
                0x02, // function code
                0x03, // byte count
                0x00, // data
                0x00, // data
                0x00, // data
                0x00, // CRC first byte
                      // missing crc second byte
            ][..],
        );
        let res = codec.decode(&mut buf).unwrap();
        assert!(res.is_none());
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn decode_read_holding_registers() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(&[0x01, 0x03, 0x04, 0x00, 0x01, 0x00, 0x02, 0x2A, 0x32][..]);
        let adu = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(adu.hdr, Header::serial(Slave(1)));
        assert_eq!(
            adu.pdu,
            ResponsePdu(Ok(Response::ReadHoldingRegisters(vec![0x0001, 0x0002])))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_exception_message() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(&[0x01, 0x83, 0x02, 0xC0, 0xF1, 0x42][..]);
        let adu = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            adu.pdu,
            ResponsePdu(Err(ExceptionResponse {
                function: FunctionCode::ReadHoldingRegisters,
                exception: ExceptionCode::IllegalDataAddress,
            }))
        );
        // The trailing byte belongs to the next frame
        assert_eq!(&buf[..], &[0x42]);
    }

    #[test]
    fn decode_with_invalid_crc() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(&[0x01, 0x83, 0x02, 0xC0, 0xF2][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            Error::Checksum {
                kind: ChecksumKind::Crc16,
                expected: 0xF1C0,
                received: 0xF2C0,
            }
        ));
    }

    #[test]
    fn decode_eof_of_too_short_frame() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(&[0x01, 0x03, 0x04][..]);
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_eof_of_truncated_frame() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::from(&[0x01, 0x03, 0x04, 0x00, 0x01, 0x00][..]);
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn decode_eof_of_unknown_length() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x01, 0x41, 0xAB]);
        let crc = compute_crc16(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        assert!(codec.decode(&mut buf).unwrap().is_none());
        let adu = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert!(matches!(
            adu.pdu,
            ResponsePdu(Ok(Response::Custom(0x41, ref data))) if data[..] == [0xAB]
        ));
    }

    #[test]
    fn encode_read_request() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        let adu = RequestAdu::new(
            Header::serial(Slave(0x01)),
            Request::ReadHoldingRegisters(0x0000, 6),
        );
        codec.encode(adu, &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x06, 0xC5, 0xC8]
        );
    }

    #[test]
    fn encode_write_request() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        let adu = RequestAdu::new(
            Header::serial(Slave(0x11)),
            Request::WriteSingleCoil(0x00AC, true),
        );
        codec.encode(adu, &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            &[0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4E, 0x8B]
        );
    }

    #[test]
    fn frame_round_trip() {
        let mut codec = ClientCodec;
        let mut buf = BytesMut::new();
        let adu = RequestAdu::new(
            Header::serial(Slave(0x01)),
            Request::Custom(0x03, Cow::Borrowed(&[0x00, 0x00, 0x00, 0x06])),
        );
        codec.encode(adu, &mut buf).unwrap();

        // Without a known length the whole frame is taken after silence.
        buf[1] = 0x41;
        let crc = compute_crc16(&buf[..6]);
        buf[6..].copy_from_slice(&crc.to_le_bytes());
        let adu = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(adu.hdr.slave, Slave(0x01));
        assert!(matches!(
            adu.pdu,
            ResponsePdu(Ok(Response::Custom(0x41, ref data))) if data[..] == [0x00, 0x00, 0x00, 0x06]
        ));
    }
}
