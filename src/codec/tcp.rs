// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use byteorder::{BigEndian, ByteOrder as _};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::{BufMut as _, BytesMut},
    error::ProtocolError,
    frame::{
        adu::{Header, RequestAdu, ResponseAdu},
        Request, ResponsePdu,
    },
    slave::Slave,
    Error, Result,
};

use super::{encode_request_pdu, request_pdu_size, u16_len, MAX_PDU_SIZE};

pub(crate) const HEADER_LEN: usize = 7;

const PROTOCOL_ID: u16 = 0x0000; // TCP

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let protocol_id = BigEndian::read_u16(&buf[2..4]);
        if protocol_id != PROTOCOL_ID {
            buf.clear();
            return Err(ProtocolError::InvalidProtocolId(protocol_id).into());
        }

        // len = bytes of PDU + one byte (unit ID)
        let len = usize::from(BigEndian::read_u16(&buf[4..6]));
        if !(2..=MAX_PDU_SIZE + 1).contains(&len) {
            buf.clear();
            return Err(Error::format(format!("invalid MBAP length: {len}")));
        }
        let pdu_len = len - 1;
        if buf.len() < HEADER_LEN + pdu_len {
            buf.reserve(HEADER_LEN + pdu_len - buf.len());
            return Ok(None);
        }

        let header_data = buf.split_to(HEADER_LEN);
        let pdu_data = buf.split_to(pdu_len).freeze();
        log::trace!(
            "Received MBAP frame: {:02X?} {:02X?}",
            &header_data[..],
            &pdu_data[..]
        );

        let transaction_id = BigEndian::read_u16(&header_data[0..2]);
        let unit_id = header_data[6];
        let hdr = Header::tcp(Slave(unit_id), transaction_id);
        let pdu = ResponsePdu::try_from(pdu_data)?;
        Ok(Some(ResponseAdu { hdr, pdu }))
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let request: Request<'_> = pdu.into();
        debug_assert!(hdr.transaction_id.is_some());
        let pdu_len = request_pdu_size(&request)?;
        buf.reserve(HEADER_LEN + pdu_len);
        buf.put_u16(hdr.transaction_id.unwrap_or_default());
        buf.put_u16(PROTOCOL_ID);
        buf.put_u16(u16_len(pdu_len + 1));
        buf.put_u8(hdr.slave.into());
        encode_request_pdu(buf, &request);
        Ok(())
    }
}
