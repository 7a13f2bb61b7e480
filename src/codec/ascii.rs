// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    checksum::{compute_lrc, validate_lrc},
    error::ChecksumKind,
    frame::{
        adu::{Header, RequestAdu, ResponseAdu},
        Request, ResponsePdu,
    },
    settings::Settings,
    slave::Slave,
    Error, Result,
};

use super::{encode_request_pdu, hex, request_pdu_size, MAX_PDU_SIZE};

// address + PDU + LRC
const MAX_ADU_LEN: usize = 1 + MAX_PDU_SIZE + 1;

// address + function + LRC
const MIN_ADU_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientCodec {
    start: Vec<u8>,
    end: Vec<u8>,
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl ClientCodec {
    pub(crate) fn new(settings: &Settings) -> Self {
        Self {
            start: settings.ascii_start_delimiter.as_bytes().to_vec(),
            end: settings.ascii_end_delimiter.as_bytes().to_vec(),
        }
    }

    fn max_frame_len(&self) -> usize {
        self.start.len() + MAX_ADU_LEN * 2 + self.end.len()
    }

    /// Drops everything in front of the first start delimiter.
    ///
    /// Returns `false` if no start delimiter has been received yet.
    fn skip_to_start(&self, buf: &mut BytesMut) -> bool {
        if let Some(pos) = find(buf, &self.start) {
            if pos > 0 {
                log::warn!(
                    "Discarding {} byte(s) in front of ASCII frame: {:02X?}",
                    pos,
                    &buf[..pos]
                );
                let _ = buf.split_to(pos);
            }
            return true;
        }
        // Keep a partially received start delimiter
        let keep = self.start.len().saturating_sub(1).min(buf.len());
        let discard = buf.len() - keep;
        if discard > 0 {
            log::warn!(
                "Discarding {} byte(s) while waiting for ASCII frame: {:02X?}",
                discard,
                &buf[..discard]
            );
            let _ = buf.split_to(discard);
        }
        false
    }

    fn decode_frame(hex_digits: &[u8]) -> Result<ResponseAdu> {
        let data = hex::decode_hex(hex_digits)?;
        if data.len() < MIN_ADU_LEN {
            return Err(Error::format(format!(
                "ASCII frame too short: {} byte(s)",
                data.len()
            )));
        }
        let (adu, lrc) = data.split_at(data.len() - 1);
        let received = lrc[0];
        if !validate_lrc(adu, received) {
            return Err(Error::Checksum {
                kind: ChecksumKind::Lrc,
                expected: compute_lrc(adu).into(),
                received: received.into(),
            });
        }
        let slave = Slave(adu[0]);
        let pdu = ResponsePdu::try_from(Bytes::copy_from_slice(&adu[1..]))?;
        Ok(ResponseAdu {
            hdr: Header::serial(slave),
            pdu,
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        loop {
            if !self.skip_to_start(buf) {
                return Ok(None);
            }
            let body = &buf[self.start.len()..];
            let end = find(body, &self.end);
            // A second start delimiter in front of the end delimiter
            // means that the previous frame has been aborted.
            if let Some(restart) = find(body, &self.start) {
                if end.map_or(true, |end| restart < end) {
                    log::warn!("Discarding incomplete ASCII frame");
                    let _ = buf.split_to(self.start.len() + restart);
                    continue;
                }
            }
            let Some(end) = end else {
                if buf.len() > self.max_frame_len() {
                    buf.clear();
                    return Err(Error::format("ASCII frame exceeds maximum length"));
                }
                return Ok(None);
            };
            let frame = buf.split_to(self.start.len() + end + self.end.len());
            log::trace!("Received ASCII frame: {:?}", String::from_utf8_lossy(&frame));
            let hex_digits = &frame[self.start.len()..self.start.len() + end];
            return Self::decode_frame(hex_digits).map(Some);
        }
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        self.encode_adu(adu, buf)
    }
}

impl ClientCodec {
    pub(crate) fn encode_adu(&self, adu: RequestAdu<'_>, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let request: Request<'_> = pdu.into();
        let mut data = BytesMut::with_capacity(request_pdu_size(&request)? + 2);
        data.put_u8(hdr.slave.into());
        encode_request_pdu(&mut data, &request);
        let lrc = compute_lrc(&data);
        data.put_u8(lrc);
        buf.reserve(self.start.len() + data.len() * 2 + self.end.len());
        buf.put_slice(&self.start);
        buf.put_slice(hex::encode_hex(&data).as_bytes());
        buf.put_slice(&self.end);
        Ok(())
    }
}
