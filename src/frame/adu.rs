// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;

use crate::{error::ProtocolError, slave::Slave, Error, Result};

/// Transaction identifier of an MBAP header.
pub type TransactionId = u16;

/// Envelope of a PDU.
///
/// Serial frames only carry the slave address, TCP frames additionally
/// carry a transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Header {
    pub(crate) slave: Slave,
    pub(crate) transaction_id: Option<TransactionId>,
}

impl Header {
    pub(crate) const fn serial(slave: Slave) -> Self {
        Self {
            slave,
            transaction_id: None,
        }
    }

    pub(crate) const fn tcp(slave: Slave, transaction_id: TransactionId) -> Self {
        Self {
            slave,
            transaction_id: Some(transaction_id),
        }
    }
}

/// Check that `rsp_hdr` answers the request with `req_hdr`.
///
/// TCP responses are matched by their transaction identifier only, gateways
/// and devices may answer with a different unit identifier. Serial responses
/// must echo the slave address.
///
/// # Errors
///
/// If the headers don't match, an error message with the details will be returned.
pub(crate) fn verify_response_header(
    req_hdr: &Header,
    rsp_hdr: &Header,
) -> std::result::Result<(), String> {
    let matching = match req_hdr.transaction_id {
        Some(transaction_id) => rsp_hdr.transaction_id == Some(transaction_id),
        None => req_hdr == rsp_hdr,
    };
    if !matching {
        return Err(format!(
            "expected/request = {req_hdr:?}, actual/response = {rsp_hdr:?}"
        ));
    }
    if req_hdr.slave != rsp_hdr.slave {
        log::debug!(
            "Unit identifier {} of the response differs from the request {}",
            rsp_hdr.slave,
            req_hdr.slave
        );
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestAdu<'a> {
    pub(crate) hdr: Header,
    pub(crate) pdu: RequestPdu<'a>,
}

impl<'a> RequestAdu<'a> {
    pub(crate) fn new(hdr: Header, request: Request<'a>) -> Self {
        Self {
            hdr,
            pdu: request.into(),
        }
    }

    pub(crate) fn context(&self) -> RequestContext {
        RequestContext {
            function_code: self.pdu.0.function_code(),
            header: self.hdr,
        }
    }
}

/// What is needed to match a response with its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestContext {
    pub(crate) function_code: FunctionCode,
    pub(crate) header: Header,
}

impl RequestContext {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        self.function_code
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.header.slave
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: ResponsePdu,
}

impl ResponseAdu {
    pub(crate) fn try_into_response(self, request_context: RequestContext) -> Result<Response> {
        let RequestContext {
            function_code: req_function_code,
            header: req_hdr,
        } = request_context;

        let ResponseAdu {
            hdr: rsp_hdr,
            pdu: rsp_pdu,
        } = self;
        let ResponsePdu(result) = rsp_pdu;

        if let Err(message) = verify_response_header(&req_hdr, &rsp_hdr) {
            return Err(ProtocolError::HeaderMismatch { message, result }.into());
        }

        // Match function codes of request and response.
        let rsp_function_code = match &result {
            Ok(response) => response.function_code(),
            Err(ExceptionResponse { function, .. }) => *function,
        };
        if req_function_code != rsp_function_code {
            return Err(ProtocolError::FunctionCodeMismatch {
                request: req_function_code,
                result,
            }
            .into());
        }

        result.map_err(Error::Exception)
    }
}
