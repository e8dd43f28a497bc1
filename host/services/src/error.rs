// Licensed under the Apache-2.0 license

use crate::addr::TranslateError;
use crate::doorbell::DoorbellError;
use crate::packet::PacketError;
use se_svc_common::{TransportStatus, TRANSPORT_UNAVAILABLE};
use thiserror::Error;

/// Transport-layer failure of one service call.
///
/// This is strictly the transport verdict: an `Ok` response from the engine
/// means a response arrived and was decoded, not that the requested operation
/// succeeded at the enclave. The service-layer outcome lives in the payload's
/// `resp_error_code` and is never inspected here.
#[derive(Debug, Error, PartialEq)]
pub enum SvcError {
    /// The handle is not registered, or the transport endpoint could not be
    /// opened or signalled.
    #[error("transport unavailable")]
    TransportUnavailable,
    /// The enclave refused the request.
    #[error("request not acknowledged by the enclave")]
    NotAcknowledged,
    /// No doorbell-ack arrived before the deadline.
    #[error("request timed out")]
    RequestTimeout,
    /// The enclave did not recognize the service ID.
    #[error("service id not recognized by the enclave")]
    UnknownCommand,
    /// The enclave wrote a status outside the known transport code set.
    #[error("unexpected transport status {0:#06x}")]
    UnexpectedStatus(u16),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Doorbell(#[from] DoorbellError),
}

impl SvcError {
    /// The numeric code the raw call primitive reports for this failure,
    /// using the library-internal all-ones sentinel where no wire code
    /// exists.
    pub fn status_code(&self) -> u32 {
        match self {
            SvcError::NotAcknowledged => TransportStatus::NOT_ACKNOWLEDGED.into(),
            SvcError::RequestTimeout => TransportStatus::TIMEOUT.into(),
            SvcError::UnknownCommand => TransportStatus::UNKNOWN_COMMAND.into(),
            SvcError::UnexpectedStatus(code) => *code as u32,
            SvcError::TransportUnavailable
            | SvcError::Packet(_)
            | SvcError::Translate(_)
            | SvcError::Doorbell(_) => TRANSPORT_UNAVAILABLE,
        }
    }
}
