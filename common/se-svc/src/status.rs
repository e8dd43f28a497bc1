// Licensed under the Apache-2.0 license

//! Transport-layer status codes carried in `ServiceHeader::status`.

/// Transport-layer status of one request/response exchange. Says whether a
/// response arrived and was framed correctly; the outcome of the requested
/// operation itself lives in the payload's `resp_error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatus(pub u16);

impl TransportStatus {
    /// A response was received and decoded.
    pub const SUCCESS: Self = Self(0x00);
    /// The enclave rejected the service ID.
    pub const UNKNOWN_COMMAND: Self = Self(0xFC);
    /// No doorbell-ack arrived before the deadline.
    pub const TIMEOUT: Self = Self(0xFD);
    /// The enclave refused the request.
    pub const NOT_ACKNOWLEDGED: Self = Self(0xFF);
}

impl From<u16> for TransportStatus {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<TransportStatus> for u32 {
    fn from(value: TransportStatus) -> Self {
        value.0 as u32
    }
}

/// Library-internal sentinel for registration/handle failures. Never appears
/// on the wire; the all-ones value cannot collide with a header status.
pub const TRANSPORT_UNAVAILABLE: u32 = u32::MAX;

/// Maps a transport code to a fixed description. Total over `u32`: codes
/// outside the known set map to a generic string, never a panic.
pub fn error_to_string(code: u32) -> &'static str {
    match code {
        0x00 => "service success",
        0xFC => "service unknown command",
        0xFD => "service request timeout",
        0xFF => "service not acknowledged",
        TRANSPORT_UNAVAILABLE => "service transport unavailable",
        _ => "service unknown error",
    }
}
