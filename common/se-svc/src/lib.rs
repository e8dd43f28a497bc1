// Licensed under the Apache-2.0 license

//! Wire format shared by the host client library and the secure-enclave
//! firmware: the service header that prefixes every packet, the service ID
//! space, the transport status codes, and the typed request/response payloads.

#![cfg_attr(not(test), no_std)]

pub mod messages;
pub mod status;

pub use messages::ServiceId;
pub use status::{error_to_string, TransportStatus, TRANSPORT_UNAVAILABLE};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Capacity of the shared packet buffer. A request (header + payload) and
/// the response overwritten in its place must both fit.
pub const PACKET_CAPACITY: usize = 600;

/// Fixed-layout header at offset 0 of every request and response packet.
///
/// `status` is written by the engine's peer: after the doorbell-ack it holds
/// the transport-layer status code, which is independent of any
/// `resp_error_code` field a payload may carry.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ServiceHeader {
    pub service_id: u16,
    pub flags: u16,
    pub status: u16,
    pub reserved: u16,
}

pub const SERVICE_HEADER_SIZE: usize = core::mem::size_of::<ServiceHeader>();
const _: () = assert!(SERVICE_HEADER_SIZE == 8);

/// Largest payload that fits behind the header in one packet.
pub const MAX_PAYLOAD_SIZE: usize = PACKET_CAPACITY - SERVICE_HEADER_SIZE;

/// A trait implemented by request payload types. Describes the associated
/// service ID and response type, so a response can only be decoded as the
/// struct its request was paired with.
pub trait Request: IntoBytes + FromBytes + Immutable + KnownLayout {
    const ID: ServiceId;
    type Resp: Response;
}

/// A trait implemented by response payload types.
pub trait Response: IntoBytes + FromBytes + Immutable + KnownLayout {}
