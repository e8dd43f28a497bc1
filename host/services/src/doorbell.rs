// Licensed under the Apache-2.0 license

//! The doorbell collaborator: the out-of-band notification that tells the
//! enclave a packet is ready, and the matching wait for its answer.

use crate::addr::GlobalAddress;
use crate::packet::PacketBuffer;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Index of a physical mailbox unit (or its host-OS device pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(pub u32);

impl core::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "mailbox{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DoorbellError {
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("doorbell send failed: {0}")]
    SendFailed(String),
    /// The bounded receive expired without a doorbell-ack.
    #[error("no doorbell-ack before the deadline")]
    TimedOut,
    #[error("doorbell receive failed: {0}")]
    RecvFailed(String),
}

/// One physical packet region behind its lock, plus the global address the
/// enclave uses to reach it. The engine holds the lock across an entire
/// call, so a binding that hands every channel the same region serializes
/// cross-channel traffic as a side effect.
#[derive(Clone)]
pub struct PacketRegion {
    pub packet: Arc<Mutex<PacketBuffer>>,
    pub address: GlobalAddress,
}

impl std::fmt::Debug for PacketRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketRegion")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// A transport binding that can signal "packet ready" to the enclave and
/// wait for the answering signal. The send/recv pair round-trips the packet
/// region's global address; no payload travels through the doorbell itself.
///
/// `ring` and `wait` receive the locked packet bytes so an in-process peer
/// (the test model) can read the request and write its response through the
/// same exclusive borrow the engine holds. Hardware-backed bindings ignore
/// the slice; their peer reaches the region through the address.
pub trait MailboxDoorbell: Send + Sync {
    /// Opens the transport endpoint for `channel` and returns the packet
    /// region calls on that channel stage through. Must release anything
    /// partially opened before reporting failure.
    fn open_endpoint(
        &self,
        endpoint: EndpointId,
        channel: u32,
    ) -> Result<PacketRegion, DoorbellError>;

    /// Releases the endpoint. Safe to call for endpoints that were never
    /// opened or are already closed.
    fn close_endpoint(&self, endpoint: EndpointId);

    /// Blocking doorbell send: the packet at `addr` is ready for the peer.
    fn ring(
        &self,
        endpoint: EndpointId,
        addr: GlobalAddress,
        packet: &mut [u8],
    ) -> Result<(), DoorbellError>;

    /// Blocking receive of the doorbell-ack, bounded by `timeout`. Returns
    /// the address the peer reports, which is expected to be the one passed
    /// to `ring`.
    fn wait(
        &self,
        endpoint: EndpointId,
        timeout: Duration,
        packet: &mut [u8],
    ) -> Result<GlobalAddress, DoorbellError>;
}
