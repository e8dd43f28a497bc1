// Licensed under the Apache-2.0 license

//! The shared packet buffer: the sole staging area for one in-flight call.
//!
//! The request is encoded at offset 0 and the enclave overwrites the same
//! bytes with its response, so the previous call's contents are destroyed by
//! every `prepare`. The buffer provides no concurrency control of its own;
//! the engine serializes access by holding the region lock across the whole
//! prepare -> ring -> wait -> read sequence.

use core::ptr::NonNull;
use se_svc_common::PACKET_CAPACITY;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The caller asked for more bytes than the physical buffer holds.
    /// Surfaced before any write reaches the shared region.
    #[error("requested {requested} bytes exceeds the {capacity}-byte packet buffer")]
    CapacityExceeded { requested: usize, capacity: usize },
    /// The response bytes were too short for the expected payload type.
    #[error("response payload truncated at {0} bytes")]
    ResponseTruncated(usize),
}

enum Storage {
    Inline(Box<[u8; PACKET_CAPACITY]>),
    // Memory owned by a transport binding (e.g. a mapped device region).
    // The binding keeps the mapping alive for as long as the buffer exists.
    Raw(NonNull<u8>),
}

/// One physical packet region of `PACKET_CAPACITY` bytes.
pub struct PacketBuffer {
    storage: Storage,
}

// The raw variant points into a binding-owned region that is only ever
// reached through the enclosing Mutex.
unsafe impl Send for PacketBuffer {}

impl PacketBuffer {
    /// A host-allocated packet region, zero-filled.
    pub fn new() -> Self {
        Self {
            storage: Storage::Inline(Box::new([0u8; PACKET_CAPACITY])),
        }
    }

    /// Wraps an externally owned region of at least `PACKET_CAPACITY` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `PACKET_CAPACITY` bytes
    /// for the lifetime of the returned buffer, and must not be accessed
    /// through any other Rust reference while the buffer is alive.
    pub unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Self {
            storage: Storage::Raw(ptr),
        }
    }

    /// Zeroes the first `size` bytes and returns them for the caller to
    /// encode a request into. Fails the capacity precondition rather than
    /// writing out of bounds.
    pub fn prepare(&mut self, size: usize) -> Result<&mut [u8], PacketError> {
        if size > PACKET_CAPACITY {
            return Err(PacketError::CapacityExceeded {
                requested: size,
                capacity: PACKET_CAPACITY,
            });
        }
        let bytes = self.bytes_mut();
        bytes[..size].fill(0);
        Ok(&mut bytes[..size])
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Inline(b) => &b[..],
            Storage::Raw(p) => unsafe { core::slice::from_raw_parts(p.as_ptr(), PACKET_CAPACITY) },
        }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Inline(b) => &mut b[..],
            Storage::Raw(p) => unsafe {
                core::slice::from_raw_parts_mut(p.as_ptr(), PACKET_CAPACITY)
            },
        }
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}
