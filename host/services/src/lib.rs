// Licensed under the Apache-2.0 license

//! Host-side client library for the secure-enclave services transport.
//!
//! A non-secure host core issues synchronous requests to the enclave
//! firmware through a single shared packet buffer per channel, with a
//! mailbox doorbell as the only notification primitive: no sequence numbers,
//! no correlation IDs, one request in flight per channel. The
//! [`ServicesContext`] owns the channel registry and enforces the call
//! discipline the protocol depends on: the whole
//! prepare -> ring -> wait -> read sequence runs under the channel's packet
//! region lock, and the bounded wait turns a silent enclave into a
//! [`SvcError::RequestTimeout`] instead of a hung caller.
//!
//! The context replaces the process-wide transport singleton of older
//! implementations of this protocol: it is created once by
//! [`ServicesContext::initialize`], channels hang off it, and
//! [`ServicesContext::shutdown`] releases every transport resource it
//! acquired.

pub mod addr;
pub mod channel;
pub mod chardev;
pub mod doorbell;
mod error;
pub mod packet;
pub mod wrappers;

pub use addr::{
    AddressTranslator, GlobalAddress, IdentityTranslator, OffsetTranslator, TranslateError,
};
pub use channel::ServicesHandle;
pub use chardev::CharDevDoorbell;
pub use doorbell::{DoorbellError, EndpointId, MailboxDoorbell, PacketRegion};
pub use error::SvcError;
pub use packet::{PacketBuffer, PacketError};

use channel::{ChannelState, Registry};
use se_svc_common::{
    error_to_string, Request, ServiceHeader, ServiceId, TransportStatus, MAX_PAYLOAD_SIZE,
    SERVICE_HEADER_SIZE,
};
use std::sync::Mutex;
use std::time::Duration;
use zerocopy::{FromBytes, IntoBytes};

/// Heartbeat attempts the synchronizer makes beyond the first before giving
/// up on the link.
pub const SYNC_RETRY_BOUND: u32 = 100;

struct RawResponse {
    status: TransportStatus,
    payload: [u8; MAX_PAYLOAD_SIZE],
}

/// The transport context: doorbell binding, address translator, and the
/// registry of live channels.
pub struct ServicesContext<D: MailboxDoorbell, T: AddressTranslator> {
    doorbell: D,
    translator: T,
    channels: Mutex<Registry>,
    sync_retry_delay: Option<Duration>,
}

impl<D: MailboxDoorbell, T: AddressTranslator> ServicesContext<D, T> {
    /// Creates the context. Nothing touches the transport until the first
    /// `register_channel`.
    pub fn initialize(doorbell: D, translator: T) -> Self {
        Self {
            doorbell,
            translator,
            channels: Mutex::new(Registry::new()),
            sync_retry_delay: None,
        }
    }

    /// Inserts a fixed delay between heartbeat retries in [`synchronize`].
    /// Only the final success/failure and the retry count are observable to
    /// callers, so pacing the probes is free.
    ///
    /// [`synchronize`]: ServicesContext::synchronize
    pub fn with_sync_retry_delay(mut self, delay: Duration) -> Self {
        self.sync_retry_delay = Some(delay);
        self
    }

    /// The translator wrappers use to turn host buffer addresses into the
    /// global addresses carried in `send_*_addr` fields.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Binds `(mailbox, channel)` to a fresh handle. The doorbell binding
    /// opens the endpoint (releasing anything partially opened on failure);
    /// any failure there surfaces as [`SvcError::TransportUnavailable`].
    pub fn register_channel(&self, mailbox: u32, channel: u32) -> Result<ServicesHandle, SvcError> {
        let endpoint = EndpointId(mailbox);
        let region = self.doorbell.open_endpoint(endpoint, channel).map_err(|err| {
            log::warn!("failed to open {endpoint} channel {channel}: {err}");
            SvcError::TransportUnavailable
        })?;
        let handle = self.channels.lock().unwrap().insert(ChannelState {
            endpoint,
            channel,
            region,
        });
        log::info!("registered {handle} on {endpoint} channel {channel}");
        Ok(handle)
    }

    /// Releases the channel and its endpoint. A no-op, not an error, for
    /// handles that were never registered or are already released.
    pub fn unregister_channel(&self, handle: ServicesHandle) {
        let removed = self.channels.lock().unwrap().remove(handle);
        match removed {
            Some(state) => {
                self.doorbell.close_endpoint(state.endpoint);
                log::info!("unregistered {handle}");
            }
            None => log::debug!("unregister of unknown {handle} ignored"),
        }
    }

    /// Issues the request and decodes the response as the type bound to `R`,
    /// so the bytes written before the call can only be read back as the
    /// payload shape they were staged for.
    ///
    /// `Ok` is the transport verdict only; service-layer failures stay in
    /// the response's `resp_error_code`, which is returned untouched.
    pub fn send_request<R: Request>(
        &self,
        handle: ServicesHandle,
        req: &R,
        timeout: Duration,
    ) -> Result<R::Resp, SvcError> {
        let raw = self.exchange(handle, R::ID, req.as_bytes(), timeout)?;
        match raw.status {
            TransportStatus::SUCCESS => {
                let (resp, _) = <R::Resp>::read_from_prefix(&raw.payload)
                    .map_err(|_| PacketError::ResponseTruncated(raw.payload.len()))?;
                Ok(resp)
            }
            TransportStatus::NOT_ACKNOWLEDGED => Err(SvcError::NotAcknowledged),
            TransportStatus::TIMEOUT => Err(SvcError::RequestTimeout),
            TransportStatus::UNKNOWN_COMMAND => Err(SvcError::UnknownCommand),
            TransportStatus(code) => Err(SvcError::UnexpectedStatus(code)),
        }
    }

    /// Source-shaped call primitive for services without request payloads:
    /// stages a bare header for `service_id` and reports the transport
    /// status code the enclave wrote back. Registration and transport
    /// failures map to the all-ones sentinel; a missed deadline maps to the
    /// timeout code. Never panics, never retries.
    pub fn send_request_raw(
        &self,
        handle: ServicesHandle,
        service_id: ServiceId,
        timeout: Duration,
    ) -> u32 {
        match self.exchange(handle, service_id, &[], timeout) {
            Ok(raw) => raw.status.into(),
            Err(err) => {
                let code = err.status_code();
                log::debug!(
                    "raw request {service_id:?} on {handle} failed: {err} ({})",
                    error_to_string(code)
                );
                code
            }
        }
    }

    /// Confirms the enclave firmware is answering before real traffic is
    /// sent. Repeats the zero-payload heartbeat until one attempt succeeds
    /// or the retry counter exceeds [`SYNC_RETRY_BOUND`].
    ///
    /// Returns the number of attempts consumed: positive on success,
    /// negated on failure, so callers can see how unhealthy the link was
    /// even when it eventually came up.
    pub fn synchronize(&self, handle: ServicesHandle, per_try_timeout: Duration) -> i32 {
        let mut attempts: i32 = 0;
        loop {
            attempts += 1;
            let status = self.send_request_raw(handle, ServiceId::HEARTBEAT, per_try_timeout);
            if status == u32::from(TransportStatus::SUCCESS) {
                log::debug!("enclave answered heartbeat after {attempts} attempt(s)");
                return attempts;
            }
            log::debug!(
                "heartbeat attempt {attempts} failed: {}",
                error_to_string(status)
            );
            if attempts as u32 > SYNC_RETRY_BOUND {
                log::warn!("enclave not responding after {attempts} heartbeat attempts");
                return -attempts;
            }
            if let Some(delay) = self.sync_retry_delay {
                std::thread::sleep(delay);
            }
        }
    }

    /// Unregisters every channel and releases the transport.
    pub fn shutdown(self) {
        let states = self.channels.lock().unwrap().drain();
        for state in states {
            self.doorbell.close_endpoint(state.endpoint);
        }
        log::info!("services context shut down");
    }

    /// One full exchange: resolve the handle, then run
    /// prepare -> ring -> wait -> read as a single critical section under
    /// the packet region lock. Holding the lock across the wait is what
    /// keeps a second caller from clobbering the in-flight packet. On
    /// platforms where every channel shares one physical buffer, the shared
    /// region serializes cross-channel calls through the same lock.
    fn exchange(
        &self,
        handle: ServicesHandle,
        service_id: ServiceId,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<RawResponse, SvcError> {
        let channel = self
            .channels
            .lock()
            .unwrap()
            .get(handle)
            .ok_or(SvcError::TransportUnavailable)?;

        let mut packet = channel.region.packet.lock().unwrap();

        let frame = packet.prepare(SERVICE_HEADER_SIZE + payload.len())?;
        let header = ServiceHeader {
            service_id: service_id.into(),
            flags: 0,
            status: 0,
            reserved: 0,
        };
        frame[..SERVICE_HEADER_SIZE].copy_from_slice(header.as_bytes());
        frame[SERVICE_HEADER_SIZE..].copy_from_slice(payload);

        log::trace!(
            "ring {} channel {}: service {:#06x}, {} payload bytes",
            channel.endpoint,
            channel.channel,
            u16::from(service_id),
            payload.len()
        );
        self.doorbell
            .ring(channel.endpoint, channel.region.address, packet.bytes_mut())?;

        let ack = self
            .doorbell
            .wait(channel.endpoint, timeout, packet.bytes_mut())
            .map_err(|err| match err {
                DoorbellError::TimedOut => SvcError::RequestTimeout,
                other => SvcError::Doorbell(other),
            })?;
        if ack != channel.region.address {
            log::warn!(
                "doorbell-ack address {ack} does not match packet region {}",
                channel.region.address
            );
        }

        let bytes = packet.bytes();
        let (header, rest) = ServiceHeader::read_from_prefix(bytes)
            .map_err(|_| PacketError::ResponseTruncated(bytes.len()))?;
        let mut response = [0u8; MAX_PAYLOAD_SIZE];
        response.copy_from_slice(rest);
        Ok(RawResponse {
            status: TransportStatus(header.status),
            payload: response,
        })
    }
}
