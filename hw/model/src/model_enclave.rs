// Licensed under the Apache-2.0 license

use crate::ModelParams;
use se_svc_common::messages::{
    GetDeviceDataResp, GetRunProfileResp, GetVersionResp, SetRunProfileReq, VERSION_STR_LEN,
};
use se_svc_common::{ServiceHeader, ServiceId, TransportStatus, SERVICE_HEADER_SIZE};
use se_svc_host::{
    DoorbellError, EndpointId, GlobalAddress, MailboxDoorbell, PacketBuffer, PacketRegion,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use zerocopy::{FromBytes, IntoBytes};

// Synthetic bus addresses for the model's packet regions.
const SHARED_PACKET_ADDR: u32 = 0x8340_0000;
const PER_CHANNEL_ADDR_BASE: u32 = 0x8340_0400;

#[derive(Clone, Copy)]
enum Fault {
    Nack,
    Drop,
}

struct ModelState {
    params: ModelParams,
    shared_region: Mutex<Option<PacketRegion>>,
    next_region_addr: AtomicU32,
    pending: Mutex<HashMap<EndpointId, VecDeque<GlobalAddress>>>,
    doorbell_cv: Condvar,
    faults: Mutex<VecDeque<Fault>>,
    echo: AtomicBool,
    requests_seen: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    captured: Mutex<Vec<Vec<u8>>>,
    run_profile: Mutex<SetRunProfileReq>,
}

/// The emulated enclave. Clones share one model, so tests keep a handle for
/// scripting and assertions while the context owns another.
#[derive(Clone)]
pub struct ModelEnclave {
    inner: Arc<ModelState>,
}

impl ModelEnclave {
    pub fn new() -> Self {
        Self::with_params(ModelParams::default())
    }

    pub fn with_params(params: ModelParams) -> Self {
        Self {
            inner: Arc::new(ModelState {
                params,
                shared_region: Mutex::new(None),
                next_region_addr: AtomicU32::new(PER_CHANNEL_ADDR_BASE),
                pending: Mutex::new(HashMap::new()),
                doorbell_cv: Condvar::new(),
                faults: Mutex::new(VecDeque::new()),
                echo: AtomicBool::new(false),
                requests_seen: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                captured: Mutex::new(Vec::new()),
                run_profile: Mutex::new(SetRunProfileReq::default()),
            }),
        }
    }

    /// The next `n` requests are refused with NOT_ACKNOWLEDGED.
    pub fn enqueue_nacks(&self, n: usize) {
        let mut faults = self.inner.faults.lock().unwrap();
        faults.extend(std::iter::repeat(Fault::Nack).take(n));
    }

    /// The next `n` requests are swallowed without a doorbell-ack, so the
    /// engine's bounded wait expires.
    pub fn enqueue_drops(&self, n: usize) {
        let mut faults = self.inner.faults.lock().unwrap();
        faults.extend(std::iter::repeat(Fault::Drop).take(n));
    }

    /// Answer unknown service IDs by leaving the request payload in place
    /// with a SUCCESS status, instead of UNKNOWN_COMMAND. Used by framing
    /// tests that read the echoed bytes back as the staged struct.
    pub fn set_echo(&self, on: bool) {
        self.inner.echo.store(on, Ordering::SeqCst);
    }

    /// Requests observed, whatever their outcome.
    pub fn requests_seen(&self) -> usize {
        self.inner.requests_seen.load(Ordering::SeqCst)
    }

    /// High-water mark of concurrently in-flight requests.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Raw frame (header + payload) of the most recent request.
    pub fn last_request(&self) -> Option<Vec<u8>> {
        self.inner.captured.lock().unwrap().last().cloned()
    }

    fn fresh_region(&self) -> PacketRegion {
        PacketRegion {
            packet: Arc::new(Mutex::new(PacketBuffer::new())),
            address: GlobalAddress(self.inner.next_region_addr.fetch_add(0x400, Ordering::SeqCst)),
        }
    }

    fn post_ack(&self, endpoint: EndpointId, addr: GlobalAddress) {
        let mut pending = self.inner.pending.lock().unwrap();
        pending.entry(endpoint).or_default().push_back(addr);
        self.inner.doorbell_cv.notify_all();
    }

    fn set_status(packet: &mut [u8], status: TransportStatus) {
        packet[4..6].copy_from_slice(&status.0.to_le_bytes());
    }

    /// Writes the response payload over the request bytes, the way the real
    /// firmware answers in place.
    fn respond(packet: &mut [u8], payload: &[u8]) {
        packet[SERVICE_HEADER_SIZE..SERVICE_HEADER_SIZE + payload.len()].copy_from_slice(payload);
        Self::set_status(packet, TransportStatus::SUCCESS);
    }

    fn handle_request(&self, packet: &mut [u8]) {
        let state = &*self.inner;
        let Ok((header, _)) = ServiceHeader::read_from_prefix(packet) else {
            return;
        };
        let id = ServiceId(header.service_id);
        log::trace!("model: service {:#06x}", header.service_id);
        match id {
            ServiceId::HEARTBEAT => Self::respond(packet, &[]),
            ServiceId::SYSTEM_GET_VERSION => {
                let mut resp = GetVersionResp::default();
                let version = state.params.version.as_bytes();
                let n = version.len().min(VERSION_STR_LEN);
                resp.resp_version[..n].copy_from_slice(&version[..n]);
                Self::respond(packet, resp.as_bytes());
            }
            ServiceId::SYSTEM_GET_DEVICE_DATA => {
                let mut resp = GetDeviceDataResp {
                    resp_part_number: 0x7150,
                    ..Default::default()
                };
                resp.resp_revision_id[..2].copy_from_slice(b"B2");
                Self::respond(packet, resp.as_bytes());
            }
            ServiceId::POWER_SET_RUN_PROFILE => {
                if let Ok((req, _)) =
                    SetRunProfileReq::read_from_prefix(&packet[SERVICE_HEADER_SIZE..])
                {
                    *state.run_profile.lock().unwrap() = req;
                }
                Self::respond(packet, &0u32.to_le_bytes());
            }
            ServiceId::POWER_GET_RUN_PROFILE => {
                let profile = state.run_profile.lock().unwrap();
                let resp = GetRunProfileResp {
                    resp_error_code: 0,
                    resp_power_domains: profile.send_power_domains,
                    resp_memory_blocks: profile.send_memory_blocks,
                    resp_ip_clock_gating: profile.send_ip_clock_gating,
                    resp_vdd_ioflex_3v3: profile.send_vdd_ioflex_3v3,
                };
                Self::respond(packet, resp.as_bytes());
            }
            ServiceId::MEMORY_RETENTION
            | ServiceId::BOOT_RELEASE_CPU
            | ServiceId::BOOT_RESET_SOC
            | ServiceId::CRYPTO_GET_RANDOM
            | ServiceId::APP_PINMUX
            | ServiceId::CLOCK_ENABLE
            | ServiceId::CLOCK_SET_FREQUENCY
            | ServiceId::UPDATE_STORE_IMAGE
            | ServiceId::EXTSYS_BOOT
            | ServiceId::EXTSYS_SHUTDOWN => Self::respond(packet, &0u32.to_le_bytes()),
            _ => {
                if state.echo.load(Ordering::SeqCst) {
                    Self::set_status(packet, TransportStatus::SUCCESS);
                } else {
                    Self::set_status(packet, TransportStatus::UNKNOWN_COMMAND);
                }
            }
        }
    }
}

impl Default for ModelEnclave {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxDoorbell for ModelEnclave {
    fn open_endpoint(
        &self,
        _endpoint: EndpointId,
        _channel: u32,
    ) -> Result<PacketRegion, DoorbellError> {
        if self.inner.params.per_channel_buffers {
            Ok(self.fresh_region())
        } else {
            let mut shared = self.inner.shared_region.lock().unwrap();
            Ok(shared
                .get_or_insert_with(|| PacketRegion {
                    packet: Arc::new(Mutex::new(PacketBuffer::new())),
                    address: GlobalAddress(SHARED_PACKET_ADDR),
                })
                .clone())
        }
    }

    fn close_endpoint(&self, endpoint: EndpointId) {
        self.inner.pending.lock().unwrap().remove(&endpoint);
    }

    fn ring(
        &self,
        endpoint: EndpointId,
        addr: GlobalAddress,
        packet: &mut [u8],
    ) -> Result<(), DoorbellError> {
        let state = &*self.inner;
        let in_flight = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = state.params.response_delay {
            std::thread::sleep(delay);
        }
        state.requests_seen.fetch_add(1, Ordering::SeqCst);
        state.captured.lock().unwrap().push(packet.to_vec());

        let fault = state.faults.lock().unwrap().pop_front();
        match fault {
            Some(Fault::Drop) => {
                log::debug!("model: dropping doorbell on {endpoint}");
            }
            Some(Fault::Nack) => {
                Self::set_status(packet, TransportStatus::NOT_ACKNOWLEDGED);
                self.post_ack(endpoint, addr);
            }
            None => {
                self.handle_request(packet);
                self.post_ack(endpoint, addr);
            }
        }
        state.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait(
        &self,
        endpoint: EndpointId,
        timeout: Duration,
        _packet: &mut [u8],
    ) -> Result<GlobalAddress, DoorbellError> {
        let state = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut pending = state.pending.lock().unwrap();
        loop {
            if let Some(addr) = pending.get_mut(&endpoint).and_then(|q| q.pop_front()) {
                return Ok(addr);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(DoorbellError::TimedOut);
            }
            let (guard, _) = state
                .doorbell_cv
                .wait_timeout(pending, deadline - now)
                .unwrap();
            pending = guard;
        }
    }
}
