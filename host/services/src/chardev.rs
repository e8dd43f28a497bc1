// Licensed under the Apache-2.0 license

//! Host-OS doorbell binding: two character devices per mailbox unit.
//!
//! The control device creates the logical channel and reports the bus
//! address of the packet region; the data device carries the doorbell
//! itself as a 4-byte little-endian address exchange and exposes the packet
//! region through `mmap`. The enclave-side driver reads and writes the
//! mapped memory directly, so the region handed to the engine is the same
//! physical bytes the enclave answers into.

use crate::addr::GlobalAddress;
use crate::doorbell::{DoorbellError, EndpointId, MailboxDoorbell, PacketRegion};
use crate::packet::PacketBuffer;
use nix::fcntl::{open, OFlag};
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::{close, read, write};
use se_svc_common::PACKET_CAPACITY;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct DevEndpoint {
    control_fd: RawFd,
    data_fd: RawFd,
    mapping: *mut libc::c_void,
    region: PacketRegion,
    refs: u32,
}

// The mapping pointer is only dereferenced through the region's lock.
unsafe impl Send for DevEndpoint {}

/// Doorbell transport over `semhu<N>` / `semhu<N>_data` device pairs.
pub struct CharDevDoorbell {
    dev_dir: PathBuf,
    endpoints: Mutex<HashMap<EndpointId, DevEndpoint>>,
}

impl CharDevDoorbell {
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    fn control_path(&self, endpoint: EndpointId) -> PathBuf {
        self.dev_dir.join(format!("semhu{}", endpoint.0))
    }

    fn data_path(&self, endpoint: EndpointId) -> PathBuf {
        self.dev_dir.join(format!("semhu{}_data", endpoint.0))
    }

    /// Everything after the control open, so a failure at any step can
    /// close the control descriptor in one place.
    fn setup(
        control_fd: RawFd,
        data_path: &Path,
        channel: u32,
    ) -> Result<(RawFd, *mut libc::c_void, u32), DoorbellError> {
        // Create the logical channel on the control endpoint.
        let written = write(control_fd, &channel.to_le_bytes())
            .map_err(|err| DoorbellError::Unavailable(format!("channel create: {err}")))?;
        if written != 4 {
            return Err(DoorbellError::Unavailable(format!(
                "channel create: short write of {written} bytes"
            )));
        }

        // The driver answers with the bus address of the packet region.
        let mut addr_bytes = [0u8; 4];
        let got = read(control_fd, &mut addr_bytes)
            .map_err(|err| DoorbellError::Unavailable(format!("region address: {err}")))?;
        if got != 4 {
            return Err(DoorbellError::Unavailable(format!(
                "region address: short read of {got} bytes"
            )));
        }
        let bus_addr = u32::from_le_bytes(addr_bytes);

        let data_fd = open(data_path, OFlag::O_RDWR, Mode::empty()).map_err(|err| {
            DoorbellError::Unavailable(format!("{}: {err}", data_path.display()))
        })?;

        let mapping = unsafe {
            mmap(
                None,
                NonZeroUsize::new(PACKET_CAPACITY).unwrap(),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                data_fd,
                0,
            )
        }
        .map_err(|err| {
            let _ = close(data_fd);
            DoorbellError::Unavailable(format!("packet region map: {err}"))
        })?;

        Ok((data_fd, mapping, bus_addr))
    }

    fn data_fd(&self, endpoint: EndpointId) -> Result<RawFd, DoorbellError> {
        self.endpoints
            .lock()
            .unwrap()
            .get(&endpoint)
            .map(|dev| dev.data_fd)
            .ok_or_else(|| DoorbellError::Unavailable(format!("{endpoint} is not open")))
    }
}

impl MailboxDoorbell for CharDevDoorbell {
    fn open_endpoint(
        &self,
        endpoint: EndpointId,
        channel: u32,
    ) -> Result<PacketRegion, DoorbellError> {
        let mut endpoints = self.endpoints.lock().unwrap();
        if let Some(dev) = endpoints.get_mut(&endpoint) {
            // Channels on one mailbox share the device pair and its region.
            dev.refs += 1;
            return Ok(dev.region.clone());
        }

        let control_path = self.control_path(endpoint);
        let control_fd = open(&control_path, OFlag::O_RDWR, Mode::empty()).map_err(|err| {
            DoorbellError::Unavailable(format!("{}: {err}", control_path.display()))
        })?;

        let (data_fd, mapping, bus_addr) =
            match Self::setup(control_fd, &self.data_path(endpoint), channel) {
                Ok(parts) => parts,
                Err(err) => {
                    // Fail the whole registration, releasing what was opened.
                    let _ = close(control_fd);
                    return Err(err);
                }
            };

        let packet = unsafe { PacketBuffer::from_raw(NonNull::new_unchecked(mapping.cast())) };
        let region = PacketRegion {
            packet: Arc::new(Mutex::new(packet)),
            address: GlobalAddress(bus_addr),
        };
        log::debug!("{endpoint} open: packet region at {}", region.address);
        endpoints.insert(
            endpoint,
            DevEndpoint {
                control_fd,
                data_fd,
                mapping,
                region: region.clone(),
                refs: 1,
            },
        );
        Ok(region)
    }

    fn close_endpoint(&self, endpoint: EndpointId) {
        let dev = {
            let mut endpoints = self.endpoints.lock().unwrap();
            match endpoints.get_mut(&endpoint) {
                Some(dev) if dev.refs > 1 => {
                    dev.refs -= 1;
                    return;
                }
                Some(_) => endpoints.remove(&endpoint),
                None => return,
            }
        };
        if let Some(dev) = dev {
            // Wait out any in-flight exchange before unmapping its memory.
            let _guard = dev.region.packet.lock().unwrap();
            unsafe {
                let _ = munmap(dev.mapping, PACKET_CAPACITY);
            }
            let _ = close(dev.data_fd);
            let _ = close(dev.control_fd);
            log::debug!("{endpoint} closed");
        }
    }

    fn ring(
        &self,
        endpoint: EndpointId,
        addr: GlobalAddress,
        _packet: &mut [u8],
    ) -> Result<(), DoorbellError> {
        let fd = self.data_fd(endpoint)?;
        let written = write(fd, &addr.0.to_le_bytes())
            .map_err(|err| DoorbellError::SendFailed(err.to_string()))?;
        if written != 4 {
            return Err(DoorbellError::SendFailed(format!(
                "short doorbell write of {written} bytes"
            )));
        }
        Ok(())
    }

    fn wait(
        &self,
        endpoint: EndpointId,
        timeout: Duration,
        _packet: &mut [u8],
    ) -> Result<GlobalAddress, DoorbellError> {
        let fd = self.data_fd(endpoint)?;
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let ready = poll(&mut fds, millis)
            .map_err(|err| DoorbellError::RecvFailed(err.to_string()))?;
        if ready == 0 {
            return Err(DoorbellError::TimedOut);
        }

        let mut addr_bytes = [0u8; 4];
        let got =
            read(fd, &mut addr_bytes).map_err(|err| DoorbellError::RecvFailed(err.to_string()))?;
        if got != 4 {
            return Err(DoorbellError::RecvFailed(format!(
                "short doorbell read of {got} bytes"
            )));
        }
        Ok(GlobalAddress(u32::from_le_bytes(addr_bytes)))
    }
}

impl Drop for CharDevDoorbell {
    fn drop(&mut self) {
        let mut endpoints = self.endpoints.lock().unwrap();
        for (_, dev) in endpoints.drain() {
            unsafe {
                let _ = munmap(dev.mapping, PACKET_CAPACITY);
            }
            let _ = close(dev.data_fd);
            let _ = close(dev.control_fd);
        }
    }
}
