// Licensed under the Apache-2.0 license

//! Service ID space and typed request/response payloads.
//!
//! Payload structs immediately follow the `ServiceHeader` in the packet
//! buffer. Fields written by the host before the call are named `send_*`;
//! fields written by the enclave are named `resp_*`, with `resp_error_code`
//! carrying the service-layer outcome. Every `send_*_addr` field holds a
//! global address produced by the address translator, never a raw host
//! pointer.

use crate::{Request, Response, MAX_PAYLOAD_SIZE};
use core::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const VERSION_STR_LEN: usize = 80;
pub const REVISION_ID_LEN: usize = 16;

/// Selects the payload shape and the enclave-side handler for a call.
///
/// IDs are grouped in non-overlapping per-family ranges delimited by
/// `_START`/`_END` sentinels; the enclave firmware dispatches on the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceId(pub u16);

impl ServiceId {
    // Maintenance services
    pub const MAINTENANCE_START: Self = Self(0x0000);
    pub const HEARTBEAT: Self = Self(0x0001);
    pub const MEMORY_RETENTION: Self = Self(0x0002);
    pub const MAINTENANCE_END: Self = Self(0x00FF);

    // Boot services
    pub const BOOT_START: Self = Self(0x0100);
    pub const BOOT_RELEASE_CPU: Self = Self(0x0101);
    pub const BOOT_RESET_SOC: Self = Self(0x0102);
    pub const BOOT_END: Self = Self(0x01FF);

    // Crypto services
    pub const CRYPTO_START: Self = Self(0x0200);
    pub const CRYPTO_GET_RANDOM: Self = Self(0x0201);
    pub const CRYPTO_END: Self = Self(0x02FF);

    // Application services
    pub const APP_START: Self = Self(0x0300);
    pub const APP_PINMUX: Self = Self(0x0301);
    pub const APP_END: Self = Self(0x03FF);

    // System-management services
    pub const SYSTEM_START: Self = Self(0x0400);
    pub const SYSTEM_GET_VERSION: Self = Self(0x0401);
    pub const SYSTEM_GET_DEVICE_DATA: Self = Self(0x0402);
    pub const SYSTEM_END: Self = Self(0x04FF);

    // Power services
    pub const POWER_START: Self = Self(0x0500);
    pub const POWER_SET_RUN_PROFILE: Self = Self(0x0501);
    pub const POWER_GET_RUN_PROFILE: Self = Self(0x0502);
    pub const POWER_END: Self = Self(0x05FF);

    // Clock services
    pub const CLOCK_START: Self = Self(0x0600);
    pub const CLOCK_ENABLE: Self = Self(0x0601);
    pub const CLOCK_SET_FREQUENCY: Self = Self(0x0602);
    pub const CLOCK_END: Self = Self(0x06FF);

    // Update services
    pub const UPDATE_START: Self = Self(0x0700);
    pub const UPDATE_STORE_IMAGE: Self = Self(0x0701);
    pub const UPDATE_END: Self = Self(0x07FF);

    // External-processor control services
    pub const EXTSYS_START: Self = Self(0x0800);
    pub const EXTSYS_BOOT: Self = Self(0x0801);
    pub const EXTSYS_SHUTDOWN: Self = Self(0x0802);
    pub const EXTSYS_END: Self = Self(0x08FF);
}

impl From<u16> for ServiceId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ServiceId> for u16 {
    fn from(value: ServiceId) -> Self {
        value.0
    }
}

// Maintenance services

/// Zero-payload liveness probe used by the synchronizer.
#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct HeartbeatReq {}
impl Request for HeartbeatReq {
    const ID: ServiceId = ServiceId::HEARTBEAT;
    type Resp = HeartbeatResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct HeartbeatResp {}
impl Response for HeartbeatResp {}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct MemoryRetentionReq {
    pub send_retention_mask: u32,
}
impl Request for MemoryRetentionReq {
    const ID: ServiceId = ServiceId::MEMORY_RETENTION;
    type Resp = MemoryRetentionResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct MemoryRetentionResp {
    pub resp_error_code: u32,
}
impl Response for MemoryRetentionResp {}

// Boot services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ReleaseCpuReq {
    pub send_cpu_id: u32,
}
impl Request for ReleaseCpuReq {
    const ID: ServiceId = ServiceId::BOOT_RELEASE_CPU;
    type Resp = ReleaseCpuResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ReleaseCpuResp {
    pub resp_error_code: u32,
}
impl Response for ReleaseCpuResp {}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ResetSocReq {}
impl Request for ResetSocReq {
    const ID: ServiceId = ServiceId::BOOT_RESET_SOC;
    type Resp = ResetSocResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ResetSocResp {
    pub resp_error_code: u32,
}
impl Response for ResetSocResp {}

// Crypto services

/// The enclave fills `send_length` random bytes at `send_buffer_addr`
/// (a translated global address).
#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetRandomReq {
    pub send_buffer_addr: u32,
    pub send_length: u32,
}
impl Request for GetRandomReq {
    const ID: ServiceId = ServiceId::CRYPTO_GET_RANDOM;
    type Resp = GetRandomResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetRandomResp {
    pub resp_error_code: u32,
}
impl Response for GetRandomResp {}

// Application services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct PinmuxReq {
    pub send_port: u32,
    pub send_pin: u32,
    pub send_function: u32,
}
impl Request for PinmuxReq {
    const ID: ServiceId = ServiceId::APP_PINMUX;
    type Resp = PinmuxResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct PinmuxResp {
    pub resp_error_code: u32,
}
impl Response for PinmuxResp {}

// System-management services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetVersionReq {}
impl Request for GetVersionReq {
    const ID: ServiceId = ServiceId::SYSTEM_GET_VERSION;
    type Resp = GetVersionResp;
}

#[repr(C)]
#[derive(Debug, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetVersionResp {
    pub resp_error_code: u32,
    pub resp_version: [u8; VERSION_STR_LEN],
}
impl Response for GetVersionResp {}

impl Default for GetVersionResp {
    fn default() -> Self {
        Self {
            resp_error_code: 0,
            resp_version: [0u8; VERSION_STR_LEN],
        }
    }
}

impl GetVersionResp {
    /// The version string up to its NUL padding.
    pub fn version_str(&self) -> &str {
        let end = self
            .resp_version
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(VERSION_STR_LEN);
        core::str::from_utf8(&self.resp_version[..end]).unwrap_or("")
    }
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetDeviceDataReq {}
impl Request for GetDeviceDataReq {
    const ID: ServiceId = ServiceId::SYSTEM_GET_DEVICE_DATA;
    type Resp = GetDeviceDataResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetDeviceDataResp {
    pub resp_error_code: u32,
    pub resp_part_number: u32,
    pub resp_revision_id: [u8; REVISION_ID_LEN],
}
impl Response for GetDeviceDataResp {}

// Power services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct SetRunProfileReq {
    pub send_power_domains: u32,
    pub send_memory_blocks: u32,
    pub send_ip_clock_gating: u32,
    pub send_vdd_ioflex_3v3: u32,
}
impl Request for SetRunProfileReq {
    const ID: ServiceId = ServiceId::POWER_SET_RUN_PROFILE;
    type Resp = SetRunProfileResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct SetRunProfileResp {
    pub resp_error_code: u32,
}
impl Response for SetRunProfileResp {}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetRunProfileReq {}
impl Request for GetRunProfileReq {
    const ID: ServiceId = ServiceId::POWER_GET_RUN_PROFILE;
    type Resp = GetRunProfileResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct GetRunProfileResp {
    pub resp_error_code: u32,
    pub resp_power_domains: u32,
    pub resp_memory_blocks: u32,
    pub resp_ip_clock_gating: u32,
    pub resp_vdd_ioflex_3v3: u32,
}
impl Response for GetRunProfileResp {}

// Clock services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ClockEnableReq {
    pub send_clock_id: u32,
    pub send_enable: u32,
}
impl Request for ClockEnableReq {
    const ID: ServiceId = ServiceId::CLOCK_ENABLE;
    type Resp = ClockEnableResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ClockEnableResp {
    pub resp_error_code: u32,
}
impl Response for ClockEnableResp {}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ClockSetFrequencyReq {
    pub send_clock_id: u32,
    pub send_frequency: u32,
}
impl Request for ClockSetFrequencyReq {
    const ID: ServiceId = ServiceId::CLOCK_SET_FREQUENCY;
    type Resp = ClockSetFrequencyResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ClockSetFrequencyResp {
    pub resp_error_code: u32,
}
impl Response for ClockSetFrequencyResp {}

// Update services

/// `send_image_addr` is a translated global address; the image bytes stay in
/// host-supplied memory, only their address crosses the packet buffer.
#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct StoreImageReq {
    pub send_image_addr: u32,
    pub send_image_size: u32,
    pub send_destination_id: u32,
}
impl Request for StoreImageReq {
    const ID: ServiceId = ServiceId::UPDATE_STORE_IMAGE;
    type Resp = StoreImageResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct StoreImageResp {
    pub resp_error_code: u32,
}
impl Response for StoreImageResp {}

// External-processor control services

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ExtSysBootReq {
    pub send_boot_addr: u32,
    pub send_boot_arg: u32,
}
impl Request for ExtSysBootReq {
    const ID: ServiceId = ServiceId::EXTSYS_BOOT;
    type Resp = ExtSysBootResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ExtSysBootResp {
    pub resp_error_code: u32,
}
impl Response for ExtSysBootResp {}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ExtSysShutdownReq {}
impl Request for ExtSysShutdownReq {
    const ID: ServiceId = ServiceId::EXTSYS_SHUTDOWN;
    type Resp = ExtSysShutdownResp;
}

#[repr(C)]
#[derive(Debug, Default, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
pub struct ExtSysShutdownResp {
    pub resp_error_code: u32,
}
impl Response for ExtSysShutdownResp {}

// Every request and response must fit behind the header in one packet.
const _: () = assert!(size_of::<HeartbeatReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<HeartbeatResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<MemoryRetentionReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<MemoryRetentionResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ReleaseCpuReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ReleaseCpuResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ResetSocReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ResetSocResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetRandomReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetRandomResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<PinmuxReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<PinmuxResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetVersionReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetVersionResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetDeviceDataReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetDeviceDataResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<SetRunProfileReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<SetRunProfileResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetRunProfileReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<GetRunProfileResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ClockEnableReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ClockEnableResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ClockSetFrequencyReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ClockSetFrequencyResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<StoreImageReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<StoreImageResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ExtSysBootReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ExtSysBootResp>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ExtSysShutdownReq>() <= MAX_PAYLOAD_SIZE);
const _: () = assert!(size_of::<ExtSysShutdownResp>() <= MAX_PAYLOAD_SIZE);
