// Licensed under the Apache-2.0 license

//! Typed wrappers for the individual enclave services.
//!
//! Each wrapper stages the request fields, runs one engine call, and hands
//! back the response struct. Buffer arguments always go through the
//! context's address translator: the enclave dereferences global addresses,
//! so a raw host pointer in a `send_*_addr` field would be read against the
//! wrong memory.
//!
//! A transport-level `Ok` only means the enclave answered; the service's own
//! verdict is the `resp_error_code` field of the returned struct.

use crate::addr::AddressTranslator;
use crate::channel::ServicesHandle;
use crate::doorbell::MailboxDoorbell;
use crate::error::SvcError;
use crate::ServicesContext;
use se_svc_common::messages::{
    ClockEnableReq, ClockEnableResp, ClockSetFrequencyReq, ClockSetFrequencyResp, ExtSysBootReq,
    ExtSysBootResp, ExtSysShutdownReq, ExtSysShutdownResp, GetDeviceDataReq, GetDeviceDataResp,
    GetRandomReq, GetRandomResp, GetRunProfileReq, GetRunProfileResp, GetVersionReq,
    GetVersionResp, HeartbeatReq, MemoryRetentionReq, MemoryRetentionResp, PinmuxReq, PinmuxResp,
    ReleaseCpuReq, ReleaseCpuResp, SetRunProfileReq, SetRunProfileResp, StoreImageReq,
    StoreImageResp,
};
use std::time::Duration;

/// One liveness probe outside the synchronizer's retry loop.
pub fn heartbeat<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    timeout: Duration,
) -> Result<(), SvcError> {
    ctx.send_request(handle, &HeartbeatReq::default(), timeout)
        .map(|_| ())
}

pub fn get_version<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    timeout: Duration,
) -> Result<GetVersionResp, SvcError> {
    ctx.send_request(handle, &GetVersionReq::default(), timeout)
}

pub fn get_device_data<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    timeout: Duration,
) -> Result<GetDeviceDataResp, SvcError> {
    ctx.send_request(handle, &GetDeviceDataReq::default(), timeout)
}

/// Asks the enclave TRNG to fill `out` in place via its global address.
pub fn get_random<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    out: &mut [u8],
    timeout: Duration,
) -> Result<GetRandomResp, SvcError> {
    let addr = ctx.translator().to_global(out.as_ptr() as usize)?;
    let req = GetRandomReq {
        send_buffer_addr: addr.0,
        send_length: out.len() as u32,
    };
    ctx.send_request(handle, &req, timeout)
}

pub fn memory_retention<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    retention_mask: u32,
    timeout: Duration,
) -> Result<MemoryRetentionResp, SvcError> {
    let req = MemoryRetentionReq {
        send_retention_mask: retention_mask,
    };
    ctx.send_request(handle, &req, timeout)
}

pub fn release_cpu<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    cpu_id: u32,
    timeout: Duration,
) -> Result<ReleaseCpuResp, SvcError> {
    let req = ReleaseCpuReq { send_cpu_id: cpu_id };
    ctx.send_request(handle, &req, timeout)
}

pub fn pinmux<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    port: u32,
    pin: u32,
    function: u32,
    timeout: Duration,
) -> Result<PinmuxResp, SvcError> {
    let req = PinmuxReq {
        send_port: port,
        send_pin: pin,
        send_function: function,
    };
    ctx.send_request(handle, &req, timeout)
}

pub fn set_run_profile<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    req: &SetRunProfileReq,
    timeout: Duration,
) -> Result<SetRunProfileResp, SvcError> {
    ctx.send_request(handle, req, timeout)
}

pub fn get_run_profile<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    timeout: Duration,
) -> Result<GetRunProfileResp, SvcError> {
    ctx.send_request(handle, &GetRunProfileReq::default(), timeout)
}

pub fn clock_enable<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    clock_id: u32,
    enable: bool,
    timeout: Duration,
) -> Result<ClockEnableResp, SvcError> {
    let req = ClockEnableReq {
        send_clock_id: clock_id,
        send_enable: enable as u32,
    };
    ctx.send_request(handle, &req, timeout)
}

pub fn set_clock_frequency<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    clock_id: u32,
    frequency_hz: u32,
    timeout: Duration,
) -> Result<ClockSetFrequencyResp, SvcError> {
    let req = ClockSetFrequencyReq {
        send_clock_id: clock_id,
        send_frequency: frequency_hz,
    };
    ctx.send_request(handle, &req, timeout)
}

/// Hands an update image to the enclave by address; the image bytes stay in
/// host memory until the enclave copies them out.
pub fn store_image<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    image: &[u8],
    destination_id: u32,
    timeout: Duration,
) -> Result<StoreImageResp, SvcError> {
    let addr = ctx.translator().to_global(image.as_ptr() as usize)?;
    let req = StoreImageReq {
        send_image_addr: addr.0,
        send_image_size: image.len() as u32,
        send_destination_id: destination_id,
    };
    ctx.send_request(handle, &req, timeout)
}

/// Boots the external processor from an image staged in host-shared memory.
pub fn boot_external_processor<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    image: &[u8],
    boot_arg: u32,
    timeout: Duration,
) -> Result<ExtSysBootResp, SvcError> {
    let addr = ctx.translator().to_global(image.as_ptr() as usize)?;
    let req = ExtSysBootReq {
        send_boot_addr: addr.0,
        send_boot_arg: boot_arg,
    };
    ctx.send_request(handle, &req, timeout)
}

pub fn shutdown_external_processor<D: MailboxDoorbell, T: AddressTranslator>(
    ctx: &ServicesContext<D, T>,
    handle: ServicesHandle,
    timeout: Duration,
) -> Result<ExtSysShutdownResp, SvcError> {
    ctx.send_request(handle, &ExtSysShutdownReq::default(), timeout)
}
