// Licensed under the Apache-2.0 license

//! Translation between host-local addresses and the global addresses the
//! enclave's memory controller dereferences.
//!
//! Any payload field that carries a buffer address (`send_*_addr`) must be
//! populated through a translator, never with a raw host pointer: the enclave
//! runs behind a different view of the memory map, and an untranslated
//! address is dereferenced against the wrong bytes. Translation failure is a
//! checked error surfaced before anything is written to the packet buffer.

use thiserror::Error;

/// A 32-bit address in the enclave's view of the memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalAddress(pub u32);

impl core::fmt::Display for GlobalAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("address {addr:#x} is outside the translatable window")]
    OutsideWindow { addr: usize },
    #[error("address {addr:#x} does not fit the 32-bit global address space")]
    Unrepresentable { addr: usize },
}

/// Converts a host-local address into the enclave-visible global address for
/// the same byte. Implementations are pure: the same local address always
/// yields the same global address.
pub trait AddressTranslator: Send + Sync {
    fn to_global(&self, local: usize) -> Result<GlobalAddress, TranslateError>;
}

/// Flat memory map: local and global addresses coincide. Used on embedded
/// targets where the host core and the enclave share one bus view.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

impl AddressTranslator for IdentityTranslator {
    fn to_global(&self, local: usize) -> Result<GlobalAddress, TranslateError> {
        u32::try_from(local)
            .map(GlobalAddress)
            .map_err(|_| TranslateError::Unrepresentable { addr: local })
    }
}

/// Window translation: a contiguous host region maps onto a bus region at a
/// fixed offset. Addresses outside the window are not reachable by the
/// enclave and fail translation.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTranslator {
    host_base: usize,
    window_len: usize,
    bus_base: u32,
}

impl OffsetTranslator {
    pub fn new(host_base: usize, window_len: usize, bus_base: u32) -> Self {
        Self {
            host_base,
            window_len,
            bus_base,
        }
    }
}

impl AddressTranslator for OffsetTranslator {
    fn to_global(&self, local: usize) -> Result<GlobalAddress, TranslateError> {
        let offset = local
            .checked_sub(self.host_base)
            .filter(|off| *off < self.window_len)
            .ok_or(TranslateError::OutsideWindow { addr: local })?;
        u32::try_from(offset)
            .ok()
            .and_then(|off| self.bus_base.checked_add(off))
            .map(GlobalAddress)
            .ok_or(TranslateError::Unrepresentable { addr: local })
    }
}
