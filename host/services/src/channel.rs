// Licensed under the Apache-2.0 license

//! The channel registry: an explicit map from caller-visible handles to the
//! transport endpoint and packet region behind them.

use crate::doorbell::{EndpointId, PacketRegion};
use std::collections::HashMap;
use std::sync::Arc;

/// Caller-visible binding of one serialized path to the enclave. Returned by
/// `register_channel`; meaningless to any other context instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServicesHandle(u32);

impl ServicesHandle {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ServicesHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "handle{}", self.0)
    }
}

pub(crate) struct ChannelState {
    pub endpoint: EndpointId,
    pub channel: u32,
    pub region: PacketRegion,
}

/// Handle allocation is a counter, never reused within a context; the map is
/// the only connection between a handle and its endpoint.
pub(crate) struct Registry {
    next_handle: u32,
    channels: HashMap<ServicesHandle, Arc<ChannelState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            channels: HashMap::new(),
        }
    }

    pub fn insert(&mut self, state: ChannelState) -> ServicesHandle {
        let handle = ServicesHandle(self.next_handle);
        self.next_handle += 1;
        self.channels.insert(handle, Arc::new(state));
        handle
    }

    pub fn get(&self, handle: ServicesHandle) -> Option<Arc<ChannelState>> {
        self.channels.get(&handle).cloned()
    }

    pub fn remove(&mut self, handle: ServicesHandle) -> Option<Arc<ChannelState>> {
        self.channels.remove(&handle)
    }

    pub fn drain(&mut self) -> Vec<Arc<ChannelState>> {
        self.channels.drain().map(|(_, state)| state).collect()
    }
}
