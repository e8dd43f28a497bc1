// Licensed under the Apache-2.0 license

//! In-process model of the secure-enclave firmware for tests.
//!
//! The model implements the doorbell transport against the shared packet
//! region: a ring decodes the request in place, writes the response over the
//! same bytes, and posts the doorbell-ack the engine's wait picks up.
//! Scripted faults (leading NACK runs, dropped doorbells) and request
//! capture make the protocol's failure paths and framing observable to
//! tests.

mod model_enclave;

pub use model_enclave::ModelEnclave;

use std::time::Duration;

/// Behavior knobs for [`ModelEnclave`].
pub struct ModelParams {
    /// Hand every opened channel its own packet region instead of the single
    /// shared one. The shared default mirrors the embedded transport, where
    /// all channels stage through one physical buffer.
    pub per_channel_buffers: bool,
    /// Firmware version string reported by the version service.
    pub version: String,
    /// Artificial service time per request, to widen race windows in
    /// concurrency tests.
    pub response_delay: Option<Duration>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            per_channel_buffers: false,
            version: "SERAM_1.102.0".to_string(),
            response_delay: None,
        }
    }
}
