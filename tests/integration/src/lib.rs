// Licensed under the Apache-2.0 license

//! End-to-end tests of the services transport against the emulated enclave.

mod test_channels;
mod test_framing;
mod test_liveness;
mod test_round_trip;
mod test_wrappers;
