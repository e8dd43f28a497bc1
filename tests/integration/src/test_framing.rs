// Licensed under the Apache-2.0 license

//! Byte-exact framing through the shared packet buffer.

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use se_hw_model::ModelEnclave;
    use se_svc_common::{Request, Response, ServiceId, SERVICE_HEADER_SIZE};
    use se_svc_host::{IdentityTranslator, ServicesContext};
    use std::time::Duration;
    use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

    const TIMEOUT: Duration = Duration::from_millis(250);

    // A service the enclave model echoes verbatim: request and response
    // share one layout, so the read-back must reproduce every staged byte.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
    struct EchoReq {
        send_pattern: [u8; 64],
        send_mark: u32,
    }
    impl Request for EchoReq {
        const ID: ServiceId = ServiceId(0x00EE);
        type Resp = EchoResp;
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, IntoBytes, FromBytes, Immutable, KnownLayout, PartialEq, Eq)]
    struct EchoResp {
        resp_pattern: [u8; 64],
        resp_mark: u32,
    }
    impl Response for EchoResp {}

    #[test]
    fn echoed_payload_reads_back_byte_for_byte() {
        let model = ModelEnclave::new();
        model.set_echo(true);
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let handle = ctx.register_channel(0, 0).unwrap();

        let mut rng = StdRng::seed_from_u64(0x5e5e_0001);
        let mut pattern = [0u8; 64];
        rng.fill(&mut pattern[..]);
        let req = EchoReq {
            send_pattern: pattern,
            send_mark: rng.gen(),
        };

        let resp = ctx.send_request(handle, &req, TIMEOUT).unwrap();
        assert_eq!(resp.as_bytes(), req.as_bytes());
        assert_eq!(resp.resp_pattern, req.send_pattern);
        assert_eq!(resp.resp_mark, req.send_mark);
    }

    #[test]
    fn staged_frame_has_the_wire_layout() {
        let model = ModelEnclave::new();
        model.set_echo(true);
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let handle = ctx.register_channel(0, 0).unwrap();

        let req = EchoReq {
            send_pattern: [0xA5; 64],
            send_mark: 0x1122_3344,
        };
        ctx.send_request(handle, &req, TIMEOUT).unwrap();

        let frame = model.last_request().unwrap();
        // Header: service id, cleared flags, cleared status, padding.
        assert_eq!(u16::from_le_bytes([frame[0], frame[1]]), 0x00EE);
        assert_eq!(u16::from_le_bytes([frame[2], frame[3]]), 0);
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 0);
        assert_eq!(u16::from_le_bytes([frame[6], frame[7]]), 0);
        // Payload starts right behind the header.
        let payload = &frame[SERVICE_HEADER_SIZE..SERVICE_HEADER_SIZE + size_of::<EchoReq>()];
        assert_eq!(payload, req.as_bytes());
    }
}
