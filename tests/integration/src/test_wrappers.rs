// Licensed under the Apache-2.0 license

//! Service wrappers, including the translated-address contract for buffer
//! arguments.

#[cfg(test)]
mod test {
    use se_hw_model::ModelEnclave;
    use se_svc_common::messages::{GetRandomReq, SetRunProfileReq, StoreImageReq};
    use se_svc_common::SERVICE_HEADER_SIZE;
    use se_svc_host::{
        wrappers, IdentityTranslator, OffsetTranslator, ServicesContext, SvcError,
    };
    use std::time::Duration;
    use zerocopy::FromBytes;

    const TIMEOUT: Duration = Duration::from_millis(250);

    #[test]
    fn version_and_device_data_wrappers_decode() {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let handle = ctx.register_channel(0, 0).unwrap();

        wrappers::heartbeat(&ctx, handle, TIMEOUT).unwrap();
        let version = wrappers::get_version(&ctx, handle, TIMEOUT).unwrap();
        assert_eq!(version.version_str(), "SERAM_1.102.0");
        let device = wrappers::get_device_data(&ctx, handle, TIMEOUT).unwrap();
        assert_eq!(device.resp_error_code, 0);
        assert_eq!(device.resp_part_number, 0x7150);
        assert_eq!(&device.resp_revision_id[..2], b"B2");
    }

    #[test]
    fn run_profile_round_trips_through_the_enclave() {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let handle = ctx.register_channel(0, 0).unwrap();

        let profile = SetRunProfileReq {
            send_power_domains: 0x0000_0013,
            send_memory_blocks: 0x0000_00f0,
            send_ip_clock_gating: 1,
            send_vdd_ioflex_3v3: 0,
        };
        let set = wrappers::set_run_profile(&ctx, handle, &profile, TIMEOUT).unwrap();
        assert_eq!(set.resp_error_code, 0);

        let got = wrappers::get_run_profile(&ctx, handle, TIMEOUT).unwrap();
        assert_eq!(got.resp_power_domains, profile.send_power_domains);
        assert_eq!(got.resp_memory_blocks, profile.send_memory_blocks);
        assert_eq!(got.resp_ip_clock_gating, profile.send_ip_clock_gating);
        assert_eq!(got.resp_vdd_ioflex_3v3, profile.send_vdd_ioflex_3v3);
    }

    #[test]
    fn buffer_arguments_carry_translated_addresses() {
        let mut out = vec![0u8; 32];
        let window_base = out.as_ptr() as usize;
        let model = ModelEnclave::new();
        let translator = OffsetTranslator::new(window_base, out.len(), 0x2000_0000);
        let ctx = ServicesContext::initialize(model.clone(), translator);
        let handle = ctx.register_channel(0, 0).unwrap();

        wrappers::get_random(&ctx, handle, &mut out, TIMEOUT).unwrap();

        let frame = model.last_request().unwrap();
        let (req, _) = GetRandomReq::read_from_prefix(&frame[SERVICE_HEADER_SIZE..]).unwrap();
        // The wire carries the bus-side view of the buffer, not the host
        // pointer.
        assert_eq!(req.send_buffer_addr, 0x2000_0000);
        assert_eq!(req.send_length, 32);
    }

    #[test]
    fn untranslatable_buffer_fails_before_the_wire() {
        let inside = vec![0u8; 16];
        let outside = vec![0u8; 16];
        let model = ModelEnclave::new();
        let translator = OffsetTranslator::new(inside.as_ptr() as usize, inside.len(), 0x2000_0000);
        let ctx = ServicesContext::initialize(model.clone(), translator);
        let handle = ctx.register_channel(0, 0).unwrap();

        let image = &outside[..];
        let err = wrappers::store_image(&ctx, handle, image, 1, TIMEOUT).unwrap_err();
        assert!(matches!(err, SvcError::Translate(_)));
        // Nothing reached the transport.
        assert_eq!(model.requests_seen(), 0);
    }

    #[test]
    fn store_image_stages_address_and_size() {
        let image = vec![0x5a_u8; 256];
        let model = ModelEnclave::new();
        let translator = OffsetTranslator::new(image.as_ptr() as usize, image.len(), 0x8200_0000);
        let ctx = ServicesContext::initialize(model.clone(), translator);
        let handle = ctx.register_channel(0, 0).unwrap();

        wrappers::store_image(&ctx, handle, &image, 2, TIMEOUT).unwrap();

        let frame = model.last_request().unwrap();
        let (req, _) = StoreImageReq::read_from_prefix(&frame[SERVICE_HEADER_SIZE..]).unwrap();
        assert_eq!(req.send_image_addr, 0x8200_0000);
        assert_eq!(req.send_image_size, 256);
        assert_eq!(req.send_destination_id, 2);
    }
}
