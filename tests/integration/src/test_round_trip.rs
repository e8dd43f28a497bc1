// Licensed under the Apache-2.0 license

//! Request/response round trips and the transport error taxonomy.

#[cfg(test)]
mod test {
    use log::LevelFilter;
    use se_hw_model::ModelEnclave;
    use se_svc_common::messages::GetVersionReq;
    use se_svc_common::{ServiceId, TransportStatus, TRANSPORT_UNAVAILABLE};
    use se_svc_host::{IdentityTranslator, ServicesContext, SvcError};
    use simple_logger::SimpleLogger;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(250);

    fn setup() -> (ModelEnclave, ServicesContext<ModelEnclave, IdentityTranslator>) {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        (model, ctx)
    }

    #[test]
    fn heartbeat_round_trip_returns_success() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Info).init();
        let (_model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();

        assert_eq!(
            ctx.send_request_raw(handle, ServiceId::HEARTBEAT, TIMEOUT),
            u32::from(TransportStatus::SUCCESS)
        );

        // The next, unrelated call sees an intact buffer.
        let version = ctx
            .send_request(handle, &GetVersionReq::default(), TIMEOUT)
            .unwrap();
        assert_eq!(version.resp_error_code, 0);
        assert_eq!(version.version_str(), "SERAM_1.102.0");
    }

    #[test]
    fn nack_and_dropped_doorbell_surface_distinctly() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();

        model.enqueue_nacks(1);
        assert_eq!(
            ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT),
            Err(SvcError::NotAcknowledged)
        );

        model.enqueue_drops(1);
        assert_eq!(
            ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT),
            Err(SvcError::RequestTimeout)
        );

        // The raw primitive reports the matching wire codes.
        model.enqueue_nacks(1);
        assert_eq!(
            ctx.send_request_raw(handle, ServiceId::HEARTBEAT, TIMEOUT),
            u32::from(TransportStatus::NOT_ACKNOWLEDGED)
        );
        model.enqueue_drops(1);
        assert_eq!(
            ctx.send_request_raw(handle, ServiceId::HEARTBEAT, TIMEOUT),
            u32::from(TransportStatus::TIMEOUT)
        );
    }

    #[test]
    fn unknown_service_id_maps_to_unknown_command() {
        let (_model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        assert_eq!(
            ctx.send_request_raw(handle, ServiceId(0x00EE), TIMEOUT),
            u32::from(TransportStatus::UNKNOWN_COMMAND)
        );
    }

    #[test]
    fn unregistered_handle_reports_transport_unavailable() {
        let (_model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        ctx.unregister_channel(handle);
        assert_eq!(
            ctx.send_request_raw(handle, ServiceId::HEARTBEAT, TIMEOUT),
            TRANSPORT_UNAVAILABLE
        );
        assert_eq!(
            ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT),
            Err(SvcError::TransportUnavailable)
        );
    }

    #[test]
    fn failure_leaves_the_link_usable() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();

        model.enqueue_drops(1);
        assert_eq!(
            ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT),
            Err(SvcError::RequestTimeout)
        );

        // No retry happened behind the caller's back, and the next call goes
        // through cleanly.
        assert_eq!(model.requests_seen(), 1);
        let version = ctx
            .send_request(handle, &GetVersionReq::default(), TIMEOUT)
            .unwrap();
        assert_eq!(version.resp_error_code, 0);
    }
}
