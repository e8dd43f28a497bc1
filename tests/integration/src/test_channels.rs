// Licensed under the Apache-2.0 license

//! Channel lifecycle and the single-flight discipline.

#[cfg(test)]
mod test {
    use se_hw_model::{ModelEnclave, ModelParams};
    use se_svc_common::messages::GetVersionReq;
    use se_svc_common::{ServiceId, TRANSPORT_UNAVAILABLE};
    use se_svc_host::{IdentityTranslator, ServicesContext};
    use std::sync::Arc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[test]
    fn registered_channels_get_distinct_live_handles() {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let first = ctx.register_channel(0, 0).unwrap();
        let second = ctx.register_channel(0, 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(ctx.send_request_raw(first, ServiceId::HEARTBEAT, TIMEOUT), 0);
        assert_eq!(
            ctx.send_request_raw(second, ServiceId::HEARTBEAT, TIMEOUT),
            0
        );
    }

    #[test]
    fn double_unregister_is_a_no_op() {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let handle = ctx.register_channel(0, 0).unwrap();
        ctx.unregister_channel(handle);
        ctx.unregister_channel(handle);
        assert_eq!(
            ctx.send_request_raw(handle, ServiceId::HEARTBEAT, TIMEOUT),
            TRANSPORT_UNAVAILABLE
        );
    }

    #[test]
    fn one_channel_never_has_two_requests_in_flight() {
        let model = ModelEnclave::with_params(ModelParams {
            response_delay: Some(Duration::from_millis(2)),
            ..Default::default()
        });
        let ctx = Arc::new(ServicesContext::initialize(
            model.clone(),
            IdentityTranslator,
        ));
        let handle = ctx.register_channel(0, 0).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT)
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(model.requests_seen(), 20);
        assert_eq!(model.max_in_flight(), 1);
    }

    #[test]
    fn shared_packet_buffer_serializes_across_channels() {
        // Default model topology: every channel stages through one physical
        // buffer, like the embedded transport.
        let model = ModelEnclave::with_params(ModelParams {
            response_delay: Some(Duration::from_millis(2)),
            ..Default::default()
        });
        let ctx = Arc::new(ServicesContext::initialize(
            model.clone(),
            IdentityTranslator,
        ));
        let first = ctx.register_channel(0, 0).unwrap();
        let second = ctx.register_channel(1, 0).unwrap();

        let workers: Vec<_> = [first, second]
            .into_iter()
            .map(|handle| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        ctx.send_request(handle, &GetVersionReq::default(), TIMEOUT)
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(model.max_in_flight(), 1);
    }

    #[test]
    fn per_channel_buffers_keep_channels_independent() {
        let model = ModelEnclave::with_params(ModelParams {
            per_channel_buffers: true,
            ..Default::default()
        });
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        let first = ctx.register_channel(0, 0).unwrap();
        let second = ctx.register_channel(1, 0).unwrap();
        assert_eq!(ctx.send_request_raw(first, ServiceId::HEARTBEAT, TIMEOUT), 0);
        assert_eq!(
            ctx.send_request_raw(second, ServiceId::HEARTBEAT, TIMEOUT),
            0
        );
        ctx.shutdown();
    }
}
