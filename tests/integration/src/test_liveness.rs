// Licensed under the Apache-2.0 license

//! Synchronizer retry accounting against healthy, flaky, and dead links.

#[cfg(test)]
mod test {
    use se_hw_model::ModelEnclave;
    use se_svc_host::{IdentityTranslator, ServicesContext, SYNC_RETRY_BOUND};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn setup() -> (ModelEnclave, ServicesContext<ModelEnclave, IdentityTranslator>) {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator);
        (model, ctx)
    }

    #[test]
    fn healthy_link_synchronizes_on_the_first_attempt() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        assert_eq!(ctx.synchronize(handle, TIMEOUT), 1);
        assert_eq!(model.requests_seen(), 1);
    }

    #[test]
    fn two_nacks_then_success_reports_three_attempts() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        model.enqueue_nacks(2);
        assert_eq!(ctx.synchronize(handle, TIMEOUT), 3);
        assert_eq!(model.requests_seen(), 3);
    }

    #[test]
    fn dead_link_consumes_exactly_the_retry_bound_plus_one() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        // Refuse every probe; the synchronizer must stop on its own.
        model.enqueue_nacks(1000);
        let expected = SYNC_RETRY_BOUND as i32 + 1;
        assert_eq!(ctx.synchronize(handle, TIMEOUT), -expected);
        assert_eq!(model.requests_seen(), expected as usize);
    }

    #[test]
    fn recovery_mid_loop_reports_the_attempts_spent() {
        let (model, ctx) = setup();
        let handle = ctx.register_channel(0, 0).unwrap();
        // One swallowed doorbell, one refusal, then the link comes up.
        model.enqueue_drops(1);
        model.enqueue_nacks(1);
        assert_eq!(ctx.synchronize(handle, TIMEOUT), 3);
    }

    #[test]
    fn retry_delay_does_not_change_the_contract() {
        let model = ModelEnclave::new();
        let ctx = ServicesContext::initialize(model.clone(), IdentityTranslator)
            .with_sync_retry_delay(Duration::from_millis(1));
        let handle = ctx.register_channel(0, 0).unwrap();
        model.enqueue_nacks(2);
        assert_eq!(ctx.synchronize(handle, TIMEOUT), 3);
    }
}
