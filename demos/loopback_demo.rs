//! Drives an [`AuthenticationStateMachine`] through a full happy-path cycle
//! against the in-process [`LoopbackCbsClient`], logging every status
//! transition. Useful for exercising the crate without a real CBS peer.

use std::sync::Arc;

use iothub_cbs_auth::cbs::{CbsCompletion, LoopbackCbsClient};
use iothub_cbs_auth::state_machine::AuthenticationStateMachine;
use iothub_cbs_auth::{AuthConfig, CbsConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AuthConfig::new()
        .with_device_id("demo-device")
        .with_hub_fqdn("demo-hub.azure-devices.net")
        .with_device_key(b"not-a-real-key".to_vec());
    let cbs_config = CbsConfig::new()
        .with_sas_token_lifetime_ms(3_600_000)
        .with_sas_token_refresh_ms(2_700_000)
        .with_cbs_request_timeout_ms(30_000);

    let state_machine = AuthenticationStateMachine::with_defaults(config, cbs_config)
        .expect("demo config is valid");
    let cbs = Arc::new(LoopbackCbsClient::new());

    state_machine
        .start(Some(cbs.clone()), |old, new| {
            tracing::info!(?old, ?new, "status changed");
        })
        .expect("start from None succeeds");

    state_machine.do_work().expect("do_work from Started succeeds");
    assert!(
        cbs.complete_next(CbsCompletion::Ok),
        "do_work should have submitted a put_token"
    );

    tracing::info!(status = ?state_machine.status(), "authenticated");

    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    state_machine
        .stop(move |result| {
            let _ = tx.try_send(result);
        })
        .expect("stop from Authenticated succeeds");
    cbs.complete_next(CbsCompletion::Ok);

    let stop_result = rx.recv().await.expect("on_stop_completed fires");
    tracing::info!(?stop_result, status = ?state_machine.status(), "stopped");
}
