//! Contract Test: Reconfiguration Idempotency
//!
//! This test verifies that `set` only validates what is new.
//!
//! Constraints verified:
//! - Re-applying the same configuration starts no attempt
//! - Servers already configured keep their state when others are added
//! - At most one attempt runs per server, even across remove and re-add
//! - A result for a server no longer configured is reported but not recorded
//!
//! If this test fails, reconfiguration floods servers with probes or the
//! status disagrees with the configuration.

mod common;

use common::*;
use privdns_core::{Error, PrivateDnsMode, Validation};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn same_configuration_does_not_revalidate() {
    let h = Harness::new();

    h.engine
        .set(NET_ID, MARK, &[SERVER1, SERVER2], "", "")
        .expect("set succeeds");
    h.expect_running(0).await;
    h.expect_status(PrivateDnsMode::Opportunistic).await;
    h.observer.clear_history();

    for _ in 0..3 {
        h.engine
            .set(NET_ID, MARK, &[SERVER2, SERVER1], "", "")
            .expect("set succeeds");
    }
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(h.observer.events().is_empty(), "no new attempt was started");
    assert_eq!(h.prober.probe_count(SERVER1), 1);
    assert_eq!(h.prober.probe_count(SERVER2), 1);
    h.expect_status(PrivateDnsMode::Opportunistic).await;
}

#[tokio::test(start_paused = true)]
async fn only_added_servers_are_validated() {
    let h = Harness::new();

    h.engine
        .set(NET_ID, MARK, &[SERVER1], "", "")
        .expect("set succeeds");
    h.expect_running(0).await;

    h.engine
        .set(NET_ID, MARK, &[SERVER1, SERVER2], "", "")
        .expect("set succeeds");
    h.expect_running(0).await;
    h.expect_status(PrivateDnsMode::Opportunistic).await;

    assert_eq!(h.prober.probe_count(SERVER1), 1);
    assert_eq!(h.prober.probe_count(SERVER2), 1);
    assert_eq!(
        h.observer.history(SERVER1),
        vec![Validation::InProcess, Validation::Success]
    );
    assert_eq!(
        h.observer.history(SERVER2),
        vec![Validation::InProcess, Validation::Success]
    );
}

#[tokio::test(start_paused = true)]
async fn duplicate_addresses_collapse() {
    let h = Harness::new();

    h.engine
        .set(NET_ID, MARK, &[SERVER1, "127.0.2.2:853", SERVER1], "", "")
        .expect("set succeeds");
    h.expect_running(0).await;

    assert_eq!(h.prober.probe_count(SERVER1), 1);
    assert_eq!(h.engine.get_status(NET_ID).servers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_mark_updates_server_without_revalidating() {
    let h = Harness::new();

    h.engine
        .set(NET_ID, MARK, &[SERVER1], "", "")
        .expect("set succeeds");
    h.expect_running(0).await;

    h.engine
        .set(NET_ID, MARK + 1, &[SERVER1], "", "")
        .expect("set succeeds");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.prober.probe_count(SERVER1), 1);
    let server = h
        .engine
        .get_private_dns(&identity(SERVER1), NET_ID)
        .expect("server is configured");
    assert_eq!(server.mark, MARK + 1);
    assert_eq!(
        h.engine.get_status(NET_ID).validation(&identity(SERVER1)),
        Some(Validation::Success)
    );
}

#[tokio::test(start_paused = true)]
async fn validation_block() {
    let h = Harness::new();
    h.prober.block();

    // Server1 is validating; removing and re-adding it does not start another attempt.
    h.engine
        .set(NET_ID, MARK, &[SERVER1], "", "")
        .expect("set succeeds");
    assert!(wait_until(|| h.prober.probe_count(SERVER1) == 1).await);
    h.expect_running(1).await;
    h.expect_status(PrivateDnsMode::Opportunistic).await;

    h.engine
        .set(NET_ID, MARK, &[SERVER2], "", "")
        .expect("set succeeds");
    assert!(wait_until(|| h.prober.probe_count(SERVER2) == 1).await);
    h.expect_running(2).await;

    h.engine
        .set(NET_ID, MARK, &[SERVER1], "", "")
        .expect("set succeeds");
    h.engine
        .set(NET_ID, MARK, &[SERVER1, SERVER2], "", "")
        .expect("set succeeds");
    h.engine
        .set(NET_ID, MARK, &[SERVER2], "", "")
        .expect("set succeeds");

    // A rejected configuration changes nothing.
    let result = h.engine.set(NET_ID, MARK, &["invalid_addr"], "", "");
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    tokio::time::sleep(Duration::from_secs(1)).await;
    h.expect_running(2).await;
    assert_eq!(h.prober.probe_count(SERVER1), 1);
    assert_eq!(h.prober.probe_count(SERVER2), 1);
    assert_eq!(h.observer.history(SERVER1), vec![Validation::InProcess]);
    assert_eq!(h.observer.history(SERVER2), vec![Validation::InProcess]);

    h.prober.release();
    h.expect_running(0).await;

    // Server1's result is reported even though it is no longer configured.
    assert_eq!(
        h.observer.history(SERVER1),
        vec![Validation::InProcess, Validation::Success]
    );
    let status = h.engine.get_status(NET_ID);
    assert_eq!(status.validation(&identity(SERVER1)), None);
    assert_eq!(status.validation(&identity(SERVER2)), Some(Validation::Success));

    h.observer.remove_from_state_map(SERVER1);
    h.expect_status(PrivateDnsMode::Opportunistic).await;
}

#[tokio::test(start_paused = true)]
async fn readded_server_reports_in_process_until_its_attempt_ends() {
    let h = Harness::new();
    h.prober.block();

    h.engine
        .set(NET_ID, MARK, &[SERVER1], "", "")
        .expect("set succeeds");
    assert!(wait_until(|| h.prober.probe_count(SERVER1) == 1).await);

    h.engine
        .set(NET_ID, MARK, &[SERVER2], "", "")
        .expect("set succeeds");
    h.engine
        .set(NET_ID, MARK, &[SERVER1, SERVER2], "", "")
        .expect("set succeeds");

    assert_eq!(
        h.engine.get_status(NET_ID).validation(&identity(SERVER1)),
        Some(Validation::InProcess)
    );

    // The first attempt's result lands on the re-added entry.
    h.prober.release();
    h.expect_running(0).await;
    h.expect_status(PrivateDnsMode::Opportunistic).await;
    assert_eq!(
        h.engine.get_status(NET_ID).validation(&identity(SERVER1)),
        Some(Validation::Success)
    );
    assert_eq!(h.prober.probe_count(SERVER1), 1);
}
