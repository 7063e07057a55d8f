use provider_framework::{Provider, ProviderError, ProviderState, Teardown};
use provider_sample::lifecycle::{FeedSystem, SampleConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

fn fast_config() -> SampleConfig {
    SampleConfig {
        connect_delay_ms: 5,
        quote_interval_ms: 5,
        ready_timeout_ms: 1_000,
        ..SampleConfig::default()
    }
}

async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Full end-to-end test: shared feeds and connections, teardown when the last user leaves.
#[tokio::test]
async fn test_full_feed_system_integration() {
    let system = FeedSystem::new(fast_config());
    let cancel = CancellationToken::new();

    let first = system.subscribe("feed.example:443", "ACME").unwrap();
    let second = system.subscribe("feed.example:443", "ACME").unwrap();
    let other = system.subscribe("feed.example:443", "INIT").unwrap();

    // Same key shares one feed, and every feed on an endpoint shares one connection
    assert!(Arc::ptr_eq(first.feed(), second.feed()));
    assert!(!Arc::ptr_eq(first.feed(), other.feed()));
    assert!(Arc::ptr_eq(first.feed().connection(), other.feed().connection()));

    system.wait_ready(&first, &cancel).await.unwrap();
    system.wait_ready(&other, &cancel).await.unwrap();
    assert_eq!(first.feed().connection().state(), ProviderState::Ready);

    eventually(|| first.latest().is_some()).await;
    assert_eq!(first.latest().unwrap().symbol, "ACME");

    let status = system.status(&[first, second, other]);
    assert_eq!(status.children.len(), 3);
    assert!(status.message.contains("2 feeds"));
}

#[tokio::test]
async fn closing_subscriptions_tears_down_feed_then_connection() {
    let system = FeedSystem::new(fast_config());
    let cancel = CancellationToken::new();

    let acme = system.subscribe("feed.example:443", "ACME").unwrap();
    let init = system.subscribe("feed.example:443", "INIT").unwrap();
    system.wait_ready(&acme, &cancel).await.unwrap();
    system.wait_ready(&init, &cancel).await.unwrap();

    let acme_feed = acme.feed().clone();
    let connection = acme_feed.connection().clone();

    acme.close();
    let cause = tokio::time::timeout(WAIT, acme_feed.lifecycle().errored())
        .await
        .unwrap();
    assert_eq!(cause.downcast_ref::<Teardown>(), Some(&Teardown::NoRemainingUsers));
    eventually(|| connection.lifecycle().users().count() == 1).await;
    assert_eq!(connection.state(), ProviderState::Ready);

    init.close();
    tokio::time::timeout(WAIT, connection.lifecycle().errored())
        .await
        .unwrap();
    eventually(|| system.connection("feed.example:443").unwrap().is_none()).await;
}

#[tokio::test]
async fn resubscribing_after_teardown_builds_fresh_providers() {
    let system = FeedSystem::new(fast_config());
    let cancel = CancellationToken::new();

    let first = system.subscribe("feed.example:443", "ACME").unwrap();
    system.wait_ready(&first, &cancel).await.unwrap();
    let old_feed = first.feed().clone();
    first.close();

    // No waiting for eviction: a failed entry is replaced on lookup
    let again = system.subscribe("feed.example:443", "ACME").unwrap();
    assert!(!Arc::ptr_eq(&old_feed, again.feed()));
    system.wait_ready(&again, &cancel).await.unwrap();
    assert_eq!(again.feed().state(), ProviderState::Ready);
}

#[tokio::test]
async fn connection_reset_fails_every_feed_on_it() {
    let system = FeedSystem::new(fast_config());
    let cancel = CancellationToken::new();

    let on_main = vec![
        system.subscribe("feed.example:443", "ACME").unwrap(),
        system.subscribe("feed.example:443", "INIT").unwrap(),
    ];
    let on_backup = system.subscribe("backup.example:443", "ACME").unwrap();
    for subscription in on_main.iter().chain([&on_backup]) {
        system.wait_ready(subscription, &cancel).await.unwrap();
    }

    system
        .connection("feed.example:443")
        .unwrap()
        .unwrap()
        .reset();

    let err = tokio::time::timeout(WAIT, system.first_failure(&on_main, &cancel))
        .await
        .unwrap();
    assert!(err.to_string().contains("was reset"));
    for subscription in &on_main {
        tokio::time::timeout(WAIT, subscription.feed().lifecycle().errored())
            .await
            .unwrap();
    }
    assert_eq!(on_backup.feed().state(), ProviderState::Ready);
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_cause() {
    let system = FeedSystem::new(fast_config());
    let subscription = system.subscribe("unreachable.example:443", "ACME").unwrap();

    let err = system
        .wait_ready(&subscription, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Endpoint 'unreachable.example:443' is unreachable"
    );
}

#[tokio::test]
async fn slow_connect_times_out_without_failing_the_feed() {
    let system = FeedSystem::new(SampleConfig {
        connect_delay_ms: 300,
        ready_timeout_ms: 50,
        ..fast_config()
    });
    let impatient = system.subscribe("feed.example:443", "ACME").unwrap();
    let patient = system.subscribe("feed.example:443", "ACME").unwrap();
    assert!(Arc::ptr_eq(impatient.feed(), patient.feed()));

    let err = system
        .wait_ready(&impatient, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(impatient.feed().state(), ProviderState::Loading);

    // The other subscriber still gets its feed once the connection comes up
    tokio::time::timeout(WAIT, patient.feed().lifecycle().ready())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patient.feed().state(), ProviderState::Ready);
}

#[tokio::test]
async fn expiring_unready_feed_fails_it_for_everyone() {
    let system = FeedSystem::new(SampleConfig {
        connect_delay_ms: 10_000,
        ready_timeout_ms: 50,
        ..fast_config()
    });
    let first = system.subscribe("feed.example:443", "ACME").unwrap();
    let second = system.subscribe("feed.example:443", "ACME").unwrap();

    assert!(system
        .wait_ready(&first, &CancellationToken::new())
        .await
        .unwrap_err()
        .is_cancelled());
    assert!(system.expire_unready(&first));
    assert!(!system.expire_unready(&second));

    let cause = tokio::time::timeout(WAIT, second.feed().lifecycle().errored())
        .await
        .unwrap();
    assert_eq!(
        cause.downcast_ref::<Teardown>(),
        Some(&Teardown::ReadyTimeout(Duration::from_millis(50)))
    );
}

#[tokio::test]
async fn expiring_ready_feed_does_nothing() {
    let system = FeedSystem::new(fast_config());
    let subscription = system.subscribe("feed.example:443", "ACME").unwrap();
    system
        .wait_ready(&subscription, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!system.expire_unready(&subscription));
    assert_eq!(subscription.feed().state(), ProviderState::Ready);
}

#[tokio::test]
async fn invalid_symbol_is_a_construction_error() {
    let system = FeedSystem::new(fast_config());
    let err = system.subscribe("feed.example:443", "").unwrap_err();
    assert!(matches!(err, ProviderError::Construction(_)));
    assert!(system.connection("feed.example:443").unwrap().is_none());
}

#[tokio::test]
async fn shutdown_fails_everything() {
    let system = FeedSystem::new(fast_config());
    let subscription = system.subscribe("feed.example:443", "ACME").unwrap();
    let feed = subscription.feed().clone();
    let connection = feed.connection().clone();

    system.shutdown();

    assert_eq!(feed.state(), ProviderState::Error);
    assert_eq!(connection.state(), ProviderState::Error);
    assert_eq!(
        feed.lifecycle().failure().unwrap().to_string(),
        "Provider store disposed"
    );
}
