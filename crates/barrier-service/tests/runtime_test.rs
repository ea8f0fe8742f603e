//! The supervised runtime under paused time.

mod common;

use std::time::Duration;

use barrier_core::{MetadataSource, Position, Schedule};
use barrier_service::{BarrierService, ShutdownReason};
use common::Fixture;
use tokio::time::sleep;
use tokio_test::assert_err;

fn service(fixture: &mut Fixture, source: MetadataSource) -> BarrierService {
    BarrierService::new(
        fixture.barrier.clone(),
        fixture.store_handle(),
        fixture.bus_handle(),
        fixture.queue.take().unwrap(),
        source,
        Schedule::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_heartbeats_follow_schedule() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);

    let reason = service.run_until(sleep(Duration::from_secs(125))).await;
    assert_eq!(reason, ShutdownReason::Requested);

    // Status at 0s, 60s and 120s; metadata only at 0s.
    assert_eq!(
        fixture.bus.messages_on(&fixture.status_topic()).await.len(),
        3
    );
    assert_eq!(
        fixture
            .bus
            .messages_on(&fixture.attribute_topic("firmware"))
            .await
            .len(),
        1
    );
    assert_eq!(fixture.bus.count().await, 12);

    assert!(fixture.bus.is_disconnected());
    assert!(fixture.store.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_metadata_heartbeat_repeats() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);

    service.run_until(sleep(Duration::from_secs(905))).await;

    assert_eq!(
        fixture
            .bus
            .messages_on(&fixture.attribute_topic("name"))
            .await
            .len(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_command_delivered_over_bus() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);
    service.subscribe_commands().await.unwrap();
    assert_eq!(
        fixture.bus.subscriptions().await,
        vec!["barrier/commands/north-gate".to_string()]
    );

    let bus = fixture.bus.clone();
    service
        .run_until(async move {
            sleep(Duration::from_secs(3)).await;
            assert!(bus.deliver("barrier/commands/north-gate", b"open").await);
            sleep(Duration::from_secs(3)).await;
        })
        .await;

    assert_eq!(fixture.barrier.position().await, Position::Opened);
    let status = fixture.bus.messages_on(&fixture.status_topic()).await;
    assert_eq!(status.len(), 2);
    assert_eq!(status[1].json()["position"], "opened");
}

#[tokio::test(start_paused = true)]
async fn test_drift_during_run_republishes() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);

    let store = fixture.store.clone();
    service
        .run_until(async move {
            sleep(Duration::from_secs(3)).await;
            store.update("7", |r| r.firmware = "1.0".to_string()).await;
            sleep(Duration::from_secs(3)).await;
        })
        .await;

    let firmware = fixture
        .bus
        .messages_on(&fixture.attribute_topic("firmware"))
        .await;
    assert_eq!(firmware.len(), 2);
    assert_eq!(firmware[0].text(), "0.9");
    assert_eq!(firmware[1].text(), "1.0");
    assert_eq!(fixture.barrier.info().await.firmware, "1.0");
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_token_stops_service() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);

    let token = service.cancellation_token();
    tokio::spawn(async move {
        sleep(Duration::from_secs(2)).await;
        token.cancel();
    });

    let reason = service.run_until(std::future::pending()).await;
    assert_eq!(reason, ShutdownReason::Requested);
    assert!(fixture.store.is_closed());
}

#[tokio::test]
async fn test_close_after_failed_subscribe_releases_collaborators() {
    let mut fixture = Fixture::new(Position::Closed).await;
    let service = service(&mut fixture, MetadataSource::Entity);

    fixture.bus.set_failing(true);
    assert_err!(service.subscribe_commands().await);

    service.close().await;
    assert!(fixture.bus.is_disconnected());
    assert!(fixture.store.is_closed());
}
