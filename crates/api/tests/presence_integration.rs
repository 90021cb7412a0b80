//! Integration tests for online-status derivation.
//!
//! Drives the presence monitor through the real feed hubs with an
//! in-memory location store, covering the freshness fallback, presence
//! overrides, and change-feed integration.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use domain::models::badge::{BadgeStatus, SurveyorBadge};
use domain::services::presence::PresenceConfig;
use field_tracker_api::feeds::{ChangeFeedHub, PresenceFeedHub};
use field_tracker_api::services::{PresenceMonitor, PresenceMonitorRegistry};

use common::MemoryLocationStore;

struct TestBed {
    registry: PresenceMonitorRegistry,
    presence_feed: PresenceFeedHub,
    change_feed: ChangeFeedHub,
    store: Arc<MemoryLocationStore>,
}

fn test_bed() -> TestBed {
    let store = Arc::new(MemoryLocationStore::default());
    let presence_feed = PresenceFeedHub::new(16);
    let change_feed = ChangeFeedHub::new(16);
    let registry = PresenceMonitorRegistry::new(
        PresenceConfig::default(),
        store.clone(),
        presence_feed.clone(),
        change_feed.clone(),
    );
    TestBed {
        registry,
        presence_feed,
        change_feed,
        store,
    }
}

fn badge(surveyor_id: &str) -> SurveyorBadge {
    SurveyorBadge {
        id: Uuid::new_v4(),
        surveyor_id: surveyor_id.to_string(),
        owner_id: Uuid::new_v4(),
        status: BadgeStatus::Active,
        last_latitude: None,
        last_longitude: None,
        last_location_at: None,
        forms_submitted: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn wait_for_view(
    monitor: &Arc<PresenceMonitor>,
    condition: impl Fn(&domain::models::PresenceView) -> bool,
) {
    for _ in 0..200 {
        if condition(&monitor.view()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("presence view condition not reached in time");
}

#[tokio::test]
async fn fresh_sample_reports_online_without_presence_membership() {
    let bed = test_bed();
    let badge = badge("SRV-100");
    bed.store
        .seed_sample(badge.id, Utc::now() - chrono::Duration::minutes(4));

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-100").await;
    wait_for_view(&monitor, |view| view.is_online).await;

    let view = monitor.view();
    assert_eq!(view.presence_count, 0);
    assert!(view.last_seen.is_some());
    bed.registry.shutdown().await;
}

#[tokio::test]
async fn stale_sample_reports_offline() {
    let bed = test_bed();
    let badge = badge("SRV-101");
    bed.store
        .seed_sample(badge.id, Utc::now() - chrono::Duration::minutes(6));

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-101").await;
    wait_for_view(&monitor, |view| view.last_seen.is_some()).await;

    assert!(!monitor.view().is_online);
    bed.registry.shutdown().await;
}

#[tokio::test]
async fn join_overrides_stale_freshness_check() {
    let bed = test_bed();
    let badge = badge("SRV-102");
    bed.store
        .seed_sample(badge.id, Utc::now() - chrono::Duration::hours(2));

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-102").await;
    wait_for_view(&monitor, |view| view.last_seen.is_some()).await;
    assert!(!monitor.view().is_online);

    let joined_at = Utc::now();
    let _membership = bed.presence_feed.join("SRV-102");
    wait_for_view(&monitor, |view| view.is_online).await;

    let view = monitor.view();
    assert_eq!(view.presence_count, 1);
    // last_seen moved to the join, not the two-hour-old sample.
    assert!(view.last_seen.unwrap() >= joined_at - chrono::Duration::seconds(1));
    bed.registry.shutdown().await;
}

#[tokio::test]
async fn leave_to_zero_goes_offline_but_stamps_last_seen() {
    let bed = test_bed();
    let badge = badge("SRV-103");

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-103").await;
    let membership = bed.presence_feed.join("SRV-103");
    wait_for_view(&monitor, |view| view.is_online).await;

    let left_at = Utc::now();
    drop(membership);
    wait_for_view(&monitor, |view| !view.is_online).await;

    let view = monitor.view();
    assert_eq!(view.presence_count, 0);
    assert!(view.last_seen.unwrap() >= left_at - chrono::Duration::seconds(1));
    bed.registry.shutdown().await;
}

#[tokio::test]
async fn change_feed_insert_forces_online() {
    let bed = test_bed();
    let badge = badge("SRV-104");

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-104").await;
    assert!(!monitor.view().is_online);

    // A sample written by some other device lands in the store and fans
    // out through the change feed.
    let sample = bed.store.seed_sample(badge.id, Utc::now());
    use domain::services::stores::ChangeFeedPublisher;
    bed.change_feed.publish(&sample);

    wait_for_view(&monitor, |view| view.is_online).await;
    assert_eq!(monitor.view().last_seen, Some(sample.recorded_at));
    bed.registry.shutdown().await;
}

#[tokio::test]
async fn membership_count_follows_joins_and_leaves() {
    let bed = test_bed();
    let badge = badge("SRV-105");

    let monitor = bed.registry.get_or_spawn(&badge, "SRV-105").await;
    let first = bed.presence_feed.join("SRV-105");
    let second = bed.presence_feed.join("SRV-105");
    wait_for_view(&monitor, |view| view.presence_count == 2).await;

    drop(first);
    wait_for_view(&monitor, |view| view.presence_count == 1).await;
    // Still online: one member remains.
    assert!(monitor.view().is_online);

    drop(second);
    wait_for_view(&monitor, |view| view.presence_count == 0).await;
    assert!(!monitor.view().is_online);
    bed.registry.shutdown().await;
}
