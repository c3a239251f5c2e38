//! Integration tests for durable scheduling: arm, fire, cancel, restore

mod mocks;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use glashatay::core::types::{format_instant, ScheduleEntry, ScheduleStatus, User};
use glashatay::{BroadcastScheduler, Stores};
use mocks::MockSender;

fn user(id: i64) -> User {
    User {
        id,
        first_name: format!("User{id}"),
        username: format!("user{id}"),
        phone: String::new(),
        last_active: String::new(),
    }
}

async fn stores_with_broadcast(dir: &tempfile::TempDir, broadcast_id: &str) -> Arc<Stores> {
    let stores = Arc::new(Stores::open(dir.path()).unwrap());
    stores.users.register_or_touch(user(1)).await.unwrap();
    stores.users.register_or_touch(user(2)).await.unwrap();

    stores.broadcast_drafts.create(broadcast_id).await.unwrap();
    stores
        .broadcast_drafts
        .merge(broadcast_id, |d| d.text = "Запланированный анонс".to_string())
        .await
        .unwrap();
    stores.promote_broadcast(broadcast_id).await.unwrap();
    stores
}

#[tokio::test]
async fn test_scheduled_broadcast_fires_and_marks_done() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let run_at = Utc::now() + chrono::Duration::milliseconds(100);
    let job_id = scheduler.schedule("b1", run_at).await.unwrap();

    let entry = stores.ledger.find_by_job(&job_id).await.unwrap();
    assert_eq!(entry.status, ScheduleStatus::Scheduled);
    assert_eq!(entry.broadcast_id, "b1");

    let mut fired = false;
    for _ in 0..100 {
        if matches!(
            stores.ledger.find_by_job(&job_id).await,
            Some(e) if e.status == ScheduleStatus::Done
        ) {
            fired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(fired, "job never completed");

    // Both registered users got the message, count persisted on the record
    assert_eq!(sender.sent_count().await, 2);
    assert_eq!(stores.broadcasts.get("b1").await.unwrap().delivered, 2);
}

/// A job armed with an already-elapsed run time fires immediately and its
/// timer handle is cleaned out of the map instead of lingering
#[tokio::test]
async fn test_past_due_schedule_leaves_no_stale_timer() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let job_id = scheduler.schedule("b1", Utc::now() - chrono::Duration::seconds(5)).await.unwrap();

    let mut fired = false;
    for _ in 0..100 {
        if matches!(
            stores.ledger.find_by_job(&job_id).await,
            Some(e) if e.status == ScheduleStatus::Done
        ) {
            fired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(fired, "past-due job never fired");
    assert_eq!(sender.sent_count().await, 2);
    assert_eq!(scheduler.armed_count(), 0);
}

#[tokio::test]
async fn test_cancelled_job_never_sends() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let run_at = Utc::now() + chrono::Duration::milliseconds(150);
    let job_id = scheduler.schedule("b1", run_at).await.unwrap();
    scheduler.cancel(&job_id).await.unwrap();

    assert_eq!(
        stores.ledger.find_by_job(&job_id).await.unwrap().status,
        ScheduleStatus::Cancelled
    );

    // Give the (aborted) timer plenty of time to have fired
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sender.sent_count().await, 0);
}

/// A fire for a row no longer marked `scheduled` is a no-op, so a job can
/// never deliver twice
#[tokio::test]
async fn test_fire_is_idempotent() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let job_id = scheduler.schedule("b1", Utc::now() + chrono::Duration::minutes(5)).await.unwrap();

    scheduler.fire(&job_id, "b1").await;
    assert_eq!(sender.sent_count().await, 2);

    scheduler.fire(&job_id, "b1").await;
    assert_eq!(sender.sent_count().await, 2);
}

#[tokio::test]
async fn test_fire_for_deleted_broadcast_is_noop() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let job_id = scheduler.schedule("b1", Utc::now() + chrono::Duration::minutes(5)).await.unwrap();
    stores.broadcasts.remove("b1").await.unwrap();

    scheduler.fire(&job_id, "b1").await;
    assert_eq!(sender.sent_count().await, 0);
    // Row stays scheduled; there was nothing to deliver
    assert_eq!(
        stores.ledger.find_by_job(&job_id).await.unwrap().status,
        ScheduleStatus::Scheduled
    );
}

/// Restart recovery: still-scheduled rows are re-armed (past-due ones fire
/// immediately), finished and malformed rows are left alone
#[tokio::test]
async fn test_restore_rearms_scheduled_rows() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;

    // Simulate rows left behind by a previous process
    stores
        .ledger
        .append(ScheduleEntry {
            job_id: "past-due".to_string(),
            broadcast_id: "b1".to_string(),
            run_at: format_instant(Utc::now() - chrono::Duration::minutes(10)),
            status: ScheduleStatus::Scheduled,
        })
        .await
        .unwrap();
    stores
        .ledger
        .append(ScheduleEntry {
            job_id: "future".to_string(),
            broadcast_id: "b2".to_string(),
            run_at: format_instant(Utc::now() + chrono::Duration::hours(1)),
            status: ScheduleStatus::Scheduled,
        })
        .await
        .unwrap();
    stores
        .ledger
        .append(ScheduleEntry {
            job_id: "corrupt".to_string(),
            broadcast_id: "b1".to_string(),
            run_at: "yesterday-ish".to_string(),
            status: ScheduleStatus::Scheduled,
        })
        .await
        .unwrap();
    stores
        .ledger
        .append(ScheduleEntry {
            job_id: "finished".to_string(),
            broadcast_id: "b1".to_string(),
            run_at: format_instant(Utc::now() - chrono::Duration::hours(2)),
            status: ScheduleStatus::Done,
        })
        .await
        .unwrap();

    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let restored = scheduler.restore_on_startup().await;
    assert_eq!(restored, 2);

    // The past-due job fires right away and flips every scheduled row for
    // the broadcast, which also settles the corrupt one
    let mut fired = false;
    for _ in 0..100 {
        if sender.sent_count().await >= 2 {
            fired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(fired, "past-due job never fired after restore");

    assert_eq!(
        stores.ledger.find_by_job("past-due").await.unwrap().status,
        ScheduleStatus::Done
    );
    assert_eq!(
        stores.ledger.find_by_job("finished").await.unwrap().status,
        ScheduleStatus::Done
    );
    // The re-armed future job is untouched until its own timer fires
    assert_eq!(
        stores.ledger.find_by_job("future").await.unwrap().status,
        ScheduleStatus::Scheduled
    );
}

/// A broadcast pulled back for editing parks its rows; they never fire
/// without an explicit re-schedule
#[tokio::test]
async fn test_editing_parks_job_without_reviving() {
    let dir = tempdir().unwrap();
    let stores = stores_with_broadcast(&dir, "b1").await;
    let sender = MockSender::new();
    let scheduler = BroadcastScheduler::new(Arc::clone(&stores), sender.clone());

    let run_at = Utc::now() + chrono::Duration::milliseconds(150);
    let job_id = scheduler.schedule("b1", run_at).await.unwrap();

    scheduler.mark_editing(&job_id).await.unwrap();
    stores.demote_broadcast("b1").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sender.sent_count().await, 0);
    assert_eq!(
        stores.ledger.find_by_job(&job_id).await.unwrap().status,
        ScheduleStatus::Editing
    );
}
