//! Integration tests for the draft lifecycle and broadcast dispatch

mod mocks;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use glashatay::core::types::{Attachment, MediaKind, User};
use glashatay::core::AppError;
use glashatay::dispatch::{compose_body, run_broadcast};
use glashatay::Stores;
use mocks::MockSender;

fn user(id: i64, username: &str) -> User {
    User {
        id,
        first_name: format!("User{id}"),
        username: username.to_string(),
        phone: String::new(),
        last_active: String::new(),
    }
}

/// An item lives in exactly one table at every lifecycle stage
#[tokio::test]
async fn test_draft_moves_between_tables_without_duplicates() {
    let dir = tempdir().unwrap();
    let stores = Stores::open(dir.path()).unwrap();

    stores.broadcast_drafts.create("b1").await.unwrap();
    stores
        .broadcast_drafts
        .merge("b1", |d| {
            d.text = "Новый курс стартует!".to_string();
            d.link = "https://example.com/course".to_string();
        })
        .await
        .unwrap();

    // Draft -> saved
    stores.promote_broadcast("b1").await.unwrap();
    assert!(stores.broadcast_drafts.get("b1").await.is_none());
    let saved = stores.broadcasts.get("b1").await.unwrap();
    assert_eq!(saved.text, "Новый курс стартует!");

    // Saved -> draft again (editing), fields intact
    let reopened = stores.demote_broadcast("b1").await.unwrap();
    assert_eq!(reopened.link, "https://example.com/course");
    assert!(stores.broadcasts.get("b1").await.is_none());
    assert!(stores.broadcast_drafts.get("b1").await.is_some());
}

/// One failing recipient never blocks the rest, and the persisted
/// delivered count reflects only successful sends
#[tokio::test]
async fn test_dispatch_isolates_recipient_failures() {
    let dir = tempdir().unwrap();
    let stores = Stores::open(dir.path()).unwrap();

    for (id, name) in [(10, "a"), (20, "b"), (30, "c")] {
        stores.users.register_or_touch(user(id, name)).await.unwrap();
    }

    stores.broadcast_drafts.create("b1").await.unwrap();
    stores
        .broadcast_drafts
        .merge("b1", |d| d.text = "Привет!".to_string())
        .await
        .unwrap();
    stores.promote_broadcast("b1").await.unwrap();

    let sender = MockSender::new();
    sender.fail_for(20).await;

    let delivered = run_broadcast(&stores, sender.as_ref(), "b1").await.unwrap();
    assert_eq!(delivered, 2);

    let mut reached = sender.recipients().await;
    reached.sort_unstable();
    assert_eq!(reached, vec![10, 30]);

    assert_eq!(stores.broadcasts.get("b1").await.unwrap().delivered, 2);
}

/// Attachment and link both ride along with the body
#[tokio::test]
async fn test_dispatch_carries_attachment_and_link() {
    let dir = tempdir().unwrap();
    let stores = Stores::open(dir.path()).unwrap();

    stores.users.register_or_touch(user(1, "solo")).await.unwrap();

    stores.broadcast_drafts.create("b1").await.unwrap();
    stores
        .broadcast_drafts
        .merge("b1", |d| {
            d.text = "Смотрите видео".to_string();
            d.link = "https://example.com".to_string();
            d.attachment = Some(Attachment {
                kind: MediaKind::Video,
                file_id: "vid-1".to_string(),
            });
        })
        .await
        .unwrap();
    let record = stores.promote_broadcast("b1").await.unwrap();

    let sender = MockSender::new();
    run_broadcast(&stores, sender.as_ref(), "b1").await.unwrap();

    let sent = sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, compose_body(&record));
    assert!(sent[0].text.contains("https://example.com"));
    assert_eq!(sent[0].attachment_kind, Some(MediaKind::Video));
}

#[tokio::test]
async fn test_dispatch_missing_broadcast_is_not_found() {
    let dir = tempdir().unwrap();
    let stores = Stores::open(dir.path()).unwrap();

    let sender = MockSender::new();
    let err = run_broadcast(&stores, sender.as_ref(), "ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(sender.sent_count().await, 0);
}

/// Publishing a scenario moves it under its code; re-using the code
/// overwrites the previous content
#[tokio::test]
async fn test_scenario_publish_and_code_reuse() {
    let dir = tempdir().unwrap();
    let stores = Stores::open(dir.path()).unwrap();

    stores.scenario_drafts.create("s1").await.unwrap();
    stores
        .scenario_drafts
        .merge("s1", |d| d.text = "Материалы первого потока".to_string())
        .await
        .unwrap();
    stores.publish_scenario("s1", "start2026").await.unwrap();

    assert!(stores.scenario_drafts.get("s1").await.is_none());
    assert_eq!(
        stores.scenarios.get("start2026").await.unwrap().text,
        "Материалы первого потока"
    );

    // Same code again wins over the old bundle
    stores.scenario_drafts.create("s2").await.unwrap();
    stores
        .scenario_drafts
        .merge("s2", |d| d.text = "Обновлённые материалы".to_string())
        .await
        .unwrap();
    stores.publish_scenario("s2", "start2026").await.unwrap();

    assert_eq!(stores.scenarios.all().await.len(), 1);
    assert_eq!(
        stores.scenarios.get("start2026").await.unwrap().text,
        "Обновлённые материалы"
    );
}

/// Stores survive a reopen from the same directory
#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();

    {
        let stores = Stores::open(dir.path()).unwrap();
        stores.users.register_or_touch(user(7, "persist")).await.unwrap();
        stores.broadcast_drafts.create("b1").await.unwrap();
        stores
            .broadcast_drafts
            .merge("b1", |d| d.text = "до рестарта".to_string())
            .await
            .unwrap();
    }

    let reopened = Stores::open(dir.path()).unwrap();
    assert_eq!(reopened.users.count().await, 1);
    assert_eq!(reopened.broadcast_drafts.get("b1").await.unwrap().text, "до рестарта");
}
