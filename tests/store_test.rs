//! Store integration tests
//!
//! Exercise the conversation and message stores against a real database.
//! These need a running PostgreSQL instance (`DATABASE_URL`, defaulting to a
//! local `tradepost_test` database) and are ignored by default.

mod common;

use assert_matches::assert_matches;
use serial_test::serial;
use uuid::Uuid;

use common::database::TestDatabase;
use tradepost::backend::error::MessagingError;
use tradepost::backend::messaging::{conversations, delivery, messages, notifications};
use tradepost::backend::realtime::RoomRegistry;
use tradepost::shared::event::ServerEvent;

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn get_or_create_is_idempotent_per_triple() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;

    let first = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();
    let second = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn conversation_with_yourself_is_rejected() {
    let db = TestDatabase::new().await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;

    let err = conversations::get_or_create(db.pool(), ad, seller, seller)
        .await
        .unwrap_err();
    assert_matches!(err, MessagingError::Validation { .. });
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn append_order_matches_list_order() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    for text in ["first", "second", "third"] {
        messages::append(db.pool(), &conversation, buyer, text)
            .await
            .unwrap();
    }

    let history = messages::list_for_conversation(db.pool(), conversation.id)
        .await
        .unwrap();
    let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    assert!(history.windows(2).all(|pair| pair[0].seq < pair[1].seq));
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn append_derives_receiver_and_bumps_conversation() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    let message = messages::append(db.pool(), &conversation, buyer, "is this still available?")
        .await
        .unwrap();
    assert_eq!(message.receiver_id, seller);
    assert!(!message.is_read);

    let reloaded = conversations::get_for_participant(db.pool(), conversation.id, buyer)
        .await
        .unwrap()
        .unwrap();
    assert!(reloaded.updated_at > conversation.updated_at);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn empty_message_is_rejected_without_a_row() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    let err = messages::append(db.pool(), &conversation, buyer, "   ")
        .await
        .unwrap_err();
    assert_matches!(err, MessagingError::Validation { .. });

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn outsider_cannot_see_or_write_the_conversation() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let stranger = db.seed_user("stranger").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    // Lookup behaves as if the conversation does not exist.
    let lookup = conversations::get_for_participant(db.pool(), conversation.id, stranger)
        .await
        .unwrap();
    assert!(lookup.is_none());

    // A send from an outsider persists nothing.
    let err = messages::append(db.pool(), &conversation, stranger, "let me in")
        .await
        .unwrap_err();
    assert_matches!(err, MessagingError::Authorization);

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn mark_read_is_idempotent() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    messages::append(db.pool(), &conversation, buyer, "hello")
        .await
        .unwrap();
    messages::append(db.pool(), &conversation, buyer, "anyone there?")
        .await
        .unwrap();

    let first = messages::mark_read(db.pool(), conversation.id, seller)
        .await
        .unwrap();
    assert_eq!(first, 2);

    let second = messages::mark_read(db.pool(), conversation.id, seller)
        .await
        .unwrap();
    assert_eq!(second, 0);

    let history = messages::list_for_conversation(db.pool(), conversation.id)
        .await
        .unwrap();
    assert!(history.iter().all(|m| m.is_read));
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn summary_embeds_counterpart_ad_and_unread_count() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    messages::append(db.pool(), &conversation, buyer, "is this still available?")
        .await
        .unwrap();

    let seller_view = conversations::list_for_user(db.pool(), seller).await.unwrap();
    assert_eq!(seller_view.len(), 1);
    let summary = &seller_view[0];
    assert_eq!(summary.counterpart_name, "buyer");
    assert_eq!(summary.ad_title, "City bike");
    assert_eq!(summary.ad_price_cents, 12_500);
    assert_eq!(summary.unread_count, 1);
    assert_eq!(
        summary.last_message_text.as_deref(),
        Some("is this still available?")
    );
    assert_eq!(summary.last_message_sender, Some(buyer));

    // From the sender's side nothing is unread.
    let buyer_view = conversations::list_for_user(db.pool(), buyer).await.unwrap();
    assert_eq!(buyer_view[0].unread_count, 0);
    assert_eq!(buyer_view[0].counterpart_name, "seller");
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn conversation_list_ordered_by_latest_activity() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad_a = db.seed_ad(seller, "City bike", 12_500).await;
    let ad_b = db.seed_ad(seller, "Desk lamp", 1_900).await;

    let older = conversations::get_or_create(db.pool(), ad_a, buyer, seller)
        .await
        .unwrap();
    let newer = conversations::get_or_create(db.pool(), ad_b, buyer, seller)
        .await
        .unwrap();

    // Activity in the older conversation moves it to the front.
    messages::append(db.pool(), &older, buyer, "still for sale?")
        .await
        .unwrap();

    let listed = conversations::list_for_user(db.pool(), buyer).await.unwrap();
    assert_eq!(listed[0].id, older.id);
    assert_eq!(listed[1].id, newer.id);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn delivery_broadcasts_and_writes_notification() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    let rooms = RoomRegistry::new();
    let mut room_rx = rooms.conversation_sender(conversation.id).subscribe();
    let mut personal_rx = rooms.user_sender(seller).subscribe();

    let sent = delivery::send_message(
        db.pool(),
        &rooms,
        &conversation,
        buyer,
        "is this still available?",
    )
    .await
    .unwrap();

    // Room sees the persisted message, server-assigned id and all.
    let broadcast = room_rx.recv().await.unwrap();
    assert_matches!(broadcast, ServerEvent::NewMessage { message } if message.id == sent.id);

    // Receiver's personal channel gets the badge ping.
    let ping = personal_rx.recv().await.unwrap();
    assert_matches!(
        ping,
        ServerEvent::NewMessageNotification { conversation_id, sender_id, .. }
            if conversation_id == conversation.id && sender_id == buyer
    );

    // Notification row exists for the receiver.
    let unread = notifications::list_unread_for_user(db.pool(), seller)
        .await
        .unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].kind, "message");
    assert_eq!(unread[0].conversation_id, Some(conversation.id));
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn mark_read_pipeline_broadcasts_receipt() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    messages::append(db.pool(), &conversation, buyer, "hello")
        .await
        .unwrap();

    let rooms = RoomRegistry::new();
    let mut room_rx = rooms.conversation_sender(conversation.id).subscribe();

    let flipped = delivery::mark_conversation_read(db.pool(), &rooms, &conversation, seller)
        .await
        .unwrap();
    assert_eq!(flipped, 1);

    let receipt = room_rx.recv().await.unwrap();
    assert_matches!(
        receipt,
        ServerEvent::MessagesRead { conversation_id, read_by }
            if conversation_id == conversation.id && read_by == seller
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn read_flag_never_flips_back() {
    let db = TestDatabase::new().await;
    let buyer = db.seed_user("buyer").await;
    let seller = db.seed_user("seller").await;
    let ad = db.seed_ad(seller, "City bike", 12_500).await;
    let conversation = conversations::get_or_create(db.pool(), ad, buyer, seller)
        .await
        .unwrap();

    messages::append(db.pool(), &conversation, buyer, "hello")
        .await
        .unwrap();
    messages::mark_read(db.pool(), conversation.id, seller)
        .await
        .unwrap();

    // A later append and another mark-read touch nothing already read.
    messages::append(db.pool(), &conversation, seller, "yes, still here")
        .await
        .unwrap();
    messages::mark_read(db.pool(), conversation.id, buyer)
        .await
        .unwrap();

    let history = messages::list_for_conversation(db.pool(), conversation.id)
        .await
        .unwrap();
    assert!(history.iter().all(|m| m.is_read));
}
