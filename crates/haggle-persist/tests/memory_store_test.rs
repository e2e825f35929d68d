use chrono::{Duration, Utc};
use futures::StreamExt;
use haggle_persist::{ChatPatch, MarketStore, MemoryStore};
use haggle_types::{Chat, Message, MessageKind, MessageStatus, NewChat, ParticipantRole};

fn listing(item_id: &str, buyer_id: &str) -> NewChat {
    NewChat {
        item_id: item_id.to_string(),
        item_title: "Calculus Textbook".to_string(),
        item_price: 80.0,
        buyer_id: buyer_id.to_string(),
        buyer_name: "Riley".to_string(),
        seller_id: "seller".to_string(),
        seller_name: "Morgan".to_string(),
        item_image_ref: None,
    }
}

#[tokio::test]
async fn test_chats_listed_newest_first_for_either_role() {
    let store = MemoryStore::new();
    let now = Utc::now();

    store.insert_chat_if_absent(Chat::new("old", listing("i1", "b1"), now)).await.unwrap();
    store.insert_chat_if_absent(Chat::new("new", listing("i2", "b2"), now)).await.unwrap();
    let at = now + Duration::minutes(1);
    let hello = store
        .insert_message(Message::new("new", "b2", "Riley", "hi", MessageKind::Text, at))
        .await
        .unwrap();
    store.update_chat("new", ChatPatch::last_message("hi", &hello)).await.unwrap();

    let seller_view: Vec<_> = store
        .list_chats_for("seller")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(seller_view, vec!["new", "old"]);

    let buyer_view = store.list_chats_for("b1").await.unwrap();
    assert_eq!(buyer_view.len(), 1);
    assert_eq!(buyer_view[0].id, "old");
}

#[tokio::test]
async fn test_mark_read_skips_own_messages_and_is_idempotent() {
    let store = MemoryStore::new();
    let now = Utc::now();

    for (sender, content) in [("b", "hello"), ("s", "hey"), ("b", "still there?")] {
        store
            .insert_message(Message::new("chat", sender, sender, content, MessageKind::Text, now))
            .await
            .unwrap();
    }

    assert_eq!(store.mark_read("chat", "s").await.unwrap(), 2);
    assert_eq!(store.mark_read("chat", "s").await.unwrap(), 0);

    let statuses: Vec<_> = store
        .get_messages("chat")
        .await
        .unwrap()
        .into_iter()
        .map(|m| (m.sender_id, m.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("b".to_string(), MessageStatus::Read),
            ("s".to_string(), MessageStatus::Sent),
            ("b".to_string(), MessageStatus::Read),
        ]
    );
}

#[tokio::test]
async fn test_delivered_never_downgrades_read() {
    let store = MemoryStore::new();
    store
        .insert_message(Message::new("chat", "b", "B", "hello", MessageKind::Text, Utc::now()))
        .await
        .unwrap();

    store.mark_read("chat", "s").await.unwrap();
    assert_eq!(store.mark_delivered("chat", "s").await.unwrap(), 0);
    assert_eq!(store.get_messages("chat").await.unwrap()[0].status, MessageStatus::Read);
}

#[tokio::test]
async fn test_unread_counters_are_per_role() {
    let store = MemoryStore::new();
    store
        .insert_chat_if_absent(Chat::new("c", listing("i", "b"), Utc::now()))
        .await
        .unwrap();

    store.increment_unread("c", ParticipantRole::Seller).await.unwrap();
    store.increment_unread("c", ParticipantRole::Seller).await.unwrap();
    store.increment_unread("c", ParticipantRole::Buyer).await.unwrap();
    store.reset_unread("c", ParticipantRole::Seller).await.unwrap();

    let chat = store.get_chat("c").await.unwrap().unwrap();
    assert_eq!(chat.unread.seller, 0);
    assert_eq!(chat.unread.buyer, 1);
}

#[tokio::test]
async fn test_delete_cascades_messages_and_notifies_feed() {
    let store = MemoryStore::new();
    store
        .insert_chat_if_absent(Chat::new("c", listing("i", "b"), Utc::now()))
        .await
        .unwrap();
    store
        .insert_message(Message::new("c", "b", "B", "hello", MessageKind::Text, Utc::now()))
        .await
        .unwrap();

    let mut feed = store.subscribe_messages("c").await.unwrap();
    assert_eq!(feed.next().await.unwrap().unwrap().len(), 1);

    assert!(store.delete_chat_cascade("c").await.unwrap());
    assert!(feed.next().await.unwrap().unwrap().is_empty());
    assert!(store.get_chat("c").await.unwrap().is_none());
    assert!(!store.delete_chat_cascade("c").await.unwrap());
}

#[tokio::test]
async fn test_chat_feed_follows_participant() {
    let store = MemoryStore::new();
    let mut feed = store.subscribe_chats("seller").await.unwrap();
    assert!(feed.next().await.unwrap().unwrap().is_empty());

    store
        .insert_chat_if_absent(Chat::new("c", listing("i", "b"), Utc::now()))
        .await
        .unwrap();

    let chats = feed.next().await.unwrap().unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].id, "c");
}
