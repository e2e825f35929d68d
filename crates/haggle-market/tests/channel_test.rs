mod common;

use chrono::Duration;
use common::{drain, market, new_chat, BUYER, ITEM, SELLER};
use futures::StreamExt;
use haggle_market::{MarketError, MessageDraft, IMAGE_MESSAGE_CONTENT};
use haggle_persist::StoreOp;
use haggle_types::{Clock, MarketEvent, Message, MessageKind, MessageStatus};

#[tokio::test]
async fn test_observe_yields_messages_sorted_by_timestamp() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let base = m.clock.now();

    // Written out of order on purpose
    for (offset, text) in [(30, "third"), (10, "first"), (20, "second")] {
        let message = Message::new(
            &chat_id,
            SELLER,
            "Sam",
            text,
            MessageKind::Text,
            base + Duration::seconds(offset),
        );
        m.store.insert_message_unchecked(message).await;
    }

    let mut feed = m.channel.observe(&chat_id).await.unwrap();
    let snapshot = feed.next().await.unwrap().unwrap();
    let contents: Vec<&str> = snapshot.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Hi! I'm interested in your Calculus Textbook.", "first", "second", "third"]
    );

    m.store
        .insert_message_unchecked(Message::new(
            &chat_id,
            BUYER,
            "Bea",
            "zeroth",
            MessageKind::Text,
            base + Duration::seconds(5),
        ))
        .await;
    let snapshot = feed.next().await.unwrap().unwrap();
    assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(snapshot[1].content, "zeroth");
}

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.channel
        .send_text(&chat_id, BUYER, "Bea", "Still available?")
        .await
        .unwrap();
    m.channel
        .send_text(&chat_id, SELLER, "Sam", "Yes!")
        .await
        .unwrap();

    assert_eq!(m.channel.mark_read(&chat_id, SELLER).await.unwrap(), 2);
    assert_eq!(m.channel.mark_read(&chat_id, SELLER).await.unwrap(), 0);

    let messages = m.channel.messages(&chat_id).await.unwrap();
    for message in &messages {
        let expected = if message.sender_id == BUYER {
            MessageStatus::Read
        } else {
            MessageStatus::Sent
        };
        assert_eq!(message.status, expected);
    }
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.unread.seller, 0);
    assert_eq!(chat.unread.buyer, 1);
}

#[tokio::test]
async fn test_mark_read_rejects_outsiders() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    assert!(matches!(
        m.channel.mark_read(&chat_id, "stranger").await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        m.channel.mark_read("missing", SELLER).await,
        Err(MarketError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_send_updates_summary_after_message() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.clock.advance(Duration::minutes(1));

    let sent = m
        .channel
        .send_text(&chat_id, SELLER, "Sam", "Sure, I'm on campus")
        .await
        .unwrap();

    assert_eq!(sent.status, MessageStatus::Sent);
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "Sure, I'm on campus");
    assert_eq!(chat.last_message_timestamp, sent.timestamp);
    assert_eq!(chat.last_message_sender_id, SELLER);
    assert_eq!(chat.unread.buyer, 1);
}

#[tokio::test]
async fn test_summary_failure_surfaces_but_message_is_kept() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.store.inject_fault(StoreOp::UpdateChat);

    let result = m.channel.send_text(&chat_id, SELLER, "Sam", "Hello").await;

    assert!(matches!(result, Err(MarketError::Network(_))));
    assert_eq!(m.store.message_count(&chat_id).await, 2);
}

#[tokio::test]
async fn test_unread_increment_is_best_effort() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.store.inject_fault(StoreOp::IncrementUnread);

    m.channel
        .send_text(&chat_id, SELLER, "Sam", "Hello")
        .await
        .unwrap();

    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "Hello");
    assert_eq!(chat.unread.buyer, 0);
}

#[tokio::test]
async fn test_send_validation() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    assert!(matches!(
        m.channel.send_text(&chat_id, "stranger", "X", "hi").await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        m.channel.send_text("missing", BUYER, "Bea", "hi").await,
        Err(MarketError::NotFound { .. })
    ));
    assert!(matches!(
        m.channel.send_text(&chat_id, BUYER, "Bea", "   ").await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        m.channel
            .send(&chat_id, MessageDraft::offer(BUYER, "Bea", 0.0, None))
            .await,
        Err(MarketError::Validation(_))
    ));
    assert_eq!(m.store.message_count(&chat_id).await, 1);
}

#[tokio::test]
async fn test_message_variants() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    let image = m
        .channel
        .send_image(&chat_id, SELLER, "Sam", "uploads/book.jpg")
        .await
        .unwrap();
    assert_eq!(image.content, IMAGE_MESSAGE_CONTENT);
    assert_eq!(image.image_ref.as_deref(), Some("uploads/book.jpg"));

    let offer = m
        .channel
        .send_offer_message(&chat_id, BUYER, "Bea", 75.5, None)
        .await
        .unwrap();
    assert_eq!(offer.content, "Made an offer of $75.50");
    assert!(offer.is_offer());

    let system = m.channel.send_system(&chat_id, "Offer expired").await.unwrap();
    assert_eq!(system.kind, MessageKind::System);

    // System notices do not count as unread for either side
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.unread.buyer, 1);
    assert_eq!(chat.unread.seller, 2);
}

#[tokio::test]
async fn test_mark_delivered_never_downgrades_read() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.channel.mark_read(&chat_id, SELLER).await.unwrap();
    m.channel
        .send_text(&chat_id, BUYER, "Bea", "Following up")
        .await
        .unwrap();

    assert_eq!(m.channel.mark_delivered(&chat_id, SELLER).await.unwrap(), 1);

    let statuses: Vec<MessageStatus> = m
        .channel
        .messages(&chat_id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.status)
        .collect();
    assert_eq!(statuses, vec![MessageStatus::Read, MessageStatus::Delivered]);
}

#[tokio::test]
async fn test_mark_delivered_failure_is_absorbed() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.store.inject_fault(StoreOp::MarkDelivered);

    assert_eq!(m.channel.mark_delivered(&chat_id, SELLER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_by_sender_refreshes_preview() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.clock.advance(Duration::seconds(10));
    let sent = m
        .channel
        .send_text(&chat_id, SELLER, "Sam", "Pick up at 5")
        .await
        .unwrap();
    m.clock.advance(Duration::seconds(10));

    let edited = m
        .channel
        .edit(&chat_id, &sent.id, SELLER, "Pick up at 6")
        .await
        .unwrap();

    assert!(edited.is_edited);
    assert!(edited.edited_at.is_some());
    assert_eq!(edited.timestamp, sent.timestamp);
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "Pick up at 6");
}

#[tokio::test]
async fn test_edit_of_older_message_keeps_preview() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let seed = m.channel.messages(&chat_id).await.unwrap().remove(0);
    m.clock.advance(Duration::seconds(10));
    m.channel
        .send_text(&chat_id, SELLER, "Sam", "Yes it is")
        .await
        .unwrap();

    m.channel
        .edit(&chat_id, &seed.id, BUYER, "Hi! Is the textbook still available?")
        .await
        .unwrap();

    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "Yes it is");
}

#[tokio::test]
async fn test_edit_of_earlier_message_with_same_timestamp_keeps_preview() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.clock.advance(Duration::seconds(10));
    let first = m
        .channel
        .send_text(&chat_id, BUYER, "Bea", "first")
        .await
        .unwrap();
    let second = m
        .channel
        .send_text(&chat_id, BUYER, "Bea", "second")
        .await
        .unwrap();
    assert_eq!(first.timestamp, second.timestamp);
    assert!(first.seq < second.seq);

    let edited = m
        .channel
        .edit(&chat_id, &first.id, BUYER, "first, edited")
        .await
        .unwrap();

    assert!(edited.is_edited);
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "second");
    assert_eq!(chat.last_message_id.as_deref(), Some(second.id.as_str()));

    m.channel
        .edit(&chat_id, &second.id, BUYER, "second, edited")
        .await
        .unwrap();
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.last_message_preview, "second, edited");
}

#[tokio::test]
async fn test_edit_rules() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let seed = m.channel.messages(&chat_id).await.unwrap().remove(0);
    let offer = m
        .channel
        .send_offer_message(&chat_id, BUYER, "Bea", 50.0, None)
        .await
        .unwrap();

    assert!(matches!(
        m.channel.edit(&chat_id, &seed.id, SELLER, "hijack").await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        m.channel.edit(&chat_id, &offer.id, BUYER, "$5").await,
        Err(MarketError::InvalidState(_))
    ));
    assert!(matches!(
        m.channel.edit(&chat_id, "missing", BUYER, "text").await,
        Err(MarketError::NotFound { kind: "Message", .. })
    ));
}

#[tokio::test]
async fn test_send_publishes_new_message_event() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let mut events = m.events.subscribe();

    let sent = m
        .channel
        .send_text(&chat_id, SELLER, "Sam", "Deal")
        .await
        .unwrap();
    m.channel.mark_read(&chat_id, BUYER).await.unwrap();

    let seen = drain(&mut events);
    assert_eq!(
        seen[0],
        MarketEvent::NewMessage {
            chat_id: chat_id.clone(),
            message_id: sent.id,
            sender_id: SELLER.to_string(),
            recipient_id: BUYER.to_string(),
            preview: "Deal".to_string(),
        }
    );
    assert_eq!(
        seen[1],
        MarketEvent::MessagesRead {
            chat_id,
            reader_id: BUYER.to_string(),
            count: 1,
        }
    );
}
