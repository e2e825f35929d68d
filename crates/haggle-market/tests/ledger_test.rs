mod common;

use std::time::Duration as StdDuration;

use chrono::Duration;
use common::{drain, market, market_with, new_chat, offer_request, BUYER, ITEM, SELLER};
use haggle_market::{
    is_expired, LedgerConfig, MarketError, OfferResponse, SecondaryWrite, WritePolicy,
};
use haggle_persist::StoreOp;
use haggle_types::{Clock, MarketEvent, MessageKind, OfferStatus};

#[tokio::test]
async fn test_create_offer_updates_chat_and_posts_message() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    assert_eq!(offer.status, OfferStatus::Pending);
    assert_eq!(offer.proposed_by, BUYER);
    assert_eq!(offer.expires_at, offer.created_at + Duration::hours(24));
    assert_eq!(offer.discount_percentage(), 20);

    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.current_offer_amount, Some(80.0));
    assert_eq!(chat.offer_status, Some(OfferStatus::Pending));

    let last = m.channel.messages(&chat_id).await.unwrap().pop().unwrap();
    assert_eq!(last.kind, MessageKind::Offer);
    assert_eq!(last.content, "Made an offer of $80.00");
    assert_eq!(last.offer_amount, Some(80.0));
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected_without_writes() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    for amount in [0.0, -10.0, f64::NAN, f64::INFINITY] {
        let result = m.ledger.create_offer(offer_request(&chat_id, amount)).await;
        assert!(matches!(result, Err(MarketError::Validation(_))));
    }
    assert!(m.ledger.offers_for_chat(&chat_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_must_match_chat() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    let mut wrong_item = offer_request(&chat_id, 50.0);
    wrong_item.item_id = "item-2".to_string();
    assert!(matches!(
        m.ledger.create_offer(wrong_item).await,
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        m.ledger.create_offer(offer_request("missing", 50.0)).await,
        Err(MarketError::NotFound { kind: "Chat", .. })
    ));

    m.registry.archive(&chat_id).await.unwrap();
    assert!(matches!(
        m.ledger.create_offer(offer_request(&chat_id, 50.0)).await,
        Err(MarketError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_counter_closes_original_and_opens_linked_offer() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let original = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();
    m.clock.advance(Duration::minutes(10));

    let answered = m
        .ledger
        .respond(&original.id, OfferResponse::Counter(90.0))
        .await
        .unwrap();

    assert_eq!(answered.id, original.id);
    assert_eq!(answered.status, OfferStatus::Countered);
    assert_eq!(answered.amount, 90.0);
    assert_eq!(answered.responded_at, Some(m.clock.now()));

    let offers = m.ledger.offers_for_chat(&chat_id).await.unwrap();
    assert_eq!(offers.len(), 2);
    let follow_up = m.ledger.pending_for_chat(&chat_id).await.unwrap().unwrap();
    assert_eq!(follow_up.amount, 90.0);
    assert_eq!(follow_up.proposed_by, SELLER);
    assert_eq!(follow_up.responder_id(), BUYER);
    assert_eq!(follow_up.previous_offer_id.as_deref(), Some(original.id.as_str()));
    assert_eq!(follow_up.original_price, 100.0);

    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.current_offer_amount, Some(90.0));
    assert_eq!(chat.offer_status, Some(OfferStatus::Pending));

    let last = m.channel.messages(&chat_id).await.unwrap().pop().unwrap();
    assert_eq!(last.sender_id, SELLER);
    assert_eq!(last.content, "Made an offer of $90.00");
}

#[tokio::test]
async fn test_respond_on_closed_offer_fails_without_mutation() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();
    let declined = m
        .ledger
        .respond(&offer.id, OfferResponse::Decline)
        .await
        .unwrap();
    assert_eq!(declined.status, OfferStatus::Declined);

    m.clock.advance(Duration::minutes(1));
    for response in [
        OfferResponse::Accept,
        OfferResponse::Decline,
        OfferResponse::Counter(95.0),
    ] {
        let result = m.ledger.respond(&offer.id, response).await;
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }

    assert_eq!(m.ledger.get(&offer.id).await.unwrap(), declined);
    assert_eq!(m.ledger.offers_for_chat(&chat_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_respond_to_unknown_offer() {
    let m = market();
    assert!(matches!(
        m.ledger.respond("missing", OfferResponse::Accept).await,
        Err(MarketError::NotFound { kind: "Offer", .. })
    ));
}

#[tokio::test]
async fn test_counter_requires_valid_amount() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    assert!(matches!(
        m.ledger.respond(&offer.id, OfferResponse::Counter(-1.0)).await,
        Err(MarketError::Validation(_))
    ));
    assert_eq!(m.ledger.get(&offer.id).await.unwrap().status, OfferStatus::Pending);
}

#[tokio::test]
async fn test_counter_on_archived_chat_is_rejected() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();
    m.registry.archive(&chat_id).await.unwrap();

    assert!(matches!(
        m.ledger.respond(&offer.id, OfferResponse::Counter(90.0)).await,
        Err(MarketError::InvalidState(_))
    ));

    assert_eq!(m.ledger.get(&offer.id).await.unwrap(), offer);
    assert_eq!(m.ledger.offers_for_chat(&chat_id).await.unwrap().len(), 1);
    assert!(!m.registry.get(&chat_id).await.unwrap().is_active);
}

#[tokio::test]
async fn test_accept_records_outcome() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();
    let mut events = m.events.subscribe();

    let accepted = m
        .ledger
        .respond(&offer.id, OfferResponse::Accept)
        .await
        .unwrap();

    assert_eq!(accepted.status, OfferStatus::Accepted);
    assert_eq!(accepted.amount, 80.0);
    assert!(accepted.responded_at.is_some());
    assert!(m.ledger.pending_for_chat(&chat_id).await.unwrap().is_none());

    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.offer_status, Some(OfferStatus::Accepted));
    let last = m.channel.messages(&chat_id).await.unwrap().pop().unwrap();
    assert_eq!(last.kind, MessageKind::System);
    assert_eq!(last.content, "Offer of $80.00 accepted");

    assert!(drain(&mut events).contains(&MarketEvent::OfferAccepted {
        chat_id,
        offer_id: offer.id,
        amount: 80.0,
    }));
}

#[tokio::test]
async fn test_new_offer_supersedes_pending_one() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let first = m
        .ledger
        .create_offer(offer_request(&chat_id, 70.0))
        .await
        .unwrap();
    m.clock.advance(Duration::seconds(1));
    let second = m
        .ledger
        .create_offer(offer_request(&chat_id, 75.0))
        .await
        .unwrap();

    let offers = m.ledger.offers_for_chat(&chat_id).await.unwrap();
    let pending: Vec<_> = offers
        .iter()
        .filter(|o| o.status == OfferStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
    assert_eq!(m.ledger.get(&first.id).await.unwrap().status, OfferStatus::Countered);
}

#[tokio::test]
async fn test_sweep_expires_each_offer_exactly_once() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();
    let mut events = m.events.subscribe();

    m.clock.advance(Duration::hours(23));
    assert!(!is_expired(&offer, m.clock.now()));
    assert!(m.ledger.sweep_expired().await.unwrap().is_empty());
    assert_eq!(m.ledger.time_remaining(&offer), Duration::hours(1));

    m.clock.advance(Duration::hours(1));
    assert!(is_expired(&offer, m.clock.now()));
    assert_eq!(m.ledger.time_remaining(&offer), Duration::zero());

    let swept = m.ledger.sweep_expired().await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].status, OfferStatus::Expired);
    assert!(m.ledger.sweep_expired().await.unwrap().is_empty());

    let expired_events = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, MarketEvent::OfferExpired { .. }))
        .count();
    assert_eq!(expired_events, 1);
    let chat = m.registry.get(&chat_id).await.unwrap();
    assert_eq!(chat.offer_status, Some(OfferStatus::Expired));
}

#[tokio::test]
async fn test_responding_after_expiry_expires_the_offer() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    m.clock.advance(Duration::hours(25));
    assert!(m.ledger.pending_for_chat(&chat_id).await.unwrap().is_none());

    let result = m.ledger.respond(&offer.id, OfferResponse::Accept).await;
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
    assert_eq!(m.ledger.get(&offer.id).await.unwrap().status, OfferStatus::Expired);
    assert!(m.ledger.sweep_expired().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_follow_ups_are_best_effort() {
    assert_eq!(SecondaryWrite::OfferSummary.policy(), WritePolicy::BestEffort);
    assert_eq!(SecondaryWrite::OfferMessage.policy(), WritePolicy::BestEffort);
    assert_eq!(SecondaryWrite::SeedMessage.policy(), WritePolicy::BestEffort);
    assert_eq!(SecondaryWrite::MessageSummary.policy(), WritePolicy::Surface);

    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.store.inject_fault(StoreOp::InsertMessage);
    m.store.inject_fault(StoreOp::UpdateChat);

    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    m.store.clear_faults();
    assert_eq!(m.ledger.get(&offer.id).await.unwrap().status, OfferStatus::Pending);
    assert_eq!(m.store.message_count(&chat_id).await, 1);
    assert_eq!(m.registry.get(&chat_id).await.unwrap().current_offer_amount, None);
}

#[tokio::test]
async fn test_offer_insert_failure_surfaces() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    m.store.inject_fault(StoreOp::InsertOffer);

    let result = m.ledger.create_offer(offer_request(&chat_id, 80.0)).await;
    assert!(matches!(result, Err(MarketError::Network(_))));
}

#[tokio::test]
async fn test_seller_can_propose() {
    let m = market();
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 85.0).proposed_by(SELLER).with_message("Firm at $85"))
        .await
        .unwrap();

    assert_eq!(offer.responder_id(), BUYER);
    let last = m.channel.messages(&chat_id).await.unwrap().pop().unwrap();
    assert_eq!(last.content, "Firm at $85");

    let stranger = m
        .ledger
        .create_offer(offer_request(&chat_id, 85.0).proposed_by("stranger"))
        .await;
    assert!(matches!(stranger, Err(MarketError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper_expires_offers() {
    let m = market_with(LedgerConfig::default().with_sweep_interval(StdDuration::from_secs(1)));
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();
    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    let sweeper = m.ledger.spawn_sweeper(m.ledger.config().sweep_interval);
    m.clock.advance(Duration::hours(24));
    tokio::time::sleep(StdDuration::from_secs(3)).await;

    assert_eq!(m.ledger.get(&offer.id).await.unwrap().status, OfferStatus::Expired);
    sweeper.stop().await;
}

#[tokio::test]
async fn test_custom_offer_ttl() {
    let m = market_with(LedgerConfig::default().with_offer_ttl(StdDuration::from_secs(3600)));
    let chat_id = m.registry.create_or_get_chat(new_chat(ITEM)).await.unwrap();

    let offer = m
        .ledger
        .create_offer(offer_request(&chat_id, 80.0))
        .await
        .unwrap();

    assert_eq!(offer.expires_at - offer.created_at, Duration::hours(1));
}
