use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use haggle_persist::{ChatPatch, MarketStore, OfferPatch};
use haggle_types::{Chat, Clock, MarketEvent, Offer, OfferStatus, OFFER_TTL_HOURS};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::channel::MessageChannel;
use crate::error::{MarketError, Result};
use crate::events::EventBus;
use crate::policy::SecondaryWrite;

/// Offer lifetime and background sweep cadence
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub offer_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            offer_ttl: Duration::from_secs(OFFER_TTL_HOURS as u64 * 3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl LedgerConfig {
    pub fn with_offer_ttl(mut self, ttl: Duration) -> Self {
        self.offer_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Input for a new offer. The buyer proposes unless `proposed_by` says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRequest {
    pub chat_id: String,
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: f64,
    pub original_price: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub proposed_by: Option<String>,
}

impl OfferRequest {
    pub fn new(
        chat_id: impl Into<String>,
        item_id: impl Into<String>,
        buyer_id: impl Into<String>,
        seller_id: impl Into<String>,
        amount: f64,
        original_price: f64,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            item_id: item_id.into(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            amount,
            original_price,
            message: None,
            proposed_by: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn proposed_by(mut self, participant_id: impl Into<String>) -> Self {
        self.proposed_by = Some(participant_id.into());
        self
    }
}

/// Answer to a pending offer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfferResponse {
    Accept,
    Decline,
    Counter(f64),
}

impl OfferResponse {
    /// Build a response from a target status plus optional counter amount
    pub fn from_parts(status: OfferStatus, counter_amount: Option<f64>) -> Result<Self> {
        match (status, counter_amount) {
            (OfferStatus::Accepted, _) => Ok(OfferResponse::Accept),
            (OfferStatus::Declined, _) => Ok(OfferResponse::Decline),
            (OfferStatus::Countered, Some(amount)) => Ok(OfferResponse::Counter(amount)),
            (OfferStatus::Countered, None) => {
                Err(MarketError::validation("a counter-offer needs an amount"))
            }
            (other, _) => Err(MarketError::validation(format!(
                "cannot respond to an offer with status {}",
                other.as_str()
            ))),
        }
    }

    pub fn status(self) -> OfferStatus {
        match self {
            OfferResponse::Accept => OfferStatus::Accepted,
            OfferResponse::Decline => OfferStatus::Declined,
            OfferResponse::Counter(_) => OfferStatus::Countered,
        }
    }
}

/// Shared by the sweep and any countdown display
pub fn is_expired(offer: &Offer, now: DateTime<Utc>) -> bool {
    offer.is_expired(now)
}

fn validate_amount(amount: f64, what: &str) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(MarketError::validation(format!(
            "{} must be a positive, finite amount",
            what
        )))
    }
}

fn participant_name<'a>(chat: &'a Chat, participant_id: &str) -> &'a str {
    if participant_id == chat.seller_id {
        &chat.seller_name
    } else {
        &chat.buyer_name
    }
}

/// Offer lifecycle: create, respond, expire
#[derive(Clone)]
pub struct OfferLedger {
    store: Arc<dyn MarketStore>,
    channel: MessageChannel,
    events: EventBus,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl OfferLedger {
    pub fn new(
        store: Arc<dyn MarketStore>,
        channel: MessageChannel,
        events: EventBus,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            channel,
            events,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Open a pending offer on a chat.
    ///
    /// Any offer still pending on the chat is closed as countered first. The
    /// chat summary and the announcing offer message are best-effort.
    pub async fn create_offer(&self, request: OfferRequest) -> Result<Offer> {
        validate_amount(request.amount, "offer amount")?;
        if !request.original_price.is_finite() || request.original_price < 0.0 {
            return Err(MarketError::validation(
                "original price must be a finite, non-negative amount",
            ));
        }

        let chat = self
            .store
            .get_chat(&request.chat_id)
            .await?
            .ok_or_else(|| MarketError::chat_not_found(&request.chat_id))?;
        if chat.buyer_id != request.buyer_id
            || chat.seller_id != request.seller_id
            || chat.item_id != request.item_id
        {
            return Err(MarketError::validation(
                "offer parties and item must match the chat",
            ));
        }
        if !chat.is_active {
            return Err(MarketError::invalid_state("chat is archived"));
        }

        let proposer = request
            .proposed_by
            .clone()
            .unwrap_or_else(|| request.buyer_id.clone());
        if !chat.is_participant(&proposer) {
            return Err(MarketError::validation(format!(
                "{} is not a participant of chat {}",
                proposer, chat.id
            )));
        }

        let offer = self.new_offer(
            &chat,
            &proposer,
            request.amount,
            request.original_price,
            request.message.clone(),
            None,
        );
        let offer = self.open(&chat, offer, request.message.as_deref()).await?;

        info!(
            chat_id = %offer.chat_id,
            offer_id = %offer.id,
            amount = offer.amount,
            "Offer created"
        );
        Ok(offer)
    }

    /// Accept, decline, or counter a pending offer.
    ///
    /// Closed offers are rejected with `InvalidState` and left untouched. A
    /// pending offer already past its expiry is expired instead. Countering
    /// records the counter amount on the answered offer and opens a new
    /// pending offer from the responder, linked through `previous_offer_id`.
    /// A counter on an archived chat fails with `InvalidState`.
    pub async fn respond(&self, offer_id: &str, response: OfferResponse) -> Result<Offer> {
        if let OfferResponse::Counter(amount) = response {
            validate_amount(amount, "counter amount")?;
        }

        let offer = self.get(offer_id).await?;
        if !offer.status.is_open() {
            return Err(MarketError::invalid_state(format!(
                "offer {} is already {}",
                offer_id,
                offer.status.as_str()
            )));
        }

        let now = self.clock.now();
        if offer.is_expired(now) {
            self.expire(&offer).await?;
            return Err(MarketError::invalid_state(format!(
                "offer {} has expired",
                offer_id
            )));
        }

        let mut patch = OfferPatch::responded(response.status(), now);
        if let OfferResponse::Counter(amount) = response {
            // Same rule as create_offer: no new pending offer on an archived chat
            let archived = self
                .store
                .get_chat(&offer.chat_id)
                .await?
                .is_some_and(|chat| !chat.is_active);
            if archived {
                return Err(MarketError::invalid_state("chat is archived"));
            }
            patch = patch.with_amount(amount);
        }
        let answered = self
            .store
            .update_offer_if(offer_id, OfferStatus::Pending, patch)
            .await?
            .ok_or_else(|| {
                MarketError::invalid_state(format!("offer {} was answered concurrently", offer_id))
            })?;

        info!(
            chat_id = %answered.chat_id,
            offer_id,
            status = answered.status.as_str(),
            "Offer answered"
        );

        match response {
            OfferResponse::Counter(amount) => self.open_counter(&answered, amount).await?,
            OfferResponse::Accept => {
                self.summarize(&answered).await?;
                self.announce(
                    &answered.chat_id,
                    format!("Offer of {} accepted", answered.formatted_amount()),
                )
                .await?;
                self.events.publish(MarketEvent::OfferAccepted {
                    chat_id: answered.chat_id.clone(),
                    offer_id: answered.id.clone(),
                    amount: answered.amount,
                });
            }
            OfferResponse::Decline => {
                self.summarize(&answered).await?;
                self.announce(
                    &answered.chat_id,
                    format!("Offer of {} declined", answered.formatted_amount()),
                )
                .await?;
                self.events.publish(MarketEvent::OfferDeclined {
                    chat_id: answered.chat_id.clone(),
                    offer_id: answered.id.clone(),
                });
            }
        }

        Ok(answered)
    }

    /// Expire every pending offer whose `expires_at` has passed.
    ///
    /// Each offer transitions at most once even with concurrent sweeps.
    pub async fn sweep_expired(&self) -> Result<Vec<Offer>> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for offer in self.store.pending_offers().await? {
            if !offer.is_expired(now) {
                continue;
            }
            if let Some(closed) = self.expire(&offer).await? {
                expired.push(closed);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired offers swept");
        }
        Ok(expired)
    }

    pub async fn get(&self, offer_id: &str) -> Result<Offer> {
        self.store
            .get_offer(offer_id)
            .await?
            .ok_or_else(|| MarketError::offer_not_found(offer_id))
    }

    /// Offers of a chat, oldest first
    pub async fn offers_for_chat(&self, chat_id: &str) -> Result<Vec<Offer>> {
        Ok(self.store.offers_for_chat(chat_id).await?)
    }

    /// The chat's open offer, ignoring one that has run out but not been swept
    pub async fn pending_for_chat(&self, chat_id: &str) -> Result<Option<Offer>> {
        let now = self.clock.now();
        Ok(self
            .store
            .offers_for_chat(chat_id)
            .await?
            .into_iter()
            .rev()
            .find(|o| o.status.is_open() && !o.is_expired(now)))
    }

    /// Time left on an offer by this ledger's clock
    pub fn time_remaining(&self, offer: &Offer) -> chrono::Duration {
        offer.time_remaining(self.clock.now())
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` on a background task.
    ///
    /// The task stops when the returned handle is stopped or dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let ledger = self.clone();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = ledger.sweep_expired().await {
                            warn!(error = %e, "Offer sweep failed");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Offer sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    fn new_offer(
        &self,
        chat: &Chat,
        proposer: &str,
        amount: f64,
        original_price: f64,
        message: Option<String>,
        previous_offer_id: Option<String>,
    ) -> Offer {
        let now = self.clock.now();
        let mut offer = Offer::new(
            &chat.id,
            &chat.item_id,
            &chat.buyer_id,
            &chat.seller_id,
            proposer,
            amount,
            original_price,
            message,
            now,
        );
        if let Ok(ttl) = chrono::Duration::from_std(self.config.offer_ttl) {
            offer.expires_at = now + ttl;
        }
        offer.previous_offer_id = previous_offer_id;
        offer
    }

    /// Store a new pending offer and run its follow-up writes
    async fn open(&self, chat: &Chat, offer: Offer, note: Option<&str>) -> Result<Offer> {
        let superseded = self.store.insert_offer(offer.clone(), offer.created_at).await?;
        for old in superseded {
            debug!(chat_id = %old.chat_id, offer_id = %old.id, "Pending offer superseded");
            self.events.publish(MarketEvent::OfferCountered {
                chat_id: old.chat_id.clone(),
                offer_id: old.id.clone(),
                amount: old.amount,
                counter_offer_id: Some(offer.id.clone()),
            });
        }

        self.summarize(&offer).await?;
        SecondaryWrite::OfferMessage
            .run(self.channel.send_offer_message(
                &chat.id,
                &offer.proposed_by,
                participant_name(chat, &offer.proposed_by),
                offer.amount,
                note,
            ))
            .await?;

        self.events.publish(MarketEvent::NewOffer {
            chat_id: offer.chat_id.clone(),
            offer_id: offer.id.clone(),
            amount: offer.amount,
            recipient_id: offer.responder_id().to_string(),
        });
        Ok(offer)
    }

    async fn open_counter(&self, answered: &Offer, amount: f64) -> Result<()> {
        let chat = self.store.get_chat(&answered.chat_id).await?;
        let Some(chat) = chat else {
            // Chat deleted: the counter stays recorded on the answered offer
            warn!(
                chat_id = %answered.chat_id,
                offer_id = %answered.id,
                "Counter on a deleted chat"
            );
            self.events.publish(MarketEvent::OfferCountered {
                chat_id: answered.chat_id.clone(),
                offer_id: answered.id.clone(),
                amount,
                counter_offer_id: None,
            });
            return Ok(());
        };

        let counter = self.new_offer(
            &chat,
            answered.responder_id(),
            amount,
            answered.original_price,
            None,
            Some(answered.id.clone()),
        );
        let counter = self.open(&chat, counter, None).await?;

        self.events.publish(MarketEvent::OfferCountered {
            chat_id: answered.chat_id.clone(),
            offer_id: answered.id.clone(),
            amount,
            counter_offer_id: Some(counter.id),
        });
        Ok(())
    }

    /// Compare-and-set a pending offer to expired; `None` if something else closed it first
    async fn expire(&self, offer: &Offer) -> Result<Option<Offer>> {
        let patch = OfferPatch::status(OfferStatus::Expired);
        let expired = self
            .store
            .update_offer_if(&offer.id, OfferStatus::Pending, patch)
            .await?;

        if let Some(expired) = &expired {
            debug!(chat_id = %expired.chat_id, offer_id = %expired.id, "Offer expired");
            self.summarize(expired).await?;
            self.events.publish(MarketEvent::OfferExpired {
                chat_id: expired.chat_id.clone(),
                offer_id: expired.id.clone(),
            });
        }
        Ok(expired)
    }

    async fn summarize(&self, offer: &Offer) -> Result<()> {
        SecondaryWrite::OfferSummary
            .run(
                self.store
                    .update_chat(&offer.chat_id, ChatPatch::offer(offer.amount, offer.status)),
            )
            .await?;
        Ok(())
    }

    async fn announce(&self, chat_id: &str, content: String) -> Result<()> {
        SecondaryWrite::OfferMessage
            .run(self.channel.send_system(chat_id, &content))
            .await?;
        Ok(())
    }
}

/// Handle to a background sweeper task
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to finish its current pass
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Offer sweeper task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
