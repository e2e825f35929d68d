use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of a pending offer
pub const OFFER_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Countered,
    Expired,
}

impl OfferStatus {
    /// Only pending offers accept a response; every other status is closed
    pub fn is_open(self) -> bool {
        self == OfferStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Countered => "countered",
            OfferStatus::Expired => "expired",
        }
    }
}

/// A proposed price tied to a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub chat_id: String,
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    /// Participant who put this amount on the table
    pub proposed_by: String,
    pub amount: f64,
    pub original_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Offer this one answers, set on counter-offers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_offer_id: Option<String>,
}

impl Offer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chat_id: impl Into<String>,
        item_id: impl Into<String>,
        buyer_id: impl Into<String>,
        seller_id: impl Into<String>,
        proposed_by: impl Into<String>,
        amount: f64,
        original_price: f64,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            chat_id: chat_id.into(),
            item_id: item_id.into(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            proposed_by: proposed_by.into(),
            amount,
            original_price,
            message,
            status: OfferStatus::Pending,
            created_at: now,
            responded_at: None,
            expires_at: now + Duration::hours(OFFER_TTL_HOURS),
            previous_offer_id: None,
        }
    }

    /// Pure function of `expires_at` versus `now`; shared by the sweep and any countdown
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, floored at zero
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.is_expired(now) {
            Duration::zero()
        } else {
            self.expires_at - now
        }
    }

    /// Whoever answers this offer: the participant who did not propose it
    pub fn responder_id(&self) -> &str {
        if self.proposed_by == self.buyer_id {
            &self.seller_id
        } else {
            &self.buyer_id
        }
    }

    pub fn formatted_amount(&self) -> String {
        format_usd(self.amount)
    }

    pub fn formatted_original_price(&self) -> String {
        format_usd(self.original_price)
    }

    /// Whole-percent discount against the listing price (truncated)
    pub fn discount_percentage(&self) -> i64 {
        if self.original_price <= 0.0 {
            return 0;
        }
        (((self.original_price - self.amount) / self.original_price) * 100.0) as i64
    }
}

pub fn format_usd(amount: f64) -> String {
    format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Offer {
        Offer::new(
            "chat123",
            "item123",
            "buyer123",
            "seller123",
            "buyer123",
            80.0,
            100.0,
            Some("My offer".to_string()),
            now,
        )
    }

    #[test]
    fn test_offer_initialization() {
        let now = Utc::now();
        let offer = sample(now);

        assert_eq!(offer.status, OfferStatus::Pending);
        assert_eq!(offer.formatted_amount(), "$80.00");
        assert_eq!(offer.formatted_original_price(), "$100.00");
        assert_eq!(offer.discount_percentage(), 20);
        assert_eq!(offer.expires_at - offer.created_at, Duration::hours(24));
        assert!(!offer.is_expired(now));
        assert_eq!(offer.responder_id(), "seller123");
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let offer = sample(now);

        assert!(!offer.is_expired(offer.expires_at - Duration::seconds(1)));
        assert!(offer.is_expired(offer.expires_at));
        assert_eq!(offer.time_remaining(offer.expires_at + Duration::hours(1)), Duration::zero());
        assert_eq!(offer.time_remaining(now + Duration::hours(23)), Duration::hours(1));
    }

    #[test]
    fn test_only_pending_is_open() {
        assert!(OfferStatus::Pending.is_open());
        let closed = [
            OfferStatus::Accepted,
            OfferStatus::Declined,
            OfferStatus::Countered,
            OfferStatus::Expired,
        ];
        for status in closed {
            assert!(!status.is_open(), "{:?} should be closed", status);
        }
    }
}
