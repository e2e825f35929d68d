use std::collections::BTreeMap;
use std::fmt::Write as _;

use haggle_types::{format_usd, ItemCategory, ListingSnapshot};
use serde::{Deserialize, Serialize};

use crate::parse::round_cents;
use crate::types::TransactionType;

pub fn safety_tips(transaction: TransactionType) -> &'static [&'static str] {
    match transaction {
        TransactionType::Selling => &[
            "Meet in public campus locations like the SUB or library",
            "Verify the buyer's Texas Tech student status",
            "Use secure payment methods (Venmo, Zelle with verification)",
            "Take photos of the item condition before meeting",
            "Bring a friend to high-value transactions",
        ],
        TransactionType::Buying => &[
            "Inspect items thoroughly before payment",
            "Meet in well-lit, populated campus areas",
            "Verify the seller's student status and reviews",
            "Test electronics before purchasing",
            "Trust your instincts: if something feels wrong, walk away",
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryActivity {
    pub category: ItemCategory,
    pub listings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrice {
    pub category: ItemCategory,
    pub average_price: f64,
}

/// Snapshot of current listing activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    /// Up to three busiest categories
    pub most_active: Vec<CategoryActivity>,
    /// Up to five categories with the highest average price
    pub average_prices: Vec<CategoryPrice>,
}

impl TrendReport {
    pub fn render(&self) -> String {
        let mut out = String::from("Current Marketplace Trends\n\nMost Active Categories:\n");
        for entry in &self.most_active {
            let _ = writeln!(out, "- {}: {} items", entry.category, entry.listings);
        }
        out.push_str("\nAverage Prices by Category:\n");
        for entry in &self.average_prices {
            let _ = writeln!(out, "- {}: {}", entry.category, format_usd(entry.average_price));
        }
        out
    }
}

/// Ties are broken by category order so the report is deterministic
pub fn trend_report(listings: &[ListingSnapshot]) -> TrendReport {
    let mut totals: BTreeMap<ItemCategory, (usize, f64)> = BTreeMap::new();
    for listing in listings {
        let entry = totals.entry(listing.category).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += listing.price;
    }

    let mut most_active: Vec<CategoryActivity> = totals
        .iter()
        .map(|(category, (count, _))| CategoryActivity {
            category: *category,
            listings: *count,
        })
        .collect();
    most_active.sort_by(|a, b| b.listings.cmp(&a.listings).then(a.category.cmp(&b.category)));
    most_active.truncate(3);

    let mut average_prices: Vec<CategoryPrice> = totals
        .iter()
        .map(|(category, (count, sum))| CategoryPrice {
            category: *category,
            average_price: round_cents(sum / *count as f64),
        })
        .collect();
    average_prices.sort_by(|a, b| {
        b.average_price
            .total_cmp(&a.average_price)
            .then(a.category.cmp(&b.category))
    });
    average_prices.truncate(5);

    TrendReport {
        most_active,
        average_prices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(category: ItemCategory, price: f64) -> ListingSnapshot {
        ListingSnapshot {
            title: "x".to_string(),
            category,
            price,
        }
    }

    #[test]
    fn test_trend_report_ranks_categories() {
        let listings = vec![
            listing(ItemCategory::Textbooks, 40.0),
            listing(ItemCategory::Textbooks, 60.0),
            listing(ItemCategory::Textbooks, 20.0),
            listing(ItemCategory::Electronics, 300.0),
            listing(ItemCategory::Electronics, 100.0),
            listing(ItemCategory::Furniture, 90.0),
        ];
        let report = trend_report(&listings);

        assert_eq!(report.most_active[0].category, ItemCategory::Textbooks);
        assert_eq!(report.most_active[0].listings, 3);
        assert_eq!(report.most_active.len(), 3);
        assert_eq!(report.average_prices[0].category, ItemCategory::Electronics);
        assert_eq!(report.average_prices[0].average_price, 200.0);

        let text = report.render();
        assert!(text.contains("- Textbooks: 3 items"));
        assert!(text.contains("- Electronics: $200.00"));
    }

    #[test]
    fn test_empty_listings() {
        let report = trend_report(&[]);
        assert!(report.most_active.is_empty());
        assert!(report.average_prices.is_empty());
    }

    #[test]
    fn test_safety_tips_per_side() {
        assert_eq!(safety_tips(TransactionType::Selling).len(), 5);
        assert!(safety_tips(TransactionType::Buying)
            .iter()
            .any(|tip| tip.contains("Test electronics")));
    }
}
