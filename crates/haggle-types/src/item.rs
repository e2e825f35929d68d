use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Listing category, serialized with its display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemCategory {
    Textbooks,
    Electronics,
    Clothing,
    Furniture,
    #[serde(rename = "Sports & Recreation")]
    Sports,
    Tickets,
    #[serde(rename = "Dorm Supplies")]
    DormSupplies,
    #[serde(rename = "Tech Gear")]
    TechGear,
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 9] = [
        ItemCategory::Textbooks,
        ItemCategory::Electronics,
        ItemCategory::Clothing,
        ItemCategory::Furniture,
        ItemCategory::Sports,
        ItemCategory::Tickets,
        ItemCategory::DormSupplies,
        ItemCategory::TechGear,
        ItemCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Textbooks => "Textbooks",
            ItemCategory::Electronics => "Electronics",
            ItemCategory::Clothing => "Clothing",
            ItemCategory::Furniture => "Furniture",
            ItemCategory::Sports => "Sports & Recreation",
            ItemCategory::Tickets => "Tickets",
            ItemCategory::DormSupplies => "Dorm Supplies",
            ItemCategory::TechGear => "Tech Gear",
            ItemCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = UnknownVariant;

    /// Accepts the display name case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Physical condition of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCondition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl ItemCondition {
    pub const ALL: [ItemCondition; 5] = [
        ItemCondition::New,
        ItemCondition::LikeNew,
        ItemCondition::Good,
        ItemCondition::Fair,
        ItemCondition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCondition::New => "New",
            ItemCondition::LikeNew => "Like New",
            ItemCondition::Good => "Good",
            ItemCondition::Fair => "Fair",
            ItemCondition::Poor => "Poor",
        }
    }
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCondition {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ItemCondition::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant {
                kind: "condition",
                value: s.to_string(),
            })
    }
}

/// Minimal view of a listing, supplied by the item catalog collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    pub title: String,
    pub category: ItemCategory,
    pub price: f64,
}
