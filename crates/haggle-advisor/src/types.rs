use haggle_types::ItemCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Stable,
    Increasing,
    Decreasing,
    Unknown,
}

impl MarketTrend {
    /// Lenient read of free-form model text
    pub fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "stable" => return MarketTrend::Stable,
            "increasing" => return MarketTrend::Increasing,
            "decreasing" => return MarketTrend::Decreasing,
            _ => {}
        }
        if lowered.contains("increas") || lowered.contains("rising") || lowered.contains("upward") {
            MarketTrend::Increasing
        } else if lowered.contains("decreas")
            || lowered.contains("falling")
            || lowered.contains("downward")
        {
            MarketTrend::Decreasing
        } else if lowered.contains("stable") || lowered.contains("steady") {
            MarketTrend::Stable
        } else {
            MarketTrend::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl DemandLevel {
    pub fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.starts_with("high") {
            DemandLevel::High
        } else if lowered.starts_with("medium") || lowered.starts_with("moderate") {
            DemandLevel::Medium
        } else if lowered.starts_with("low") {
            DemandLevel::Low
        } else {
            DemandLevel::Unknown
        }
    }
}

/// Where an analysis came from. Anything but `Model` is shown with a low-confidence badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Model,
    /// Dollar amount pulled out of an otherwise unparseable model reply
    Extracted,
    RuleBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub suggested_price: f64,
    /// Always on a 0-1 scale
    pub confidence: f64,
    pub reasoning: String,
    pub comparable_items: Vec<String>,
    pub market_trend: MarketTrend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    pub source: AnalysisSource,
}

impl PriceAnalysis {
    pub fn is_low_confidence(&self) -> bool {
        self.source != AnalysisSource::Model
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsights {
    pub category: ItemCategory,
    pub average_price: f64,
    pub price_range: PriceRange,
    pub demand_level: DemandLevel,
    pub seasonal_trends: String,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub popular_items: Vec<String>,
    pub source: AnalysisSource,
}

impl MarketInsights {
    pub fn is_low_confidence(&self) -> bool {
        self.source != AnalysisSource::Model
    }
}

/// Topic hint for assistant replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatContext {
    PriceHelp,
    SellingTips,
    BuyingAdvice,
    GeneralMarketplace,
    TechSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Selling,
    Buying,
}
