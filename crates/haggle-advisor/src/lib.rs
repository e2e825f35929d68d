pub mod advisor;
pub mod config;
mod error;
pub mod fallback;
pub mod insights;
pub mod parse;
pub mod prompts;
pub mod race;
pub mod types;

pub use advisor::PricingAdvisor;
pub use config::{AdvisorConfig, AdvisorTimeouts};
pub use insights::{safety_tips, trend_report, CategoryActivity, CategoryPrice, TrendReport};
pub use parse::normalize_confidence;
pub use race::{race_with_deadline, Raced};
pub use types::{
    AnalysisSource, ChatContext, DemandLevel, MarketInsights, MarketTrend, PriceAnalysis,
    PriceRange, TransactionType,
};
