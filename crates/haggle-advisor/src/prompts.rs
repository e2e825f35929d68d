use haggle_types::{ItemCategory, ItemCondition};

use crate::types::{ChatContext, PriceRange};

/// System persona shared by every advisor request
pub const PERSONA: &str = "You are the assistant for Raider ReSell, a marketplace exclusive to \
Texas Tech University students. You help with price recommendations and market analysis, \
selling and buying tips, marketplace best practices, and safety guidelines for student \
transactions. Keep responses helpful, concise, and relevant to college students on a budget.";

pub fn price_analysis(
    title: &str,
    description: &str,
    condition: ItemCondition,
    category: ItemCategory,
) -> String {
    format!(
        r#"As a marketplace pricing expert for college students at Texas Tech University, analyze this item and suggest an optimal price.

Item Details:
- Title: {title}
- Description: {description}
- Condition: {condition}
- Category: {category}
- Target Market: Texas Tech University students (ages 18-25)

Respond with a single JSON object and nothing else:
{{
    "suggestedPrice": 0.00,
    "priceRange": {{"min": 0.00, "max": 0.00}},
    "confidence": 0.8,
    "reasoning": "explanation here",
    "comparableItems": ["item1", "item2"],
    "marketTrend": "stable"
}}

"confidence" is a number between 0 and 1. "marketTrend" is one of "stable", "increasing", "decreasing"."#
    )
}

pub fn market_research(category: ItemCategory, price_range: Option<PriceRange>) -> String {
    let range_line = price_range
        .map(|r| format!("Price Range of Interest: ${:.2} - ${:.2}\n", r.min, r.max))
        .unwrap_or_default();

    format!(
        r#"Provide market research analysis for {category} items on a Texas Tech University student marketplace.

Target Demographics:
- Texas Tech University students, ages 18-25
- College budget constraints
- Campus-specific needs
{range_line}
Respond with a single JSON object and nothing else:
{{
    "averagePrice": 0.00,
    "priceRange": {{"min": 0.00, "max": 0.00}},
    "demandLevel": "high",
    "seasonalTrends": "description",
    "recommendations": ["tip1", "tip2", "tip3"],
    "popularItems": ["item1", "item2"]
}}

"demandLevel" is one of "high", "medium", "low"."#
    )
}

pub fn chat_reply(query: &str, context: Option<ChatContext>) -> String {
    let focus = match context {
        Some(ChatContext::PriceHelp) => {
            "Focus on pricing strategies and market value analysis.\n"
        }
        Some(ChatContext::SellingTips) => {
            "Provide selling optimization and listing improvement tips.\n"
        }
        Some(ChatContext::BuyingAdvice) => "Give buying advice and safety tips for students.\n",
        Some(ChatContext::GeneralMarketplace) => {
            "Discuss general marketplace functionality and features.\n"
        }
        Some(ChatContext::TechSupport) => "Help with app technical issues and how-to questions.\n",
        None => "",
    };
    format!("{focus}\nUser Query: {query}\n\nResponse:")
}

pub fn similar_items(item: &str, category: ItemCategory) -> String {
    format!(
        r#"Given this item: "{item}" in the {category} category, suggest 5-7 similar items that Texas Tech students might be interested in buying or selling.

Focus on items commonly needed by college students, campus-relevant variations, different conditions or models, and complementary items.

Return only a plain list of item names, one per line."#
    )
}

pub fn optimize_description(description: &str, title: &str, category: ItemCategory) -> String {
    format!(
        r#"Optimize this item description for a Texas Tech student marketplace:

Title: {title}
Category: {category}
Original Description: {description}

Make it more appealing to college students: add details they care about, highlight the value, and keep it concise but informative.

Return only the optimized description:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_prompt_carries_item_details() {
        let prompt = price_analysis(
            "MacBook Air",
            "2020 model",
            ItemCondition::Good,
            ItemCategory::Electronics,
        );
        assert!(prompt.contains("Title: MacBook Air"));
        assert!(prompt.contains("Condition: Good"));
        assert!(prompt.contains("Category: Electronics"));
        assert!(prompt.contains("\"suggestedPrice\""));
    }

    #[test]
    fn test_market_prompt_optional_range() {
        let without = market_research(ItemCategory::Furniture, None);
        let range = PriceRange { min: 20.0, max: 80.0 };
        let with = market_research(ItemCategory::Furniture, Some(range));
        assert!(!without.contains("Price Range of Interest"));
        assert!(with.contains("Price Range of Interest: $20.00 - $80.00"));
    }
}
