//! Deterministic answers used whenever the model path is unavailable.

use haggle_types::{ItemCategory, ItemCondition};

use crate::parse::round_cents;
use crate::types::{
    AnalysisSource, ChatContext, DemandLevel, MarketInsights, MarketTrend, PriceAnalysis,
    PriceRange,
};

pub const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Typical resale price of a category, in dollars
pub fn base_price(category: ItemCategory) -> f64 {
    match category {
        ItemCategory::Textbooks => 50.0,
        ItemCategory::Electronics => 200.0,
        ItemCategory::Clothing => 25.0,
        ItemCategory::Furniture => 100.0,
        ItemCategory::Sports => 40.0,
        ItemCategory::Tickets => 60.0,
        ItemCategory::DormSupplies => 30.0,
        ItemCategory::TechGear => 150.0,
        ItemCategory::Other => 35.0,
    }
}

pub fn condition_multiplier(condition: ItemCondition) -> f64 {
    match condition {
        ItemCondition::New => 0.90,
        ItemCondition::LikeNew => 0.80,
        ItemCondition::Good => 0.70,
        ItemCondition::Fair => 0.55,
        ItemCondition::Poor => 0.40,
    }
}

pub fn price_analysis(category: ItemCategory, condition: ItemCondition) -> PriceAnalysis {
    let base = base_price(category);
    let multiplier = condition_multiplier(condition);
    let suggested = round_cents(base * multiplier);

    PriceAnalysis {
        suggested_price: suggested,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: format!(
            "Rule-based estimate: {category} items typically resell for about ${base:.2}; \
             {condition} condition prices at {pct:.0}% of that. AI pricing was unavailable, \
             so treat this as a starting point.",
            pct = multiplier * 100.0,
        ),
        comparable_items: Vec::new(),
        market_trend: MarketTrend::Unknown,
        price_range: Some(PriceRange {
            min: round_cents(suggested * 0.8),
            max: round_cents(suggested * 1.2),
        }),
        source: AnalysisSource::RuleBased,
    }
}

struct CategoryProfile {
    demand: DemandLevel,
    seasonal: &'static str,
    recommendations: &'static [&'static str],
    popular: &'static [&'static str],
}

fn profile(category: ItemCategory) -> CategoryProfile {
    match category {
        ItemCategory::Textbooks => CategoryProfile {
            demand: DemandLevel::High,
            seasonal:
                "Demand peaks in the first two weeks of each semester and collapses after finals.",
            recommendations: &[
                "List before the semester starts",
                "Include the edition and ISBN",
                "Mention whether access codes are unused",
            ],
            popular: &["Calculus textbooks", "Chemistry lab manuals", "Course readers"],
        },
        ItemCategory::Electronics => CategoryProfile {
            demand: DemandLevel::High,
            seasonal: "Strong at the start of fall semester and around the holidays.",
            recommendations: &[
                "Show the device powered on in photos",
                "Include chargers and original boxes",
                "State battery health for laptops and phones",
            ],
            popular: &["Laptops", "Tablets", "Headphones"],
        },
        ItemCategory::Clothing => CategoryProfile {
            demand: DemandLevel::Medium,
            seasonal: "Game-day apparel sells best during football season.",
            recommendations: &[
                "Photograph items on a hanger in good light",
                "List sizes clearly",
                "Bundle similar pieces",
            ],
            popular: &["Game-day shirts", "Jackets", "Sneakers"],
        },
        ItemCategory::Furniture => CategoryProfile {
            demand: DemandLevel::Medium,
            seasonal: "Move-in weeks in August and January drive most furniture sales.",
            recommendations: &[
                "Give dimensions",
                "Note whether pickup is required",
                "Price to move before lease end",
            ],
            popular: &["Desks", "Futons", "Bookshelves"],
        },
        ItemCategory::Sports => CategoryProfile {
            demand: DemandLevel::Medium,
            seasonal: "Rises in spring for outdoor gear and in fall for intramurals.",
            recommendations: &[
                "Mention the sport and size",
                "Call out any wear",
                "Bundle accessories",
            ],
            popular: &["Bikes", "Gym equipment", "Intramural gear"],
        },
        ItemCategory::Tickets => CategoryProfile {
            demand: DemandLevel::High,
            seasonal: "Spikes the week before home games and major concerts.",
            recommendations: &[
                "List as early as possible",
                "State section and row",
                "Confirm transfer method up front",
            ],
            popular: &["Football tickets", "Basketball tickets", "Concert tickets"],
        },
        ItemCategory::DormSupplies => CategoryProfile {
            demand: DemandLevel::High,
            seasonal: "Peaks during move-in and drops sharply by mid-semester.",
            recommendations: &[
                "Sell right before move-out to incoming students",
                "Clean items before photographing",
                "Bundle small items",
            ],
            popular: &["Mini fridges", "Microwaves", "Storage bins"],
        },
        ItemCategory::TechGear => CategoryProfile {
            demand: DemandLevel::Medium,
            seasonal: "Steady through the year with bumps before finals.",
            recommendations: &[
                "List specs and compatibility",
                "Include cables and adapters",
                "Mention remaining warranty",
            ],
            popular: &["Graphing calculators", "Monitors", "Keyboards"],
        },
        ItemCategory::Other => CategoryProfile {
            demand: DemandLevel::Low,
            seasonal: "No strong seasonal pattern.",
            recommendations: &[
                "Write a descriptive title",
                "Use clear photos",
                "Price competitively",
            ],
            popular: &[],
        },
    }
}

pub fn market_insights(category: ItemCategory, range: Option<PriceRange>) -> MarketInsights {
    let average = base_price(category);
    let profile = profile(category);
    let price_range = range.unwrap_or(PriceRange {
        min: round_cents(average * 0.5),
        max: round_cents(average * 1.5),
    });

    MarketInsights {
        category,
        average_price: average,
        price_range,
        demand_level: profile.demand,
        seasonal_trends: profile.seasonal.to_string(),
        recommendations: profile.recommendations.iter().map(|s| s.to_string()).collect(),
        popular_items: profile.popular.iter().map(|s| s.to_string()).collect(),
        source: AnalysisSource::RuleBased,
    }
}

const PRICE_REPLY: &str = "For pricing, check what similar items sold for on campus, then adjust \
for condition: like-new items usually go for about 80% of the typical price, good condition \
around 70%, and worn items less. Leave a little room to negotiate.";

const SELL_REPLY: &str = "To sell faster: use clear, well-lit photos, write an honest description \
with the condition and any flaws, price slightly below similar listings, and reply to messages \
quickly.";

const BUY_REPLY: &str = "When buying: compare a few listings first, ask the seller about condition \
and age, inspect the item in person before paying, and make a reasonable offer rather than \
lowballing.";

const SAFETY_REPLY: &str = "Stay safe: meet in busy public campus spots like the SUB or library, \
bring a friend for high-value items, inspect before paying, and never send money in advance.";

const CAPABILITY_MENU: &str = "Hi! I'm your Raider ReSell assistant. I can help you with pricing, \
market insights, selling tips, buying advice, and safety guidelines. What would you like to know?";

pub fn chat_reply(query: &str, context: Option<ChatContext>) -> String {
    let lowered = query.to_lowercase();
    let reply = if lowered.contains("price") {
        PRICE_REPLY
    } else if lowered.contains("sell") {
        SELL_REPLY
    } else if lowered.contains("buy") {
        BUY_REPLY
    } else if lowered.contains("safety") || lowered.contains("safe") {
        SAFETY_REPLY
    } else {
        match context {
            Some(ChatContext::PriceHelp) => PRICE_REPLY,
            Some(ChatContext::SellingTips) => SELL_REPLY,
            Some(ChatContext::BuyingAdvice) => BUY_REPLY,
            Some(ChatContext::GeneralMarketplace) | Some(ChatContext::TechSupport) | None => {
                CAPABILITY_MENU
            }
        }
    };
    reply.to_string()
}

pub fn similar_items(category: ItemCategory) -> Vec<String> {
    let items: &[&str] = match category {
        ItemCategory::Textbooks => &[
            "Study guides",
            "Solution manuals",
            "Lab notebooks",
            "Graphing calculator",
            "Highlighters",
        ],
        ItemCategory::Electronics => &[
            "Laptop stand",
            "Wireless earbuds",
            "Portable charger",
            "Bluetooth speaker",
            "USB-C hub",
        ],
        ItemCategory::Clothing => &[
            "Game-day shirt",
            "Hoodie",
            "Rain jacket",
            "Running shoes",
            "Backpack",
        ],
        ItemCategory::Furniture => &[
            "Desk chair",
            "Bookshelf",
            "Futon",
            "Desk lamp",
            "Storage ottoman",
        ],
        ItemCategory::Sports => &[
            "Bike lock",
            "Yoga mat",
            "Dumbbells",
            "Intramural jersey",
            "Water bottle",
        ],
        ItemCategory::Tickets => &[
            "Football tickets",
            "Basketball tickets",
            "Concert tickets",
            "Parking pass",
            "Event wristband",
        ],
        ItemCategory::DormSupplies => &[
            "Mini fridge",
            "Microwave",
            "Shower caddy",
            "Mattress topper",
            "Storage bins",
        ],
        ItemCategory::TechGear => &[
            "Monitor",
            "Mechanical keyboard",
            "Webcam",
            "External SSD",
            "Graphing calculator",
        ],
        ItemCategory::Other => &["Bike", "Plants", "Wall art", "Board games", "Kitchenware"],
    };
    items.iter().map(|s| s.to_string()).collect()
}
