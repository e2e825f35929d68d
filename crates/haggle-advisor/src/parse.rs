//! Parsing of model replies into advisor results.
//!
//! Models are asked for strict JSON but frequently wrap it in prose or code
//! fences, report confidence on a 1-10 scale, or quote numbers as strings.
//! Everything is normalized here so callers only ever see 0-1 confidence and
//! positive finite prices.

use haggle_types::ItemCategory;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AdvisorError;
use crate::types::{
    AnalysisSource, DemandLevel, MarketInsights, MarketTrend, PriceAnalysis, PriceRange,
};

/// Confidence assumed when the model omits it
const DEFAULT_MODEL_CONFIDENCE: f64 = 0.5;

/// Confidence given to a price scraped out of unstructured text
pub const EXTRACTED_CONFIDENCE: f64 = 0.5;

const MAX_REASONING_CHARS: usize = 600;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPriceAnalysis {
    suggested_price: Value,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    comparable_items: Vec<String>,
    #[serde(default)]
    market_trend: Option<String>,
    #[serde(default)]
    price_range: Option<RawPriceRange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarketInsights {
    average_price: Value,
    #[serde(default)]
    price_range: Option<RawPriceRange>,
    #[serde(default)]
    demand_level: Option<String>,
    #[serde(default)]
    seasonal_trends: Option<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    popular_items: Vec<String>,
}

#[derive(Deserialize)]
struct RawPriceRange {
    min: Value,
    max: Value,
}

impl RawPriceRange {
    fn resolve(&self) -> Option<PriceRange> {
        let min = number(&self.min)?;
        let max = number(&self.max)?;
        (min >= 0.0 && max >= min).then_some(PriceRange { min, max })
    }
}

/// Numbers may arrive as JSON numbers or as strings such as "$45.00"
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Map any reported confidence onto 0-1.
///
/// Values in (1, 10] are read as a 1-10 score, values in (10, 100] as a
/// percentage. Everything is clamped; non-finite input becomes 0.
pub fn normalize_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw > 10.0 {
        raw / 100.0
    } else if raw > 1.0 {
        raw / 10.0
    } else {
        raw
    };
    scaled.clamp(0.0, 1.0)
}

/// Slice out the outermost JSON object, ignoring code fences and surrounding prose
fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub(crate) fn price_analysis(text: &str) -> Result<PriceAnalysis, AdvisorError> {
    let body = json_object(text).ok_or_else(|| AdvisorError::Parse("no JSON object".into()))?;
    let raw: RawPriceAnalysis =
        serde_json::from_str(body).map_err(|e| AdvisorError::Parse(e.to_string()))?;

    let suggested_price = number(&raw.suggested_price)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| AdvisorError::Parse("suggestedPrice must be a positive number".into()))?;

    let confidence = raw
        .confidence
        .as_ref()
        .and_then(number)
        .map(normalize_confidence)
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);

    Ok(PriceAnalysis {
        suggested_price: round_cents(suggested_price),
        confidence,
        reasoning: raw.reasoning.unwrap_or_default(),
        comparable_items: raw.comparable_items,
        market_trend: raw
            .market_trend
            .as_deref()
            .map(MarketTrend::parse_lenient)
            .unwrap_or(MarketTrend::Unknown),
        price_range: raw.price_range.as_ref().and_then(RawPriceRange::resolve),
        source: AnalysisSource::Model,
    })
}

pub(crate) fn market_insights(
    text: &str,
    category: ItemCategory,
) -> Result<MarketInsights, AdvisorError> {
    let body = json_object(text).ok_or_else(|| AdvisorError::Parse("no JSON object".into()))?;
    let raw: RawMarketInsights =
        serde_json::from_str(body).map_err(|e| AdvisorError::Parse(e.to_string()))?;

    let average_price = number(&raw.average_price)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| AdvisorError::Parse("averagePrice must be a positive number".into()))?;

    let price_range = raw
        .price_range
        .as_ref()
        .and_then(RawPriceRange::resolve)
        .unwrap_or(PriceRange {
            min: round_cents(average_price * 0.5),
            max: round_cents(average_price * 1.5),
        });

    Ok(MarketInsights {
        category,
        average_price: round_cents(average_price),
        price_range,
        demand_level: raw
            .demand_level
            .as_deref()
            .map(DemandLevel::parse_lenient)
            .unwrap_or(DemandLevel::Unknown),
        seasonal_trends: raw.seasonal_trends.unwrap_or_default(),
        recommendations: raw.recommendations,
        popular_items: raw.popular_items,
        source: AnalysisSource::Model,
    })
}

/// First positive dollar amount in free text, e.g. "$1,250.50" or "$ 45"
pub fn extract_dollar_amount(text: &str) -> Option<f64> {
    for (idx, _) in text.match_indices('$') {
        let rest = text[idx + 1..].trim_start();
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .filter(|c| *c != ',')
            .collect();
        let digits = digits.trim_end_matches('.');
        if let Ok(amount) = digits.parse::<f64>() {
            if amount.is_finite() && amount > 0.0 {
                return Some(amount);
            }
        }
    }
    None
}

/// Secondary path for replies that are not valid JSON but still name a price
pub(crate) fn extracted_price_analysis(text: &str) -> Option<PriceAnalysis> {
    let amount = extract_dollar_amount(text)?;
    Some(PriceAnalysis {
        suggested_price: round_cents(amount),
        confidence: EXTRACTED_CONFIDENCE,
        reasoning: truncate_chars(text.trim(), MAX_REASONING_CHARS),
        comparable_items: Vec::new(),
        market_trend: MarketTrend::Unknown,
        price_range: None,
        source: AnalysisSource::Extracted,
    })
}

/// One item per non-empty line, list markers stripped
pub(crate) fn item_lines(text: &str, limit: usize) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| {
                    c == '-' || c == '*' || c == '•' || c.is_ascii_digit() || c == '.' || c == ')'
                })
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(limit)
        .collect()
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_normalization() {
        assert_eq!(normalize_confidence(0.8), 0.8);
        assert_eq!(normalize_confidence(8.0), 0.8);
        assert_eq!(normalize_confidence(85.0), 0.85);
        assert_eq!(normalize_confidence(250.0), 1.0);
        assert_eq!(normalize_confidence(-3.0), 0.0);
        assert_eq!(normalize_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn test_parses_fenced_json_with_ten_point_confidence() {
        let reply = r#"Here you go:
```json
{"suggestedPrice": 140, "confidence": 8, "reasoning": "Popular model",
 "comparableItems": ["iPad 9th gen"], "marketTrend": "increasing",
 "priceRange": {"min": 120, "max": 160}}
```"#;
        let analysis = price_analysis(reply).unwrap();

        assert_eq!(analysis.suggested_price, 140.0);
        assert_eq!(analysis.confidence, 0.8);
        assert_eq!(analysis.market_trend, MarketTrend::Increasing);
        assert_eq!(analysis.price_range, Some(PriceRange { min: 120.0, max: 160.0 }));
        assert!(!analysis.is_low_confidence());
    }

    #[test]
    fn test_string_prices_are_accepted() {
        let analysis = price_analysis(r#"{"suggestedPrice": "$45.50"}"#).unwrap();
        assert_eq!(analysis.suggested_price, 45.5);
        assert_eq!(analysis.confidence, DEFAULT_MODEL_CONFIDENCE);
        assert_eq!(analysis.market_trend, MarketTrend::Unknown);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        assert!(price_analysis(r#"{"suggestedPrice": 0}"#).is_err());
        assert!(price_analysis("I think around forty dollars").is_err());
    }

    #[test]
    fn test_extract_dollar_amount() {
        assert_eq!(extract_dollar_amount("List it at $1,250.50 or best offer"), Some(1250.5));
        assert_eq!(extract_dollar_amount("Maybe $ 45."), Some(45.0));
        assert_eq!(extract_dollar_amount("$0 down, then $30"), Some(30.0));
        assert_eq!(extract_dollar_amount("no price here"), None);
    }

    #[test]
    fn test_extracted_analysis_shape() {
        let analysis = extracted_price_analysis("Probably worth about $60 on campus.").unwrap();
        assert_eq!(analysis.suggested_price, 60.0);
        assert_eq!(analysis.confidence, EXTRACTED_CONFIDENCE);
        assert!(analysis.comparable_items.is_empty());
        assert_eq!(analysis.source, AnalysisSource::Extracted);
    }

    #[test]
    fn test_item_lines_strip_markers() {
        let items = item_lines("1. TI-84 Calculator\n- Graphing paper\n\n* Backpack\n", 7);
        assert_eq!(items, vec!["TI-84 Calculator", "Graphing paper", "Backpack"]);
    }

    #[test]
    fn test_market_insights_default_range() {
        let insights = market_insights(
            r#"{"averagePrice": 100, "demandLevel": "High", "recommendations": ["List early"]}"#,
            ItemCategory::Furniture,
        )
        .unwrap();
        assert_eq!(insights.price_range, PriceRange { min: 50.0, max: 150.0 });
        assert_eq!(insights.demand_level, DemandLevel::High);
    }
}
