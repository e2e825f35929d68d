use std::sync::Arc;
use std::time::Duration;

use haggle_llm::{ChatClient, ChatOptions, ChatRequest, ClientFactory, Message, ProviderConfig};
use haggle_types::{ItemCategory, ItemCondition, ListingSnapshot};
use tracing::{debug, info, warn};

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::fallback;
use crate::insights::{self, TrendReport};
use crate::parse;
use crate::prompts;
use crate::race::{race_with_deadline, Raced};
use crate::types::{ChatContext, MarketInsights, PriceAnalysis, PriceRange, TransactionType};

const MAX_SIMILAR_ITEMS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    PriceAnalysis,
    MarketResearch,
    ChatReply,
    SimilarItems,
    OptimizeDescription,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::PriceAnalysis => "price_analysis",
            Operation::MarketResearch => "market_research",
            Operation::ChatReply => "chat_reply",
            Operation::SimilarItems => "similar_items",
            Operation::OptimizeDescription => "optimize_description",
        }
    }
}

/// Price suggestions and marketplace guidance backed by a generative model.
///
/// Every public method returns a usable answer. Network errors, timeouts,
/// unparseable replies and a missing credential all resolve to a
/// deterministic fallback; results derived that way report
/// `is_low_confidence() == true`.
#[derive(Clone)]
pub struct PricingAdvisor {
    client: Option<Arc<dyn ChatClient>>,
    config: AdvisorConfig,
}

impl PricingAdvisor {
    pub fn new(client: Arc<dyn ChatClient>, config: AdvisorConfig) -> Self {
        Self {
            client: Some(client),
            config,
        }
    }

    /// Advisor that always answers from the fallback tables
    pub fn disabled(config: AdvisorConfig) -> Self {
        Self {
            client: None,
            config,
        }
    }

    /// Build from an optional model credential. A missing or blank key puts
    /// the advisor in permanent fallback mode; that is not an error.
    pub fn from_credential(
        api_key: Option<&str>,
        base_url: Option<&str>,
        config: AdvisorConfig,
    ) -> Self {
        let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            info!("No model credential configured, pricing advisor runs in fallback mode");
            return Self::disabled(config);
        };

        let mut provider = ProviderConfig::gemini(key);
        if let Some(url) = base_url {
            provider = provider.with_base_url(url);
        }

        match ClientFactory::create_chat_client(provider) {
            Ok(client) => Self::new(client, config),
            Err(e) => {
                warn!(
                    error = %e,
                    "Could not create model client, pricing advisor runs in fallback mode"
                );
                Self::disabled(config)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    fn timeout_for(&self, op: Operation) -> Duration {
        let timeouts = &self.config.timeouts;
        match op {
            Operation::PriceAnalysis | Operation::OptimizeDescription => timeouts.price_analysis,
            Operation::MarketResearch | Operation::SimilarItems => timeouts.market_research,
            Operation::ChatReply => timeouts.chat_reply,
        }
    }

    async fn complete(
        &self,
        op: Operation,
        prompt: String,
        json: bool,
    ) -> Result<String, AdvisorError> {
        let client = self.client.as_ref().ok_or(AdvisorError::Disabled)?;

        let mut options = ChatOptions::new().json_mode(json);
        if let Some(temperature) = self.config.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        let request = ChatRequest::new(
            self.config.model.clone(),
            vec![Message::system(prompts::PERSONA), Message::human(prompt)],
        )
        .with_options(options);

        let deadline = self.timeout_for(op);
        debug!(operation = op.name(), ?deadline, "Sending advisor request");

        match race_with_deadline(deadline, client.chat(request)).await {
            Raced::Completed(Ok(response)) => response
                .content
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| AdvisorError::Parse("empty response".to_string())),
            Raced::Completed(Err(e)) => Err(AdvisorError::Network(format!("{e:#}"))),
            Raced::TimedOut => Err(AdvisorError::Timeout(deadline)),
        }
    }

    fn note_fallback(op: Operation, error: &AdvisorError) {
        match error {
            AdvisorError::Disabled => {
                debug!(operation = op.name(), "Advisor disabled, using fallback")
            }
            _ => warn!(
                operation = op.name(),
                error = %error,
                "Advisor fell back to rule-based answer"
            ),
        }
    }

    /// Suggested price for an item. Falls back to category base price times
    /// a condition multiplier (confidence 0.6).
    pub async fn suggest_price(
        &self,
        title: &str,
        description: &str,
        condition: ItemCondition,
        category: ItemCategory,
    ) -> PriceAnalysis {
        let op = Operation::PriceAnalysis;
        let prompt = prompts::price_analysis(title, description, condition, category);

        let text = match self.complete(op, prompt, true).await {
            Ok(text) => text,
            Err(e) => {
                Self::note_fallback(op, &e);
                return fallback::price_analysis(category, condition);
            }
        };

        match parse::price_analysis(&text) {
            Ok(analysis) => {
                debug!(
                    price = analysis.suggested_price,
                    confidence = analysis.confidence,
                    "Model price analysis"
                );
                analysis
            }
            Err(e) => match parse::extracted_price_analysis(&text) {
                Some(analysis) => {
                    warn!(
                        operation = op.name(),
                        error = %e,
                        "Using dollar amount from unstructured model reply"
                    );
                    analysis
                }
                None => {
                    Self::note_fallback(op, &e);
                    fallback::price_analysis(category, condition)
                }
            },
        }
    }

    pub async fn market_research(
        &self,
        category: ItemCategory,
        price_range: Option<PriceRange>,
    ) -> MarketInsights {
        let op = Operation::MarketResearch;
        let prompt = prompts::market_research(category, price_range);

        let result = match self.complete(op, prompt, true).await {
            Ok(text) => parse::market_insights(&text, category),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            Self::note_fallback(op, &e);
            fallback::market_insights(category, price_range)
        })
    }

    pub async fn chat_reply(&self, query: &str, context: Option<ChatContext>) -> String {
        let op = Operation::ChatReply;
        match self.complete(op, prompts::chat_reply(query, context), false).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                Self::note_fallback(op, &e);
                fallback::chat_reply(query, context)
            }
        }
    }

    pub async fn similar_items(&self, item: &str, category: ItemCategory) -> Vec<String> {
        let op = Operation::SimilarItems;
        let items = match self.complete(op, prompts::similar_items(item, category), false).await {
            Ok(text) => parse::item_lines(&text, MAX_SIMILAR_ITEMS),
            Err(e) => {
                Self::note_fallback(op, &e);
                Vec::new()
            }
        };
        if items.is_empty() {
            fallback::similar_items(category)
        } else {
            items
        }
    }

    /// Rewritten listing description; the original text when the model is unavailable
    pub async fn optimize_description(
        &self,
        description: &str,
        title: &str,
        category: ItemCategory,
    ) -> String {
        let op = Operation::OptimizeDescription;
        let prompt = prompts::optimize_description(description, title, category);
        match self.complete(op, prompt, false).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                Self::note_fallback(op, &e);
                description.to_string()
            }
        }
    }

    pub fn safety_tips(&self, transaction: TransactionType) -> Vec<String> {
        insights::safety_tips(transaction)
            .iter()
            .map(|tip| tip.to_string())
            .collect()
    }

    pub fn trend_report(&self, listings: &[ListingSnapshot]) -> TrendReport {
        insights::trend_report(listings)
    }
}
