use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard deadline per advisor operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorTimeouts {
    pub price_analysis: Duration,
    pub market_research: Duration,
    pub chat_reply: Duration,
}

impl Default for AdvisorTimeouts {
    fn default() -> Self {
        Self {
            price_analysis: Duration::from_secs(30),
            market_research: Duration::from_secs(45),
            chat_reply: Duration::from_secs(20),
        }
    }
}

impl AdvisorTimeouts {
    /// Same deadline for every operation
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            price_analysis: timeout,
            market_research: timeout,
            chat_reply: timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeouts: AdvisorTimeouts,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(1000),
            timeouts: AdvisorTimeouts::default(),
        }
    }
}

impl AdvisorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_timeouts(mut self, timeouts: AdvisorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
