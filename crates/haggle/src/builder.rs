//! High-level builder wiring the store, clock, event bus, services and advisor

use std::sync::Arc;

use anyhow::Result;
#[cfg(feature = "mongodb")]
use anyhow::Context;
use haggle_advisor::{AdvisorConfig, PricingAdvisor};
use haggle_llm::ChatClient;
use haggle_market::{
    ChatRegistry, EventBus, LedgerConfig, MessageChannel, OfferLedger, SweeperHandle,
};
use haggle_persist::{MarketStore, MemoryStore};
use haggle_types::{Clock, SystemClock};
use tracing::info;

enum StoreChoice {
    Memory,
    Custom(Arc<dyn MarketStore>),
    #[cfg(feature = "mongodb")]
    Mongo { uri: String, database: String },
}

enum AdvisorChoice {
    Credential {
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Client(Arc<dyn ChatClient>),
    Ready(PricingAdvisor),
}

/// Builder for a fully wired [`Marketplace`]
///
/// Defaults: in-memory store, system clock, advisor in fallback mode,
/// 24 hour offers swept every minute.
///
/// # Example
///
/// ```rust,no_run
/// use haggle::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let market = MarketplaceBuilder::new()
///     .advisor_key(Some("AIza..."))
///     .event_capacity(512)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct MarketplaceBuilder {
    store: StoreChoice,
    clock: Arc<dyn Clock>,
    advisor: AdvisorChoice,
    advisor_config: AdvisorConfig,
    ledger_config: LedgerConfig,
    event_capacity: usize,
}

impl Default for MarketplaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketplaceBuilder {
    pub fn new() -> Self {
        Self {
            store: StoreChoice::Memory,
            clock: Arc::new(SystemClock),
            advisor: AdvisorChoice::Credential {
                api_key: None,
                base_url: None,
            },
            advisor_config: AdvisorConfig::default(),
            ledger_config: LedgerConfig::default(),
            event_capacity: 256,
        }
    }

    /// Use an existing store implementation
    pub fn store(mut self, store: Arc<dyn MarketStore>) -> Self {
        self.store = StoreChoice::Custom(store);
        self
    }

    /// Connect to MongoDB at build time
    #[cfg(feature = "mongodb")]
    pub fn mongodb(mut self, uri: impl Into<String>, database: impl Into<String>) -> Self {
        self.store = StoreChoice::Mongo {
            uri: uri.into(),
            database: database.into(),
        };
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Model credential. `None` or blank runs the advisor in fallback mode.
    pub fn advisor_key<S: Into<String>>(mut self, api_key: Option<S>) -> Self {
        let base_url = match self.advisor {
            AdvisorChoice::Credential { base_url, .. } => base_url,
            _ => None,
        };
        self.advisor = AdvisorChoice::Credential {
            api_key: api_key.map(Into::into),
            base_url,
        };
        self
    }

    /// Override the provider endpoint used with [`advisor_key`](Self::advisor_key)
    pub fn advisor_base_url(mut self, url: impl Into<String>) -> Self {
        let api_key = match self.advisor {
            AdvisorChoice::Credential { api_key, .. } => api_key,
            _ => None,
        };
        self.advisor = AdvisorChoice::Credential {
            api_key,
            base_url: Some(url.into()),
        };
        self
    }

    /// Use a ready-made model client
    pub fn advisor_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.advisor = AdvisorChoice::Client(client);
        self
    }

    /// Use a fully configured advisor; `advisor_config` is ignored
    pub fn advisor(mut self, advisor: PricingAdvisor) -> Self {
        self.advisor = AdvisorChoice::Ready(advisor);
        self
    }

    pub fn advisor_config(mut self, config: AdvisorConfig) -> Self {
        self.advisor_config = config;
        self
    }

    pub fn ledger_config(mut self, config: LedgerConfig) -> Self {
        self.ledger_config = config;
        self
    }

    /// Buffer size of the notification event bus (default: 256)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Build the marketplace
    ///
    /// # Errors
    ///
    /// Returns an error only if a MongoDB connection was requested and fails.
    pub async fn build(self) -> Result<Marketplace> {
        let store: Arc<dyn MarketStore> = match self.store {
            StoreChoice::Memory => Arc::new(MemoryStore::new()),
            StoreChoice::Custom(store) => store,
            #[cfg(feature = "mongodb")]
            StoreChoice::Mongo { uri, database } => Arc::new(
                haggle_persist::MongoMarketStore::connect(&uri, &database)
                    .await
                    .context("Failed to connect to MongoDB")?,
            ),
        };

        let advisor = match self.advisor {
            AdvisorChoice::Credential { api_key, base_url } => PricingAdvisor::from_credential(
                api_key.as_deref(),
                base_url.as_deref(),
                self.advisor_config,
            ),
            AdvisorChoice::Client(client) => PricingAdvisor::new(client, self.advisor_config),
            AdvisorChoice::Ready(advisor) => advisor,
        };

        let events = EventBus::new(self.event_capacity);
        let channel = MessageChannel::new(store.clone(), events.clone(), self.clock.clone());
        let registry = ChatRegistry::new(
            store.clone(),
            channel.clone(),
            events.clone(),
            self.clock.clone(),
        );
        let ledger = OfferLedger::new(
            store.clone(),
            channel.clone(),
            events.clone(),
            self.clock,
            self.ledger_config,
        );

        info!(advisor_enabled = advisor.is_enabled(), "Marketplace ready");
        Ok(Marketplace {
            store,
            events,
            registry,
            channel,
            ledger,
            advisor,
        })
    }
}

/// The negotiation services sharing one store, clock and event bus
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn MarketStore>,
    events: EventBus,
    registry: ChatRegistry,
    channel: MessageChannel,
    ledger: OfferLedger,
    advisor: PricingAdvisor,
}

impl Marketplace {
    pub fn registry(&self) -> &ChatRegistry {
        &self.registry
    }

    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    pub fn ledger(&self) -> &OfferLedger {
        &self.ledger
    }

    pub fn advisor(&self) -> &PricingAdvisor {
        &self.advisor
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    /// Start the periodic offer sweep at the configured interval
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        self.ledger
            .spawn_sweeper(self.ledger.config().sweep_interval)
    }
}
