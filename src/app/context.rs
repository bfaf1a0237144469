use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::app::Result;
use crate::cache::CacheHandle;
use crate::client::{Credentials, FeedClient, FeedbinClient, FeedbinOptions, HttpTransport, Transport};
use crate::config::{ClientKind, Config};
use crate::engine::{EngineOptions, FilterEngine};
use crate::rules::RuleSet;

pub struct AppContext {
    pub config: Config,
    pub cache: CacheHandle,
    pub client: Arc<dyn FeedClient + Send + Sync>,
    pub engine: FilterEngine,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let credentials = Credentials {
            username: config.client.username.clone(),
            password: config.client.password.clone(),
        };
        let transport = HttpTransport::new(
            credentials,
            Duration::from_secs(config.client.timeout_secs),
        )?;

        Self::with_transport(config, Arc::new(transport))
    }

    /// Wire everything up around an existing transport.
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport + Send + Sync>,
    ) -> Result<Self> {
        let cache = if config.cache.enabled {
            CacheHandle::initialize(config.cache.resolved_dir())
        } else {
            info!("Item cache disabled");
            CacheHandle::Disabled
        };

        let client: Arc<dyn FeedClient + Send + Sync> = match config.client.kind {
            ClientKind::Feedbin => Arc::new(FeedbinClient::new(
                transport,
                FeedbinOptions::from_config(&config.client)?,
                cache.clone(),
            )),
        };

        let rules = RuleSet::from_config(&config.rules)?;
        info!("Loaded {} rules: {}", rules.len(), rules.names().join(", "));

        let engine = FilterEngine::new(
            client.clone(),
            rules,
            EngineOptions {
                dry_run: config.dry_run,
                verbose: config.verbose,
            },
        );

        Ok(Self {
            config,
            cache,
            client,
            engine,
        })
    }
}
