use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::{SecurityEvent, SecurityEventSink};
use crate::security::{CredentialHasher, TokenIssuer};
use crate::services::{
    AccountDirectory, DefaultIdentityService, IdentityService, SecurityLogService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,
    pub store: Store,
    pub identity_service: Arc<dyn IdentityService>,
    pub security_log: Arc<SecurityLogService>,
    pub event_bus: broadcast::Sender<SecurityEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    /// Builds the full service graph on a caller-supplied bus. Tests use
    /// this to keep a receiver on the bus the services publish to.
    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<SecurityEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::connect(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let hasher = CredentialHasher::new(&config.security)?;
        let tokens = TokenIssuer::new(&config.token);

        let directory: Arc<dyn AccountDirectory> = Arc::new(store.account_repo());
        let sink: Arc<dyn SecurityEventSink> = Arc::new(event_bus.clone());

        let identity_service: Arc<dyn IdentityService> =
            Arc::new(DefaultIdentityService::new(directory, hasher, tokens, sink));

        let security_log = Arc::new(SecurityLogService::new(store.clone(), event_bus.clone()));
        security_log.clone().start_listener();

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            identity_service,
            security_log,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
