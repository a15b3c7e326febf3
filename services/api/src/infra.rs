use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_match::adapters::{
    HostedFileStore, HostedIdentityProvider, HostedStore, InMemoryFileStore,
    InMemoryMarketplaceStore, OutboxTransport, ResendTransport, StaticIdentityProvider,
};
use talent_match::config::{AppConfig, BackendKind};
use talent_match::marketplace::{Actor, ActorRole, MarketplaceBackends};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Picks the backend set named by the configuration.
pub(crate) fn backends(config: &AppConfig, admin_token: Option<String>) -> MarketplaceBackends {
    match config.backend {
        BackendKind::Hosted => hosted_backends(config),
        BackendKind::Memory => memory_backends(admin_token),
    }
}

/// Hosted adapters. Missing credentials surface per request as internal
/// errors rather than preventing startup.
pub(crate) fn hosted_backends(config: &AppConfig) -> MarketplaceBackends {
    if config.store.url.is_none() || config.store.service_key.is_none() {
        warn!("STORE_URL or STORE_SERVICE_KEY unset; store calls will fail until configured");
    }
    if config.email.api_key.is_none() {
        warn!("EMAIL_API_KEY unset; notifications will be logged as failed");
    }

    MarketplaceBackends {
        store: Arc::new(HostedStore::new(config.store.clone())),
        files: Arc::new(HostedFileStore::new(config.store.clone())),
        identity: Arc::new(HostedIdentityProvider::new(config.store.clone())),
        email: Arc::new(ResendTransport::new(config.email.clone())),
    }
}

pub(crate) fn memory_backends(admin_token: Option<String>) -> MarketplaceBackends {
    let mut identity = StaticIdentityProvider::new();
    if let Some(token) = admin_token {
        identity = identity.with_token(
            token,
            Actor {
                user_id: "local-admin".to_string(),
                email: None,
                role: ActorRole::Admin,
            },
        );
    }

    MarketplaceBackends {
        store: Arc::new(InMemoryMarketplaceStore::new()),
        files: Arc::new(InMemoryFileStore::new()),
        identity: Arc::new(identity),
        email: Arc::new(OutboxTransport::new()),
    }
}
