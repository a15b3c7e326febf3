use std::sync::Arc;

use axum::http::HeaderMap;

use super::auth::resolve_actor;
use super::error::MarketplaceError;
use super::intake::IntakeService;
use super::listings::AdminListingService;
use super::matching::MatchingService;
use super::notifications::{EmailTransport, NotificationSender};
use super::repository::{Actor, FileStore, IdentityProvider, MarketplaceStore};
use super::status::StatusTransitionService;
use super::uploads::UploadService;

/// External collaborators, constructed once at startup.
#[derive(Clone)]
pub struct MarketplaceBackends {
    pub store: Arc<dyn MarketplaceStore>,
    pub files: Arc<dyn FileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub email: Arc<dyn EmailTransport>,
}

/// Every marketplace service wired against one set of backends.
pub struct Marketplace {
    pub status: StatusTransitionService,
    pub listings: AdminListingService,
    pub intake: IntakeService,
    pub matching: MatchingService,
    pub uploads: UploadService,
    identity: Arc<dyn IdentityProvider>,
}

impl Marketplace {
    pub fn new(backends: MarketplaceBackends) -> Self {
        let MarketplaceBackends {
            store,
            files,
            identity,
            email,
        } = backends;
        let notifier = NotificationSender::new(email);

        Self {
            status: StatusTransitionService::new(Arc::clone(&store), notifier.clone()),
            listings: AdminListingService::new(Arc::clone(&store), Arc::clone(&files)),
            intake: IntakeService::new(Arc::clone(&store), notifier.clone()),
            matching: MatchingService::new(Arc::clone(&store), notifier),
            uploads: UploadService::new(store, files),
            identity,
        }
    }

    /// Caller identified by the request's bearer token, if any. Fails when
    /// the identity provider cannot be reached.
    pub async fn actor(&self, headers: &HeaderMap) -> Result<Option<Actor>, MarketplaceError> {
        resolve_actor(self.identity.as_ref(), headers).await
    }
}
