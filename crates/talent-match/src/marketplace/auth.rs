use axum::http::{header, HeaderMap};
use tracing::warn;

use super::error::MarketplaceError;
use super::repository::{Actor, IdentityProvider};

/// Fails with `Unauthorized` when there is no caller.
pub fn require_actor(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    actor.ok_or(MarketplaceError::Unauthorized)
}

/// Fails with `Unauthorized` without a caller and `Forbidden` for non-admins.
pub fn require_admin(actor: Option<&Actor>) -> Result<&Actor, MarketplaceError> {
    let actor = require_actor(actor)?;
    if actor.is_admin() {
        Ok(actor)
    } else {
        Err(MarketplaceError::Forbidden)
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller from the `Authorization` header. A missing header is an
/// anonymous caller; a provider outage is an error, not a silent logout.
pub(crate) async fn resolve_actor(
    identity: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Result<Option<Actor>, MarketplaceError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    identity.resolve(token).await.map_err(|err| {
        warn!(error = %err, "identity provider lookup failed");
        MarketplaceError::from(err)
    })
}
