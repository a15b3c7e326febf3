use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::auth::require_admin;
use super::domain::{
    CompanyId, CompanyStatus, Entity, EntityKind, HiringRequest, HiringRequestId,
    HiringRequestPatch, RequestStatus, TalentId, TalentStatus,
};
use super::error::{MarketplaceError, ValidationErrors};
use super::events;
use super::notifications::NotificationSender;
use super::repository::{Actor, MarketplaceStore};

pub const STATUS_FIELD: &str = "application_status";
pub const REQUEST_STATUS_FIELD: &str = "request_status";

/// A requested status already checked against its entity kind's enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget {
    Talent(TalentStatus),
    /// Legacy company-level status.
    Company(CompanyStatus),
    HiringRequest(CompanyStatus),
}

impl StatusTarget {
    /// The one place raw status strings are accepted or rejected.
    pub fn parse(kind: EntityKind, raw: &str) -> Result<Self, ValidationErrors> {
        let parsed = match kind {
            EntityKind::Talent => TalentStatus::parse(raw).map(Self::Talent),
            EntityKind::Company => CompanyStatus::parse(raw).map(Self::Company),
            EntityKind::HiringRequest => CompanyStatus::parse(raw).map(Self::HiringRequest),
        };

        parsed.ok_or_else(|| {
            let allowed = match kind {
                EntityKind::Talent => TalentStatus::allowed_values(),
                EntityKind::Company | EntityKind::HiringRequest => {
                    CompanyStatus::allowed_values()
                }
            };
            ValidationErrors::single(
                STATUS_FIELD,
                format!("'{raw}' is not a valid {kind} status (expected one of: {allowed})"),
            )
        })
    }

    pub const fn kind(self) -> EntityKind {
        match self {
            StatusTarget::Talent(_) => EntityKind::Talent,
            StatusTarget::Company(_) => EntityKind::Company,
            StatusTarget::HiringRequest(_) => EntityKind::HiringRequest,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StatusTarget::Talent(status) => status.label(),
            StatusTarget::Company(status) | StatusTarget::HiringRequest(status) => status.label(),
        }
    }

    /// Internal bookkeeping stages are never announced to applicants.
    pub const fn notifies(self) -> bool {
        !matches!(self, StatusTarget::Talent(TalentStatus::Screening))
    }
}

/// Outcome of a persisted transition.
#[derive(Debug)]
pub struct Transition {
    pub entity: Entity,
    /// Detached notification task, `None` when the status is not announced.
    pub notification: Option<JoinHandle<()>>,
}

/// Validates, persists, and announces admin status changes.
///
/// Re-applying the current status is not short-circuited: it rewrites the row
/// and dispatches again. Callers that want to skip no-op updates compare
/// before calling.
pub struct StatusTransitionService {
    store: Arc<dyn MarketplaceStore>,
    notifier: NotificationSender,
}

impl StatusTransitionService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: NotificationSender) -> Self {
        Self { store, notifier }
    }

    pub async fn transition(
        &self,
        kind: EntityKind,
        entity_id: &str,
        requested_status: &str,
        actor: Option<&Actor>,
    ) -> Result<Transition, MarketplaceError> {
        let actor = require_admin(actor)?;

        let id = entity_id.trim();
        let mut errors = ValidationErrors::new();
        if id.is_empty() {
            errors.push("id", "must not be empty");
        }
        let target = match StatusTarget::parse(kind, requested_status) {
            Ok(target) => Some(target),
            Err(status_errors) => {
                for error in status_errors.fields() {
                    errors.push(error.field.clone(), error.message.clone());
                }
                None
            }
        };
        errors.into_result()?;
        let Some(target) = target else {
            return Err(ValidationErrors::single(STATUS_FIELD, "missing status").into());
        };

        let changed_at = Utc::now();
        let transition = match target {
            StatusTarget::Talent(status) => {
                let talent = self
                    .store
                    .update_talent_status(&TalentId(id.to_string()), status)
                    .await?
                    .ok_or_else(|| MarketplaceError::not_found(kind, id))?;
                let notification = target
                    .notifies()
                    .then(|| self.notifier.dispatch(events::talent_status_changed(&talent, changed_at)));
                Transition {
                    entity: Entity::Talent(talent),
                    notification,
                }
            }
            StatusTarget::Company(status) => {
                warn!(company_id = %id, "company-level status is deprecated; hiring requests carry status");
                let company = self
                    .store
                    .update_company_status(&CompanyId(id.to_string()), status)
                    .await?
                    .ok_or_else(|| MarketplaceError::not_found(kind, id))?;
                let notification = Some(
                    self.notifier
                        .dispatch(events::company_status_changed(&company, changed_at)),
                );
                Transition {
                    entity: Entity::Company(company),
                    notification,
                }
            }
            StatusTarget::HiringRequest(status) => {
                let patch = HiringRequestPatch {
                    application_status: Some(status),
                    ..HiringRequestPatch::default()
                };
                let request = self
                    .store
                    .update_hiring_request(&HiringRequestId(id.to_string()), patch)
                    .await?
                    .ok_or_else(|| MarketplaceError::not_found(kind, id))?;
                let notification = Some(self.announce_to_owner(request.clone(), changed_at));
                Transition {
                    entity: Entity::HiringRequest(request),
                    notification,
                }
            }
        };

        info!(
            kind = %kind,
            id = %id,
            status = target.label(),
            actor = %actor.user_id,
            notified = transition.notification.is_some(),
            "application status updated"
        );
        if !target.notifies() {
            debug!(kind = %kind, id = %id, status = target.label(), "status change not announced");
        }

        Ok(transition)
    }

    /// Admin change of a hiring request's `request_status`. `filled` is only
    /// reachable through matching, and a matched request stays filled.
    pub async fn transition_request_status(
        &self,
        request_id: &str,
        requested_status: &str,
        actor: Option<&Actor>,
    ) -> Result<HiringRequest, MarketplaceError> {
        let actor = require_admin(actor)?;

        let id = request_id.trim();
        if id.is_empty() {
            return Err(ValidationErrors::single("id", "must not be empty").into());
        }
        let status = RequestStatus::parse(requested_status).ok_or_else(|| {
            ValidationErrors::single(
                REQUEST_STATUS_FIELD,
                format!(
                    "'{requested_status}' is not a valid request status (expected one of: {})",
                    RequestStatus::allowed_values()
                ),
            )
        })?;

        let request_id = HiringRequestId(id.to_string());
        let current = self
            .store
            .fetch_hiring_request(&request_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(EntityKind::HiringRequest, id))?;

        match (status, current.matched_talent_id.is_some()) {
            (RequestStatus::Filled, false) => {
                return Err(ValidationErrors::single(
                    REQUEST_STATUS_FIELD,
                    "a request is filled by matching a talent to it",
                )
                .into());
            }
            (RequestStatus::Open | RequestStatus::Cancelled, true) => {
                return Err(ValidationErrors::single(
                    REQUEST_STATUS_FIELD,
                    "request already has a matched talent",
                )
                .into());
            }
            _ => {}
        }

        let patch = HiringRequestPatch {
            request_status: Some(status),
            ..HiringRequestPatch::default()
        };
        let updated = self
            .store
            .update_hiring_request(&request_id, patch)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(EntityKind::HiringRequest, id))?;

        info!(
            request_id = %id,
            request_status = status.label(),
            actor = %actor.user_id,
            "hiring request status updated"
        );
        Ok(updated)
    }

    /// Looks up the owning company off the request path and notifies it.
    fn announce_to_owner(&self, request: HiringRequest, changed_at: DateTime<Utc>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match store.fetch_company(&request.company_id).await {
                Ok(Some(owner)) => {
                    let notice = events::hiring_request_status_changed(&request, &owner, changed_at);
                    if let Err(err) = notifier.dispatch(notice).await {
                        warn!(request_id = %request.id, error = %err, "notification task aborted");
                    }
                }
                Ok(None) => warn!(
                    request_id = %request.id,
                    company_id = %request.company_id,
                    "owning company missing; status notification skipped"
                ),
                Err(err) => warn!(
                    request_id = %request.id,
                    error = %err,
                    "owning company lookup failed; status notification skipped"
                ),
            }
        })
    }
}
