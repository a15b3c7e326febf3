use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::auth::require_admin;
use super::domain::{
    CompanyStatus, EntityKind, HiringRequest, HiringRequestId, HiringRequestPatch,
    RequestStatus, TalentId, TalentStatus,
};
use super::error::{MarketplaceError, ValidationErrors};
use super::events;
use super::notifications::NotificationSender;
use super::repository::{Actor, MarketplaceStore};

#[derive(Debug)]
pub struct MatchOutcome {
    pub request: HiringRequest,
    /// Detached emails to the owning company and the matched talent.
    pub notifications: Vec<JoinHandle<()>>,
}

/// Pairs an open hiring request with a talent.
pub struct MatchingService {
    store: Arc<dyn MarketplaceStore>,
    notifier: NotificationSender,
}

impl MatchingService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: NotificationSender) -> Self {
        Self { store, notifier }
    }

    /// Moves the talent to `matched`, then sets `matched_talent_id`,
    /// `matched_at` and `request_status = filled` together. When the request
    /// write fails the talent is put back to its previous status.
    pub async fn match_talent(
        &self,
        request_id: &str,
        talent_id: &str,
        actor: Option<&Actor>,
    ) -> Result<MatchOutcome, MarketplaceError> {
        let actor = require_admin(actor)?;

        let mut errors = ValidationErrors::new();
        if request_id.trim().is_empty() {
            errors.push("id", "must not be empty");
        }
        if talent_id.trim().is_empty() {
            errors.push("talent_id", "must not be empty");
        }
        errors.into_result()?;

        let request_id = HiringRequestId(request_id.trim().to_string());
        let talent_id = TalentId(talent_id.trim().to_string());

        let request = self
            .store
            .fetch_hiring_request(&request_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(EntityKind::HiringRequest, &request_id.0))?;
        if request.request_status != RequestStatus::Open {
            return Err(ValidationErrors::single(
                "request_status",
                format!(
                    "only open requests can be matched (currently {})",
                    request.request_status
                ),
            )
            .into());
        }
        let talent = self
            .store
            .fetch_talent(&talent_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(EntityKind::Talent, &talent_id.0))?;
        if talent.application_status == TalentStatus::Rejected {
            return Err(ValidationErrors::single(
                "talent_id",
                "rejected talents cannot be matched",
            )
            .into());
        }

        // A filled request must never point at a talent that is not matched.
        let previous_status = talent.application_status;
        let matched_at = Utc::now();
        let talent = self
            .store
            .update_talent_status(&talent_id, TalentStatus::Matched)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(EntityKind::Talent, &talent_id.0))?;

        let patch = HiringRequestPatch {
            application_status: Some(CompanyStatus::Matched),
            request_status: Some(RequestStatus::Filled),
            matched_talent_id: Some(talent_id.clone()),
            matched_at: Some(matched_at),
        };
        let request = match self.store.update_hiring_request(&request_id, patch).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                self.restore_talent(&talent_id, previous_status).await;
                return Err(MarketplaceError::not_found(
                    EntityKind::HiringRequest,
                    &request_id.0,
                ));
            }
            Err(err) => {
                self.restore_talent(&talent_id, previous_status).await;
                return Err(err.into());
            }
        };

        info!(
            request_id = %request.id,
            talent_id = %talent.id,
            actor = %actor.user_id,
            "hiring request matched"
        );

        let mut notifications = vec![self
            .notifier
            .dispatch(events::talent_status_changed(&talent, matched_at))];
        match self.store.fetch_company(&request.company_id).await {
            Ok(Some(owner)) => notifications.push(
                self.notifier
                    .dispatch(events::hiring_request_matched(&request, &owner, &talent)),
            ),
            Ok(None) => warn!(company_id = %request.company_id, "owning company missing; match email skipped"),
            Err(err) => warn!(error = %err, "owning company lookup failed; match email skipped"),
        }

        Ok(MatchOutcome {
            request,
            notifications,
        })
    }

    async fn restore_talent(&self, talent_id: &TalentId, status: TalentStatus) {
        if let Err(err) = self.store.update_talent_status(talent_id, status).await {
            warn!(talent_id = %talent_id, error = %err, "could not restore talent status after failed match");
        }
    }
}
