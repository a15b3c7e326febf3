//! Notification builders for each marketplace event.

use chrono::{DateTime, SecondsFormat, Utc};

use super::domain::{Company, HiringRequest, Talent};
use super::notifications::{Notification, Recipient, TemplateKey};

fn first_word(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn talent_recipient(talent: &Talent) -> Recipient {
    Recipient {
        email: talent.email.clone(),
        first_name: talent.first_name.clone(),
    }
}

fn company_recipient(company: &Company) -> Recipient {
    Recipient {
        email: company.email.clone(),
        first_name: first_word(&company.contact_name),
    }
}

/// Event discriminator for a status write: the new status plus the moment it
/// was applied. Retries of one notification share the key; a later write of
/// the same status does not.
fn transition_event(status: &str, changed_at: DateTime<Utc>) -> String {
    format!(
        "{status}@{}",
        changed_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

pub fn talent_application_received(talent: &Talent) -> Notification {
    Notification::new(
        TemplateKey::TalentApplicationReceived,
        talent_recipient(talent),
        talent.id.0.clone(),
    )
    .locale(talent.locale)
    .event("submitted")
}

pub fn company_application_received(company: &Company) -> Notification {
    Notification::new(
        TemplateKey::CompanyApplicationReceived,
        company_recipient(company),
        company.id.0.clone(),
    )
    .locale(company.locale)
    .event("submitted")
    .variable("company_name", company.company_name.clone())
}

pub fn talent_status_changed(talent: &Talent, changed_at: DateTime<Utc>) -> Notification {
    let status = talent.application_status.label();
    Notification::new(
        TemplateKey::TalentStatusChanged,
        talent_recipient(talent),
        talent.id.0.clone(),
    )
    .locale(talent.locale)
    .event(transition_event(status, changed_at))
    .variable("status", status)
}

pub fn company_status_changed(company: &Company, changed_at: DateTime<Utc>) -> Notification {
    let status = company.application_status.label();
    Notification::new(
        TemplateKey::CompanyStatusChanged,
        company_recipient(company),
        company.id.0.clone(),
    )
    .locale(company.locale)
    .event(transition_event(status, changed_at))
    .variable("status", status)
    .variable("company_name", company.company_name.clone())
}

pub fn hiring_request_status_changed(
    request: &HiringRequest,
    owner: &Company,
    changed_at: DateTime<Utc>,
) -> Notification {
    let status = request.application_status.label();
    Notification::new(
        TemplateKey::HiringRequestStatusChanged,
        company_recipient(owner),
        request.id.0.clone(),
    )
    .locale(owner.locale)
    .event(transition_event(status, changed_at))
    .variable("status", status)
    .variable("request_title", request.title.clone())
}

pub fn hiring_request_matched(
    request: &HiringRequest,
    owner: &Company,
    talent: &Talent,
) -> Notification {
    Notification::new(
        TemplateKey::HiringRequestMatched,
        company_recipient(owner),
        request.id.0.clone(),
    )
    .locale(owner.locale)
    .event(talent.id.0.clone())
    .variable("request_title", request.title.clone())
    .variable(
        "talent_name",
        format!("{} {}", talent.first_name, talent.last_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::{EnglishLevel, Locale, TalentId, TalentRole, TalentStatus};
    use chrono::Duration;

    fn talent(status: TalentStatus) -> Talent {
        Talent {
            id: TalentId("t-1".to_string()),
            user_id: None,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            role: TalentRole::Backend,
            english_level: EnglishLevel::Fluent,
            portfolio_url: "https://ada.dev".to_string(),
            shipped: "Analytical engine".to_string(),
            tools: None,
            cv_url: None,
            profile_image_url: None,
            locale: Locale::En,
            application_status: status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn each_status_write_gets_its_own_key() {
        let start = Utc::now();
        let first = talent_status_changed(&talent(TalentStatus::Interviewing), start);
        let detour = talent_status_changed(
            &talent(TalentStatus::Training),
            start + Duration::seconds(1),
        );
        let back = talent_status_changed(
            &talent(TalentStatus::Interviewing),
            start + Duration::seconds(2),
        );

        assert_ne!(first.idempotency_key(), detour.idempotency_key());
        assert_ne!(first.idempotency_key(), back.idempotency_key());
        assert_eq!(first.variables.get("status"), back.variables.get("status"));

        let retried = first.clone();
        assert_eq!(first.idempotency_key(), retried.idempotency_key());
    }
}
