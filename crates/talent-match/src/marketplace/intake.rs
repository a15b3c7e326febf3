//! Public application forms and company-owned hiring requests.

use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;

use super::auth::require_actor;
use super::domain::{
    Company, CompanySize, CompanyStatus, EnglishLevel, HiringRequest, Locale, NewCompany,
    NewHiringRequest, NewTalent, ProjectType, RequestStatus, Talent, TalentRole, TalentStatus,
};
use super::error::{MarketplaceError, ValidationErrors};
use super::events;
use super::notifications::NotificationSender;
use super::repository::{Actor, MarketplaceStore};

const NAME_LIMIT: usize = 100;
const LONG_TEXT_LIMIT: usize = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: String,
    pub english_level: String,
    pub portfolio_url: String,
    pub shipped: String,
    #[serde(default)]
    pub tools: Option<String>,
    /// Storage path returned by the CV upload endpoint.
    #[serde(default)]
    pub cv_path: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyApplicationForm {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub company_size: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringRequestForm {
    pub title: String,
    pub roles_needed: Vec<String>,
    pub project_type: String,
    #[serde(default)]
    pub budget_range: Option<String>,
    pub description: String,
}

/// Stored record plus the detached "application received" email.
#[derive(Debug)]
pub struct Submitted<T> {
    pub record: T,
    pub notification: Option<JoinHandle<()>>,
}

pub struct IntakeService {
    store: Arc<dyn MarketplaceStore>,
    notifier: NotificationSender,
}

impl IntakeService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: NotificationSender) -> Self {
        Self { store, notifier }
    }

    /// New talents always start `under_review`.
    pub async fn submit_talent(
        &self,
        form: TalentApplicationForm,
        actor: Option<&Actor>,
    ) -> Result<Submitted<Talent>, MarketplaceError> {
        let new_talent = validate_talent(form, actor)?;
        let talent = self.store.insert_talent(new_talent).await?;
        info!(talent_id = %talent.id, role = talent.role.label(), "talent application received");

        let notification = Some(
            self.notifier
                .dispatch(events::talent_application_received(&talent)),
        );
        Ok(Submitted {
            record: talent,
            notification,
        })
    }

    pub async fn submit_company(
        &self,
        form: CompanyApplicationForm,
        actor: Option<&Actor>,
    ) -> Result<Submitted<Company>, MarketplaceError> {
        let new_company = validate_company(form, actor)?;
        let company = self.store.insert_company(new_company).await?;
        info!(company_id = %company.id, "company application received");

        let notification = Some(
            self.notifier
                .dispatch(events::company_application_received(&company)),
        );
        Ok(Submitted {
            record: company,
            notification,
        })
    }

    /// The caller must own a company; the request is attached to it.
    pub async fn create_hiring_request(
        &self,
        form: HiringRequestForm,
        actor: Option<&Actor>,
    ) -> Result<HiringRequest, MarketplaceError> {
        let actor = require_actor(actor)?;
        let company = self
            .store
            .company_for_user(&actor.user_id)
            .await?
            .ok_or(MarketplaceError::Forbidden)?;

        let (title, roles_needed, project_type, budget_range, description) =
            validate_hiring_request(form)?;
        let request = self
            .store
            .insert_hiring_request(NewHiringRequest {
                company_id: company.id.clone(),
                title,
                roles_needed,
                project_type,
                budget_range,
                description,
                request_status: RequestStatus::Open,
                application_status: CompanyStatus::UnderReview,
            })
            .await?;

        info!(request_id = %request.id, company_id = %company.id, "hiring request created");
        Ok(request)
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    limit: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
    } else if trimmed.chars().count() > limit {
        errors.push(field, format!("must be at most {limit} characters"));
    }
    trimmed.to_string()
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn is_valid_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !raw.chars().any(char::is_whitespace)
}

pub(crate) fn is_valid_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

fn email_field(errors: &mut ValidationErrors, value: &str) -> String {
    let email = value.trim().to_ascii_lowercase();
    if email.is_empty() {
        errors.push("email", "is required");
    } else if !is_valid_email(&email) {
        errors.push("email", "must be a valid email address");
    }
    email
}

fn enum_field<T: Copy>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
    parse: fn(&str) -> Option<T>,
    allowed: fn() -> String,
) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        errors.push(field, format!("must be one of: {}", allowed()));
    }
    parsed
}

fn validate_talent(
    form: TalentApplicationForm,
    actor: Option<&Actor>,
) -> Result<NewTalent, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let first_name = required_text(&mut errors, "first_name", &form.first_name, NAME_LIMIT);
    let last_name = required_text(&mut errors, "last_name", &form.last_name, NAME_LIMIT);
    let email = email_field(&mut errors, &form.email);
    let role = enum_field(
        &mut errors,
        "role",
        &form.role,
        TalentRole::parse,
        TalentRole::allowed_values,
    );
    let english_level = enum_field(
        &mut errors,
        "english_level",
        &form.english_level,
        EnglishLevel::parse,
        EnglishLevel::allowed_values,
    );
    let portfolio_url = form.portfolio_url.trim().to_string();
    if !is_valid_web_url(&portfolio_url) {
        errors.push("portfolio_url", "must be an http(s) URL");
    }
    let shipped = required_text(&mut errors, "shipped", &form.shipped, LONG_TEXT_LIMIT);
    let profile_image_url = optional_text(form.profile_image_url);
    if let Some(url) = &profile_image_url {
        if !is_valid_web_url(url) {
            errors.push("profile_image_url", "must be an http(s) URL");
        }
    }

    errors.into_result()?;
    let (Some(role), Some(english_level)) = (role, english_level) else {
        return Err(ValidationErrors::single("role", "is required"));
    };

    Ok(NewTalent {
        user_id: actor.map(|actor| actor.user_id.clone()),
        first_name,
        last_name,
        email,
        phone: optional_text(form.phone),
        role,
        english_level,
        portfolio_url,
        shipped,
        tools: optional_text(form.tools),
        cv_url: optional_text(form.cv_path),
        profile_image_url,
        locale: form.locale.as_deref().map(Locale::from_tag).unwrap_or_default(),
        application_status: TalentStatus::UnderReview,
    })
}

fn validate_company(
    form: CompanyApplicationForm,
    actor: Option<&Actor>,
) -> Result<NewCompany, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let company_name = required_text(&mut errors, "company_name", &form.company_name, NAME_LIMIT);
    let contact_name = required_text(&mut errors, "contact_name", &form.contact_name, NAME_LIMIT);
    let email = email_field(&mut errors, &form.email);
    let company_size = enum_field(
        &mut errors,
        "company_size",
        &form.company_size,
        CompanySize::parse,
        CompanySize::allowed_values,
    );
    let website = optional_text(form.website);
    if let Some(url) = &website {
        if !is_valid_web_url(url) {
            errors.push("website", "must be an http(s) URL");
        }
    }

    errors.into_result()?;
    let Some(company_size) = company_size else {
        return Err(ValidationErrors::single("company_size", "is required"));
    };

    Ok(NewCompany {
        user_id: actor.map(|actor| actor.user_id.clone()),
        company_name,
        contact_name,
        email,
        phone: optional_text(form.phone),
        company_size,
        website,
        locale: form.locale.as_deref().map(Locale::from_tag).unwrap_or_default(),
        application_status: CompanyStatus::UnderReview,
    })
}

type ValidHiringRequest = (String, Vec<TalentRole>, ProjectType, Option<String>, String);

fn validate_hiring_request(form: HiringRequestForm) -> Result<ValidHiringRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required_text(&mut errors, "title", &form.title, NAME_LIMIT * 2);
    let description = required_text(
        &mut errors,
        "description",
        &form.description,
        LONG_TEXT_LIMIT,
    );

    let mut roles_needed = Vec::with_capacity(form.roles_needed.len());
    for raw in &form.roles_needed {
        match TalentRole::parse(raw) {
            Some(role) if !roles_needed.contains(&role) => roles_needed.push(role),
            Some(_) => {}
            None => errors.push(
                "roles_needed",
                format!(
                    "'{raw}' is not a role (expected one of: {})",
                    TalentRole::allowed_values()
                ),
            ),
        }
    }
    if form.roles_needed.is_empty() {
        errors.push("roles_needed", "at least one role is required");
    }

    let project_type = enum_field(
        &mut errors,
        "project_type",
        &form.project_type,
        ProjectType::parse,
        ProjectType::allowed_values,
    );

    errors.into_result()?;
    let Some(project_type) = project_type else {
        return Err(ValidationErrors::single("project_type", "is required"));
    };

    Ok((
        title,
        roles_needed,
        project_type,
        optional_text(form.budget_range),
        description,
    ))
}
