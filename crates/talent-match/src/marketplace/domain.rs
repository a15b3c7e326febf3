use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed string-backed enum with its wire labels in one place so
/// serde, validation, and filtering all agree on the accepted values.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                match raw.trim() {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn allowed_values() -> String {
                Self::ALL
                    .iter()
                    .map(|value| value.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labeled_enum! {
    /// Review pipeline for individual applicants.
    TalentStatus {
        UnderReview => "under_review",
        Screening => "screening",
        Interviewing => "interviewing",
        Training => "training",
        PendingMatching => "pending_matching",
        Matched => "matched",
        Rejected => "rejected",
    }
}

labeled_enum! {
    /// Review pipeline shared by hiring requests and the legacy company status.
    CompanyStatus {
        UnderReview => "under_review",
        ReviewingCandidates => "reviewing_candidates",
        InterviewingCandidates => "interviewing_candidates",
        Negotiating => "negotiating",
        Matched => "matched",
        Rejected => "rejected",
    }
}

labeled_enum! {
    RequestStatus {
        Open => "open",
        Filled => "filled",
        Cancelled => "cancelled",
    }
}

labeled_enum! {
    TalentRole {
        Frontend => "frontend",
        Backend => "backend",
        Fullstack => "fullstack",
        Mobile => "mobile",
        Devops => "devops",
        Data => "data",
        AiMl => "ai_ml",
        Design => "design",
        Product => "product",
        Qa => "qa",
    }
}

labeled_enum! {
    EnglishLevel {
        Basic => "basic",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Fluent => "fluent",
        Native => "native",
    }
}

labeled_enum! {
    CompanySize {
        Micro => "1-10",
        Small => "11-50",
        Medium => "51-200",
        Large => "201-500",
        Enterprise => "500+",
    }
}

labeled_enum! {
    ProjectType {
        NewProduct => "new_product",
        ExistingProduct => "existing_product",
        Mvp => "mvp",
        Maintenance => "maintenance",
        Other => "other",
    }
}

labeled_enum! {
    /// Languages the email templates may be rendered in.
    Locale {
        En => "en",
        Es => "es",
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::En
    }
}

impl Locale {
    /// Accepts tags such as `es-MX`; anything unknown becomes English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        Self::parse(&primary.to_ascii_lowercase()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TalentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HiringRequestId(pub String);

impl fmt::Display for TalentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for HiringRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talent {
    pub id: TalentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: TalentRole,
    pub english_level: EnglishLevel,
    pub portfolio_url: String,
    pub shipped: String,
    #[serde(default)]
    pub tools: Option<String>,
    /// Storage path in the private CV bucket; listings swap it for a signed URL.
    #[serde(default)]
    pub cv_url: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub locale: Locale,
    pub application_status: TalentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub company_size: CompanySize,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub locale: Locale,
    pub application_status: CompanyStatus,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn summary(&self) -> CompanySummary {
        CompanySummary {
            id: self.id.clone(),
            company_name: self.company_name.clone(),
            contact_name: self.contact_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Owning-company columns embedded in hiring request listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: CompanyId,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringRequest {
    pub id: HiringRequestId,
    pub company_id: CompanyId,
    pub title: String,
    pub roles_needed: Vec<TalentRole>,
    pub project_type: ProjectType,
    #[serde(default)]
    pub budget_range: Option<String>,
    pub description: String,
    pub request_status: RequestStatus,
    pub application_status: CompanyStatus,
    #[serde(default)]
    pub matched_talent_id: Option<TalentId>,
    #[serde(default)]
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row values supplied when a talent application is inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTalent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: TalentRole,
    pub english_level: EnglishLevel,
    pub portfolio_url: String,
    pub shipped: String,
    pub tools: Option<String>,
    pub cv_url: Option<String>,
    pub profile_image_url: Option<String>,
    pub locale: Locale,
    pub application_status: TalentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCompany {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_size: CompanySize,
    pub website: Option<String>,
    pub locale: Locale,
    pub application_status: CompanyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHiringRequest {
    pub company_id: CompanyId,
    pub title: String,
    pub roles_needed: Vec<TalentRole>,
    pub project_type: ProjectType,
    pub budget_range: Option<String>,
    pub description: String,
    pub request_status: RequestStatus,
    pub application_status: CompanyStatus,
}

/// Partial update applied to a hiring request row. `None` leaves a column
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HiringRequestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<CompanyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_talent_id: Option<TalentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Talent,
    Company,
    HiringRequest,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Talent => "talent",
            EntityKind::Company => "company",
            EntityKind::HiringRequest => "hiring_request",
        }
    }

    /// Accepts the singular and plural path segments used by the HTTP routes.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "talent" | "talents" => Some(Self::Talent),
            "company" | "companies" => Some(Self::Company),
            "hiring_request" | "hiring_requests" | "hiring-request" | "hiring-requests" => {
                Some(Self::HiringRequest)
            }
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Any entity returned by a status transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Talent(Talent),
    Company(Company),
    HiringRequest(HiringRequest),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Talent(_) => EntityKind::Talent,
            Entity::Company(_) => EntityKind::Company,
            Entity::HiringRequest(_) => EntityKind::HiringRequest,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Talent(talent) => &talent.id.0,
            Entity::Company(company) => &company.id.0,
            Entity::HiringRequest(request) => &request.id.0,
        }
    }
}
