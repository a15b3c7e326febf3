//! Talent marketplace: applications, admin review, hiring requests, and the
//! notifications that accompany each state change.

pub mod auth;
pub mod domain;
pub mod error;
pub mod events;
pub mod intake;
pub mod listings;
pub mod matching;
pub mod notifications;
pub mod query;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;
pub mod uploads;

#[cfg(test)]
mod tests;

pub use domain::{
    Company, CompanyId, CompanySize, CompanyStatus, CompanySummary, EnglishLevel, Entity,
    EntityKind, HiringRequest, HiringRequestId, HiringRequestPatch, Locale, NewCompany,
    NewHiringRequest, NewTalent, ProjectType, RequestStatus, Talent, TalentId, TalentRole,
    TalentStatus,
};
pub use error::{FieldError, MarketplaceError, ValidationErrors};
pub use intake::{
    CompanyApplicationForm, HiringRequestForm, IntakeService, Submitted, TalentApplicationForm,
};
pub use listings::{AdminListingService, HiringRequestRow, CV_LINK_TTL};
pub use matching::{MatchOutcome, MatchingService};
pub use notifications::{
    EmailTransport, Notification, NotificationSender, OutboundEmail, Recipient, SendError,
    TemplateKey,
};
pub use query::{build_query, ListingFilters, ListingQuery, Page, PageMeta, Pagination, Table};
pub use repository::{
    Actor, ActorRole, AuthError, Bucket, FileStore, IdentityProvider, MarketplaceStore, RowPage,
    StorageError, StoreError, StoreResult,
};
pub use router::marketplace_router;
pub use service::{Marketplace, MarketplaceBackends};
pub use status::{StatusTarget, StatusTransitionService, Transition};
pub use uploads::{StoredUpload, UploadError, UploadPolicy, UploadService, UploadedFile};
