use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    Company, CompanyId, CompanyStatus, HiringRequest, HiringRequestId, HiringRequestPatch,
    NewCompany, NewHiringRequest, NewTalent, Talent, TalentId, TalentStatus,
};
use super::query::ListingQuery;
use crate::config::ConfigError;

pub type StoreResult<T> = Result<T, StoreError>;

/// One window of rows plus the exact size of the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
}

/// Row-level access to the hosted relational store.
///
/// Update methods return `Ok(None)` when no row matches the id so callers can
/// tell a missing entity apart from a failed call.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn insert_talent(&self, talent: NewTalent) -> StoreResult<Talent>;
    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company>;
    async fn insert_hiring_request(&self, request: NewHiringRequest) -> StoreResult<HiringRequest>;

    async fn fetch_talent(&self, id: &TalentId) -> StoreResult<Option<Talent>>;
    async fn fetch_company(&self, id: &CompanyId) -> StoreResult<Option<Company>>;
    async fn fetch_hiring_request(&self, id: &HiringRequestId)
        -> StoreResult<Option<HiringRequest>>;
    async fn company_for_user(&self, user_id: &str) -> StoreResult<Option<Company>>;
    async fn talent_for_user(&self, user_id: &str) -> StoreResult<Option<Talent>>;

    async fn update_talent_status(
        &self,
        id: &TalentId,
        status: TalentStatus,
    ) -> StoreResult<Option<Talent>>;
    async fn update_company_status(
        &self,
        id: &CompanyId,
        status: CompanyStatus,
    ) -> StoreResult<Option<Company>>;
    async fn update_hiring_request(
        &self,
        id: &HiringRequestId,
        patch: HiringRequestPatch,
    ) -> StoreResult<Option<HiringRequest>>;
    async fn update_talent_profile_image(
        &self,
        id: &TalentId,
        url: &str,
    ) -> StoreResult<Option<Talent>>;

    async fn list_talents(&self, query: &ListingQuery) -> StoreResult<RowPage<Talent>>;
    async fn list_companies(&self, query: &ListingQuery) -> StoreResult<RowPage<Company>>;
    async fn list_hiring_requests(&self, query: &ListingQuery)
        -> StoreResult<RowPage<HiringRequest>>;
    /// Foreign-key lookup used to embed owners into hiring request listings.
    async fn companies_by_ids(&self, ids: &[CompanyId]) -> StoreResult<Vec<Company>>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("store unreachable: {0}")]
    Transport(String),
    #[error("store rejected request with status {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("unexpected store payload: {0}")]
    Decode(String),
}

/// Private/public buckets in the hosted object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    #[serde(rename = "cvs")]
    Cvs,
    #[serde(rename = "profile-images")]
    ProfileImages,
}

impl Bucket {
    pub const fn name(self) -> &'static str {
        match self {
            Bucket::Cvs => "cvs",
            Bucket::ProfileImages => "profile-images",
        }
    }

    pub const fn is_public(self) -> bool {
        matches!(self, Bucket::ProfileImages)
    }
}

/// Object store used for CVs and profile images.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    fn public_url(&self, bucket: Bucket, path: &str) -> Result<String, StorageError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("object store unreachable: {0}")]
    Transport(String),
    #[error("object store rejected request with status {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("object not found: {0}")]
    NotFound(String),
}

/// Capability level carried by an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Member,
}

/// Authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub email: Option<String>,
    pub role: ActorRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

/// Resolves bearer tokens issued by the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `Ok(None)` for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, AuthError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
