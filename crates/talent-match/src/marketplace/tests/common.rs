use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::adapters::{
    InMemoryFileStore, InMemoryMarketplaceStore, OutboxTransport, StaticIdentityProvider,
};
use crate::marketplace::domain::{
    Company, CompanyId, CompanySize, CompanyStatus, EnglishLevel, HiringRequest, HiringRequestId,
    HiringRequestPatch, Locale, NewCompany, NewHiringRequest, NewTalent, ProjectType,
    RequestStatus, Talent, TalentId, TalentRole, TalentStatus,
};
use crate::marketplace::notifications::{EmailTransport, OutboundEmail, SendError};
use crate::marketplace::query::ListingQuery;
use crate::marketplace::repository::{
    Actor, ActorRole, AuthError, IdentityProvider, MarketplaceStore, RowPage, StoreError,
    StoreResult,
};
use crate::marketplace::{marketplace_router, Marketplace, MarketplaceBackends, TalentApplicationForm};

pub(super) const ADMIN_TOKEN: &str = "admin-token";
pub(super) const MEMBER_TOKEN: &str = "member-token";
pub(super) const COMPANY_TOKEN: &str = "company-token";
pub(super) const COMPANY_USER: &str = "user-company";
pub(super) const MEMBER_USER: &str = "user-member";

pub(super) fn admin() -> Actor {
    Actor {
        user_id: "user-admin".to_string(),
        email: Some("ops@talentmatch.dev".to_string()),
        role: ActorRole::Admin,
    }
}

pub(super) fn member(user_id: &str) -> Actor {
    Actor {
        user_id: user_id.to_string(),
        email: None,
        role: ActorRole::Member,
    }
}

/// In-memory backends plus the services wired over them.
pub(super) struct Harness {
    pub(super) store: InMemoryMarketplaceStore,
    pub(super) files: InMemoryFileStore,
    pub(super) outbox: OutboxTransport,
    pub(super) marketplace: Arc<Marketplace>,
}

pub(super) fn harness() -> Harness {
    let store = InMemoryMarketplaceStore::new();
    let files = InMemoryFileStore::new();
    let outbox = OutboxTransport::new();
    let marketplace = marketplace_over(Arc::new(store.clone()), files.clone(), Arc::new(outbox.clone()));
    Harness {
        store,
        files,
        outbox,
        marketplace,
    }
}

pub(super) fn marketplace_over(
    store: Arc<dyn MarketplaceStore>,
    files: InMemoryFileStore,
    email: Arc<dyn EmailTransport>,
) -> Arc<Marketplace> {
    let identity = StaticIdentityProvider::new()
        .with_token(ADMIN_TOKEN, admin())
        .with_token(MEMBER_TOKEN, member(MEMBER_USER))
        .with_token(COMPANY_TOKEN, member(COMPANY_USER));
    Arc::new(Marketplace::new(MarketplaceBackends {
        store,
        files: Arc::new(files),
        identity: Arc::new(identity),
        email,
    }))
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        marketplace_router(Arc::clone(&self.marketplace))
    }
}

pub(super) fn new_talent(first_name: &str) -> NewTalent {
    NewTalent {
        user_id: None,
        first_name: first_name.to_string(),
        last_name: "Lovelace".to_string(),
        email: format!("{}@example.com", first_name.to_ascii_lowercase()),
        phone: None,
        role: TalentRole::Backend,
        english_level: EnglishLevel::Fluent,
        portfolio_url: "https://example.com/portfolio".to_string(),
        shipped: "Payments platform".to_string(),
        tools: Some("Rust, Postgres".to_string()),
        cv_url: None,
        profile_image_url: None,
        locale: Locale::En,
        application_status: TalentStatus::UnderReview,
    }
}

pub(super) async fn seed_talent(store: &dyn MarketplaceStore, first_name: &str) -> Talent {
    store
        .insert_talent(new_talent(first_name))
        .await
        .expect("talent inserted")
}

pub(super) async fn seed_company(store: &dyn MarketplaceStore, user_id: Option<&str>) -> Company {
    store
        .insert_company(NewCompany {
            user_id: user_id.map(str::to_string),
            company_name: "Initech".to_string(),
            contact_name: "Bill Lumbergh".to_string(),
            email: "bill@initech.com".to_string(),
            phone: None,
            company_size: CompanySize::Small,
            website: Some("https://initech.com".to_string()),
            locale: Locale::En,
            application_status: CompanyStatus::UnderReview,
        })
        .await
        .expect("company inserted")
}

pub(super) async fn seed_request(store: &dyn MarketplaceStore, company: &Company) -> HiringRequest {
    store
        .insert_hiring_request(NewHiringRequest {
            company_id: company.id.clone(),
            title: "Payments rebuild".to_string(),
            roles_needed: vec![TalentRole::Backend],
            project_type: ProjectType::ExistingProduct,
            budget_range: Some("$10k-$20k".to_string()),
            description: "Replace the legacy ledger".to_string(),
            request_status: RequestStatus::Open,
            application_status: CompanyStatus::UnderReview,
        })
        .await
        .expect("hiring request inserted")
}

pub(super) fn talent_form() -> TalentApplicationForm {
    TalentApplicationForm {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@example.com".to_string(),
        role: "backend".to_string(),
        english_level: "native".to_string(),
        portfolio_url: "https://grace.dev".to_string(),
        shipped: "COBOL compiler".to_string(),
        ..TalentApplicationForm::default()
    }
}

/// Lets detached notification tasks run to completion on the test runtime.
pub(super) async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

pub(super) fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) const BOUNDARY: &str = "talent-match-boundary";

pub(super) fn multipart_request(
    uri: &str,
    token: Option<&str>,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Every call fails as if the database were down.
pub(super) struct UnavailableStore;

fn offline<T>() -> StoreResult<T> {
    Err(StoreError::Transport("database offline".to_string()))
}

#[async_trait]
impl MarketplaceStore for UnavailableStore {
    async fn insert_talent(&self, _talent: NewTalent) -> StoreResult<Talent> {
        offline()
    }

    async fn insert_company(&self, _company: NewCompany) -> StoreResult<Company> {
        offline()
    }

    async fn insert_hiring_request(&self, _request: NewHiringRequest) -> StoreResult<HiringRequest> {
        offline()
    }

    async fn fetch_talent(&self, _id: &TalentId) -> StoreResult<Option<Talent>> {
        offline()
    }

    async fn fetch_company(&self, _id: &CompanyId) -> StoreResult<Option<Company>> {
        offline()
    }

    async fn fetch_hiring_request(
        &self,
        _id: &HiringRequestId,
    ) -> StoreResult<Option<HiringRequest>> {
        offline()
    }

    async fn company_for_user(&self, _user_id: &str) -> StoreResult<Option<Company>> {
        offline()
    }

    async fn talent_for_user(&self, _user_id: &str) -> StoreResult<Option<Talent>> {
        offline()
    }

    async fn update_talent_status(
        &self,
        _id: &TalentId,
        _status: TalentStatus,
    ) -> StoreResult<Option<Talent>> {
        offline()
    }

    async fn update_company_status(
        &self,
        _id: &CompanyId,
        _status: CompanyStatus,
    ) -> StoreResult<Option<Company>> {
        offline()
    }

    async fn update_hiring_request(
        &self,
        _id: &HiringRequestId,
        _patch: HiringRequestPatch,
    ) -> StoreResult<Option<HiringRequest>> {
        offline()
    }

    async fn update_talent_profile_image(
        &self,
        _id: &TalentId,
        _url: &str,
    ) -> StoreResult<Option<Talent>> {
        offline()
    }

    async fn list_talents(&self, _query: &ListingQuery) -> StoreResult<RowPage<Talent>> {
        offline()
    }

    async fn list_companies(&self, _query: &ListingQuery) -> StoreResult<RowPage<Company>> {
        offline()
    }

    async fn list_hiring_requests(
        &self,
        _query: &ListingQuery,
    ) -> StoreResult<RowPage<HiringRequest>> {
        offline()
    }

    async fn companies_by_ids(&self, _ids: &[CompanyId]) -> StoreResult<Vec<Company>> {
        offline()
    }
}

/// Delegates to the in-memory store, failing status writes on demand.
#[derive(Clone)]
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryMarketplaceStore,
    fail_talent_updates: Arc<AtomicBool>,
    fail_request_updates: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(super) fn new(inner: InMemoryMarketplaceStore) -> Self {
        Self {
            inner,
            fail_talent_updates: Arc::new(AtomicBool::new(false)),
            fail_request_updates: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(super) fn fail_talent_updates(&self, fail: bool) {
        self.fail_talent_updates.store(fail, Ordering::SeqCst);
    }

    pub(super) fn fail_request_updates(&self, fail: bool) {
        self.fail_request_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketplaceStore for FlakyStore {
    async fn insert_talent(&self, talent: NewTalent) -> StoreResult<Talent> {
        self.inner.insert_talent(talent).await
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        self.inner.insert_company(company).await
    }

    async fn insert_hiring_request(&self, request: NewHiringRequest) -> StoreResult<HiringRequest> {
        self.inner.insert_hiring_request(request).await
    }

    async fn fetch_talent(&self, id: &TalentId) -> StoreResult<Option<Talent>> {
        self.inner.fetch_talent(id).await
    }

    async fn fetch_company(&self, id: &CompanyId) -> StoreResult<Option<Company>> {
        self.inner.fetch_company(id).await
    }

    async fn fetch_hiring_request(&self, id: &HiringRequestId) -> StoreResult<Option<HiringRequest>> {
        self.inner.fetch_hiring_request(id).await
    }

    async fn company_for_user(&self, user_id: &str) -> StoreResult<Option<Company>> {
        self.inner.company_for_user(user_id).await
    }

    async fn talent_for_user(&self, user_id: &str) -> StoreResult<Option<Talent>> {
        self.inner.talent_for_user(user_id).await
    }

    async fn update_talent_status(
        &self,
        id: &TalentId,
        status: TalentStatus,
    ) -> StoreResult<Option<Talent>> {
        if self.fail_talent_updates.load(Ordering::SeqCst) {
            return offline();
        }
        self.inner.update_talent_status(id, status).await
    }

    async fn update_company_status(
        &self,
        id: &CompanyId,
        status: CompanyStatus,
    ) -> StoreResult<Option<Company>> {
        self.inner.update_company_status(id, status).await
    }

    async fn update_hiring_request(
        &self,
        id: &HiringRequestId,
        patch: HiringRequestPatch,
    ) -> StoreResult<Option<HiringRequest>> {
        if self.fail_request_updates.load(Ordering::SeqCst) {
            return offline();
        }
        self.inner.update_hiring_request(id, patch).await
    }

    async fn update_talent_profile_image(&self, id: &TalentId, url: &str) -> StoreResult<Option<Talent>> {
        self.inner.update_talent_profile_image(id, url).await
    }

    async fn list_talents(&self, query: &ListingQuery) -> StoreResult<RowPage<Talent>> {
        self.inner.list_talents(query).await
    }

    async fn list_companies(&self, query: &ListingQuery) -> StoreResult<RowPage<Company>> {
        self.inner.list_companies(query).await
    }

    async fn list_hiring_requests(&self, query: &ListingQuery) -> StoreResult<RowPage<HiringRequest>> {
        self.inner.list_hiring_requests(query).await
    }

    async fn companies_by_ids(&self, ids: &[CompanyId]) -> StoreResult<Vec<Company>> {
        self.inner.companies_by_ids(ids).await
    }
}

/// Identity provider whose backing service is down.
pub(super) struct UnreachableIdentity;

#[async_trait]
impl IdentityProvider for UnreachableIdentity {
    async fn resolve(&self, _token: &str) -> Result<Option<Actor>, AuthError> {
        Err(AuthError::Unavailable("connection refused".to_string()))
    }
}

/// Provider that rejects every message.
#[derive(Default, Clone)]
pub(super) struct RejectingTransport {
    attempts: Arc<std::sync::atomic::AtomicUsize>,
}

impl RejectingTransport {
    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailTransport for RejectingTransport {
    async fn deliver(&self, _email: OutboundEmail) -> Result<(), SendError> {
        self.attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(SendError::Provider {
            status: Some(500),
            message: "provider down".to_string(),
        })
    }
}
