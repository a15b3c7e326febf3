//! Process-local adapters used by tests, the CLI demo, and `--in-memory`
//! serving.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::marketplace::domain::{
    Company, CompanyId, CompanyStatus, HiringRequest, HiringRequestId, HiringRequestPatch,
    NewCompany, NewHiringRequest, NewTalent, Talent, TalentId, TalentStatus,
};
use crate::marketplace::notifications::{EmailTransport, OutboundEmail, SendError};
use crate::marketplace::query::ListingQuery;
use crate::marketplace::repository::{
    Actor, AuthError, Bucket, FileStore, IdentityProvider, MarketplaceStore, RowPage,
    StorageError, StoreError, StoreResult,
};

trait Row: Serialize + Clone {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Row for Talent {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Row for Company {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Row for HiringRequest {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Default)]
struct Tables {
    talents: Vec<Talent>,
    companies: Vec<Company>,
    hiring_requests: Vec<HiringRequest>,
    last_created: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing so "newest first" is well defined for rows
    /// inserted within the same clock tick.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_created {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_created = Some(stamp);
        stamp
    }
}

/// Row store backed by vectors behind a mutex.
#[derive(Default, Clone)]
pub struct InMemoryMarketplaceStore {
    tables: Arc<Mutex<Tables>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts and updates performed so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn talents(&self) -> Vec<Talent> {
        self.lock().talents.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.lock().companies.clone()
    }

    pub fn hiring_requests(&self) -> Vec<HiringRequest> {
        self.lock().hiring_requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Applies equality constraints, ordering, and the row window the way the
/// hosted row API does.
fn select<T: Row>(rows: &[T], query: &ListingQuery) -> StoreResult<RowPage<T>> {
    let mut matching = Vec::new();
    for row in rows {
        let value = serde_json::to_value(row).map_err(|err| StoreError::Decode(err.to_string()))?;
        let keep = query.constraints.iter().all(|constraint| {
            column_text(&value, constraint.column).as_deref() == Some(constraint.value.as_str())
        });
        if keep {
            matching.push((value, row.clone()));
        }
    }

    matching.sort_by(|(left_value, left), (right_value, right)| {
        let ordering = if query.order.column == "created_at" {
            left.created_at().cmp(&right.created_at())
        } else {
            column_text(left_value, query.order.column)
                .cmp(&column_text(right_value, query.order.column))
        };
        if query.order.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let total_count = matching.len() as u64;
    let rows = matching
        .into_iter()
        .map(|(_, row)| row)
        .skip(usize::try_from(query.range.from).unwrap_or(usize::MAX))
        .take(usize::try_from(query.range.to.saturating_sub(query.range.from) + 1).unwrap_or(0))
        .collect();

    Ok(RowPage { rows, total_count })
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryMarketplaceStore {
    async fn insert_talent(&self, talent: NewTalent) -> StoreResult<Talent> {
        let mut tables = self.lock();
        let created_at = tables.next_created_at();
        let row = Talent {
            id: TalentId(new_id()),
            user_id: talent.user_id,
            first_name: talent.first_name,
            last_name: talent.last_name,
            email: talent.email,
            phone: talent.phone,
            role: talent.role,
            english_level: talent.english_level,
            portfolio_url: talent.portfolio_url,
            shipped: talent.shipped,
            tools: talent.tools,
            cv_url: talent.cv_url,
            profile_image_url: talent.profile_image_url,
            locale: talent.locale,
            application_status: talent.application_status,
            created_at,
        };
        tables.talents.push(row.clone());
        drop(tables);
        self.record_write();
        Ok(row)
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        let mut tables = self.lock();
        let created_at = tables.next_created_at();
        let row = Company {
            id: CompanyId(new_id()),
            user_id: company.user_id,
            company_name: company.company_name,
            contact_name: company.contact_name,
            email: company.email,
            phone: company.phone,
            company_size: company.company_size,
            website: company.website,
            locale: company.locale,
            application_status: company.application_status,
            created_at,
        };
        tables.companies.push(row.clone());
        drop(tables);
        self.record_write();
        Ok(row)
    }

    async fn insert_hiring_request(&self, request: NewHiringRequest) -> StoreResult<HiringRequest> {
        let mut tables = self.lock();
        let created_at = tables.next_created_at();
        let row = HiringRequest {
            id: HiringRequestId(new_id()),
            company_id: request.company_id,
            title: request.title,
            roles_needed: request.roles_needed,
            project_type: request.project_type,
            budget_range: request.budget_range,
            description: request.description,
            request_status: request.request_status,
            application_status: request.application_status,
            matched_talent_id: None,
            matched_at: None,
            created_at,
        };
        tables.hiring_requests.push(row.clone());
        drop(tables);
        self.record_write();
        Ok(row)
    }

    async fn fetch_talent(&self, id: &TalentId) -> StoreResult<Option<Talent>> {
        Ok(self.lock().talents.iter().find(|row| &row.id == id).cloned())
    }

    async fn fetch_company(&self, id: &CompanyId) -> StoreResult<Option<Company>> {
        Ok(self.lock().companies.iter().find(|row| &row.id == id).cloned())
    }

    async fn fetch_hiring_request(
        &self,
        id: &HiringRequestId,
    ) -> StoreResult<Option<HiringRequest>> {
        Ok(self
            .lock()
            .hiring_requests
            .iter()
            .find(|row| &row.id == id)
            .cloned())
    }

    async fn company_for_user(&self, user_id: &str) -> StoreResult<Option<Company>> {
        Ok(self
            .lock()
            .companies
            .iter()
            .find(|row| row.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn talent_for_user(&self, user_id: &str) -> StoreResult<Option<Talent>> {
        Ok(self
            .lock()
            .talents
            .iter()
            .find(|row| row.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn update_talent_status(
        &self,
        id: &TalentId,
        status: TalentStatus,
    ) -> StoreResult<Option<Talent>> {
        let updated = self
            .lock()
            .talents
            .iter_mut()
            .find(|row| &row.id == id)
            .map(|row| {
                row.application_status = status;
                row.clone()
            });
        self.record_write();
        Ok(updated)
    }

    async fn update_company_status(
        &self,
        id: &CompanyId,
        status: CompanyStatus,
    ) -> StoreResult<Option<Company>> {
        let updated = self
            .lock()
            .companies
            .iter_mut()
            .find(|row| &row.id == id)
            .map(|row| {
                row.application_status = status;
                row.clone()
            });
        self.record_write();
        Ok(updated)
    }

    async fn update_hiring_request(
        &self,
        id: &HiringRequestId,
        patch: HiringRequestPatch,
    ) -> StoreResult<Option<HiringRequest>> {
        let updated = self
            .lock()
            .hiring_requests
            .iter_mut()
            .find(|row| &row.id == id)
            .map(|row| {
                if let Some(status) = patch.application_status {
                    row.application_status = status;
                }
                if let Some(status) = patch.request_status {
                    row.request_status = status;
                }
                if let Some(talent_id) = patch.matched_talent_id.clone() {
                    row.matched_talent_id = Some(talent_id);
                }
                if let Some(matched_at) = patch.matched_at {
                    row.matched_at = Some(matched_at);
                }
                row.clone()
            });
        self.record_write();
        Ok(updated)
    }

    async fn update_talent_profile_image(
        &self,
        id: &TalentId,
        url: &str,
    ) -> StoreResult<Option<Talent>> {
        let updated = self
            .lock()
            .talents
            .iter_mut()
            .find(|row| &row.id == id)
            .map(|row| {
                row.profile_image_url = Some(url.to_string());
                row.clone()
            });
        self.record_write();
        Ok(updated)
    }

    async fn list_talents(&self, query: &ListingQuery) -> StoreResult<RowPage<Talent>> {
        select(&self.lock().talents, query)
    }

    async fn list_companies(&self, query: &ListingQuery) -> StoreResult<RowPage<Company>> {
        select(&self.lock().companies, query)
    }

    async fn list_hiring_requests(
        &self,
        query: &ListingQuery,
    ) -> StoreResult<RowPage<HiringRequest>> {
        select(&self.lock().hiring_requests, query)
    }

    async fn companies_by_ids(&self, ids: &[CompanyId]) -> StoreResult<Vec<Company>> {
        Ok(self
            .lock()
            .companies
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store keeping files in a map. Signing can be made to fail for
/// chosen paths.
#[derive(Default, Clone)]
pub struct InMemoryFileStore {
    objects: Arc<Mutex<HashMap<(Bucket, String), StoredObject>>>,
    unsignable: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryFileStore {
    pub const BASE_URL: &'static str = "memory://storage";

    pub fn new() -> Self {
        Self::default()
    }

    /// Places an object directly, bypassing upload policy.
    pub fn put(&self, bucket: Bucket, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                (bucket, path.to_string()),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
    }

    pub fn object(&self, bucket: Bucket, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(bucket, path.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Makes every signing request for `path` fail.
    pub fn fail_signing(&self, path: &str) {
        self.unsignable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_string());
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.put(bucket, path, bytes, content_type);
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let blocked = self
            .unsignable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(path);
        if blocked {
            return Err(StorageError::Backend {
                status: 500,
                message: format!("signing disabled for {path}"),
            });
        }
        if self.object(bucket, path).is_none() {
            return Err(StorageError::NotFound(format!("{}/{path}", bucket.name())));
        }
        Ok(format!(
            "{}/sign/{}/{path}?token={}&expiresIn={}",
            Self::BASE_URL,
            bucket.name(),
            Uuid::new_v4().simple(),
            ttl.as_secs()
        ))
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> Result<String, StorageError> {
        Ok(format!("{}/public/{}/{path}", Self::BASE_URL, bucket.name()))
    }
}

/// Fixed token table standing in for the identity provider.
#[derive(Default, Clone)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Actor>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.tokens.insert(token.into(), actor);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Email transport that keeps every message instead of sending it.
#[derive(Default, Clone)]
pub struct OutboxTransport {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl OutboxTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EmailTransport for OutboxTransport {
    async fn deliver(&self, email: OutboundEmail) -> Result<(), SendError> {
        info!(
            to = %email.to,
            template = %email.template,
            subject = %email.subject,
            "email captured in outbox"
        );
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(email);
        Ok(())
    }
}
