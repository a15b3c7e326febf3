//! Adapters for the hosted backend: a PostgREST-style row API, an object
//! store, and the identity provider, all under one base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{ConfigError, StoreConfig};
use crate::marketplace::domain::{
    Company, CompanyId, CompanyStatus, HiringRequest, HiringRequestId, HiringRequestPatch,
    NewCompany, NewHiringRequest, NewTalent, Talent, TalentId, TalentStatus,
};
use crate::marketplace::query::{ListingQuery, Table};
use crate::marketplace::repository::{
    Actor, ActorRole, AuthError, Bucket, FileStore, IdentityProvider, MarketplaceStore, RowPage,
    StorageError, StoreError, StoreResult,
};

/// Credentials shared by the three hosted adapters.
#[derive(Clone)]
struct Endpoint {
    client: Client,
    config: StoreConfig,
}

impl Endpoint {
    fn url(&self, path: &str) -> Result<String, ConfigError> {
        Ok(format!("{}{path}", self.config.base_url()?))
    }

    /// Attaches the service key. Missing credentials surface here, at first
    /// use.
    fn service(&self, builder: RequestBuilder) -> Result<RequestBuilder, ConfigError> {
        let key = self.config.service_key()?;
        Ok(builder.header("apikey", key).bearer_auth(key))
    }
}

async fn error_body(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|err| format!("unreadable error body: {err}"));
    (status, message)
}

/// Row access through `/rest/v1/{table}`.
#[derive(Clone)]
pub struct HostedStore {
    endpoint: Endpoint,
}

impl HostedStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: StoreConfig) -> Self {
        Self {
            endpoint: Endpoint { client, config },
        }
    }

    fn table_url(&self, table: Table) -> StoreResult<String> {
        Ok(self.endpoint.url(&format!("/rest/v1/{}", table.name()))?)
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .endpoint
            .service(builder)?
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let (status, message) = error_body(response).await;
            Err(StoreError::Backend { status, message })
        }
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> StoreResult<Vec<T>> {
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn insert<B, T>(&self, table: Table, body: &B) -> StoreResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .endpoint
            .client
            .post(self.table_url(table)?)
            .header("Prefer", "return=representation")
            .json(body);
        let rows = Self::rows::<T>(self.send(request).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no row", table.name())))
    }

    async fn find_one<T: DeserializeOwned>(
        &self,
        table: Table,
        column: &str,
        value: &str,
    ) -> StoreResult<Option<T>> {
        let request = self
            .endpoint
            .client
            .get(self.table_url(table)?)
            .query(&[("select", "*".to_string()), (column, format!("eq.{value}"))])
            .query(&[("limit", "1")]);
        let rows = Self::rows::<T>(self.send(request).await?).await?;
        Ok(rows.into_iter().next())
    }

    async fn patch<B, T>(&self, table: Table, id: &str, body: &B) -> StoreResult<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .endpoint
            .client
            .patch(self.table_url(table)?)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(body);
        let rows = Self::rows::<T>(self.send(request).await?).await?;
        Ok(rows.into_iter().next())
    }

    /// Filtered, ordered window plus the exact filtered count from
    /// `Content-Range`.
    async fn list<T: DeserializeOwned>(&self, query: &ListingQuery) -> StoreResult<RowPage<T>> {
        let mut params: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        for constraint in &query.constraints {
            params.push((constraint.column.to_string(), format!("eq.{}", constraint.value)));
        }
        let direction = if query.order.descending { "desc" } else { "asc" };
        params.push((
            "order".to_string(),
            format!("{}.{direction}", query.order.column),
        ));

        let request = self
            .endpoint
            .client
            .get(self.table_url(query.table)?)
            .query(&params)
            .header("Range-Unit", "items")
            .header("Range", format!("{}-{}", query.range.from, query.range.to))
            .header("Prefer", "count=exact");
        let request = self.endpoint.service(request)?;
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let total_count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(parse_total_count);

        // An offset past the last row is answered with 416; that is an empty
        // page, not a failure.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(RowPage {
                rows: Vec::new(),
                total_count: total_count.unwrap_or(0),
            });
        }
        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            return Err(StoreError::Backend { status, message });
        }

        let rows = Self::rows::<T>(response).await?;
        let total_count = total_count.ok_or_else(|| {
            StoreError::Decode(format!(
                "listing {} returned no exact count",
                query.table.name()
            ))
        })?;
        debug!(table = query.table.name(), total_count, rows = rows.len(), "listing fetched");
        Ok(RowPage { rows, total_count })
    }
}

/// Reads the total from `Content-Range: 0-19/45` or `*/45`.
pub fn parse_total_count(value: &HeaderValue) -> Option<u64> {
    let (_, total) = value.to_str().ok()?.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl MarketplaceStore for HostedStore {
    async fn insert_talent(&self, talent: NewTalent) -> StoreResult<Talent> {
        self.insert(Table::Talents, &talent).await
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        self.insert(Table::Companies, &company).await
    }

    async fn insert_hiring_request(&self, request: NewHiringRequest) -> StoreResult<HiringRequest> {
        self.insert(Table::HiringRequests, &request).await
    }

    async fn fetch_talent(&self, id: &TalentId) -> StoreResult<Option<Talent>> {
        self.find_one(Table::Talents, "id", &id.0).await
    }

    async fn fetch_company(&self, id: &CompanyId) -> StoreResult<Option<Company>> {
        self.find_one(Table::Companies, "id", &id.0).await
    }

    async fn fetch_hiring_request(
        &self,
        id: &HiringRequestId,
    ) -> StoreResult<Option<HiringRequest>> {
        self.find_one(Table::HiringRequests, "id", &id.0).await
    }

    async fn company_for_user(&self, user_id: &str) -> StoreResult<Option<Company>> {
        self.find_one(Table::Companies, "user_id", user_id).await
    }

    async fn talent_for_user(&self, user_id: &str) -> StoreResult<Option<Talent>> {
        self.find_one(Table::Talents, "user_id", user_id).await
    }

    async fn update_talent_status(
        &self,
        id: &TalentId,
        status: TalentStatus,
    ) -> StoreResult<Option<Talent>> {
        self.patch(Table::Talents, &id.0, &json!({ "application_status": status }))
            .await
    }

    async fn update_company_status(
        &self,
        id: &CompanyId,
        status: CompanyStatus,
    ) -> StoreResult<Option<Company>> {
        self.patch(Table::Companies, &id.0, &json!({ "application_status": status }))
            .await
    }

    async fn update_hiring_request(
        &self,
        id: &HiringRequestId,
        patch: HiringRequestPatch,
    ) -> StoreResult<Option<HiringRequest>> {
        self.patch(Table::HiringRequests, &id.0, &patch).await
    }

    async fn update_talent_profile_image(
        &self,
        id: &TalentId,
        url: &str,
    ) -> StoreResult<Option<Talent>> {
        self.patch(Table::Talents, &id.0, &json!({ "profile_image_url": url }))
            .await
    }

    async fn list_talents(&self, query: &ListingQuery) -> StoreResult<RowPage<Talent>> {
        self.list(query).await
    }

    async fn list_companies(&self, query: &ListingQuery) -> StoreResult<RowPage<Company>> {
        self.list(query).await
    }

    async fn list_hiring_requests(
        &self,
        query: &ListingQuery,
    ) -> StoreResult<RowPage<HiringRequest>> {
        self.list(query).await
    }

    async fn companies_by_ids(&self, ids: &[CompanyId]) -> StoreResult<Vec<Company>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.0.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let request = self
            .endpoint
            .client
            .get(self.table_url(Table::Companies)?)
            .query(&[("select", "*".to_string()), ("id", format!("in.({joined})"))]);
        Self::rows(self.send(request).await?).await
    }
}

/// Objects under `/storage/v1/object`.
#[derive(Clone)]
pub struct HostedFileStore {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl HostedFileStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: StoreConfig) -> Self {
        Self {
            endpoint: Endpoint { client, config },
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response, StorageError> {
        let response = self
            .endpoint
            .service(builder)?
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            _ => {
                let (status, message) = error_body(response).await;
                Err(StorageError::Backend { status, message })
            }
        }
    }
}

#[async_trait]
impl FileStore for HostedFileStore {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self
            .endpoint
            .url(&format!("/storage/v1/object/{}/{path}", bucket.name()))?;
        let request = self
            .endpoint
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.send(request, path).await?;
        debug!(bucket = bucket.name(), path, "object stored");
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let url = self
            .endpoint
            .url(&format!("/storage/v1/object/sign/{}/{path}", bucket.name()))?;
        let request = self
            .endpoint
            .client
            .post(url)
            .json(&json!({ "expiresIn": ttl.as_secs() }));
        let signed = self
            .send(request, path)
            .await?
            .json::<SignedUrlResponse>()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        Ok(format!(
            "{}/storage/v1{}",
            self.endpoint.config.base_url()?,
            signed.signed_url
        ))
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> Result<String, StorageError> {
        Ok(self
            .endpoint
            .url(&format!("/storage/v1/object/public/{}/{path}", bucket.name()))?)
    }
}

/// Resolves user tokens through `/auth/v1/user`.
#[derive(Clone)]
pub struct HostedIdentityProvider {
    endpoint: Endpoint,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    app_metadata: AppMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    role: Option<String>,
}

impl HostedIdentityProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: StoreConfig) -> Self {
        Self {
            endpoint: Endpoint { client, config },
        }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, AuthError> {
        let url = self.endpoint.url("/auth/v1/user")?;
        let key = self.endpoint.config.service_key()?;
        let response = self
            .endpoint
            .client
            .get(url)
            .header("apikey", key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user = response
                    .json::<UserPayload>()
                    .await
                    .map_err(|err| AuthError::Unavailable(err.to_string()))?;
                let role = match user.app_metadata.role.as_deref() {
                    Some("admin") => ActorRole::Admin,
                    _ => ActorRole::Member,
                };
                Ok(Some(Actor {
                    user_id: user.id,
                    email: user.email,
                    role,
                }))
            }
            status => Err(AuthError::Unavailable(format!(
                "identity provider answered {status}"
            ))),
        }
    }
}
