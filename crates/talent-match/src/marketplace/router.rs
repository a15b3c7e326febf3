use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::auth::require_admin;
use super::domain::EntityKind;
use super::error::{MarketplaceError, ValidationErrors};
use super::intake::{CompanyApplicationForm, HiringRequestForm, TalentApplicationForm};
use super::query::{ListingFilters, Pagination};
use super::service::Marketplace;
use super::status::{REQUEST_STATUS_FIELD, STATUS_FIELD};
use super::uploads::{UploadError, UploadedFile, FILE_FIELD};

/// Upload routes accept bodies above the policy ceilings so oversize files
/// reach the policy check and get a field error instead of a bare 413.
pub const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

const DEPRECATION: HeaderName = HeaderName::from_static("deprecation");

/// Router builder exposing the marketplace HTTP endpoints.
pub fn marketplace_router(marketplace: Arc<Marketplace>) -> Router {
    Router::new()
        .route("/entities/:kind/:id/status", patch(update_status))
        .route("/entities/:kind/:id/request-status", patch(update_request_status))
        .route("/admin/listings/:kind", get(admin_listing))
        .route("/admin/hiring-requests/:id/match", post(match_talent))
        .route("/applications/talent", post(submit_talent))
        .route("/applications/company", post(submit_company))
        .route("/hiring-requests", post(create_hiring_request))
        .route(
            "/uploads/cv",
            post(upload_cv).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/uploads/profile-image",
            post(upload_profile_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .with_state(marketplace)
}

type Shared = State<Arc<Marketplace>>;

#[derive(Debug, Deserialize)]
struct StatusChange {
    #[serde(default)]
    application_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestStatusChange {
    #[serde(default)]
    request_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchBody {
    #[serde(default)]
    talent_id: Option<String>,
}

async fn update_status(
    State(marketplace): Shared,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    require_admin(actor.as_ref())?;
    let kind = entity_kind(&kind)?;
    let Json(body) = body.map_err(|rejection| invalid_body(STATUS_FIELD, rejection))?;

    let transition = marketplace
        .status
        .transition(
            kind,
            &id,
            body.application_status.as_deref().unwrap_or_default(),
            actor.as_ref(),
        )
        .await?;
    // The email runs detached; dropping the handle does not cancel it.
    drop(transition.notification);

    let mut response = (StatusCode::OK, Json(transition.entity)).into_response();
    if kind == EntityKind::Company {
        response
            .headers_mut()
            .insert(DEPRECATION, HeaderValue::from_static("true"));
    }
    Ok(response)
}

async fn update_request_status(
    State(marketplace): Shared,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<RequestStatusChange>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    require_admin(actor.as_ref())?;
    if entity_kind(&kind)? != EntityKind::HiringRequest {
        return Err(ValidationErrors::single(
            "kind",
            "request status only exists on hiring requests",
        )
        .into());
    }
    let Json(body) = body.map_err(|rejection| invalid_body(REQUEST_STATUS_FIELD, rejection))?;

    let request = marketplace
        .status
        .transition_request_status(
            &id,
            body.request_status.as_deref().unwrap_or_default(),
            actor.as_ref(),
        )
        .await?;
    Ok((StatusCode::OK, Json(request)).into_response())
}

async fn admin_listing(
    State(marketplace): Shared,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    require_admin(actor.as_ref())?;
    let kind = entity_kind(&kind)?;

    let pagination = Pagination::from_params(
        numeric_param(&params, "page"),
        numeric_param(&params, "pageSize"),
    );
    let filters = ListingFilters::from(params);
    let listings = &marketplace.listings;

    let response = match kind {
        EntityKind::Talent => Json(listings.list_talents(&filters, pagination).await?).into_response(),
        EntityKind::Company => Json(listings.list_companies(pagination).await?).into_response(),
        EntityKind::HiringRequest => {
            Json(listings.list_hiring_requests(&filters, pagination).await?).into_response()
        }
    };
    Ok(response)
}

async fn match_talent(
    State(marketplace): Shared,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<MatchBody>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    require_admin(actor.as_ref())?;
    let Json(body) = body.map_err(|rejection| invalid_body("talent_id", rejection))?;

    let outcome = marketplace
        .matching
        .match_talent(
            &id,
            body.talent_id.as_deref().unwrap_or_default(),
            actor.as_ref(),
        )
        .await?;
    // Detached emails; not awaited on the request path.
    drop(outcome.notifications);
    Ok((StatusCode::OK, Json(outcome.request)).into_response())
}

async fn submit_talent(
    State(marketplace): Shared,
    headers: HeaderMap,
    body: Result<Json<TalentApplicationForm>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let Json(form) = body.map_err(|rejection| invalid_body("body", rejection))?;
    let actor = marketplace.actor(&headers).await?;
    let submitted = marketplace.intake.submit_talent(form, actor.as_ref()).await?;
    drop(submitted.notification);
    Ok((StatusCode::CREATED, Json(submitted.record)).into_response())
}

async fn submit_company(
    State(marketplace): Shared,
    headers: HeaderMap,
    body: Result<Json<CompanyApplicationForm>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let Json(form) = body.map_err(|rejection| invalid_body("body", rejection))?;
    let actor = marketplace.actor(&headers).await?;
    let submitted = marketplace.intake.submit_company(form, actor.as_ref()).await?;
    drop(submitted.notification);
    Ok((StatusCode::CREATED, Json(submitted.record)).into_response())
}

async fn create_hiring_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    body: Result<Json<HiringRequestForm>, JsonRejection>,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    if actor.is_none() {
        return Err(MarketplaceError::Unauthorized);
    }
    let Json(form) = body.map_err(|rejection| invalid_body("body", rejection))?;
    let request = marketplace
        .intake
        .create_hiring_request(form, actor.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

async fn upload_cv(
    State(marketplace): Shared,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, MarketplaceError> {
    let file = read_file(multipart).await?;
    let stored = marketplace.uploads.upload_cv(file).await?;
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

async fn upload_profile_image(
    State(marketplace): Shared,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, MarketplaceError> {
    let actor = marketplace.actor(&headers).await?;
    if actor.is_none() {
        return Err(MarketplaceError::Unauthorized);
    }
    let file = read_file(multipart).await?;
    let stored = marketplace
        .uploads
        .upload_profile_image(file, actor.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

/// Pulls the single `file` field out of a multipart body; other fields are
/// skipped.
async fn read_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, UploadError> {
    let mut multipart =
        multipart.map_err(|rejection| UploadError::Malformed(rejection.body_text()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::Malformed(err.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| UploadError::Malformed(err.body_text()))?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(UploadError::MissingFile)
}

fn entity_kind(segment: &str) -> Result<EntityKind, ValidationErrors> {
    EntityKind::from_segment(segment).ok_or_else(|| {
        ValidationErrors::single(
            "kind",
            format!("'{segment}' is not one of: talents, companies, hiring_requests"),
        )
    })
}

fn invalid_body(field: &str, rejection: JsonRejection) -> ValidationErrors {
    ValidationErrors::single(field, rejection.body_text())
}

/// Unparseable numbers fall back to the pagination defaults.
fn numeric_param(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params.get(key).and_then(|raw| raw.trim().parse().ok())
}
