//! End-to-end scenarios driven through the public router, backed by the
//! in-memory adapters.

mod common {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use axum::Router;
    use serde_json::Value;

    use talent_match::adapters::{
        InMemoryFileStore, InMemoryMarketplaceStore, OutboxTransport, StaticIdentityProvider,
    };
    use talent_match::marketplace::{
        marketplace_router, Actor, ActorRole, Marketplace, MarketplaceBackends,
    };

    pub(super) const ADMIN_TOKEN: &str = "reviewer-token";
    pub(super) const COMPANY_TOKEN: &str = "founder-token";
    pub(super) const COMPANY_USER: &str = "user-founder";

    pub(super) struct App {
        pub(super) router: Router,
        pub(super) store: InMemoryMarketplaceStore,
        pub(super) outbox: OutboxTransport,
    }

    pub(super) fn app() -> App {
        let store = InMemoryMarketplaceStore::new();
        let outbox = OutboxTransport::new();
        let identity = StaticIdentityProvider::new()
            .with_token(
                ADMIN_TOKEN,
                Actor {
                    user_id: "user-reviewer".to_string(),
                    email: Some("review@talentmatch.dev".to_string()),
                    role: ActorRole::Admin,
                },
            )
            .with_token(
                COMPANY_TOKEN,
                Actor {
                    user_id: COMPANY_USER.to_string(),
                    email: Some("founder@acme.test".to_string()),
                    role: ActorRole::Member,
                },
            );
        let marketplace = Marketplace::new(MarketplaceBackends {
            store: Arc::new(store.clone()),
            files: Arc::new(InMemoryFileStore::new()),
            identity: Arc::new(identity),
            email: Arc::new(outbox.clone()),
        });
        App {
            router: marketplace_router(Arc::new(marketplace)),
            store,
            outbox,
        }
    }

    pub(super) fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds")
    }

    pub(super) async fn read_json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    /// Gives detached notification tasks a chance to finish.
    pub(super) async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }
}

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use talent_match::marketplace::{TalentStatus, TemplateKey};

#[tokio::test]
async fn talent_moves_from_application_to_interview() {
    let app = app();

    let created = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/talent",
            None,
            Some(json!({
                "first_name": "Margaret",
                "last_name": "Hamilton",
                "email": "margaret@example.com",
                "role": "backend",
                "english_level": "native",
                "portfolio_url": "https://margaret.dev",
                "shipped": "Apollo guidance software",
                "locale": "en",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let talent = read_json_body(created).await;
    assert_eq!(talent["application_status"], "under_review");
    let talent_id = talent["id"].as_str().expect("id assigned").to_string();

    settle().await;
    let received = app.outbox.sent();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].template, TemplateKey::TalentApplicationReceived);

    let interviewing = app
        .router
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/entities/talents/{talent_id}/status"),
            Some(ADMIN_TOKEN),
            Some(json!({ "application_status": "interviewing" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(interviewing.status(), StatusCode::OK);

    settle().await;
    let sent = app.outbox.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].template, TemplateKey::TalentStatusChanged);
    assert_eq!(sent[1].to, "margaret@example.com");

    let listing = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/admin/listings/talents?status=interviewing",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(listing.status(), StatusCode::OK);
    let page = read_json_body(listing).await;
    assert_eq!(page["pagination"]["totalCount"], 1);
    assert_eq!(page["data"][0]["id"], talent_id.as_str());

    let screening = app
        .router
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/entities/talents/{talent_id}/status"),
            Some(ADMIN_TOKEN),
            Some(json!({ "application_status": "screening" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(screening.status(), StatusCode::OK);

    settle().await;
    assert_eq!(app.outbox.sent().len(), 2, "screening is not announced");
    assert_eq!(app.store.talents()[0].application_status, TalentStatus::Screening);
}

#[tokio::test]
async fn company_request_is_matched_with_a_talent() {
    let app = app();

    let company = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/company",
            Some(COMPANY_TOKEN),
            Some(json!({
                "company_name": "Acme",
                "contact_name": "Wile E. Coyote",
                "email": "founder@acme.test",
                "company_size": "11-50",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(company.status(), StatusCode::CREATED);
    let company = read_json_body(company).await;
    assert_eq!(company["user_id"], COMPANY_USER);

    let hiring_request = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/hiring-requests",
            Some(COMPANY_TOKEN),
            Some(json!({
                "title": "Rocket telemetry",
                "roles_needed": ["backend"],
                "project_type": "mvp",
                "description": "Stream launch data to the ops dashboard",
            })),
        ))
        .await
        .expect("router responds");
    assert_eq!(hiring_request.status(), StatusCode::CREATED);
    let hiring_request = read_json_body(hiring_request).await;
    let request_id = hiring_request["id"].as_str().expect("id").to_string();

    let talent = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/talent",
            None,
            Some(json!({
                "first_name": "Road",
                "last_name": "Runner",
                "email": "beep@example.com",
                "role": "backend",
                "english_level": "fluent",
                "portfolio_url": "https://beep.dev",
                "shipped": "Desert courier network",
            })),
        ))
        .await
        .expect("router responds");
    let talent = read_json_body(talent).await;
    let talent_id = talent["id"].as_str().expect("id").to_string();
    settle().await;
    let before_match = app.outbox.sent().len();

    let matched = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/admin/hiring-requests/{request_id}/match"),
            Some(ADMIN_TOKEN),
            Some(json!({ "talent_id": talent_id })),
        ))
        .await
        .expect("router responds");
    assert_eq!(matched.status(), StatusCode::OK);
    let matched = read_json_body(matched).await;
    assert_eq!(matched["request_status"], "filled");
    assert_eq!(matched["application_status"], "matched");

    settle().await;
    let sent = app.outbox.sent();
    assert_eq!(sent.len(), before_match + 2);

    let listing = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/admin/listings/hiring_requests?requestStatus=filled",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .expect("router responds");
    let page = read_json_body(listing).await;
    assert_eq!(page["data"][0]["company"]["company_name"], "Acme");
    assert_eq!(page["data"][0]["matched_talent_id"], talent_id.as_str());
}
