use super::common::*;
use std::sync::Arc;

use crate::adapters::InMemoryFileStore;
use crate::marketplace::domain::{CompanyStatus, HiringRequestPatch, TalentStatus};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::query::{ListingFilters, Pagination};
use crate::marketplace::repository::{Bucket, MarketplaceStore};

async fn seed_many(h: &Harness, count: usize) {
    for index in 0..count {
        seed_talent(&h.store, &format!("Talent{index:02}")).await;
    }
}

#[tokio::test]
async fn forty_five_rows_paginate_into_three_pages() {
    let h = harness();
    seed_many(&h, 45).await;
    let listings = &h.marketplace.listings;
    let filters = ListingFilters::new();

    let first = listings
        .list_talents(&filters, Pagination::new(1, 20))
        .await
        .expect("page 1");
    assert_eq!(first.data.len(), 20);
    assert_eq!(first.pagination.total_count, 45);
    assert_eq!(first.pagination.total_pages, 3);
    assert_eq!(first.data[0].first_name, "Talent44", "newest first");
    assert_eq!(first.data[19].first_name, "Talent25");

    let third = listings
        .list_talents(&filters, Pagination::new(3, 20))
        .await
        .expect("page 3");
    assert_eq!(third.data.len(), 5);
    assert_eq!(third.data[4].first_name, "Talent00");

    let beyond = listings
        .list_talents(&filters, Pagination::new(4, 20))
        .await
        .expect("page past the end");
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.pagination.total_count, 45);
    assert_eq!(beyond.pagination.page, 4);
}

#[tokio::test]
async fn sentinel_filters_leave_the_listing_unconstrained() {
    let h = harness();
    let matched = seed_talent(&h.store, "Matched").await;
    seed_talent(&h.store, "Waiting").await;
    h.store
        .update_talent_status(&matched.id, TalentStatus::Matched)
        .await
        .expect("status set");

    let listings = &h.marketplace.listings;
    let only_matched = listings
        .list_talents(
            &ListingFilters::new()
                .with("status", "matched")
                .with("role", "all"),
            Pagination::default(),
        )
        .await
        .expect("filtered listing");
    assert_eq!(only_matched.pagination.total_count, 1);
    assert_eq!(only_matched.data[0].id, matched.id);

    let everything = listings
        .list_talents(
            &ListingFilters::new().with("status", "all").with("role", "all"),
            Pagination::default(),
        )
        .await
        .expect("unfiltered listing");
    assert_eq!(everything.pagination.total_count, 2);
}

#[tokio::test]
async fn one_unsignable_cv_nulls_only_that_record() {
    let h = harness();
    let mut paths = Vec::new();
    for index in 0..4 {
        let mut talent = new_talent(&format!("Cv{index}"));
        let path = format!("1700000000000-token{index}-cv.pdf");
        h.files
            .put(Bucket::Cvs, &path, b"%PDF-1.7".to_vec(), "application/pdf");
        talent.cv_url = Some(path.clone());
        h.store.insert_talent(talent).await.expect("insert");
        paths.push(path);
    }
    h.files.fail_signing(&paths[1]);

    let page = h
        .marketplace
        .listings
        .list_talents(&ListingFilters::new(), Pagination::default())
        .await
        .expect("listing succeeds");

    assert_eq!(page.data.len(), 4);
    for talent in &page.data {
        if talent.first_name == "Cv1" {
            assert_eq!(talent.cv_url, None);
        } else {
            let url = talent.cv_url.as_deref().expect("signed link");
            assert!(url.starts_with(InMemoryFileStore::BASE_URL));
            assert!(url.contains("expiresIn=3600"));
        }
    }
}

#[tokio::test]
async fn hiring_requests_embed_their_company() {
    let h = harness();
    let company = seed_company(&h.store, Some(COMPANY_USER)).await;
    let first = seed_request(&h.store, &company).await;
    seed_request(&h.store, &company).await;
    h.store
        .update_hiring_request(
            &first.id,
            HiringRequestPatch {
                application_status: Some(CompanyStatus::Negotiating),
                ..HiringRequestPatch::default()
            },
        )
        .await
        .expect("patched");

    let page = h
        .marketplace
        .listings
        .list_hiring_requests(
            &ListingFilters::new()
                .with("applicationStatus", "negotiating")
                .with("requestStatus", "all"),
            Pagination::default(),
        )
        .await
        .expect("listing succeeds");

    assert_eq!(page.data.len(), 1);
    let row = &page.data[0];
    assert_eq!(row.request.id, first.id);
    let summary = row.company.as_ref().expect("company embedded");
    assert_eq!(summary.company_name, "Initech");
    assert_eq!(summary.email, company.email);

    let json = serde_json::to_value(row).expect("serializes");
    assert_eq!(json["title"], "Payments rebuild");
    assert_eq!(json["company"]["contact_name"], "Bill Lumbergh");
}

#[tokio::test]
async fn companies_list_without_filters() {
    let h = harness();
    seed_company(&h.store, None).await;
    seed_company(&h.store, Some(COMPANY_USER)).await;

    let page = h
        .marketplace
        .listings
        .list_companies(Pagination::new(1, 1))
        .await
        .expect("listing succeeds");
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.data[0].user_id.as_deref(), Some(COMPANY_USER));
}

#[tokio::test]
async fn store_outage_fails_the_listing() {
    let marketplace = marketplace_over(
        Arc::new(UnavailableStore),
        InMemoryFileStore::new(),
        Arc::new(crate::adapters::OutboxTransport::new()),
    );
    let err = marketplace
        .listings
        .list_companies(Pagination::default())
        .await
        .expect_err("store offline");
    assert!(matches!(err, MarketplaceError::Persistence(_)));
}
