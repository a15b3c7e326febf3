use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use super::domain::{Company, CompanyId, CompanySummary, HiringRequest, Talent};
use super::error::MarketplaceError;
use super::query::{build_query, ListingFilters, ListingQuery, Page, Pagination, Table};
use super::repository::{Bucket, FileStore, MarketplaceStore};

/// Lifetime of CV links handed to admins.
pub const CV_LINK_TTL: Duration = Duration::from_secs(60 * 60);

/// Hiring request row with its owning company embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiringRequestRow {
    #[serde(flatten)]
    pub request: HiringRequest,
    pub company: Option<CompanySummary>,
}

/// Paginated admin views over the store.
pub struct AdminListingService {
    store: Arc<dyn MarketplaceStore>,
    files: Arc<dyn FileStore>,
}

impl AdminListingService {
    pub fn new(store: Arc<dyn MarketplaceStore>, files: Arc<dyn FileStore>) -> Self {
        Self { store, files }
    }

    /// Talents newest first. Stored CV paths are swapped for signed links; a
    /// record whose link cannot be signed keeps a `null` CV instead of failing
    /// the page.
    pub async fn list_talents(
        &self,
        filters: &ListingFilters,
        pagination: Pagination,
    ) -> Result<Page<Talent>, MarketplaceError> {
        let query = build_query(ListingQuery::base(Table::Talents), filters, pagination);
        let page = self.store.list_talents(&query).await?;

        let data = join_all(page.rows.into_iter().map(|talent| self.resolve_cv(talent))).await;

        Ok(Page {
            data,
            pagination: pagination.meta(page.total_count),
        })
    }

    pub async fn list_companies(
        &self,
        pagination: Pagination,
    ) -> Result<Page<Company>, MarketplaceError> {
        let query = build_query(
            ListingQuery::base(Table::Companies),
            &ListingFilters::new(),
            pagination,
        );
        let page = self.store.list_companies(&query).await?;
        Ok(Page {
            data: page.rows,
            pagination: pagination.meta(page.total_count),
        })
    }

    pub async fn list_hiring_requests(
        &self,
        filters: &ListingFilters,
        pagination: Pagination,
    ) -> Result<Page<HiringRequestRow>, MarketplaceError> {
        let query = build_query(ListingQuery::base(Table::HiringRequests), filters, pagination);
        let page = self.store.list_hiring_requests(&query).await?;

        let company_ids: Vec<CompanyId> = page
            .rows
            .iter()
            .map(|request| request.company_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let owners: HashMap<CompanyId, CompanySummary> = if company_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .companies_by_ids(&company_ids)
                .await?
                .iter()
                .map(|company| (company.id.clone(), company.summary()))
                .collect()
        };

        let data = page
            .rows
            .into_iter()
            .map(|request| {
                let company = owners.get(&request.company_id).cloned();
                HiringRequestRow { request, company }
            })
            .collect();

        Ok(Page {
            data,
            pagination: pagination.meta(page.total_count),
        })
    }

    async fn resolve_cv(&self, mut talent: Talent) -> Talent {
        let Some(path) = talent.cv_url.take() else {
            return talent;
        };
        match self.files.signed_url(Bucket::Cvs, &path, CV_LINK_TTL).await {
            Ok(url) => talent.cv_url = Some(url),
            Err(err) => warn!(
                talent_id = %talent.id,
                error = %err,
                "unable to sign CV link; leaving it unresolved"
            ),
        }
        talent
    }
}
