use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use talent_match::adapters::{
    InMemoryFileStore, InMemoryMarketplaceStore, OutboxTransport, StaticIdentityProvider,
};
use talent_match::error::AppError;
use talent_match::marketplace::{
    Actor, ActorRole, CompanyApplicationForm, EntityKind, HiringRequestForm, ListingFilters,
    Marketplace, MarketplaceBackends, MarketplaceError, Pagination, TalentApplicationForm,
    UploadedFile,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of synthetic talent applications to submit
    #[arg(long, default_value_t = 3)]
    pub(crate) talents: usize,
    /// Print every captured email body instead of a one-line summary
    #[arg(long)]
    pub(crate) show_emails: bool,
}

const ROLES: [&str; 4] = ["backend", "frontend", "fullstack", "mobile"];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        talents,
        show_emails,
    } = args;

    let outbox = OutboxTransport::new();
    let admin = Actor {
        user_id: "demo-admin".to_string(),
        email: Some("ops@talentmatch.dev".to_string()),
        role: ActorRole::Admin,
    };
    let founder = Actor {
        user_id: "demo-founder".to_string(),
        email: Some("founder@northwind.test".to_string()),
        role: ActorRole::Member,
    };
    let marketplace = Marketplace::new(MarketplaceBackends {
        store: Arc::new(InMemoryMarketplaceStore::new()),
        files: Arc::new(InMemoryFileStore::new()),
        identity: Arc::new(StaticIdentityProvider::new()),
        email: Arc::new(outbox.clone()),
    });

    println!("Talent marketplace demo ({})", Utc::now().format("%Y-%m-%d %H:%M UTC"));

    if let Err(err) = walk_through(&marketplace, &admin, &founder, talents.max(1)).await {
        println!("  Demo stopped: {err}");
        return Ok(());
    }

    // Let detached notification tasks drain before reading the outbox.
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }

    let sent = outbox.sent();
    println!("\nCaptured emails ({})", sent.len());
    for email in sent {
        println!("- [{}] {} -> {}", email.template, email.subject, email.to);
        if show_emails {
            println!("{}\n", email.text);
        }
    }

    Ok(())
}

async fn walk_through(
    marketplace: &Marketplace,
    admin: &Actor,
    founder: &Actor,
    talents: usize,
) -> Result<(), MarketplaceError> {
    println!("\nTalent applications");
    let cv = marketplace
        .uploads
        .upload_cv(UploadedFile {
            file_name: "resume.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.7 demo".to_vec(),
        })
        .await?;
    println!("- CV stored at {}", cv.path);

    let mut talent_ids = Vec::with_capacity(talents);
    for index in 0..talents {
        let form = TalentApplicationForm {
            first_name: format!("Candidate{}", index + 1),
            last_name: "Demo".to_string(),
            email: format!("candidate{}@example.com", index + 1),
            role: ROLES[index % ROLES.len()].to_string(),
            english_level: "fluent".to_string(),
            portfolio_url: format!("https://candidate{}.dev", index + 1),
            shipped: "A production service with real users".to_string(),
            cv_path: (index == 0).then(|| cv.path.clone()),
            ..TalentApplicationForm::default()
        };
        let submitted = marketplace.intake.submit_talent(form, None).await?;
        println!(
            "- {} {} ({}) -> {}",
            submitted.record.first_name,
            submitted.record.last_name,
            submitted.record.role,
            submitted.record.application_status
        );
        talent_ids.push(submitted.record.id);
    }

    println!("\nAdmin review");
    let first = &talent_ids[0];
    for status in ["screening", "interviewing"] {
        let transition = marketplace
            .status
            .transition(EntityKind::Talent, &first.0, status, Some(admin))
            .await?;
        let announced = if transition.notification.is_some() {
            "email queued"
        } else {
            "no email"
        };
        println!("- {first} -> {status} ({announced})");
    }

    println!("\nCompany and hiring request");
    let company = marketplace
        .intake
        .submit_company(
            CompanyApplicationForm {
                company_name: "Northwind".to_string(),
                contact_name: "Nancy Davolio".to_string(),
                email: "founder@northwind.test".to_string(),
                company_size: "11-50".to_string(),
                ..CompanyApplicationForm::default()
            },
            Some(founder),
        )
        .await?;
    println!("- {} registered ({})", company.record.company_name, company.record.id);

    let request = marketplace
        .intake
        .create_hiring_request(
            HiringRequestForm {
                title: "Order pipeline rewrite".to_string(),
                roles_needed: vec!["backend".to_string()],
                project_type: "existing_product".to_string(),
                budget_range: Some("$15k-$30k".to_string()),
                description: "Move order intake onto an event log".to_string(),
            },
            Some(founder),
        )
        .await?;
    println!("- hiring request {} is {}", request.id, request.request_status);

    let outcome = marketplace
        .matching
        .match_talent(&request.id.0, &first.0, Some(admin))
        .await?;
    println!(
        "- matched {} -> request {}",
        first, outcome.request.request_status
    );

    println!("\nAdmin listing (status=matched)");
    let page = marketplace
        .listings
        .list_talents(
            &ListingFilters::new().with("status", "matched"),
            Pagination::default(),
        )
        .await?;
    println!(
        "- {} of {} talents (page {}/{})",
        page.data.len(),
        page.pagination.total_count,
        page.pagination.page,
        page.pagination.total_pages
    );
    for talent in &page.data {
        let cv = talent.cv_url.as_deref().unwrap_or("no CV");
        println!("  - {} {} | {}", talent.first_name, talent.last_name, cv);
    }

    Ok(())
}
