use super::common::*;

use crate::marketplace::error::MarketplaceError;
use crate::marketplace::repository::{Bucket, MarketplaceStore};
use crate::marketplace::uploads::{UploadedFile, FILE_FIELD};

fn upload(name: &str, content_type: &str, size: usize) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: Some(content_type.to_string()),
        bytes: vec![7_u8; size],
    }
}

#[tokio::test]
async fn png_cv_is_rejected_before_storage() {
    let h = harness();
    let err = h
        .marketplace
        .uploads
        .upload_cv(upload("cv.png", "image/png", 1024))
        .await
        .expect_err("png rejected");

    assert!(matches!(err, MarketplaceError::Validation(ref e) if e.has_field(FILE_FIELD)));
    assert_eq!(h.files.object_count(), 0);
}

#[tokio::test]
async fn oversized_cv_reports_the_limit() {
    let h = harness();
    let err = h
        .marketplace
        .uploads
        .upload_cv(upload("cv.pdf", "application/pdf", 6 * 1024 * 1024))
        .await
        .expect_err("too large");

    let MarketplaceError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.fields()[0].message.contains("5 MB"));
    assert_eq!(h.files.object_count(), 0);
}

#[tokio::test]
async fn pdf_cv_is_stored_privately_with_a_signed_link() {
    let h = harness();
    let stored = h
        .marketplace
        .uploads
        .upload_cv(upload("My CV.pdf", "application/pdf", 2048))
        .await
        .expect("stored");

    assert_eq!(stored.bucket, Bucket::Cvs);
    assert!(stored.path.ends_with("-My_CV.pdf"));
    assert!(stored.url.contains("/sign/cvs/"));
    let object = h.files.object(Bucket::Cvs, &stored.path).expect("object saved");
    assert_eq!(object.content_type, "application/pdf");
    assert_eq!(object.bytes.len(), 2048);
}

#[tokio::test]
async fn profile_image_requires_a_caller() {
    let h = harness();
    let err = h
        .marketplace
        .uploads
        .upload_profile_image(upload("me.png", "image/png", 10), None)
        .await
        .expect_err("anonymous");
    assert!(matches!(err, MarketplaceError::Unauthorized));
    assert_eq!(h.files.object_count(), 0);
}

#[tokio::test]
async fn profile_image_updates_the_linked_talent() {
    let h = harness();
    let mut talent = new_talent("Linked");
    talent.user_id = Some(MEMBER_USER.to_string());
    let talent = h.store.insert_talent(talent).await.expect("insert");

    let stored = h
        .marketplace
        .uploads
        .upload_profile_image(upload("me.webp", "image/webp", 512), Some(&member(MEMBER_USER)))
        .await
        .expect("stored");

    assert_eq!(stored.bucket, Bucket::ProfileImages);
    assert!(stored.path.starts_with(&format!("{MEMBER_USER}/")));
    assert!(stored.url.contains("/public/profile-images/"));

    let refreshed = h
        .store
        .fetch_talent(&talent.id)
        .await
        .expect("fetch")
        .expect("talent exists");
    assert_eq!(refreshed.profile_image_url.as_deref(), Some(stored.url.as_str()));
}

#[tokio::test]
async fn profile_image_without_talent_is_still_stored() {
    let h = harness();
    let stored = h
        .marketplace
        .uploads
        .upload_profile_image(upload("me.jpg", "image/jpeg", 512), Some(&member(COMPANY_USER)))
        .await
        .expect("stored");
    assert!(h.files.object(Bucket::ProfileImages, &stored.path).is_some());
}
