//! Attachment manager tests

use std::time::Duration;

use rust_decimal_macros::dec;

use core_kernel::AttachmentId;
use domain_claims::{AttachmentType, ErrorKind};
use test_utils::{assert_error_kind, FileFixtures, MockHarness};

// ============================================================================
// Content Classification
// ============================================================================

mod classification_tests {
    use super::*;

    async fn upload_as(bytes: Vec<u8>) -> AttachmentType {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.workflow
            .create_attachment(claim.id, FileFixtures::upload(bytes))
            .await
            .unwrap()
            .attachment_type
    }

    #[tokio::test]
    async fn test_images_are_classified_as_image() {
        assert_eq!(upload_as(FileFixtures::png()).await, AttachmentType::Image);
        assert_eq!(upload_as(FileFixtures::jpeg()).await, AttachmentType::Image);
    }

    #[tokio::test]
    async fn test_mp4_is_classified_as_video() {
        assert_eq!(upload_as(FileFixtures::mp4()).await, AttachmentType::Video);
    }

    #[tokio::test]
    async fn test_pdf_is_classified_as_other() {
        assert_eq!(upload_as(FileFixtures::pdf()).await, AttachmentType::Other);
    }

    #[tokio::test]
    async fn test_stored_bytes_are_the_whole_upload() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let bytes = FileFixtures::pdf();

        let attachment = h
            .workflow
            .create_attachment(claim.id, FileFixtures::upload(bytes.clone()))
            .await
            .unwrap();

        assert_eq!(h.storage.read(&attachment.url).await, Some(bytes));
        assert_eq!(h.workflow.get_attachment(attachment.id).await.unwrap(), attachment);
    }

    #[tokio::test]
    async fn test_unsupported_content_is_refused_before_upload() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let error = assert_error_kind(
            h.workflow
                .create_attachment(claim.id, FileFixtures::upload(FileFixtures::plain_text()))
                .await,
            ErrorKind::InvalidInput,
        );

        assert!(error.to_string().contains("unsupported attachment type"));
        assert_eq!(h.storage.file_count().await, 0);
        assert!(h.store.snapshot().await.attachments.is_empty());
    }
}

// ============================================================================
// Status Guards and Storage Failures
// ============================================================================

mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_attachments_only_on_draft_claims() {
        let h = MockHarness::new().await;
        let (claim, _) = h.submitted_claim(&[dec!(10)]).await;
        let stored_before = h.storage.file_count().await;

        assert_error_kind(
            h.workflow
                .create_attachment(claim.id, FileFixtures::upload(FileFixtures::png()))
                .await,
            ErrorKind::InvalidAction,
        );
        assert_eq!(h.storage.file_count().await, stored_before);
    }

    #[tokio::test]
    async fn test_upload_failure_is_a_storage_error() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.storage.fail_uploads(true);

        assert_error_kind(
            h.workflow
                .create_attachment(claim.id, FileFixtures::upload(FileFixtures::png()))
                .await,
            ErrorKind::Storage,
        );
        assert!(h.workflow.list_attachments(claim.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_the_uploaded_file() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.store.fail_points.arm("attachments.insert");

        assert_error_kind(
            h.workflow
                .create_attachment(claim.id, FileFixtures::upload(FileFixtures::png()))
                .await,
            ErrorKind::Persistence,
        );

        assert!(h.store.snapshot().await.attachments.is_empty());
        assert_eq!(h.storage.file_count().await, 1);
    }
}

// ============================================================================
// Deletion
// ============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_hard_delete_removes_row_and_file() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let attachment = h.add_attachment(claim.id).await;

        h.workflow.hard_delete_attachment(attachment.id).await.unwrap();

        assert!(!h.storage.contains(&attachment.url).await);
        assert_error_kind(h.workflow.get_attachment(attachment.id).await, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remote_delete_failure_does_not_fail_the_call() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let attachment = h.add_attachment(claim.id).await;
        h.storage.fail_deletes(true);

        h.workflow.hard_delete_attachment(attachment.id).await.unwrap();

        assert!(h.workflow.list_attachments(claim.id).await.unwrap().is_empty());
        assert!(h.storage.contains(&attachment.url).await);
    }

    #[tokio::test]
    async fn test_slow_remote_delete_is_cut_off_at_the_deadline() {
        let h = MockHarness::builder()
            .with_deadline(Duration::from_millis(100))
            .build()
            .await;
        let claim = h.draft_claim().await;
        let attachment = h.add_attachment(claim.id).await;
        h.storage.delay_deletes(Duration::from_secs(10));

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            h.workflow.hard_delete_attachment(attachment.id),
        )
        .await
        .expect("post-commit work must respect the deadline");

        result.unwrap();
        assert_error_kind(h.workflow.get_attachment(attachment.id).await, ErrorKind::NotFound);
        assert!(h.storage.contains(&attachment.url).await);
    }

    #[tokio::test]
    async fn test_attachments_of_submitted_claim_are_kept() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.add_item(claim.id, dec!(10)).await;
        let attachment = h.add_attachment(claim.id).await;
        h.workflow.submit(claim.id, h.staff_id).await.unwrap();

        assert_error_kind(
            h.workflow.hard_delete_attachment(attachment.id).await,
            ErrorKind::InvalidAction,
        );
        assert!(h.storage.contains(&attachment.url).await);
    }

    #[tokio::test]
    async fn test_failed_transaction_keeps_the_file() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let attachment = h.add_attachment(claim.id).await;
        h.store.fail_points.arm("attachments.delete");

        assert_error_kind(
            h.workflow.hard_delete_attachment(attachment.id).await,
            ErrorKind::Persistence,
        );

        assert!(h.storage.contains(&attachment.url).await);
        assert_eq!(h.workflow.get_attachment(attachment.id).await.unwrap(), attachment);
    }

    #[tokio::test]
    async fn test_unknown_attachment_is_not_found() {
        let h = MockHarness::new().await;
        assert_error_kind(
            h.workflow.hard_delete_attachment(AttachmentId::new()).await,
            ErrorKind::NotFound,
        );
    }
}
