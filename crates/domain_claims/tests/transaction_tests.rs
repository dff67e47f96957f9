//! Transaction scope tests
//!
//! Faults are injected into single repository operations; every failed
//! workflow call must leave the committed tables exactly as they were.

use std::time::Duration;

use rust_decimal_macros::dec;

use domain_claims::{
    run_in_transaction, ClaimError, ClaimRepository, ClaimStatus, ErrorKind, UnitOfWork,
};
use test_utils::{assert_error_kind, MockHarness, NewClaimItemBuilder};

// ============================================================================
// Rollback on Failure
// ============================================================================

mod rollback_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_history_write_discards_new_claim() {
        let h = MockHarness::new().await;
        h.store.fail_points.arm("histories.insert");

        assert_error_kind(h.workflow.create_claim(h.new_claim()).await, ErrorKind::Persistence);

        let tables = h.store.snapshot().await;
        assert!(tables.claims.is_empty());
        assert!(tables.histories.is_empty());
    }

    #[tokio::test]
    async fn test_failed_total_recompute_discards_new_item() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.add_item(claim.id, dec!(40)).await;
        h.store.fail_points.arm("items.sum_cost");
        let before = h.store.snapshot().await;

        assert_error_kind(
            h.workflow
                .create_item(claim.id, NewClaimItemBuilder::new().with_cost(dec!(60)).build())
                .await,
            ErrorKind::Persistence,
        );

        assert_eq!(h.store.snapshot().await, before);
        assert_eq!(h.workflow.list_items(claim.id).await.unwrap().len(), 1);
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(40));
    }

    #[tokio::test]
    async fn test_failed_history_write_keeps_old_status() {
        let h = MockHarness::new().await;
        let (claim, _) = h.submitted_claim(&[dec!(10)]).await;
        h.store.fail_points.arm("histories.insert");

        assert_error_kind(
            h.workflow
                .update_status(claim.id, ClaimStatus::Reviewing, h.reviewer_id)
                .await,
            ErrorKind::Persistence,
        );

        let stored = h.workflow.get_claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Submitted);
        assert_eq!(stored.version, claim.version);
        let latest = h.workflow.latest_history(claim.id).await.unwrap().unwrap();
        assert_eq!(latest.status, ClaimStatus::Submitted);
    }

    #[tokio::test]
    async fn test_failed_cascade_soft_deletes_nothing() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        h.add_item(claim.id, dec!(40)).await;
        h.add_attachment(claim.id).await;
        h.workflow
            .update_status(claim.id, ClaimStatus::Cancelled, h.staff_id)
            .await
            .unwrap();
        h.store.fail_points.arm("claims.soft_delete");
        let before = h.store.snapshot().await;

        assert_error_kind(h.workflow.soft_delete_claim(claim.id).await, ErrorKind::Persistence);

        let tables = h.store.snapshot().await;
        assert_eq!(tables, before);
        assert!(tables.items.values().all(|i| i.deleted_at.is_none()));

        h.store.fail_points.disarm("claims.soft_delete");
        h.workflow.soft_delete_claim(claim.id).await.unwrap();
        assert_error_kind(h.workflow.get_claim(claim.id).await, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_item_delete_keeps_item_and_total() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h.add_item(claim.id, dec!(15)).await;
        h.store.fail_points.arm("items.delete");

        assert_error_kind(h.workflow.hard_delete_item(item.id).await, ErrorKind::Persistence);

        assert_eq!(h.workflow.get_item(item.id).await.unwrap(), item);
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(15));
    }

    #[tokio::test]
    async fn test_closure_error_rolls_back_direct_writes() {
        let h = MockHarness::new().await;
        let claims = h.store.claims.clone();
        let claim = domain_claims::Claim::draft(h.new_claim());
        let id = claim.id;

        let result: Result<(), ClaimError> = run_in_transaction(h.store.uow.as_ref(), None, move |tx| {
            Box::pin(async move {
                claims.insert(tx, &claim).await?;
                Err(ClaimError::invalid_action("abandoned"))
            })
        })
        .await;

        assert_error_kind(result, ErrorKind::InvalidAction);
        assert!(h.store.claims.get(id).await.unwrap().is_none());
    }
}

// ============================================================================
// Deadlines
// ============================================================================

mod deadline_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_operation_exceeds_deadline_and_writes_nothing() {
        let h = MockHarness::builder()
            .with_deadline(Duration::from_millis(20))
            .with_user_latency(Duration::from_millis(200))
            .build()
            .await;

        let error = assert_error_kind(
            h.workflow.create_claim(h.new_claim()).await,
            ErrorKind::DeadlineExceeded,
        );

        assert!(matches!(error, ClaimError::DeadlineExceeded { timeout_ms: 20 }));
        assert!(h.store.snapshot().await.claims.is_empty());
    }

    #[tokio::test]
    async fn test_fast_operation_completes_within_deadline() {
        let h = MockHarness::builder()
            .with_deadline(Duration::from_secs(5))
            .build()
            .await;

        let claim = h.workflow.create_claim(h.new_claim()).await.unwrap();
        assert_eq!(claim.status, ClaimStatus::Draft);
    }
}

// ============================================================================
// Optimistic Concurrency
// ============================================================================

mod version_tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_claim_update_is_a_conflict() {
        let h = MockHarness::new().await;
        let stale = h.draft_claim().await;
        h.workflow
            .update_claim(stale.id, "Thermal runaway warning on cell group 4".to_string())
            .await
            .unwrap();

        let mut tx = h.store.uow.begin().await.unwrap();
        let error = h.store.claims.update(&mut tx, &stale).await.unwrap_err();
        h.store.uow.rollback(tx).await.unwrap();

        assert!(error.is_conflict());
        assert_eq!(ClaimError::from(error).kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_every_write_bumps_the_version() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        assert_eq!(claim.version, 1);

        h.add_item(claim.id, dec!(10)).await;
        h.add_attachment(claim.id).await;
        let submitted = h.workflow.submit(claim.id, h.staff_id).await.unwrap();

        // item create recomputes the total, submit moves the status
        assert_eq!(submitted.version, 3);
    }
}
