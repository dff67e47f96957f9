//! Claim item ledger tests

use rust_decimal_macros::dec;

use core_kernel::ClaimItemId;
use domain_claims::{ClaimItemUpdate, ClaimStatus, ErrorKind, ItemStatus, ItemType};
use test_utils::{
    assert_error_kind, assert_total_matches, CostFixtures, MockHarness, NewClaimItemBuilder,
};

async fn assert_claim_total(h: &MockHarness, claim_id: core_kernel::ClaimId) {
    let claim = h.workflow.get_claim(claim_id).await.unwrap();
    let items = h.workflow.list_items(claim_id).await.unwrap();
    assert_total_matches(&claim, &items);
}

fn cost_update(cost: rust_decimal::Decimal) -> ClaimItemUpdate {
    ClaimItemUpdate {
        cost: Some(cost),
        ..ClaimItemUpdate::default()
    }
}

// ============================================================================
// Total Cost
// ============================================================================

mod total_cost_tests {
    use super::*;

    #[tokio::test]
    async fn test_total_follows_create_update_and_delete() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let battery = h.add_item(claim.id, CostFixtures::battery_module()).await;
        let inverter = h.add_item(claim.id, CostFixtures::inverter_board()).await;
        assert_claim_total(&h, claim.id).await;
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(3771.15));

        h.workflow.update_item(battery.id, cost_update(dec!(2000))).await.unwrap();
        assert_claim_total(&h, claim.id).await;
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(3320.40));

        h.workflow.hard_delete_item(inverter.id).await.unwrap();
        assert_claim_total(&h, claim.id).await;
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(2000));

        h.workflow.hard_delete_item(battery.id).await.unwrap();
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(0));
    }

    #[tokio::test]
    async fn test_decisions_keep_every_item_in_the_total() {
        let h = MockHarness::new().await;
        let (claim, items) = h.reviewing_claim(&[dec!(100), dec!(50.25)]).await;

        h.workflow.approve_item(items[0].id).await.unwrap();
        h.workflow.reject_item(items[1].id).await.unwrap();

        let claim = h.workflow.get_claim(claim.id).await.unwrap();
        assert_eq!(claim.total_cost, dec!(150.25));
        assert_claim_total(&h, claim.id).await;
    }

    #[tokio::test]
    async fn test_zero_cost_item_is_accepted() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let item = h.add_item(claim.id, dec!(0)).await;

        assert_eq!(item.cost, dec!(0));
        assert_eq!(item.status, ItemStatus::Pending);
        assert_claim_total(&h, claim.id).await;
    }
}

// ============================================================================
// Validation
// ============================================================================

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_negative_cost_is_invalid_input() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let input = NewClaimItemBuilder::new().with_cost(dec!(-0.01)).build();
        assert_error_kind(h.workflow.create_item(claim.id, input).await, ErrorKind::InvalidInput);
        assert!(h.store.snapshot().await.items.is_empty());
    }

    #[tokio::test]
    async fn test_replacement_without_part_is_invalid_input() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let input = NewClaimItemBuilder::new()
            .with_item_type(ItemType::Replacement)
            .build();
        assert_error_kind(h.workflow.create_item(claim.id, input).await, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_replacement_with_part_is_accepted() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let item = h
            .workflow
            .create_item(claim.id, NewClaimItemBuilder::new().replacement().build())
            .await
            .unwrap();

        assert_eq!(item.item_type, ItemType::Replacement);
        assert!(item.replacement_part_id.is_some());
    }

    #[tokio::test]
    async fn test_update_to_negative_cost_leaves_item_unchanged() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h.add_item(claim.id, dec!(80)).await;
        let before = h.store.snapshot().await;

        assert_error_kind(
            h.workflow.update_item(item.id, cost_update(dec!(-5))).await,
            ErrorKind::InvalidInput,
        );
        assert_eq!(h.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_switching_to_replacement_requires_part() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h.add_item(claim.id, dec!(80)).await;

        let update = ClaimItemUpdate {
            item_type: Some(ItemType::Replacement),
            ..ClaimItemUpdate::default()
        };
        assert_error_kind(h.workflow.update_item(item.id, update).await, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_sub_cent_cost_is_invalid_input() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;

        let input = NewClaimItemBuilder::new().with_cost(dec!(10.005)).build();
        assert_error_kind(h.workflow.create_item(claim.id, input).await, ErrorKind::InvalidInput);
        assert!(h.store.snapshot().await.items.is_empty());
        assert_eq!(h.workflow.get_claim(claim.id).await.unwrap().total_cost, dec!(0));
    }

    #[tokio::test]
    async fn test_cost_beyond_twelve_integer_digits_is_invalid_input() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h.add_item(claim.id, dec!(999999999999.99)).await;
        let before = h.store.snapshot().await;

        let input = NewClaimItemBuilder::new().with_cost(dec!(1000000000000)).build();
        assert_error_kind(h.workflow.create_item(claim.id, input).await, ErrorKind::InvalidInput);
        assert_error_kind(
            h.workflow.update_item(item.id, cost_update(dec!(1000000000000.00))).await,
            ErrorKind::InvalidInput,
        );
        assert_eq!(h.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_switching_to_repair_clears_replacement_part() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h
            .workflow
            .create_item(claim.id, NewClaimItemBuilder::new().replacement().build())
            .await
            .unwrap();

        let update = ClaimItemUpdate {
            item_type: Some(ItemType::Repair),
            ..ClaimItemUpdate::default()
        };
        let updated = h.workflow.update_item(item.id, update).await.unwrap();

        assert_eq!(updated.item_type, ItemType::Repair);
        assert_eq!(updated.replacement_part_id, None);
        assert_eq!(h.workflow.get_item(item.id).await.unwrap().replacement_part_id, None);
    }
}

// ============================================================================
// Status Guards
// ============================================================================

mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_items_cannot_be_added_after_submission() {
        let h = MockHarness::new().await;
        let (claim, _) = h.submitted_claim(&[dec!(10)]).await;

        assert_error_kind(
            h.workflow
                .create_item(claim.id, NewClaimItemBuilder::new().build())
                .await,
            ErrorKind::InvalidAction,
        );
    }

    #[tokio::test]
    async fn test_items_of_submitted_claim_cannot_change() {
        let h = MockHarness::new().await;
        let (_, items) = h.submitted_claim(&[dec!(10)]).await;
        let before = h.store.snapshot().await;

        assert_error_kind(
            h.workflow.update_item(items[0].id, cost_update(dec!(20))).await,
            ErrorKind::InvalidAction,
        );
        assert_error_kind(h.workflow.hard_delete_item(items[0].id).await, ErrorKind::InvalidAction);
        assert_eq!(h.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_decided_item_cannot_be_modified() {
        let h = MockHarness::new().await;
        let (_, items) = h.reviewing_claim(&[dec!(10)]).await;
        h.workflow.approve_item(items[0].id).await.unwrap();

        assert_error_kind(
            h.workflow.update_item(items[0].id, cost_update(dec!(1))).await,
            ErrorKind::InvalidAction,
        );
    }

    #[tokio::test]
    async fn test_decisions_require_review() {
        let h = MockHarness::new().await;
        let claim = h.draft_claim().await;
        let item = h.add_item(claim.id, dec!(10)).await;

        assert_error_kind(h.workflow.approve_item(item.id).await, ErrorKind::InvalidAction);
        assert_error_kind(h.workflow.reject_item(item.id).await, ErrorKind::InvalidAction);

        let (_, items) = h.submitted_claim(&[dec!(10)]).await;
        assert_error_kind(h.workflow.approve_item(items[0].id).await, ErrorKind::InvalidAction);
    }

    #[tokio::test]
    async fn test_decision_can_be_revised_during_review() {
        let h = MockHarness::new().await;
        let (_, items) = h.reviewing_claim(&[dec!(10)]).await;

        let approved = h.workflow.approve_item(items[0].id).await.unwrap();
        assert_eq!(approved.status, ItemStatus::Approved);

        let rejected = h.workflow.reject_item(items[0].id).await.unwrap();
        assert_eq!(rejected.status, ItemStatus::Rejected);
        assert_eq!(
            h.workflow.get_item(items[0].id).await.unwrap().status,
            ItemStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_decisions_after_completion_are_refused() {
        let h = MockHarness::new().await;
        let (claim, items) = h.reviewing_claim(&[dec!(10)]).await;
        h.workflow.approve_item(items[0].id).await.unwrap();
        let done = h.workflow.complete(claim.id, h.reviewer_id).await.unwrap();
        assert_eq!(done.status, ClaimStatus::Approved);

        assert_error_kind(h.workflow.reject_item(items[0].id).await, ErrorKind::InvalidAction);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let h = MockHarness::new().await;
        let missing = ClaimItemId::new();

        assert_error_kind(h.workflow.get_item(missing).await, ErrorKind::NotFound);
        assert_error_kind(h.workflow.approve_item(missing).await, ErrorKind::NotFound);
        assert_error_kind(h.workflow.hard_delete_item(missing).await, ErrorKind::NotFound);
    }
}
