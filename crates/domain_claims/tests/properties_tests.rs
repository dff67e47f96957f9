//! Property-based tests for claim invariants

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_claims::{ClaimItemUpdate, ItemType};
use test_utils::{
    assert_total_matches, claim_status_strategy, item_operations_strategy, ItemOperation,
    MockHarness, NewClaimItemBuilder,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of item changes the claim total equals the sum of
    /// its item costs.
    #[test]
    fn total_cost_tracks_item_operations(ops in item_operations_strategy(12)) {
        runtime().block_on(async {
            let h = MockHarness::new().await;
            let claim = h.draft_claim().await;
            let mut live = Vec::new();

            for op in ops {
                match op {
                    ItemOperation::Create { cost, item_type } => {
                        let input = match item_type {
                            ItemType::Replacement => NewClaimItemBuilder::new().replacement(),
                            ItemType::Repair => NewClaimItemBuilder::new(),
                        }
                        .with_cost(cost)
                        .build();
                        let item = h.workflow.create_item(claim.id, input).await.unwrap();
                        live.push(item.id);
                    }
                    ItemOperation::UpdateCost { index, cost } => {
                        if live.is_empty() {
                            continue;
                        }
                        let update = ClaimItemUpdate { cost: Some(cost), ..ClaimItemUpdate::default() };
                        h.workflow.update_item(live[index % live.len()], update).await.unwrap();
                    }
                    ItemOperation::Delete { index } => {
                        if live.is_empty() {
                            continue;
                        }
                        let id = live.remove(index % live.len());
                        h.workflow.hard_delete_item(id).await.unwrap();
                    }
                }

                let claim = h.workflow.get_claim(claim.id).await.unwrap();
                let items = h.workflow.list_items(claim.id).await.unwrap();
                assert_eq!(items.len(), live.len());
                assert_total_matches(&claim, &items);
                assert!(claim.total_cost >= Decimal::ZERO);
            }
        });
    }

    /// A refused status change never writes anything.
    #[test]
    fn refused_transitions_leave_store_untouched(
        from in claim_status_strategy(),
        to in claim_status_strategy(),
    ) {
        prop_assume!(!from.can_transition_to(to));

        runtime().block_on(async {
            let h = MockHarness::new().await;
            let claim = h.seed_claim(from).await;
            let before = h.store.snapshot().await;

            let result = h.workflow.update_status(claim.id, to, h.staff_id).await;

            assert!(result.is_err());
            assert_eq!(h.store.snapshot().await, before);
        });
    }
}
