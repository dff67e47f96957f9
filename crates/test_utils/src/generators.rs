//! Property-Based Test Generators
//!
//! Proptest strategies for claim statuses, item costs and sequences of item
//! operations.

use domain_claims::{ClaimStatus, ItemType};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Any claim status
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

/// Non-negative cost with two decimal places, up to 100 000.00
pub fn item_cost_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

pub fn item_type_strategy() -> impl Strategy<Value = ItemType> {
    prop_oneof![Just(ItemType::Repair), Just(ItemType::Replacement)]
}

/// One mutation of a draft claim's items
///
/// Indexes refer to the claim's live items and are taken modulo their
/// count when applied; they are ignored while the claim has no items.
#[derive(Debug, Clone)]
pub enum ItemOperation {
    Create { cost: Decimal, item_type: ItemType },
    UpdateCost { index: usize, cost: Decimal },
    Delete { index: usize },
}

pub fn item_operation_strategy() -> impl Strategy<Value = ItemOperation> {
    prop_oneof![
        3 => (item_cost_strategy(), item_type_strategy())
            .prop_map(|(cost, item_type)| ItemOperation::Create { cost, item_type }),
        2 => (any::<usize>(), item_cost_strategy())
            .prop_map(|(index, cost)| ItemOperation::UpdateCost { index, cost }),
        1 => any::<usize>().prop_map(|index| ItemOperation::Delete { index }),
    ]
}

/// A sequence of item mutations
pub fn item_operations_strategy(max_len: usize) -> impl Strategy<Value = Vec<ItemOperation>> {
    proptest::collection::vec(item_operation_strategy(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_costs_are_non_negative(cost in item_cost_strategy()) {
            prop_assert!(cost >= Decimal::ZERO);
            prop_assert!(cost.scale() <= 2);
        }

        #[test]
        fn generated_sequences_are_bounded(ops in item_operations_strategy(12)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.len() <= 12);
        }
    }
}
