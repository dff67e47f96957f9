//! Custom Test Assertions
//!
//! Assertion helpers for claim results that print the offending error or
//! amounts instead of a bare `assertion failed`.

use std::fmt::Debug;

use domain_claims::{Claim, ClaimError, ClaimItem, ErrorKind};
use rust_decimal::Decimal;

/// Asserts that `result` failed with an error of `kind` and returns the error
pub fn assert_error_kind<T: Debug>(result: Result<T, ClaimError>, kind: ErrorKind) -> ClaimError {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", kind, value),
        Err(error) => {
            assert_eq!(
                error.kind(),
                kind,
                "Expected {} error, got {}: {}",
                kind,
                error.kind(),
                error
            );
            error
        }
    }
}

/// Asserts that the claim total equals the sum of the given item costs
pub fn assert_total_matches(claim: &Claim, items: &[ClaimItem]) {
    let expected: Decimal = items.iter().map(|item| item.cost).sum();
    assert_eq!(
        claim.total_cost, expected,
        "Claim {} total {} does not match item sum {} over {} items",
        claim.id,
        claim.total_cost,
        expected,
        items.len()
    );
}
