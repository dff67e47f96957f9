//! Business limits applied by the claim services

use serde::{Deserialize, Serialize};

/// Open claims a technician may hold at once
pub const MAX_CLAIMS_PER_TECHNICIAN: u32 = 10;
/// Items a claim needs before it can be submitted
pub const MIN_ITEMS_PER_CLAIM: u32 = 1;
/// Attachments a claim needs before it can be submitted
pub const MIN_ATTACHMENTS_PER_CLAIM: u32 = 1;

/// Limits injected into the claim services
///
/// Deserializable so it can be nested in the service configuration; missing
/// fields take the defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimPolicy {
    pub max_claims_per_technician: u32,
    pub min_items_per_claim: u32,
    pub min_attachments_per_claim: u32,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            max_claims_per_technician: MAX_CLAIMS_PER_TECHNICIAN,
            min_items_per_claim: MIN_ITEMS_PER_CLAIM,
            min_attachments_per_claim: MIN_ATTACHMENTS_PER_CLAIM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_policy_uses_defaults() {
        let policy: ClaimPolicy = serde_json::from_str(r#"{"max_claims_per_technician": 3}"#).unwrap();
        assert_eq!(policy.max_claims_per_technician, 3);
        assert_eq!(policy.min_items_per_claim, MIN_ITEMS_PER_CLAIM);
        assert_eq!(policy.min_attachments_per_claim, MIN_ATTACHMENTS_PER_CLAIM);
    }
}
