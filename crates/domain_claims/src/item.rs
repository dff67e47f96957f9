//! Claim items - the individual repair or replacement lines of a claim

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ClaimItemId, PartCategoryId, PartId};
use crate::error::ClaimError;

/// Decimal places a cost may carry
const COST_SCALE: u32 = 2;
/// Costs must stay below 10^12, matching `NUMERIC(14, 2)` storage
const COST_INTEGER_DIGITS: u32 = 12;

/// Decision on a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [ItemStatus::Pending, ItemStatus::Approved, ItemStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Approved => "approved",
            ItemStatus::Rejected => "rejected",
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ClaimError::invalid_input(format!("unknown item status '{}'", s)))
    }
}

/// Remedy requested for the faulty part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Repair,
    Replacement,
}

impl ItemType {
    pub const ALL: [ItemType; 2] = [ItemType::Repair, ItemType::Replacement];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Repair => "repair",
            ItemType::Replacement => "replacement",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|item_type| item_type.as_str() == s)
            .ok_or_else(|| ClaimError::invalid_input(format!("unknown item type '{}'", s)))
    }
}

/// Data for a new claim item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaimItem {
    pub part_category_id: PartCategoryId,
    pub faulty_part_id: PartId,
    pub replacement_part_id: Option<PartId>,
    pub issue_description: String,
    pub item_type: ItemType,
    pub cost: Decimal,
}

/// Changes to a pending item; `None` leaves the field as is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimItemUpdate {
    pub issue_description: Option<String>,
    pub item_type: Option<ItemType>,
    pub replacement_part_id: Option<PartId>,
    pub cost: Option<Decimal>,
}

/// A line of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub claim_id: ClaimId,
    pub part_category_id: PartCategoryId,
    pub faulty_part_id: PartId,
    pub replacement_part_id: Option<PartId>,
    pub issue_description: String,
    pub status: ItemStatus,
    pub item_type: ItemType,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimItem {
    /// Creates a pending item after validating its fields
    pub fn new(claim_id: ClaimId, input: NewClaimItem) -> Result<Self, ClaimError> {
        validate_fields(input.item_type, input.replacement_part_id, input.cost)?;
        let now = Utc::now();
        Ok(Self {
            id: ClaimItemId::new_v7(),
            claim_id,
            part_category_id: input.part_category_id,
            faulty_part_id: input.faulty_part_id,
            replacement_part_id: input.replacement_part_id,
            issue_description: input.issue_description,
            status: ItemStatus::Pending,
            item_type: input.item_type,
            cost: input.cost,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Applies an update, re-validating the resulting type, part and cost
    pub fn apply(&mut self, update: ClaimItemUpdate) -> Result<(), ClaimError> {
        if self.status != ItemStatus::Pending {
            return Err(ClaimError::invalid_action(format!(
                "item {} is {} and can no longer be modified",
                self.id, self.status
            )));
        }

        let item_type = update.item_type.unwrap_or(self.item_type);
        // a repair never carries a replacement part
        let replacement_part_id = match item_type {
            ItemType::Repair => None,
            ItemType::Replacement => update.replacement_part_id.or(self.replacement_part_id),
        };
        let cost = update.cost.unwrap_or(self.cost);
        validate_fields(item_type, replacement_part_id, cost)?;

        if let Some(description) = update.issue_description {
            self.issue_description = description;
        }
        self.item_type = item_type;
        self.replacement_part_id = replacement_part_id;
        self.cost = cost;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the manufacturer's decision, whatever the current status is
    pub fn decide(&mut self, decision: ItemStatus) -> Result<(), ClaimError> {
        if !decision.is_decided() {
            return Err(ClaimError::invalid_input("an item decision must be approved or rejected"));
        }
        self.status = decision;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_fields(
    item_type: ItemType,
    replacement_part_id: Option<PartId>,
    cost: Decimal,
) -> Result<(), ClaimError> {
    if cost < Decimal::ZERO {
        return Err(ClaimError::invalid_input(format!("item cost must not be negative, got {}", cost)));
    }
    if cost.round_dp(COST_SCALE) != cost {
        return Err(ClaimError::invalid_input(format!(
            "item cost {} has more than {} decimal places",
            cost, COST_SCALE
        )));
    }
    if cost >= Decimal::from(10_i64.pow(COST_INTEGER_DIGITS)) {
        return Err(ClaimError::invalid_input(format!(
            "item cost {} exceeds {} integer digits",
            cost, COST_INTEGER_DIGITS
        )));
    }
    if item_type == ItemType::Replacement && replacement_part_id.is_none() {
        return Err(ClaimError::invalid_input("a replacement item requires a replacement part"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn repair(cost: Decimal) -> NewClaimItem {
        NewClaimItem {
            part_category_id: PartCategoryId::new(),
            faulty_part_id: PartId::new(),
            replacement_part_id: None,
            issue_description: "Loose high-voltage connector".to_string(),
            item_type: ItemType::Repair,
            cost,
        }
    }

    #[test]
    fn test_new_item_is_pending() {
        let item = ClaimItem::new(ClaimId::new(), repair(dec!(120.50))).unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.cost, dec!(120.50));
    }

    #[test]
    fn test_negative_cost_is_rejected() {
        assert!(ClaimItem::new(ClaimId::new(), repair(dec!(-1))).is_err());
    }

    #[test]
    fn test_replacement_requires_part() {
        let mut input = repair(dec!(10));
        input.item_type = ItemType::Replacement;
        assert!(ClaimItem::new(ClaimId::new(), input.clone()).is_err());

        input.replacement_part_id = Some(PartId::new());
        assert!(ClaimItem::new(ClaimId::new(), input).is_ok());
    }

    #[test]
    fn test_update_switching_to_replacement_revalidates() {
        let mut item = ClaimItem::new(ClaimId::new(), repair(dec!(10))).unwrap();
        let result = item.apply(ClaimItemUpdate {
            item_type: Some(ItemType::Replacement),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(item.item_type, ItemType::Repair);
    }

    #[test]
    fn test_cost_precision_and_magnitude_are_bounded() {
        assert!(ClaimItem::new(ClaimId::new(), repair(dec!(10.005))).is_err());
        assert!(ClaimItem::new(ClaimId::new(), repair(dec!(1000000000000))).is_err());
        assert!(ClaimItem::new(ClaimId::new(), repair(dec!(999999999999.99))).is_ok());
        // trailing zeros do not count as precision
        assert!(ClaimItem::new(ClaimId::new(), repair(dec!(10.500))).is_ok());
    }

    #[test]
    fn test_switching_to_repair_drops_replacement_part() {
        let mut input = repair(dec!(10));
        input.item_type = ItemType::Replacement;
        input.replacement_part_id = Some(PartId::new());
        let mut item = ClaimItem::new(ClaimId::new(), input).unwrap();

        item.apply(ClaimItemUpdate {
            item_type: Some(ItemType::Repair),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(item.item_type, ItemType::Repair);
        assert_eq!(item.replacement_part_id, None);
    }

    #[test]
    fn test_decided_item_cannot_be_updated() {
        let mut item = ClaimItem::new(ClaimId::new(), repair(dec!(10))).unwrap();
        item.decide(ItemStatus::Rejected).unwrap();
        let result = item.apply(ClaimItemUpdate {
            cost: Some(dec!(5)),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_decide_overrides_previous_decision() {
        let mut item = ClaimItem::new(ClaimId::new(), repair(dec!(10))).unwrap();
        item.decide(ItemStatus::Approved).unwrap();
        item.decide(ItemStatus::Rejected).unwrap();
        assert_eq!(item.status, ItemStatus::Rejected);
        assert!(item.decide(ItemStatus::Pending).is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("replacement".parse::<ItemType>().unwrap(), ItemType::Replacement);
        assert_eq!("approved".parse::<ItemStatus>().unwrap(), ItemStatus::Approved);
        assert!("swap".parse::<ItemType>().is_err());
        assert!("maybe".parse::<ItemStatus>().is_err());
    }
}
