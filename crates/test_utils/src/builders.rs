//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out the fields they
//! care about.

use core_kernel::{CustomerId, PartCategoryId, PartId, UserId, VehicleId};
use domain_claims::{ItemType, NewClaim, NewClaimItem};
use rust_decimal::Decimal;

use crate::fixtures::CostFixtures;

/// Builder for [`NewClaim`]
pub struct NewClaimBuilder {
    vehicle_id: VehicleId,
    customer_id: CustomerId,
    staff_id: UserId,
    technician_id: UserId,
    description: String,
}

impl NewClaimBuilder {
    pub fn new(staff_id: UserId, technician_id: UserId) -> Self {
        Self {
            vehicle_id: VehicleId::new_v7(),
            customer_id: CustomerId::new_v7(),
            staff_id,
            technician_id,
            description: "High-voltage battery loses 20% charge overnight".to_string(),
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: VehicleId) -> Self {
        self.vehicle_id = vehicle_id;
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_technician(mut self, technician_id: UserId) -> Self {
        self.technician_id = technician_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            vehicle_id: self.vehicle_id,
            customer_id: self.customer_id,
            staff_id: self.staff_id,
            technician_id: self.technician_id,
            description: self.description,
        }
    }
}

/// Builder for [`NewClaimItem`]; defaults to a repair
pub struct NewClaimItemBuilder {
    part_category_id: PartCategoryId,
    faulty_part_id: PartId,
    replacement_part_id: Option<PartId>,
    issue_description: String,
    item_type: ItemType,
    cost: Decimal,
}

impl Default for NewClaimItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewClaimItemBuilder {
    pub fn new() -> Self {
        Self {
            part_category_id: PartCategoryId::new_v7(),
            faulty_part_id: PartId::new_v7(),
            replacement_part_id: None,
            issue_description: "Corroded connector on the battery junction box".to_string(),
            item_type: ItemType::Repair,
            cost: CostFixtures::connector_repair(),
        }
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = cost;
        self
    }

    /// Turns the item into a replacement with a fresh replacement part
    pub fn replacement(mut self) -> Self {
        self.item_type = ItemType::Replacement;
        self.replacement_part_id = Some(PartId::new_v7());
        self
    }

    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issue_description = issue.into();
        self
    }

    pub fn build(self) -> NewClaimItem {
        NewClaimItem {
            part_category_id: self.part_category_id,
            faulty_part_id: self.faulty_part_id,
            replacement_part_id: self.replacement_part_id,
            issue_description: self.issue_description,
            item_type: self.item_type,
            cost: self.cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_carries_part() {
        let item = NewClaimItemBuilder::new().replacement().build();
        assert_eq!(item.item_type, ItemType::Replacement);
        assert!(item.replacement_part_id.is_some());
    }

    #[test]
    fn test_claim_builder_overrides() {
        let technician = UserId::new();
        let claim = NewClaimBuilder::new(UserId::new(), UserId::new())
            .with_technician(technician)
            .with_description("Charging port overheats")
            .build();
        assert_eq!(claim.technician_id, technician);
        assert_eq!(claim.description, "Charging port overheats");
    }
}
