//! Item Ledger: claim items and the derived claim total

use tracing::{info, instrument};

use core_kernel::{ClaimId, ClaimItemId};

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;
use crate::item::{ClaimItem, ClaimItemUpdate, ItemStatus, NewClaimItem};
use crate::services::{load_claim, ClaimStores};

/// Creates, edits, decides and deletes claim items
///
/// Every mutation is followed, inside the same transaction, by recomputing
/// the parent claim's `total_cost` from its remaining items and persisting
/// the claim.
pub struct ItemLedger<Tx> {
    stores: ClaimStores<Tx>,
}

impl<Tx: Send + 'static> ItemLedger<Tx> {
    pub fn new(stores: ClaimStores<Tx>) -> Self {
        Self { stores }
    }

    #[instrument(skip(self, tx, input), fields(claim_id = %claim_id))]
    pub async fn create(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        input: NewClaimItem,
    ) -> Result<ClaimItem, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, claim_id).await?;
        claim.ensure_status(ClaimStatus::Draft, "add items to")?;

        let item = ClaimItem::new(claim_id, input)?;
        self.stores.items.insert(tx, &item).await?;
        let claim = self.recompute_total(tx, claim).await?;

        info!(item_id = %item.id, total_cost = %claim.total_cost, "Claim item created");
        Ok(item)
    }

    #[instrument(skip(self, tx, update), fields(item_id = %item_id))]
    pub async fn update(
        &self,
        tx: &mut Tx,
        item_id: ClaimItemId,
        update: ClaimItemUpdate,
    ) -> Result<ClaimItem, ClaimError> {
        let mut item = self.load_item(tx, item_id).await?;
        let claim = load_claim(self.stores.claims.as_ref(), tx, item.claim_id).await?;
        claim.ensure_status(ClaimStatus::Draft, "modify items of")?;

        item.apply(update)?;
        self.stores.items.update(tx, &item).await?;
        let claim = self.recompute_total(tx, claim).await?;

        info!(claim_id = %claim.id, total_cost = %claim.total_cost, "Claim item updated");
        Ok(item)
    }

    pub async fn approve(&self, tx: &mut Tx, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        self.decide(tx, item_id, ItemStatus::Approved).await
    }

    pub async fn reject(&self, tx: &mut Tx, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        self.decide(tx, item_id, ItemStatus::Rejected).await
    }

    #[instrument(skip(self, tx), fields(item_id = %item_id, decision = %decision))]
    async fn decide(
        &self,
        tx: &mut Tx,
        item_id: ClaimItemId,
        decision: ItemStatus,
    ) -> Result<ClaimItem, ClaimError> {
        let mut item = self.load_item(tx, item_id).await?;
        let claim = load_claim(self.stores.claims.as_ref(), tx, item.claim_id).await?;
        claim.ensure_status(ClaimStatus::Reviewing, "decide items of")?;

        item.decide(decision)?;
        self.stores.items.update(tx, &item).await?;
        let claim = self.recompute_total(tx, claim).await?;

        info!(claim_id = %claim.id, "Claim item decided");
        Ok(item)
    }

    #[instrument(skip(self, tx), fields(item_id = %item_id))]
    pub async fn hard_delete(&self, tx: &mut Tx, item_id: ClaimItemId) -> Result<(), ClaimError> {
        let item = self.load_item(tx, item_id).await?;
        let claim = load_claim(self.stores.claims.as_ref(), tx, item.claim_id).await?;
        claim.ensure_status(ClaimStatus::Draft, "delete items of")?;

        self.stores.items.delete(tx, item_id).await?;
        let claim = self.recompute_total(tx, claim).await?;

        info!(claim_id = %claim.id, total_cost = %claim.total_cost, "Claim item deleted");
        Ok(())
    }

    pub async fn get(&self, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        self.stores
            .items
            .get(item_id)
            .await?
            .ok_or_else(|| ClaimError::not_found("ClaimItem", item_id))
    }

    pub async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimItem>, ClaimError> {
        Ok(self.stores.items.list_by_claim(claim_id).await?)
    }

    async fn load_item(&self, tx: &mut Tx, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        self.stores
            .items
            .find_by_id(tx, item_id)
            .await?
            .ok_or_else(|| ClaimError::not_found("ClaimItem", item_id))
    }

    async fn recompute_total(&self, tx: &mut Tx, mut claim: Claim) -> Result<Claim, ClaimError> {
        let total = self.stores.items.sum_cost_by_claim_id(tx, claim.id).await?;
        claim.set_total_cost(total);
        Ok(self.stores.claims.update(tx, &claim).await?)
    }
}
