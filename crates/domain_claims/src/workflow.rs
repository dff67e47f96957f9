//! Transactional entry points of the claims domain
//!
//! [`ClaimWorkflow`] runs each mutating service call in its own unit of
//! work, applies the configured deadline, and executes post-commit tasks
//! only after the commit succeeded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use core_kernel::{AttachmentId, ClaimId, ClaimItemId, UserId};

use crate::attachment::ClaimAttachment;
use crate::claim::{Claim, ClaimStatus, NewClaim};
use crate::error::ClaimError;
use crate::history::ClaimHistory;
use crate::item::{ClaimItem, ClaimItemUpdate, NewClaimItem};
use crate::policy::ClaimPolicy;
use crate::ports::{ContentSniffer, FileStorage, UnitOfWork, UploadStream, UserDirectory};
use crate::services::{AttachmentManager, AuditTrail, ClaimLifecycle, ClaimStores, ItemLedger};
use crate::transaction::{run_in_transaction, BoxFuture, Committed};

/// External systems the claims domain depends on besides its repositories
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserDirectory>,
    pub storage: Arc<dyn FileStorage>,
    pub sniffer: Arc<dyn ContentSniffer>,
}

pub struct ClaimWorkflow<U: UnitOfWork> {
    uow: Arc<U>,
    lifecycle: Arc<ClaimLifecycle<U::Tx>>,
    items: Arc<ItemLedger<U::Tx>>,
    attachments: Arc<AttachmentManager<U::Tx>>,
    audit: Arc<AuditTrail<U::Tx>>,
    storage: Arc<dyn FileStorage>,
    deadline: Option<Duration>,
}

impl<U: UnitOfWork> ClaimWorkflow<U> {
    pub fn new(
        uow: Arc<U>,
        stores: ClaimStores<U::Tx>,
        collaborators: Collaborators,
        policy: ClaimPolicy,
    ) -> Self {
        let audit = Arc::new(AuditTrail::new(stores.histories.clone()));
        let lifecycle = ClaimLifecycle::new(stores.clone(), collaborators.users, audit.clone(), policy);
        let items = ItemLedger::new(stores.clone());
        let attachments = AttachmentManager::new(
            stores,
            collaborators.storage.clone(),
            collaborators.sniffer,
        );

        Self {
            uow,
            lifecycle: Arc::new(lifecycle),
            items: Arc::new(items),
            attachments: Arc::new(attachments),
            audit,
            storage: collaborators.storage,
            deadline: None,
        }
    }

    /// Abandons and rolls back any unit of work that runs longer than `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn transact<T, F>(&self, f: F) -> Result<T, ClaimError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut U::Tx) -> BoxFuture<'t, Result<T, ClaimError>> + Send,
    {
        run_in_transaction(self.uow.as_ref(), self.deadline, f).await
    }

    async fn finish<T>(&self, committed: Committed<T>) -> T {
        let tasks = committed.after_commit.run(self.storage.as_ref());
        match self.deadline {
            Some(limit) => {
                if tokio::time::timeout(limit, tasks).await.is_err() {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "Post-commit tasks abandoned after deadline"
                    );
                }
            }
            None => tasks.await,
        }
        committed.value
    }

    // Claims

    pub async fn create_claim(&self, input: NewClaim) -> Result<Claim, ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| Box::pin(async move { lifecycle.create(tx, input).await }))
            .await
    }

    pub async fn update_claim(&self, id: ClaimId, description: String) -> Result<Claim, ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| Box::pin(async move { lifecycle.update(tx, id, description).await }))
            .await
    }

    /// Deletes a draft claim; failures removing its stored files are logged
    /// and do not fail the call
    pub async fn hard_delete_claim(&self, id: ClaimId) -> Result<(), ClaimError> {
        let lifecycle = self.lifecycle.clone();
        let committed = self
            .transact(move |tx| Box::pin(async move { lifecycle.hard_delete(tx, id).await }))
            .await?;
        Ok(self.finish(committed).await)
    }

    pub async fn soft_delete_claim(&self, id: ClaimId) -> Result<(), ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| Box::pin(async move { lifecycle.soft_delete(tx, id).await }))
            .await
    }

    pub async fn update_status(
        &self,
        id: ClaimId,
        status: ClaimStatus,
        actor: UserId,
    ) -> Result<Claim, ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| {
            Box::pin(async move { lifecycle.update_status(tx, id, status, actor).await })
        })
        .await
    }

    pub async fn submit(&self, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| Box::pin(async move { lifecycle.submit(tx, id, actor).await }))
            .await
    }

    pub async fn complete(&self, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let lifecycle = self.lifecycle.clone();
        self.transact(move |tx| Box::pin(async move { lifecycle.complete(tx, id, actor).await }))
            .await
    }

    pub async fn get_claim(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.lifecycle.get(id).await
    }

    // Items

    pub async fn create_item(&self, claim_id: ClaimId, input: NewClaimItem) -> Result<ClaimItem, ClaimError> {
        let items = self.items.clone();
        self.transact(move |tx| Box::pin(async move { items.create(tx, claim_id, input).await }))
            .await
    }

    pub async fn update_item(
        &self,
        item_id: ClaimItemId,
        update: ClaimItemUpdate,
    ) -> Result<ClaimItem, ClaimError> {
        let items = self.items.clone();
        self.transact(move |tx| Box::pin(async move { items.update(tx, item_id, update).await }))
            .await
    }

    pub async fn approve_item(&self, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        let items = self.items.clone();
        self.transact(move |tx| Box::pin(async move { items.approve(tx, item_id).await }))
            .await
    }

    pub async fn reject_item(&self, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        let items = self.items.clone();
        self.transact(move |tx| Box::pin(async move { items.reject(tx, item_id).await }))
            .await
    }

    pub async fn hard_delete_item(&self, item_id: ClaimItemId) -> Result<(), ClaimError> {
        let items = self.items.clone();
        self.transact(move |tx| Box::pin(async move { items.hard_delete(tx, item_id).await }))
            .await
    }

    pub async fn get_item(&self, item_id: ClaimItemId) -> Result<ClaimItem, ClaimError> {
        self.items.get(item_id).await
    }

    pub async fn list_items(&self, claim_id: ClaimId) -> Result<Vec<ClaimItem>, ClaimError> {
        self.items.list_by_claim(claim_id).await
    }

    // Attachments

    pub async fn create_attachment(
        &self,
        claim_id: ClaimId,
        mut stream: Box<dyn UploadStream>,
    ) -> Result<ClaimAttachment, ClaimError> {
        let attachments = self.attachments.clone();
        self.transact(move |tx| {
            Box::pin(async move { attachments.create(tx, claim_id, stream.as_mut()).await })
        })
        .await
    }

    /// Deletes an attachment of a draft claim; failures removing the stored
    /// file are logged and do not fail the call
    pub async fn hard_delete_attachment(&self, attachment_id: AttachmentId) -> Result<(), ClaimError> {
        let attachments = self.attachments.clone();
        let committed = self
            .transact(move |tx| {
                Box::pin(async move { attachments.hard_delete(tx, attachment_id).await })
            })
            .await?;
        Ok(self.finish(committed).await)
    }

    pub async fn get_attachment(&self, attachment_id: AttachmentId) -> Result<ClaimAttachment, ClaimError> {
        self.attachments.get(attachment_id).await
    }

    pub async fn list_attachments(&self, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, ClaimError> {
        self.attachments.list_by_claim(claim_id).await
    }

    // History

    pub async fn history(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, ClaimError> {
        self.audit.list_by_claim(claim_id).await
    }

    pub async fn latest_history(&self, claim_id: ClaimId) -> Result<Option<ClaimHistory>, ClaimError> {
        self.audit.latest_by_claim(claim_id).await
    }

    pub async fn history_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, ClaimError> {
        self.audit.list_between(from, to).await
    }
}
