//! Attachment Manager: evidence files bound to a claim

use std::io::SeekFrom;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{info, instrument};

use core_kernel::{AttachmentId, ClaimId};

use crate::attachment::{AttachmentType, ClaimAttachment};
use crate::claim::ClaimStatus;
use crate::error::ClaimError;
use crate::ports::{ContentSniffer, FileStorage, UploadStream};
use crate::services::{load_claim, ClaimStores};
use crate::sniff::SNIFF_LEN;
use crate::transaction::{AfterCommit, Committed};

pub struct AttachmentManager<Tx> {
    stores: ClaimStores<Tx>,
    storage: Arc<dyn FileStorage>,
    sniffer: Arc<dyn ContentSniffer>,
}

impl<Tx: Send + 'static> AttachmentManager<Tx> {
    pub fn new(
        stores: ClaimStores<Tx>,
        storage: Arc<dyn FileStorage>,
        sniffer: Arc<dyn ContentSniffer>,
    ) -> Self {
        Self {
            stores,
            storage,
            sniffer,
        }
    }

    /// Classifies the uploaded bytes, stores them and records the attachment
    ///
    /// The category comes from the content itself. Unsupported content is
    /// refused before anything is uploaded.
    #[instrument(skip(self, tx, stream), fields(claim_id = %claim_id))]
    pub async fn create(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        stream: &mut dyn UploadStream,
    ) -> Result<ClaimAttachment, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, claim_id).await?;
        claim.ensure_status(ClaimStatus::Draft, "attach files to")?;

        let mime = self.detect_mime(stream).await?;
        let category = AttachmentType::from_mime(&mime).ok_or_else(|| {
            ClaimError::invalid_input(format!("unsupported attachment type '{}'", mime))
        })?;

        let url = self
            .storage
            .upload(stream, category)
            .await
            .map_err(ClaimError::storage)?;

        let attachment = ClaimAttachment::new(claim_id, category, url);
        self.stores.attachments.insert(tx, &attachment).await?;

        info!(attachment_id = %attachment.id, category = %category, mime = %mime, "Attachment stored");
        Ok(attachment)
    }

    /// Removes the attachment row; the stored file is removed after commit
    #[instrument(skip(self, tx), fields(attachment_id = %attachment_id))]
    pub async fn hard_delete(
        &self,
        tx: &mut Tx,
        attachment_id: AttachmentId,
    ) -> Result<Committed<()>, ClaimError> {
        let attachment = self
            .stores
            .attachments
            .find_by_id(tx, attachment_id)
            .await?
            .ok_or_else(|| ClaimError::not_found("ClaimAttachment", attachment_id))?;
        let claim = load_claim(self.stores.claims.as_ref(), tx, attachment.claim_id).await?;
        claim.ensure_status(ClaimStatus::Draft, "remove attachments from")?;

        self.stores.attachments.delete(tx, attachment_id).await?;

        let mut after_commit = AfterCommit::new();
        after_commit.delete_remote_file(attachment.url);

        info!(claim_id = %claim.id, "Attachment deleted");
        Ok(Committed::with_tasks((), after_commit))
    }

    pub async fn get(&self, attachment_id: AttachmentId) -> Result<ClaimAttachment, ClaimError> {
        self.stores
            .attachments
            .get(attachment_id)
            .await?
            .ok_or_else(|| ClaimError::not_found("ClaimAttachment", attachment_id))
    }

    pub async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, ClaimError> {
        Ok(self.stores.attachments.list_by_claim(claim_id).await?)
    }

    /// Reads the first bytes, rewinds, and asks the sniffer
    async fn detect_mime(&self, stream: &mut dyn UploadStream) -> Result<String, ClaimError> {
        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut *stream)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .map_err(ClaimError::storage)?;
        stream
            .seek(SeekFrom::Start(0))
            .await
            .map_err(ClaimError::storage)?;

        Ok(self.sniffer.sniff(&head))
    }
}
