//! Evidence files attached to a claim

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AttachmentId, ClaimId};

/// Coarse category of an attachment, derived from its sniffed MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Image,
    Video,
    Other,
}

impl AttachmentType {
    /// Maps a MIME type onto a supported category
    ///
    /// Returns `None` for content that cannot be attached to a claim.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            Some(AttachmentType::Image)
        } else if essence.starts_with("video/") {
            Some(AttachmentType::Video)
        } else if essence == "application/pdf" {
            Some(AttachmentType::Other)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Video => "video",
            AttachmentType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(AttachmentType::Image),
            "video" => Some(AttachmentType::Video),
            "other" => Some(AttachmentType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored evidence file bound to a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAttachment {
    pub id: AttachmentId,
    pub claim_id: ClaimId,
    pub attachment_type: AttachmentType,
    /// Location returned by the file storage
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimAttachment {
    pub fn new(claim_id: ClaimId, attachment_type: AttachmentType, url: String) -> Self {
        Self {
            id: AttachmentId::new_v7(),
            claim_id,
            attachment_type,
            url,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_mapping() {
        assert_eq!(AttachmentType::from_mime("image/jpeg"), Some(AttachmentType::Image));
        assert_eq!(AttachmentType::from_mime("video/mp4"), Some(AttachmentType::Video));
        assert_eq!(AttachmentType::from_mime("application/pdf"), Some(AttachmentType::Other));
        assert_eq!(AttachmentType::from_mime("Image/PNG; charset=binary"), Some(AttachmentType::Image));
        assert_eq!(AttachmentType::from_mime("application/octet-stream"), None);
        assert_eq!(AttachmentType::from_mime("text/plain; charset=utf-8"), None);
    }
}
