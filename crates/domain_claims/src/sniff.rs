//! Content type detection from leading bytes
//!
//! Attachments are classified by what the bytes are, never by the name or
//! type the uploader claims.

use core_kernel::DomainPort;

use crate::ports::ContentSniffer;

/// Number of leading bytes inspected
pub const SNIFF_LEN: usize = 512;

/// Returned when no signature matches
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Matches well-known file signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureSniffer;

impl SignatureSniffer {
    pub fn new() -> Self {
        Self
    }

    fn detect(head: &[u8]) -> Option<&'static str> {
        const PREFIXES: &[(&[u8], &str)] = &[
            (b"\xFF\xD8\xFF", "image/jpeg"),
            (b"\x89PNG\r\n\x1A\n", "image/png"),
            (b"GIF87a", "image/gif"),
            (b"GIF89a", "image/gif"),
            (b"BM", "image/bmp"),
            (b"%PDF-", "application/pdf"),
            (b"\x1A\x45\xDF\xA3", "video/webm"),
        ];

        if let Some((_, mime)) = PREFIXES.iter().find(|(magic, _)| head.starts_with(magic)) {
            return Some(*mime);
        }

        // RIFF containers carry their format at offset 8
        if head.len() >= 12 && &head[..4] == b"RIFF" {
            return match &head[8..12] {
                b"WEBP" => Some("image/webp"),
                b"AVI " => Some("video/x-msvideo"),
                _ => None,
            };
        }

        // ISO base media: box size, then "ftyp", then the major brand
        if head.len() >= 12 && &head[4..8] == b"ftyp" {
            return match &head[8..12] {
                b"qt  " => Some("video/quicktime"),
                b"heic" | b"heix" | b"mif1" => Some("image/heic"),
                _ => Some("video/mp4"),
            };
        }

        None
    }
}

impl DomainPort for SignatureSniffer {}

impl ContentSniffer for SignatureSniffer {
    fn sniff(&self, head: &[u8]) -> String {
        let head = &head[..head.len().min(SNIFF_LEN)];
        Self::detect(head).unwrap_or(UNKNOWN_MIME).to_string()
    }
}
