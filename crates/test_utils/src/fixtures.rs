//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for warranty claims: file signatures for the
//! attachment sniffer, users, and typical item costs.

use std::io::Cursor;

use core_kernel::{OfficeId, UserId};
use domain_claims::{UploadStream, User, UserRole};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Leading bytes of common file formats
pub struct FileFixtures;

impl FileFixtures {
    pub fn png() -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1A\n\x00\x00\x00\rIHDR".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        bytes
    }

    pub fn jpeg() -> Vec<u8> {
        let mut bytes = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        bytes
    }

    pub fn mp4() -> Vec<u8> {
        let mut bytes = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom".to_vec();
        bytes.extend_from_slice(&[0u8; 1024]);
        bytes
    }

    pub fn pdf() -> Vec<u8> {
        b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec()
    }

    pub fn plain_text() -> Vec<u8> {
        b"Battery diagnostics: cell 14 reports 2.9V under load".to_vec()
    }

    /// Wraps bytes in a rewindable upload stream
    pub fn upload(bytes: Vec<u8>) -> Box<dyn UploadStream> {
        Box::new(Cursor::new(bytes))
    }
}

/// Users of the claim workflow
pub struct UserFixtures;

impl UserFixtures {
    pub fn with_role(role: UserRole, office_id: OfficeId) -> User {
        User {
            id: UserId::new_v7(),
            office_id,
            role,
        }
    }

    pub fn staff(office_id: OfficeId) -> User {
        Self::with_role(UserRole::ScStaff, office_id)
    }

    pub fn technician(office_id: OfficeId) -> User {
        Self::with_role(UserRole::ScTechnician, office_id)
    }

    pub fn reviewer() -> User {
        Self::with_role(UserRole::EvmStaff, OfficeId::new_v7())
    }
}

/// Typical item costs
pub struct CostFixtures;

impl CostFixtures {
    pub fn connector_repair() -> Decimal {
        dec!(180.00)
    }

    pub fn battery_module() -> Decimal {
        dec!(2450.75)
    }

    pub fn inverter_board() -> Decimal {
        dec!(1320.40)
    }
}
