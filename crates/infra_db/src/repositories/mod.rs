//! Transactional repositories for the claim aggregate
//!
//! Each repository implements one of the claims domain's repository ports
//! for the PostgreSQL transaction handle [`PgTx`](crate::PgTx). Rows are
//! mapped onto domain types through `From` impls; PostgreSQL enums are
//! mirrored by `Db*` types deriving `sqlx::Type`.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible to every read.

pub mod claims;
pub mod items;
pub mod attachments;
pub mod history;

pub use claims::PostgresClaimRepository;
pub use items::PostgresItemRepository;
pub use attachments::PostgresAttachmentRepository;
pub use history::PostgresHistoryRepository;
