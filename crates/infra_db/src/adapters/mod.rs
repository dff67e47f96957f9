//! Port adapters that are not tied to a claim transaction

pub mod users;

pub use users::PostgresUserDirectory;
