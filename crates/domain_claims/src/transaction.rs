//! Transaction scoping for claim operations
//!
//! Every mutating operation runs inside exactly one transaction: either all
//! of its writes become visible or none do. Side effects outside the
//! database, such as removing a stored file, are collected as
//! [`AfterCommit`] tasks and only run once the commit succeeded.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ClaimError;
use crate::ports::{FileStorage, UnitOfWork};

/// Boxed future borrowed from a transaction handle
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs `f` inside a transaction of `uow`
///
/// The transaction commits if `f` returns `Ok` and rolls back otherwise. If
/// `deadline` elapses first, the work is abandoned, the transaction is rolled
/// back and [`ClaimError::DeadlineExceeded`] is returned.
pub async fn run_in_transaction<U, T, F>(
    uow: &U,
    deadline: Option<Duration>,
    f: F,
) -> Result<T, ClaimError>
where
    U: UnitOfWork + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut U::Tx) -> BoxFuture<'t, Result<T, ClaimError>> + Send,
{
    let mut tx = uow.begin().await?;

    let outcome = match deadline {
        Some(limit) => match tokio::time::timeout(limit, f(&mut tx)).await {
            Ok(result) => result,
            Err(_) => Err(ClaimError::DeadlineExceeded {
                timeout_ms: limit.as_millis() as u64,
            }),
        },
        None => f(&mut tx).await,
    };

    match outcome {
        Ok(value) => {
            uow.commit(tx).await?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback(tx).await {
                warn!(error = %rollback_error, "Rollback failed; transaction dropped");
            }
            debug!(error = %error, "Transaction rolled back");
            Err(error)
        }
    }
}

/// External cleanup that must not run unless the transaction committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffortTask {
    DeleteRemoteFile { url: String },
}

/// Tasks to run after a successful commit
///
/// Failures are logged and swallowed; the committed result stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AfterCommit {
    tasks: Vec<BestEffortTask>,
}

impl AfterCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_remote_file(&mut self, url: impl Into<String>) {
        self.tasks.push(BestEffortTask::DeleteRemoteFile { url: url.into() });
    }

    pub fn tasks(&self) -> &[BestEffortTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn run(self, storage: &dyn FileStorage) {
        for task in self.tasks {
            match task {
                BestEffortTask::DeleteRemoteFile { url } => {
                    if let Err(error) = storage.delete_by_url(&url).await {
                        warn!(url = %url, error = %error, "Failed to delete stored file after commit");
                    }
                }
            }
        }
    }
}

/// Result of a transactional operation plus its post-commit tasks
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub after_commit: AfterCommit,
}

impl<T> Committed<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            after_commit: AfterCommit::new(),
        }
    }

    pub fn with_tasks(value: T, after_commit: AfterCommit) -> Self {
        Self { value, after_commit }
    }
}
