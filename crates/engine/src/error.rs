//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown before any store call when a required field is
//!   missing or an amount is not positive.
//! - [`KeyNotFound`] thrown when a wallet, theme or transaction does not exist
//!   (or is not visible to the caller).
//! - [`Database`] thrown when the record store fails.
//! - [`PartialReconciliation`] thrown when some reconciliation steps were
//!   committed and a later one failed.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Database`]: EngineError::Database
//!  [`PartialReconciliation`]: EngineError::PartialReconciliation
use std::fmt;

use sea_orm::DbErr;
use thiserror::Error;

use crate::reconcile::Step;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    PartialReconciliation(#[from] PartialReconciliation),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::PartialReconciliation(a), Self::PartialReconciliation(b)) => {
                a.operation == b.operation
                    && a.committed == b.committed
                    && a.failed == b.failed
                    && a.pending == b.pending
            }
            _ => false,
        }
    }
}

/// The mutation a reconciliation was running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet, theme and transaction are no longer mutually consistent.
///
/// `committed` steps were persisted, `failed` was attempted and errored,
/// `pending` were never attempted. The caller decides whether to retry the
/// remaining steps or to ask the user for a manual repair.
#[derive(Error, Debug)]
#[error("{operation} reconciliation failed at step {failed} after committing {committed:?}: {cause}")]
pub struct PartialReconciliation {
    pub operation: Operation,
    pub committed: Vec<Step>,
    pub failed: Step,
    pub pending: Vec<Step>,
    #[source]
    pub cause: Box<EngineError>,
}
