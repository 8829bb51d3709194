use api_types::error::{ErrorBody, ReconciliationFailure};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, PartialReconciliation};

pub use server::{AppEngine, ServerState, router, run, run_with_listener, spawn_with_listener};

mod server;
mod summary;
mod themes;
mod transactions;
mod user;
mod wallets;

pub mod types {
    pub mod wallet {
        pub use api_types::wallet::{WalletNew, WalletUpdate, WalletView};
    }

    pub mod theme {
        pub use api_types::theme::{ThemeNew, ThemeUpdate, ThemeView};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            BalanceView, Reconciled, TransactionKind, TransactionList, TransactionListResponse,
            TransactionNew, TransactionUpdate, TransactionView,
        };
    }

    pub mod summary {
        pub use api_types::summary::{SummaryQuery, SummaryView, ThemeSpendView};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Validation(_) | EngineError::InvalidId(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Database(_) | EngineError::PartialReconciliation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reconciliation_failure(partial: &PartialReconciliation) -> ReconciliationFailure {
    ReconciliationFailure {
        operation: partial.operation.to_string(),
        committed: partial.committed.iter().map(ToString::to_string).collect(),
        failed: partial.failed.to_string(),
        pending: partial.pending.iter().map(ToString::to_string).collect(),
    }
}

fn body_for_engine_error(err: EngineError) -> ErrorBody {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            ErrorBody {
                error: "internal server error".to_string(),
                reconciliation: None,
            }
        }
        EngineError::PartialReconciliation(partial) => {
            tracing::error!("{partial}");
            ErrorBody {
                error: "balances could not be fully updated, a manual recalculation may be needed"
                    .to_string(),
                reconciliation: Some(reconciliation_failure(&partial)),
            }
        }
        other => ErrorBody {
            error: other.to_string(),
            reconciliation: None,
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), body_for_engine_error(err)),
            ServerError::Generic(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    reconciliation: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
