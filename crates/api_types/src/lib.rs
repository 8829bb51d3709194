//! JSON bodies of the HTTP API.
//!
//! Amounts are integer minor units (`"amount_minor": 1250` is 12.50).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod wallet {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletNew {
        pub name: String,
        /// Opening balance. Defaults to zero.
        #[serde(default)]
        pub balance_minor: i64,
    }

    /// Partial update. A `balance_minor` overwrites the balance directly,
    /// without going through any transaction.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct WalletUpdate {
        pub name: Option<String>,
        pub balance_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub id: Uuid,
        pub name: String,
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod theme {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThemeNew {
        pub name: String,
        pub max_budget_minor: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ThemeUpdate {
        pub name: Option<String>,
        pub max_budget_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThemeView {
        pub id: Uuid,
        pub wallet_id: Uuid,
        pub name: String,
        pub max_budget_minor: i64,
        pub current_spent_minor: i64,
        /// `max_budget - current_spent`; negative when over budget.
        pub remaining_minor: i64,
        pub over_budget: bool,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub wallet_id: Option<Uuid>,
        pub theme_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    /// Body of `POST /transactions`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub wallet_id: Uuid,
        /// Required for expenses, forbidden for incomes.
        pub theme_id: Option<Uuid>,
        pub description: String,
        /// Must be > 0. The kind defines the direction.
        pub amount_minor: i64,
        pub kind: TransactionKind,
    }

    /// Body of `PATCH /transactions/{id}`.
    ///
    /// Missing fields keep their current value. To drop the theme when
    /// switching an expense to an income, send `kind: "income"` alone: the
    /// theme is cleared automatically.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub wallet_id: Option<Uuid>,
        pub theme_id: Option<Uuid>,
        pub description: Option<String>,
        pub amount_minor: Option<i64>,
        pub kind: Option<TransactionKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub wallet_id: Uuid,
        pub theme_id: Option<Uuid>,
        pub description: String,
        pub amount_minor: i64,
        pub kind: TransactionKind,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    /// Result of a create, update or delete: the record plus the balances
    /// it moved.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Reconciled {
        pub transaction: TransactionView,
        pub steps: Vec<String>,
        pub wallets: Vec<BalanceView>,
        pub themes: Vec<BalanceView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub id: Uuid,
        pub amount_minor: i64,
    }
}

pub mod summary {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub wallet_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ThemeSpendView {
        pub theme_id: Option<Uuid>,
        pub name: Option<String>,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        pub total_balance_minor: i64,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
        pub by_theme: Vec<ThemeSpendView>,
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub error: String,
        /// Present when a transaction write left balances out of sync.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub reconciliation: Option<ReconciliationFailure>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconciliationFailure {
        pub operation: String,
        pub committed: Vec<String>,
        pub failed: String,
        pub pending: Vec<String>,
    }
}
