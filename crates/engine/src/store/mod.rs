//! Data-access traits the engine is written against, and their
//! implementations.
//!
//! [`LedgerStore`] is the narrow interface reconciliation needs. Balance and
//! spend changes go through the `increment_*` primitives, which must be
//! atomic read-modify-writes on the store side so two reconciliations racing
//! on the same wallet or theme cannot lose an update.
//!
//! [`CatalogStore`] covers the rest of the application: wallet/theme CRUD
//! and transaction listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Money, ResultEngine, Theme, ThemeUpdate, Transaction, TransactionKind, Wallet, WalletUpdate,
};

mod memory;
mod sql;

pub use memory::MemoryStore;
pub use sql::SqlStore;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new transaction record.
    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction>;

    /// Replace the stored record having `tx.id`. Fails with `KeyNotFound` if
    /// there is none.
    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction>;

    /// Remove a transaction record. Fails with `KeyNotFound` if there is none.
    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()>;

    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>>;

    async fn wallet_balance(&self, wallet_id: Uuid) -> ResultEngine<Money>;

    async fn set_wallet_balance(&self, wallet_id: Uuid, balance: Money) -> ResultEngine<()>;

    /// Atomically add `delta` to the balance and return the new balance.
    async fn increment_wallet_balance(&self, wallet_id: Uuid, delta: Money)
    -> ResultEngine<Money>;

    async fn theme(&self, theme_id: Uuid) -> ResultEngine<Option<Theme>>;

    async fn theme_spent(&self, theme_id: Uuid) -> ResultEngine<Money>;

    /// Overwrite the spend, floored at zero.
    async fn set_theme_spent(&self, theme_id: Uuid, spent: Money) -> ResultEngine<()>;

    /// Atomically add `delta` to the spend, flooring the result at zero, and
    /// return the new spend.
    async fn increment_theme_spent(&self, theme_id: Uuid, delta: Money) -> ResultEngine<Money>;
}

/// Selection for [`CatalogStore::list_transactions`].
///
/// An empty `wallet_ids` matches nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub wallet_ids: Vec<Uuid>,
    pub theme_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub(crate) fn matches(&self, tx: &Transaction) -> bool {
        self.wallet_ids.contains(&tx.wallet_id)
            && self.theme_id.is_none_or(|id| tx.theme_id == Some(id))
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.from.is_none_or(|from| tx.created_at >= from)
            && self.to.is_none_or(|to| tx.created_at <= to)
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<Wallet>;

    async fn wallet(&self, wallet_id: Uuid) -> ResultEngine<Option<Wallet>>;

    /// Wallets owned by `owner_id`, newest first.
    async fn wallets_for_owner(&self, owner_id: &str) -> ResultEngine<Vec<Wallet>>;

    async fn update_wallet(&self, wallet_id: Uuid, update: &WalletUpdate) -> ResultEngine<Wallet>;

    /// Delete a wallet together with its themes and transactions.
    async fn delete_wallet(&self, wallet_id: Uuid) -> ResultEngine<()>;

    async fn insert_theme(&self, theme: &Theme) -> ResultEngine<Theme>;

    /// Themes of a wallet, newest first.
    async fn themes_for_wallet(&self, wallet_id: Uuid) -> ResultEngine<Vec<Theme>>;

    async fn update_theme(&self, theme_id: Uuid, update: &ThemeUpdate) -> ResultEngine<Theme>;

    /// Delete a theme. Transactions that referenced it are kept with no theme.
    async fn delete_theme(&self, theme_id: Uuid) -> ResultEngine<()>;

    /// Transactions matching `filter`, newest first.
    async fn list_transactions(&self, filter: &TransactionFilter)
    -> ResultEngine<Vec<Transaction>>;

    /// Sum of the amounts of the expenses currently referencing `theme_id`.
    async fn sum_expenses_for_theme(&self, theme_id: Uuid) -> ResultEngine<Money>;
}

/// Everything the [`Engine`](crate::Engine) facade needs.
pub trait Store: LedgerStore + CatalogStore {}

impl<T: LedgerStore + CatalogStore> Store for T {}
