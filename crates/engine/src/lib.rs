//! Wallets, budget themes and the income/expense ledger that keeps them in
//! sync.
//!
//! [`Engine`] is the application facade: every call takes an
//! [`AuthContext`] and works only on the caller's own data. Transaction
//! writes go through the [`Reconciler`], which moves wallet balances and
//! theme spends along with the stored record.

pub use auth::{AuthContext, EditTarget};
pub use error::{EngineError, Operation, PartialReconciliation};
pub use money::Money;
pub use ops::{Engine, EngineBuilder, Summary, SummaryQuery, ThemeSpend, TransactionQuery};
pub use reconcile::{Applied, Effect, Plan, Reconciler, Step};
pub use store::{CatalogStore, LedgerStore, MemoryStore, SqlStore, Store, TransactionFilter};
pub use themes::{Theme, ThemeUpdate};
pub use transactions::{NewTransaction, Transaction, TransactionEdits, TransactionKind};
pub use wallets::{Wallet, WalletUpdate};

mod auth;
mod error;
mod money;
mod ops;
pub mod reconcile;
pub mod store;
pub mod themes;
pub mod transactions;
mod util;
pub mod wallets;

pub type ResultEngine<T> = Result<T, EngineError>;
