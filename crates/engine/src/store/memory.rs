//! In-process store.
//!
//! Every operation holds one lock for its whole read-modify-write, which is
//! what makes the increments atomic. Cloning the store shares the state.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Theme, ThemeUpdate, Transaction, TransactionKind, Wallet,
    WalletUpdate, util::checked_sum,
};

use super::{CatalogStore, LedgerStore, TransactionFilter};

#[derive(Debug, Default)]
struct State {
    wallets: HashMap<Uuid, Wallet>,
    themes: HashMap<Uuid, Theme>,
    transactions: HashMap<Uuid, Transaction>,
}

impl State {
    fn wallet_mut(&mut self, wallet_id: Uuid) -> ResultEngine<&mut Wallet> {
        self.wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))
    }

    fn theme_mut(&mut self, theme_id: Uuid) -> ResultEngine<&mut Theme> {
        self.themes
            .get_mut(&theme_id)
            .ok_or_else(|| EngineError::KeyNotFound("theme not exists".to_string()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        let mut state = self.state.lock().await;
        if state.transactions.contains_key(&tx.id) {
            return Err(EngineError::Validation(format!(
                "transaction {} already exists",
                tx.id
            )));
        }
        state.transactions.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        let mut state = self.state.lock().await;
        let stored = state
            .transactions
            .get_mut(&tx.id)
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        let created_at = stored.created_at;
        *stored = tx.clone();
        stored.created_at = created_at;
        Ok(stored.clone())
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        let mut state = self.state.lock().await;
        state
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn wallet_balance(&self, wallet_id: Uuid) -> ResultEngine<Money> {
        Ok(self.state.lock().await.wallet_mut(wallet_id)?.balance)
    }

    async fn set_wallet_balance(&self, wallet_id: Uuid, balance: Money) -> ResultEngine<()> {
        let mut state = self.state.lock().await;
        let wallet = state.wallet_mut(wallet_id)?;
        wallet.balance = balance;
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_wallet_balance(
        &self,
        wallet_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Money> {
        let mut state = self.state.lock().await;
        let wallet = state.wallet_mut(wallet_id)?;
        wallet.balance = checked_sum(wallet.balance, delta)?;
        wallet.updated_at = Utc::now();
        Ok(wallet.balance)
    }

    async fn theme(&self, theme_id: Uuid) -> ResultEngine<Option<Theme>> {
        Ok(self.state.lock().await.themes.get(&theme_id).cloned())
    }

    async fn theme_spent(&self, theme_id: Uuid) -> ResultEngine<Money> {
        Ok(self.state.lock().await.theme_mut(theme_id)?.current_spent)
    }

    async fn set_theme_spent(&self, theme_id: Uuid, spent: Money) -> ResultEngine<()> {
        let mut state = self.state.lock().await;
        let theme = state.theme_mut(theme_id)?;
        theme.current_spent = spent.clamp_non_negative();
        theme.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_theme_spent(&self, theme_id: Uuid, delta: Money) -> ResultEngine<Money> {
        let mut state = self.state.lock().await;
        let theme = state.theme_mut(theme_id)?;
        theme.current_spent = checked_sum(theme.current_spent, delta)?.clamp_non_negative();
        theme.updated_at = Utc::now();
        Ok(theme.current_spent)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_wallet(&self, wallet: &Wallet) -> ResultEngine<Wallet> {
        let mut state = self.state.lock().await;
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet.clone())
    }

    async fn wallet(&self, wallet_id: Uuid) -> ResultEngine<Option<Wallet>> {
        Ok(self.state.lock().await.wallets.get(&wallet_id).cloned())
    }

    async fn wallets_for_owner(&self, owner_id: &str) -> ResultEngine<Vec<Wallet>> {
        let state = self.state.lock().await;
        let mut wallets: Vec<Wallet> = state
            .wallets
            .values()
            .filter(|w| w.owner_id == owner_id)
            .cloned()
            .collect();
        wallets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(wallets)
    }

    async fn update_wallet(&self, wallet_id: Uuid, update: &WalletUpdate) -> ResultEngine<Wallet> {
        let mut state = self.state.lock().await;
        let wallet = state.wallet_mut(wallet_id)?;
        if let Some(name) = &update.name {
            wallet.name = name.clone();
        }
        if let Some(balance) = update.balance {
            wallet.balance = balance;
        }
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn delete_wallet(&self, wallet_id: Uuid) -> ResultEngine<()> {
        let mut state = self.state.lock().await;
        state
            .wallets
            .remove(&wallet_id)
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))?;
        state.themes.retain(|_, theme| theme.wallet_id != wallet_id);
        state.transactions.retain(|_, tx| tx.wallet_id != wallet_id);
        Ok(())
    }

    async fn insert_theme(&self, theme: &Theme) -> ResultEngine<Theme> {
        let mut state = self.state.lock().await;
        state.wallet_mut(theme.wallet_id)?;
        state.themes.insert(theme.id, theme.clone());
        Ok(theme.clone())
    }

    async fn themes_for_wallet(&self, wallet_id: Uuid) -> ResultEngine<Vec<Theme>> {
        let state = self.state.lock().await;
        let mut themes: Vec<Theme> = state
            .themes
            .values()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect();
        themes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(themes)
    }

    async fn update_theme(&self, theme_id: Uuid, update: &ThemeUpdate) -> ResultEngine<Theme> {
        let mut state = self.state.lock().await;
        let theme = state.theme_mut(theme_id)?;
        if let Some(name) = &update.name {
            theme.name = name.clone();
        }
        if let Some(max_budget) = update.max_budget {
            theme.max_budget = max_budget;
        }
        theme.updated_at = Utc::now();
        Ok(theme.clone())
    }

    async fn delete_theme(&self, theme_id: Uuid) -> ResultEngine<()> {
        let mut state = self.state.lock().await;
        state
            .themes
            .remove(&theme_id)
            .ok_or_else(|| EngineError::KeyNotFound("theme not exists".to_string()))?;
        for tx in state.transactions.values_mut() {
            if tx.theme_id == Some(theme_id) {
                tx.theme_id = None;
            }
        }
        Ok(())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut txs: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }

    async fn sum_expenses_for_theme(&self, theme_id: Uuid) -> ResultEngine<Money> {
        let state = self.state.lock().await;
        state
            .transactions
            .values()
            .filter(|tx| tx.kind == TransactionKind::Expense && tx.theme_id == Some(theme_id))
            .try_fold(Money::ZERO, |total, tx| checked_sum(total, tx.amount))
    }
}
