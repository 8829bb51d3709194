//! Dashboard figures over a time range.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuthContext, Money, ResultEngine, TransactionKind, store::Store,
    util::checked_sum,
};

use super::{Engine, TransactionQuery};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Restrict income/expense figures to one wallet. The total balance
    /// always covers every wallet.
    pub wallet_id: Option<Uuid>,
}

/// Expenses attributed to one theme. `theme_id` is `None` for expenses
/// without a theme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThemeSpend {
    pub theme_id: Option<Uuid>,
    pub name: Option<String>,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_balance: Money,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    /// Sorted by amount, largest first.
    pub by_theme: Vec<ThemeSpend>,
}

impl<S: Store> Engine<S> {
    pub async fn summary(&self, ctx: &AuthContext, query: SummaryQuery) -> ResultEngine<Summary> {
        let wallets = self.store.wallets_for_owner(&ctx.user_id).await?;
        let total_balance = wallets
            .iter()
            .try_fold(Money::ZERO, |total, w| checked_sum(total, w.balance))?;

        let txs = self
            .transactions(
                ctx,
                TransactionQuery {
                    wallet_id: query.wallet_id,
                    from: query.from,
                    to: query.to,
                    ..Default::default()
                },
            )
            .await?;

        let mut income = Money::ZERO;
        let mut expense = Money::ZERO;
        let mut per_theme: HashMap<Option<Uuid>, Money> = HashMap::new();
        for tx in &txs {
            match tx.kind {
                TransactionKind::Income => income = checked_sum(income, tx.amount)?,
                TransactionKind::Expense => {
                    expense = checked_sum(expense, tx.amount)?;
                    let spent = per_theme.entry(tx.theme_id).or_default();
                    *spent = checked_sum(*spent, tx.amount)?;
                }
            }
        }

        let mut names: HashMap<Uuid, String> = HashMap::new();
        for wallet in &wallets {
            if query.wallet_id.is_some_and(|id| id != wallet.id) {
                continue;
            }
            for theme in self.store.themes_for_wallet(wallet.id).await? {
                names.insert(theme.id, theme.name);
            }
        }

        let mut by_theme: Vec<ThemeSpend> = per_theme
            .into_iter()
            .map(|(theme_id, amount)| ThemeSpend {
                theme_id,
                name: theme_id.and_then(|id| names.get(&id).cloned()),
                amount,
            })
            .collect();
        by_theme.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));

        Ok(Summary {
            total_balance,
            income,
            expense,
            // Both sides are non-negative sums, so this cannot overflow.
            net: income - expense,
            by_theme,
        })
    }
}
