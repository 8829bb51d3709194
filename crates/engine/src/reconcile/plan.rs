//! Pure delta computation.
//!
//! Nothing here touches the store: a [`Plan`] is the ordered list of writes a
//! mutation needs, and [`Plan::project`] replays it against in-memory
//! balances with the same clamping the stores apply.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Money, ResultEngine, Transaction, TransactionKind, error::Operation, util::checked_sum,
};

/// One write of a reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    InsertTransaction,
    UpdateTransaction,
    DeleteTransaction,
    ReverseWallet,
    ReverseTheme,
    ApplyWallet,
    ApplyTheme,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsertTransaction => "insert_transaction",
            Self::UpdateTransaction => "update_transaction",
            Self::DeleteTransaction => "delete_transaction",
            Self::ReverseWallet => "reverse_wallet",
            Self::ReverseTheme => "reverse_theme",
            Self::ApplyWallet => "apply_wallet",
            Self::ApplyTheme => "apply_theme",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeDelta {
    pub theme_id: Uuid,
    pub delta: Money,
}

/// What a transaction contributes to balances while it exists.
///
/// - income: `+amount` on the wallet
/// - expense: `-amount` on the wallet and `+amount` on its theme, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effect {
    pub wallet_id: Uuid,
    pub wallet_delta: Money,
    pub theme: Option<ThemeDelta>,
}

impl Effect {
    pub fn new(
        wallet_id: Uuid,
        kind: TransactionKind,
        amount: Money,
        theme_id: Option<Uuid>,
    ) -> Self {
        match kind {
            TransactionKind::Income => Self {
                wallet_id,
                wallet_delta: amount,
                theme: None,
            },
            TransactionKind::Expense => Self {
                wallet_id,
                wallet_delta: -amount,
                theme: theme_id.map(|theme_id| ThemeDelta {
                    theme_id,
                    delta: amount,
                }),
            },
        }
    }

    pub fn of(tx: &Transaction) -> Self {
        Self::new(tx.wallet_id, tx.kind, tx.amount, tx.theme_id)
    }

    /// The effect that undoes this one.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            wallet_id: self.wallet_id,
            wallet_delta: -self.wallet_delta,
            theme: self.theme.map(|theme| ThemeDelta {
                theme_id: theme.theme_id,
                delta: -theme.delta,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Insert(Transaction),
    Update(Transaction),
    Delete(Uuid),
    Wallet { wallet_id: Uuid, delta: Money },
    Theme { theme_id: Uuid, delta: Money },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub action: Action,
}

/// Ordered writes for one mutation.
///
/// The record write always comes first, so a failure there leaves nothing
/// behind. Updates reverse the old effect and apply the new one as separate
/// steps; theme steps are never merged so the zero floor behaves exactly as
/// a delete followed by a create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub operation: Operation,
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn create(tx: &Transaction) -> Self {
        let mut steps = vec![PlannedStep {
            step: Step::InsertTransaction,
            action: Action::Insert(tx.clone()),
        }];
        push_effect(&mut steps, Effect::of(tx), Step::ApplyWallet, Step::ApplyTheme);
        Self {
            operation: Operation::Create,
            steps,
        }
    }

    pub fn update(old: &Transaction, new: &Transaction) -> Self {
        let mut steps = vec![PlannedStep {
            step: Step::UpdateTransaction,
            action: Action::Update(new.clone()),
        }];
        push_effect(
            &mut steps,
            Effect::of(old).reversed(),
            Step::ReverseWallet,
            Step::ReverseTheme,
        );
        push_effect(&mut steps, Effect::of(new), Step::ApplyWallet, Step::ApplyTheme);
        Self {
            operation: Operation::Update,
            steps,
        }
    }

    pub fn delete(tx: &Transaction) -> Self {
        let mut steps = vec![PlannedStep {
            step: Step::DeleteTransaction,
            action: Action::Delete(tx.id),
        }];
        push_effect(
            &mut steps,
            Effect::of(tx).reversed(),
            Step::ReverseWallet,
            Step::ReverseTheme,
        );
        Self {
            operation: Operation::Delete,
            steps,
        }
    }

    pub fn step_names(&self) -> Vec<Step> {
        self.steps.iter().map(|s| s.step).collect()
    }

    /// Replay the balance steps on in-memory values.
    ///
    /// Missing entries start at zero. Theme spends are floored at zero after
    /// every step. Fails with a validation error if a value would leave the
    /// `i64` range.
    pub fn project(
        &self,
        wallets: &mut HashMap<Uuid, Money>,
        themes: &mut HashMap<Uuid, Money>,
    ) -> ResultEngine<()> {
        for planned in &self.steps {
            match planned.action {
                Action::Wallet { wallet_id, delta } => {
                    let balance = wallets.entry(wallet_id).or_default();
                    *balance = checked_sum(*balance, delta)?;
                }
                Action::Theme { theme_id, delta } => {
                    let spent = themes.entry(theme_id).or_default();
                    *spent = checked_sum(*spent, delta)?.clamp_non_negative();
                }
                Action::Insert(_) | Action::Update(_) | Action::Delete(_) => {}
            }
        }
        Ok(())
    }
}

fn push_effect(steps: &mut Vec<PlannedStep>, effect: Effect, wallet_step: Step, theme_step: Step) {
    steps.push(PlannedStep {
        step: wallet_step,
        action: Action::Wallet {
            wallet_id: effect.wallet_id,
            delta: effect.wallet_delta,
        },
    });
    if let Some(theme) = effect.theme {
        steps.push(PlannedStep {
            step: theme_step,
            action: Action::Theme {
                theme_id: theme.theme_id,
                delta: theme.delta,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn tx(kind: TransactionKind, amount: i64, theme_id: Option<Uuid>, wallet_id: Uuid) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            wallet_id,
            theme_id,
            description: "test".to_string(),
            amount: Money::new(amount),
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn income_touches_only_the_wallet() {
        let wallet = Uuid::new_v4();
        let effect = Effect::of(&tx(TransactionKind::Income, 500, None, wallet));
        assert_eq!(effect.wallet_delta, Money::new(500));
        assert_eq!(effect.theme, None);
    }

    #[test]
    fn expense_moves_wallet_and_theme_in_opposite_directions() {
        let wallet = Uuid::new_v4();
        let theme = Uuid::new_v4();
        let effect = Effect::of(&tx(TransactionKind::Expense, 500, Some(theme), wallet));
        assert_eq!(effect.wallet_delta, Money::new(-500));
        assert_eq!(
            effect.theme,
            Some(ThemeDelta {
                theme_id: theme,
                delta: Money::new(500)
            })
        );
        assert_eq!(effect.reversed().reversed(), effect);
    }

    #[test]
    fn plans_put_the_record_write_first() {
        let wallet = Uuid::new_v4();
        let theme = Uuid::new_v4();
        let old = tx(TransactionKind::Expense, 500, Some(theme), wallet);
        let mut new = old.clone();
        new.kind = TransactionKind::Income;
        new.theme_id = None;

        assert_eq!(
            Plan::create(&old).step_names(),
            vec![Step::InsertTransaction, Step::ApplyWallet, Step::ApplyTheme]
        );
        assert_eq!(
            Plan::update(&old, &new).step_names(),
            vec![
                Step::UpdateTransaction,
                Step::ReverseWallet,
                Step::ReverseTheme,
                Step::ApplyWallet
            ]
        );
        assert_eq!(
            Plan::delete(&new).step_names(),
            vec![Step::DeleteTransaction, Step::ReverseWallet]
        );
    }

    #[test]
    fn expense_to_income_switch_nets_double_amount() {
        let wallet = Uuid::new_v4();
        let theme = Uuid::new_v4();
        let old = tx(TransactionKind::Expense, 50_000, Some(theme), wallet);
        let mut new = old.clone();
        new.kind = TransactionKind::Income;
        new.theme_id = None;

        let mut wallets = HashMap::from([(wallet, Money::new(50_000))]);
        let mut themes = HashMap::from([(theme, Money::new(50_000))]);
        Plan::update(&old, &new)
            .project(&mut wallets, &mut themes)
            .unwrap();

        assert_eq!(wallets[&wallet], Money::new(150_000));
        assert_eq!(themes[&theme], Money::ZERO);
    }

    #[test]
    fn reverse_clamps_before_reapplying() {
        let wallet = Uuid::new_v4();
        let theme = Uuid::new_v4();
        let old = tx(TransactionKind::Expense, 500, Some(theme), wallet);
        let mut new = old.clone();
        new.amount = Money::new(600);

        // Spend drifted below the old amount: the reversal floors at zero
        // and the new amount lands on top of it.
        let mut wallets = HashMap::new();
        let mut themes = HashMap::from([(theme, Money::new(100))]);
        Plan::update(&old, &new)
            .project(&mut wallets, &mut themes)
            .unwrap();

        assert_eq!(themes[&theme], Money::new(600));
        assert_eq!(wallets[&wallet], Money::new(-100));
    }

    #[test]
    fn projection_rejects_a_balance_past_the_limit() {
        let wallet = Uuid::new_v4();
        let tx = tx(TransactionKind::Income, 100, None, wallet);

        let mut wallets = HashMap::from([(wallet, Money::new(i64::MAX - 10))]);
        let mut themes = HashMap::new();
        assert!(matches!(
            Plan::create(&tx).project(&mut wallets, &mut themes),
            Err(crate::EngineError::Validation(_))
        ));
    }
}
