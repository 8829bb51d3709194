//! Transaction-to-balance reconciliation.
//!
//! The [`Reconciler`] keeps wallet balances and theme spends consistent with
//! the stored transactions as they are created, edited and deleted. It is a
//! function of its explicit inputs (the transactions involved and the store
//! handle); ownership and authentication are checked by the caller.
//!
//! Steps are not wrapped in one atomic commit. If a step after the first one
//! fails, the error is an [`EngineError::PartialReconciliation`] listing what
//! was committed, so the caller can retry the rest or warn the user.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use uuid::Uuid;

use crate::{
    EngineError, Money, NewTransaction, ResultEngine, Transaction, TransactionEdits,
    error::{Operation, PartialReconciliation},
    store::LedgerStore,
};

mod plan;

pub use plan::{Action, Effect, Plan, PlannedStep, Step, ThemeDelta};

/// Outcome of a successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub operation: Operation,
    /// The record as stored after a create or update, or the removed record
    /// after a delete.
    pub transaction: Transaction,
    pub steps: Vec<Step>,
    /// Balance of every wallet touched, after the operation.
    pub wallet_balances: BTreeMap<Uuid, Money>,
    /// Spend of every theme touched, after the operation.
    pub theme_spends: BTreeMap<Uuid, Money>,
}

#[derive(Debug)]
pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> Reconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a new transaction, then apply its effect.
    pub async fn apply_create(&self, input: NewTransaction) -> ResultEngine<Applied> {
        let tx = input.into_transaction()?;
        self.check_references(&tx).await?;
        let plan = Plan::create(&tx);
        self.check_headroom(&plan).await?;
        self.execute(plan, tx).await
    }

    /// Persist `edits` over `old`, then move balances as if `old` never
    /// existed and the edited transaction always had.
    pub async fn apply_update(
        &self,
        old: &Transaction,
        edits: TransactionEdits,
    ) -> ResultEngine<Applied> {
        let new = edits.apply_to(old)?;
        self.check_references(&new).await?;
        let plan = Plan::update(old, &new);
        self.check_headroom(&plan).await?;
        self.execute(plan, new).await
    }

    /// Remove `tx`, then undo its effect.
    pub async fn apply_delete(&self, tx: &Transaction) -> ResultEngine<Applied> {
        let plan = Plan::delete(tx);
        self.check_headroom(&plan).await?;
        self.execute(plan, tx.clone()).await
    }

    /// Fail with `KeyNotFound` before any write if the wallet or theme is
    /// missing, or if the theme belongs to another wallet.
    async fn check_references(&self, tx: &Transaction) -> ResultEngine<()> {
        self.store.wallet_balance(tx.wallet_id).await?;
        if let Some(theme_id) = tx.theme_id {
            let theme = self
                .store
                .theme(theme_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("theme not exists".to_string()))?;
            if theme.wallet_id != tx.wallet_id {
                return Err(EngineError::KeyNotFound(
                    "theme not exists in wallet".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Replay `plan` on the current balances and spends so an amount that
    /// would overflow is rejected before the record step.
    async fn check_headroom(&self, plan: &Plan) -> ResultEngine<()> {
        let mut wallets: HashMap<Uuid, Money> = HashMap::new();
        let mut themes: HashMap<Uuid, Money> = HashMap::new();
        for planned in &plan.steps {
            match planned.action {
                Action::Wallet { wallet_id, .. } if !wallets.contains_key(&wallet_id) => {
                    let balance = self.store.wallet_balance(wallet_id).await?;
                    wallets.insert(wallet_id, balance);
                }
                Action::Theme { theme_id, .. } if !themes.contains_key(&theme_id) => {
                    // A theme gone missing is reported by its own step.
                    if let Some(theme) = self.store.theme(theme_id).await? {
                        themes.insert(theme_id, theme.current_spent);
                    }
                }
                _ => {}
            }
        }
        plan.project(&mut wallets, &mut themes)
    }

    async fn execute(&self, plan: Plan, transaction: Transaction) -> ResultEngine<Applied> {
        let mut applied = Applied {
            operation: plan.operation,
            transaction,
            steps: Vec::with_capacity(plan.steps.len()),
            wallet_balances: BTreeMap::new(),
            theme_spends: BTreeMap::new(),
        };

        for (index, planned) in plan.steps.iter().enumerate() {
            if let Err(cause) = self.run(&planned.action, &mut applied).await {
                if applied.steps.is_empty() {
                    return Err(cause);
                }
                let pending: Vec<Step> = plan.steps[index + 1..].iter().map(|s| s.step).collect();
                tracing::warn!(
                    operation = %plan.operation,
                    transaction_id = %applied.transaction.id,
                    failed = %planned.step,
                    committed = ?applied.steps,
                    pending = ?pending,
                    "partial reconciliation: {cause}"
                );
                return Err(PartialReconciliation {
                    operation: plan.operation,
                    committed: applied.steps,
                    failed: planned.step,
                    pending,
                    cause: Box::new(cause),
                }
                .into());
            }
            tracing::debug!(
                operation = %plan.operation,
                transaction_id = %applied.transaction.id,
                step = %planned.step,
                "reconciliation step committed"
            );
            applied.steps.push(planned.step);
        }

        Ok(applied)
    }

    async fn run(&self, action: &Action, applied: &mut Applied) -> ResultEngine<()> {
        match action {
            Action::Insert(tx) => {
                applied.transaction = self.store.insert_transaction(tx).await?;
            }
            Action::Update(tx) => {
                applied.transaction = self.store.update_transaction(tx).await?;
            }
            Action::Delete(id) => {
                self.store.delete_transaction(*id).await?;
            }
            Action::Wallet { wallet_id, delta } => {
                let balance = self
                    .store
                    .increment_wallet_balance(*wallet_id, *delta)
                    .await?;
                applied.wallet_balances.insert(*wallet_id, balance);
            }
            Action::Theme { theme_id, delta } => {
                let spent = self.store.increment_theme_spent(*theme_id, *delta).await?;
                applied.theme_spends.insert(*theme_id, spent);
            }
        }
        Ok(())
    }
}
