use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    AuthContext, NewTransaction, ResultEngine, Transaction, TransactionEdits, TransactionKind,
    reconcile::Applied,
    store::{Store, TransactionFilter},
};

use super::Engine;

/// Filters for [`Engine::transactions`].
///
/// Without `wallet_id` every wallet of the caller is searched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub wallet_id: Option<Uuid>,
    pub theme_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl<S: Store> Engine<S> {
    /// Record an income or expense and reconcile the wallet and theme.
    pub async fn create_transaction(
        &self,
        ctx: &AuthContext,
        input: NewTransaction,
    ) -> ResultEngine<Applied> {
        self.require_wallet(ctx, input.wallet_id).await?;
        let applied = self.reconciler.apply_create(input).await?;
        tracing::info!(transaction_id = %applied.transaction.id, "transaction created");
        Ok(applied)
    }

    /// Replace a transaction with `edits` and reconcile both its old and new
    /// wallet/theme.
    pub async fn update_transaction(
        &self,
        ctx: &AuthContext,
        transaction_id: Uuid,
        edits: TransactionEdits,
    ) -> ResultEngine<Applied> {
        let old = self.require_transaction(ctx, transaction_id).await?;
        if edits.wallet_id != old.wallet_id {
            self.require_wallet(ctx, edits.wallet_id).await?;
        }
        let applied = self.reconciler.apply_update(&old, edits).await?;
        tracing::info!(%transaction_id, "transaction updated");
        Ok(applied)
    }

    /// Delete a transaction and undo its effect.
    pub async fn delete_transaction(
        &self,
        ctx: &AuthContext,
        transaction_id: Uuid,
    ) -> ResultEngine<Applied> {
        let tx = self.require_transaction(ctx, transaction_id).await?;
        let applied = self.reconciler.apply_delete(&tx).await?;
        tracing::info!(%transaction_id, "transaction deleted");
        Ok(applied)
    }

    pub async fn transaction(
        &self,
        ctx: &AuthContext,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        self.require_transaction(ctx, transaction_id).await
    }

    /// The caller's transactions matching `query`, newest first.
    pub async fn transactions(
        &self,
        ctx: &AuthContext,
        query: TransactionQuery,
    ) -> ResultEngine<Vec<Transaction>> {
        let wallet_ids = match query.wallet_id {
            Some(wallet_id) => vec![self.require_wallet(ctx, wallet_id).await?.id],
            None => self
                .store
                .wallets_for_owner(&ctx.user_id)
                .await?
                .into_iter()
                .map(|w| w.id)
                .collect(),
        };

        let filter = TransactionFilter {
            wallet_ids,
            theme_id: query.theme_id,
            kind: query.kind,
            from: query.from,
            to: query.to,
        };
        self.store.list_transactions(&filter).await
    }
}
