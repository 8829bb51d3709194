use uuid::Uuid;

use crate::{
    AuthContext, Money, ResultEngine, Wallet, WalletUpdate, store::Store,
    util::normalize_required_text,
};

use super::Engine;

impl<S: Store> Engine<S> {
    /// Return a wallet snapshot.
    pub async fn wallet(&self, ctx: &AuthContext, wallet_id: Uuid) -> ResultEngine<Wallet> {
        self.require_wallet(ctx, wallet_id).await
    }

    /// The caller's wallets, newest first.
    pub async fn wallets(&self, ctx: &AuthContext) -> ResultEngine<Vec<Wallet>> {
        self.store.wallets_for_owner(&ctx.user_id).await
    }

    /// Add a new wallet with an opening balance.
    ///
    /// The opening balance is stored as-is; it is not modeled as a
    /// transaction.
    pub async fn new_wallet(
        &self,
        ctx: &AuthContext,
        name: &str,
        opening_balance: Money,
    ) -> ResultEngine<Wallet> {
        let name = normalize_required_text(name, "wallet name")?;
        let wallet = Wallet::new(ctx.user_id.clone(), name, opening_balance);
        let wallet = self.store.insert_wallet(&wallet).await?;
        tracing::info!(wallet_id = %wallet.id, owner = %ctx.user_id, "wallet created");
        Ok(wallet)
    }

    /// Rename a wallet and/or overwrite its balance.
    ///
    /// A balance overwrite bypasses reconciliation entirely.
    pub async fn update_wallet(
        &self,
        ctx: &AuthContext,
        wallet_id: Uuid,
        update: WalletUpdate,
    ) -> ResultEngine<Wallet> {
        self.require_wallet(ctx, wallet_id).await?;
        let update = WalletUpdate {
            name: update
                .name
                .as_deref()
                .map(|name| normalize_required_text(name, "wallet name"))
                .transpose()?,
            balance: update.balance,
        };
        if update.balance.is_some() {
            tracing::info!(%wallet_id, "wallet balance overwritten");
        }
        self.store.update_wallet(wallet_id, &update).await
    }

    /// Delete a wallet with its themes and transactions.
    pub async fn delete_wallet(&self, ctx: &AuthContext, wallet_id: Uuid) -> ResultEngine<()> {
        self.require_wallet(ctx, wallet_id).await?;
        self.store.delete_wallet(wallet_id).await?;
        tracing::info!(%wallet_id, "wallet deleted");
        Ok(())
    }
}
