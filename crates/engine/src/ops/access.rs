use uuid::Uuid;

use crate::{
    AuthContext, EditTarget, EngineError, ResultEngine, Theme, Transaction, Wallet, store::Store,
};

use super::Engine;

impl<S: Store> Engine<S> {
    /// Load a wallet owned by the caller.
    ///
    /// Wallets owned by someone else are reported exactly like missing ones.
    pub(super) async fn require_wallet(
        &self,
        ctx: &AuthContext,
        wallet_id: Uuid,
    ) -> ResultEngine<Wallet> {
        match self.store.wallet(wallet_id).await? {
            Some(wallet) if wallet.owner_id == ctx.user_id => Ok(wallet),
            _ => Err(EngineError::KeyNotFound("wallet not exists".to_string())),
        }
    }

    pub(super) async fn require_theme(
        &self,
        ctx: &AuthContext,
        theme_id: Uuid,
    ) -> ResultEngine<Theme> {
        let theme = self
            .store
            .theme(theme_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("theme not exists".to_string()))?;
        self.require_wallet(ctx, theme.wallet_id)
            .await
            .map_err(|_| EngineError::KeyNotFound("theme not exists".to_string()))?;
        Ok(theme)
    }

    pub(super) async fn require_transaction(
        &self,
        ctx: &AuthContext,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let tx = self
            .store
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        self.require_wallet(ctx, tx.wallet_id)
            .await
            .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Ok(tx)
    }

    /// Resolve what the user is editing to the wallet it lives in, checking
    /// ownership on the way.
    pub async fn resolve_edit_target(
        &self,
        ctx: &AuthContext,
        target: EditTarget,
    ) -> ResultEngine<Uuid> {
        match target {
            EditTarget::Wallet(id) => self.require_wallet(ctx, id).await.map(|w| w.id),
            EditTarget::Theme(id) => self.require_theme(ctx, id).await.map(|t| t.wallet_id),
            EditTarget::Transaction(id) => self
                .require_transaction(ctx, id)
                .await
                .map(|tx| tx.wallet_id),
        }
    }
}
