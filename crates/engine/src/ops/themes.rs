use uuid::Uuid;

use crate::{
    AuthContext, Money, ResultEngine, Theme, ThemeUpdate, store::Store,
    util::{normalize_required_text, validate_budget},
};

use super::Engine;

impl<S: Store> Engine<S> {
    pub async fn theme(&self, ctx: &AuthContext, theme_id: Uuid) -> ResultEngine<Theme> {
        self.require_theme(ctx, theme_id).await
    }

    /// Themes of one of the caller's wallets, newest first.
    pub async fn themes(&self, ctx: &AuthContext, wallet_id: Uuid) -> ResultEngine<Vec<Theme>> {
        self.require_wallet(ctx, wallet_id).await?;
        self.store.themes_for_wallet(wallet_id).await
    }

    /// Add a budget theme to a wallet. It starts with nothing spent.
    pub async fn new_theme(
        &self,
        ctx: &AuthContext,
        wallet_id: Uuid,
        name: &str,
        max_budget: Money,
    ) -> ResultEngine<Theme> {
        let name = normalize_required_text(name, "theme name")?;
        validate_budget(max_budget)?;
        self.require_wallet(ctx, wallet_id).await?;

        let theme = Theme::new(wallet_id, name, max_budget);
        self.store.insert_theme(&theme).await
    }

    /// Rename a theme and/or change its cap. The spend is left alone.
    pub async fn update_theme(
        &self,
        ctx: &AuthContext,
        theme_id: Uuid,
        update: ThemeUpdate,
    ) -> ResultEngine<Theme> {
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_required_text(name, "theme name"))
            .transpose()?;
        if let Some(max_budget) = update.max_budget {
            validate_budget(max_budget)?;
        }
        self.require_theme(ctx, theme_id).await?;

        let update = ThemeUpdate {
            name,
            max_budget: update.max_budget,
        };
        self.store.update_theme(theme_id, &update).await
    }

    /// Delete a theme. Its expenses stay in the wallet, detached from any
    /// theme, and the wallet balance is not touched.
    pub async fn delete_theme(&self, ctx: &AuthContext, theme_id: Uuid) -> ResultEngine<()> {
        self.require_theme(ctx, theme_id).await?;
        self.store.delete_theme(theme_id).await
    }
}
