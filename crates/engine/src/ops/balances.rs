use uuid::Uuid;

use crate::{AuthContext, EngineError, ResultEngine, Theme, store::Store};

use super::Engine;

impl<S: Store> Engine<S> {
    /// Recomputes a theme's spend from the ledger.
    ///
    /// Sets `current_spent` to the sum of the expenses currently referencing
    /// the theme. This is the repair path after a partial reconciliation left
    /// the running total out of sync.
    pub async fn recalculate_theme_spent(
        &self,
        ctx: &AuthContext,
        theme_id: Uuid,
    ) -> ResultEngine<Theme> {
        let before = self.require_theme(ctx, theme_id).await?;
        let total = self.store.sum_expenses_for_theme(theme_id).await?;
        self.store.set_theme_spent(theme_id, total).await?;

        if before.current_spent != total {
            tracing::warn!(
                %theme_id,
                stored = %before.current_spent,
                recomputed = %total,
                "theme spend drift repaired"
            );
        }

        self.store
            .theme(theme_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("theme not exists".to_string()))
    }
}
