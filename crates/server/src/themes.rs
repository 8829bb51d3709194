//! Budget themes API endpoints.

use api_types::theme::{ThemeNew, ThemeUpdate, ThemeView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{AuthContext, Money, Theme};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn view(theme: Theme) -> ThemeView {
    ThemeView {
        id: theme.id,
        wallet_id: theme.wallet_id,
        remaining_minor: theme.remaining().minor(),
        over_budget: theme.is_over_budget(),
        name: theme.name,
        max_budget_minor: theme.max_budget.minor(),
        current_spent_minor: theme.current_spent.minor(),
    }
}

/// Themes of the wallet in the path.
pub async fn list(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<Vec<ThemeView>>, ServerError> {
    let themes = state.engine.themes(&ctx, wallet_id).await?;
    Ok(Json(themes.into_iter().map(view).collect()))
}

pub async fn get(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(theme_id): Path<Uuid>,
) -> Result<Json<ThemeView>, ServerError> {
    let theme = state.engine.theme(&ctx, theme_id).await?;
    Ok(Json(view(theme)))
}

pub async fn theme_new(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<ThemeNew>,
) -> Result<(StatusCode, Json<ThemeView>), ServerError> {
    let theme = state
        .engine
        .new_theme(
            &ctx,
            wallet_id,
            &payload.name,
            Money::new(payload.max_budget_minor),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view(theme))))
}

pub async fn theme_update(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(theme_id): Path<Uuid>,
    Json(payload): Json<ThemeUpdate>,
) -> Result<Json<ThemeView>, ServerError> {
    if payload.name.is_none() && payload.max_budget_minor.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of name or max_budget_minor".to_string(),
        ));
    }

    let theme = state
        .engine
        .update_theme(
            &ctx,
            theme_id,
            engine::ThemeUpdate {
                name: payload.name,
                max_budget: payload.max_budget_minor.map(Money::new),
            },
        )
        .await?;
    Ok(Json(view(theme)))
}

pub async fn theme_delete(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(theme_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_theme(&ctx, theme_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuild the theme's spend from its expenses.
pub async fn recalculate(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(theme_id): Path<Uuid>,
) -> Result<Json<ThemeView>, ServerError> {
    let theme = state.engine.recalculate_theme_spent(&ctx, theme_id).await?;
    Ok(Json(view(theme)))
}
