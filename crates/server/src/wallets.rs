//! Wallets API endpoints.

use api_types::wallet::{WalletNew, WalletUpdate, WalletView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{AuthContext, Money, Wallet};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn view(wallet: Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        name: wallet.name,
        balance_minor: wallet.balance.minor(),
        created_at: wallet.created_at,
        updated_at: wallet.updated_at,
    }
}

pub async fn list(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<WalletView>>, ServerError> {
    let wallets = state.engine.wallets(&ctx).await?;
    Ok(Json(wallets.into_iter().map(view).collect()))
}

pub async fn get(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(&ctx, wallet_id).await?;
    Ok(Json(view(wallet)))
}

pub async fn wallet_new(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Json(payload): Json<WalletNew>,
) -> Result<(StatusCode, Json<WalletView>), ServerError> {
    let wallet = state
        .engine
        .new_wallet(&ctx, &payload.name, Money::new(payload.balance_minor))
        .await?;
    Ok((StatusCode::CREATED, Json(view(wallet))))
}

pub async fn wallet_update(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<WalletUpdate>,
) -> Result<Json<WalletView>, ServerError> {
    if payload.name.is_none() && payload.balance_minor.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of name or balance_minor".to_string(),
        ));
    }

    let wallet = state
        .engine
        .update_wallet(
            &ctx,
            wallet_id,
            engine::WalletUpdate {
                name: payload.name,
                balance: payload.balance_minor.map(Money::new),
            },
        )
        .await?;
    Ok(Json(view(wallet)))
}

pub async fn wallet_delete(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_wallet(&ctx, wallet_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
