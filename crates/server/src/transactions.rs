//! Transactions API endpoints

use std::collections::BTreeMap;

use api_types::transaction::{
    BalanceView, Reconciled, TransactionKind as ApiKind, TransactionList,
    TransactionListResponse, TransactionNew, TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    Applied, AuthContext, Money, NewTransaction, Transaction, TransactionEdits, TransactionKind,
    TransactionQuery,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

fn engine_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        wallet_id: tx.wallet_id,
        theme_id: tx.theme_id,
        description: tx.description,
        amount_minor: tx.amount.minor(),
        kind: map_kind(tx.kind),
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

fn balances(map: BTreeMap<Uuid, Money>) -> Vec<BalanceView> {
    map.into_iter()
        .map(|(id, amount)| BalanceView {
            id,
            amount_minor: amount.minor(),
        })
        .collect()
}

fn reconciled(applied: Applied) -> Reconciled {
    Reconciled {
        steps: applied.steps.iter().map(ToString::to_string).collect(),
        wallets: balances(applied.wallet_balances),
        themes: balances(applied.theme_spends),
        transaction: view(applied.transaction),
    }
}

pub async fn list(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let txs = state
        .engine
        .transactions(
            &ctx,
            TransactionQuery {
                wallet_id: query.wallet_id,
                theme_id: query.theme_id,
                kind: query.kind.map(engine_kind),
                from: query.from,
                to: query.to,
            },
        )
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(&ctx, transaction_id).await?;
    Ok(Json(view(tx)))
}

pub async fn create(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<Reconciled>), ServerError> {
    let applied = state
        .engine
        .create_transaction(
            &ctx,
            NewTransaction {
                wallet_id: payload.wallet_id,
                theme_id: payload.theme_id,
                description: payload.description,
                amount: Money::new(payload.amount_minor),
                kind: engine_kind(payload.kind),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(reconciled(applied))))
}

/// Merge the patch over the stored record. Switching to income drops the
/// theme.
fn merge(current: &Transaction, payload: TransactionUpdate) -> TransactionEdits {
    let mut edits = TransactionEdits::from_transaction(current);
    if let Some(wallet_id) = payload.wallet_id {
        edits.wallet_id = wallet_id;
    }
    if let Some(theme_id) = payload.theme_id {
        edits.theme_id = Some(theme_id);
    }
    if let Some(description) = payload.description {
        edits.description = description;
    }
    if let Some(amount) = payload.amount_minor {
        edits.amount = Money::new(amount);
    }
    if let Some(kind) = payload.kind {
        edits.kind = engine_kind(kind);
    }
    if edits.kind == TransactionKind::Income {
        edits.theme_id = None;
    }
    edits
}

pub async fn update(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<Reconciled>, ServerError> {
    let current = state.engine.transaction(&ctx, transaction_id).await?;
    let edits = merge(&current, payload);
    let applied = state
        .engine
        .update_transaction(&ctx, transaction_id, edits)
        .await?;
    Ok(Json(reconciled(applied)))
}

pub async fn delete(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Reconciled>, ServerError> {
    let applied = state
        .engine
        .delete_transaction(&ctx, transaction_id)
        .await?;
    Ok(Json(reconciled(applied)))
}
