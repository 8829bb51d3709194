use api_types::summary::{SummaryQuery, SummaryView, ThemeSpendView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::AuthContext;

use crate::{ServerError, server::ServerState};

/// Dashboard figures for the caller.
pub async fn get(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryView>, ServerError> {
    let summary = state
        .engine
        .summary(
            &ctx,
            engine::SummaryQuery {
                from: query.from,
                to: query.to,
                wallet_id: query.wallet_id,
            },
        )
        .await?;

    Ok(Json(SummaryView {
        total_balance_minor: summary.total_balance.minor(),
        income_minor: summary.income.minor(),
        expense_minor: summary.expense.minor(),
        net_minor: summary.net.minor(),
        by_theme: summary
            .by_theme
            .into_iter()
            .map(|spend| ThemeSpendView {
                theme_id: spend.theme_id,
                name: spend.name,
                amount_minor: spend.amount.minor(),
            })
            .collect(),
    }))
}
