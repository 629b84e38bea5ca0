//! Summary API endpoint

use api_types::{ApiResponse, summary::Summary};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState, server::UserId};

/// Handle requests for the caller's totals over all wallets
pub async fn get(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Summary>>, ServerError> {
    let summary = state.engine.owner_summary(&uid).await?;

    Ok(Json(ApiResponse::ok(Summary {
        amount: summary.amount.cents(),
        total_income: summary.total_income.cents(),
        total_expenses: summary.total_expenses.cents(),
        wallets: summary.wallets,
    })))
}
