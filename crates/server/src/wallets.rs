//! Wallets API endpoints.

use api_types::{
    ApiResponse,
    wallet::{Totals, WalletAuditView, WalletDeleted, WalletSave, WalletView},
};
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, image_source, server::ServerState, server::UserId};

fn view(wallet: engine::Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        name: wallet.name,
        amount: wallet.amount.cents(),
        total_income: wallet.total_income.cents(),
        total_expenses: wallet.total_expenses.cents(),
        image: wallet.image,
        uid: wallet.uid,
        created: wallet.created,
    }
}

fn totals(balance: engine::WalletBalance) -> Totals {
    Totals {
        amount: balance.amount.cents(),
        total_income: balance.total_income.cents(),
        total_expenses: balance.total_expenses.cents(),
    }
}

/// Create a wallet, or rename/re-icon it when `id` is set.
pub async fn save(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    payload: Result<Json<WalletSave>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<WalletView>>), ServerError> {
    let Json(payload) = payload?;
    let (status, mut cmd) = match payload.id {
        Some(id) => (StatusCode::OK, engine::SaveWalletCmd::edit(uid, id)),
        None => (
            StatusCode::CREATED,
            engine::SaveWalletCmd::new(uid, payload.name.clone().unwrap_or_default()),
        ),
    };
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(image) = payload.image {
        cmd = cmd.image(image_source(image));
    }

    let wallet = state.engine.save_wallet(cmd).await?;

    Ok((status, Json(ApiResponse::ok(view(wallet)))))
}

/// Delete a wallet together with its transactions.
pub async fn delete(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    wallet_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<WalletDeleted>>, ServerError> {
    let Path(wallet_id) = wallet_id?;
    let removed_transactions = state.engine.delete_wallet(wallet_id, &uid).await?;

    Ok(Json(ApiResponse::ok(WalletDeleted {
        id: wallet_id,
        removed_transactions,
    })))
}

pub async fn get(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    wallet_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<WalletView>>, ServerError> {
    let Path(wallet_id) = wallet_id?;
    let wallet = state.engine.wallet(wallet_id, &uid).await?;
    Ok(Json(ApiResponse::ok(view(wallet))))
}

pub async fn list(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Vec<WalletView>>>, ServerError> {
    let wallets = state.engine.list_wallets(&uid).await?;
    Ok(Json(ApiResponse::ok(wallets.into_iter().map(view).collect())))
}

/// Compare the cached totals of a wallet with its transactions.
pub async fn audit(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    wallet_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<WalletAuditView>>, ServerError> {
    let Path(wallet_id) = wallet_id?;
    let audit = state.engine.audit_wallet(wallet_id, &uid).await?;

    Ok(Json(ApiResponse::ok(WalletAuditView {
        consistent: audit.is_consistent(),
        wallet_id: audit.wallet_id,
        name: audit.name,
        stored: totals(audit.stored),
        computed: totals(audit.computed),
    })))
}
