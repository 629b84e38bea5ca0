//! Transactions API endpoints

use api_types::{
    ApiResponse,
    transaction::{
        TransactionDelete, TransactionKind as ApiKind, TransactionList, TransactionSave,
        TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, image_source, server::ServerState, server::UserId};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn engine_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind()),
        amount: tx.amount.cents(),
        category: tx.ty.category().map(ToString::to_string),
        wallet_id: tx.wallet_id,
        description: tx.description,
        date: tx.date,
        image: tx.image,
        uid: tx.uid,
    }
}

fn save_cmd(uid: String, payload: TransactionSave) -> engine::SaveTransactionCmd {
    engine::SaveTransactionCmd {
        id: payload.id,
        uid,
        kind: payload.kind.map(engine_kind),
        amount_minor: payload.amount,
        wallet_id: payload.wallet_id,
        category: payload.category,
        description: payload.description,
        date: payload.date.map(|dt| dt.with_timezone(&Utc)),
        image: payload.image.map(image_source),
    }
}

/// Create or edit a transaction.
///
/// Answers `201 Created` for a new transaction and `200 OK` for an edit.
pub async fn save(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    payload: Result<Json<TransactionSave>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionView>>), ServerError> {
    let Json(payload) = payload?;
    let status = if payload.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let tx = state.engine.save_transaction(save_cmd(uid, payload)).await?;

    Ok((status, Json(ApiResponse::ok(view(tx)))))
}

pub async fn delete(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    transaction_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<TransactionDelete>, QueryRejection>,
) -> Result<Json<ApiResponse<Uuid>>, ServerError> {
    let Path(transaction_id) = transaction_id?;
    let Query(query) = query?;

    state
        .engine
        .delete_transaction(transaction_id, query.wallet_id, &uid)
        .await?;

    Ok(Json(ApiResponse::ok(transaction_id)))
}

pub async fn get(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    transaction_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TransactionView>>, ServerError> {
    let Path(transaction_id) = transaction_id?;
    let tx = state.engine.transaction(transaction_id, &uid).await?;
    Ok(Json(ApiResponse::ok(view(tx))))
}

pub async fn list(
    Extension(UserId(uid)): Extension<UserId>,
    State(state): State<ServerState>,
    query: Result<Query<TransactionList>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<TransactionView>>>, ServerError> {
    let Query(query) = query?;
    let filter = engine::TransactionListFilter {
        wallet_id: query.wallet_id,
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        limit: query.limit,
    };

    let transactions = state.engine.list_transactions(&uid, &filter).await?;

    Ok(Json(ApiResponse::ok(
        transactions.into_iter().map(view).collect(),
    )))
}
