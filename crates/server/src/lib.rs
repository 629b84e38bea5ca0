use std::path::PathBuf;

use api_types::{ApiResponse, ImageInput};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::{EngineError, ImageSource};

pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod server;
mod summary;
mod transactions;
mod wallets;

pub mod types {
    pub use api_types::{ApiResponse, ImageInput};

    pub mod wallet {
        pub use api_types::wallet::{
            Totals, WalletAuditView, WalletDeleted, WalletSave, WalletView,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            TransactionDelete, TransactionKind, TransactionList, TransactionSave, TransactionView,
        };
    }

    pub mod summary {
        pub use api_types::summary::Summary;
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Missing or malformed `x-user-id` header.
    Unauthorized,
    /// Request that could not be decoded.
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::WouldGoNegative(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidInput(_) | EngineError::InsufficientBalance(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid x-user-id header".to_string(),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Generic(value.body_text())
    }
}

pub(crate) fn image_source(image: ImageInput) -> ImageSource {
    match image {
        ImageInput::Url(url) => ImageSource::Url(url),
        ImageInput::Local { uri } => ImageSource::Local(PathBuf::from(uri)),
    }
}
