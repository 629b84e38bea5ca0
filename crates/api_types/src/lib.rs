use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every response.
///
/// `data` is set on success, `message` carries the reason on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// An image sent by a client.
///
/// A plain string is a remote URL and is stored as is; `{ "uri": ... }` is a
/// file on the server host that gets uploaded first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Url(String),
    Local { uri: String },
}

pub mod wallet {
    use super::*;

    /// Create (`id` absent) or edit a wallet.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletSave {
        pub id: Option<Uuid>,
        pub name: Option<String>,
        pub image: Option<ImageInput>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletView {
        pub id: Uuid,
        pub name: String,
        pub amount: i64,
        pub total_income: i64,
        pub total_expenses: i64,
        pub image: Option<String>,
        pub uid: String,
        pub created: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletDeleted {
        pub id: Uuid,
        /// Transactions removed together with the wallet.
        pub removed_transactions: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Totals {
        pub amount: i64,
        pub total_income: i64,
        pub total_expenses: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletAuditView {
        pub wallet_id: Uuid,
        pub name: String,
        pub stored: Totals,
        pub computed: Totals,
        pub consistent: bool,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    /// Create (`id` absent) or edit a transaction.
    ///
    /// On edit, `category` (income only), `description`, `date` and `image`
    /// keep their stored value when absent.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionSave {
        pub id: Option<Uuid>,
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        /// Minor units, must be > 0.
        #[serde(default)]
        pub amount: i64,
        pub wallet_id: Option<Uuid>,
        pub category: Option<String>,
        pub description: Option<String>,
        /// RFC3339 timestamp, including timezone offset.
        pub date: Option<DateTime<FixedOffset>>,
        pub image: Option<ImageInput>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub amount: i64,
        pub category: Option<String>,
        pub wallet_id: Uuid,
        pub description: Option<String>,
        pub date: DateTime<Utc>,
        pub image: Option<String>,
        pub uid: String,
    }

    /// Query of `DELETE /transactions/{id}`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionDelete {
        pub wallet_id: Uuid,
    }

    /// Query of `GET /transactions`; `from` is inclusive, `to` exclusive.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionList {
        pub wallet_id: Option<Uuid>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub limit: Option<u64>,
    }
}

pub mod summary {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Summary {
        pub amount: i64,
        pub total_income: i64,
        pub total_expenses: i64,
        pub wallets: u64,
    }
}
