//! Transaction primitives.
//!
//! A `Transaction` is an income or an expense recorded against one wallet.
//! The stored column names (`type`, `walletId`, `uid`, ...) are shared with
//! data written by earlier clients and must not change.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, reconcile::TxEffect, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// Kind of a transaction together with its category.
///
/// An expense always has a category; an income may carry a free-form one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionType {
    Income { category: Option<String> },
    Expense { category: String },
}

impl TransactionType {
    /// Builds the type from loosely typed input.
    ///
    /// Blank categories count as missing.
    pub fn parse(kind: TransactionKind, category: Option<&str>) -> ResultEngine<Self> {
        let category = category
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        match kind {
            TransactionKind::Income => Ok(Self::Income { category }),
            TransactionKind::Expense => {
                let category = category.ok_or_else(|| {
                    EngineError::InvalidInput("expense category is required".to_string())
                })?;
                Ok(Self::Expense { category })
            }
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Income { .. } => TransactionKind::Income,
            Self::Expense { .. } => TransactionKind::Expense,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Income { category } => category.as_deref(),
            Self::Expense { category } => Some(category.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(flatten)]
    pub ty: TransactionType,
    pub amount: MoneyCents,
    pub wallet_id: Uuid,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub uid: String,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.ty.kind()
    }

    /// The contribution of this transaction to its wallet.
    pub fn effect(&self) -> TxEffect {
        TxEffect {
            kind: self.kind(),
            amount: self.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub amount: i64,
    pub category: Option<String>,
    #[sea_orm(column_name = "walletId")]
    pub wallet_id: String,
    pub description: Option<String>,
    pub date: DateTimeUtc,
    pub image: Option<String>,
    pub uid: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind().as_str().to_string()),
            amount: ActiveValue::Set(tx.amount.cents()),
            category: ActiveValue::Set(tx.ty.category().map(ToString::to_string)),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            date: ActiveValue::Set(tx.date),
            image: ActiveValue::Set(tx.image.clone()),
            uid: ActiveValue::Set(tx.uid.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = TransactionKind::try_from(model.kind.as_str())?;
        // Older documents may hold an expense with an empty category; keep
        // them readable instead of failing the whole listing.
        let ty = match kind {
            TransactionKind::Income => TransactionType::Income {
                category: model.category.filter(|c| !c.trim().is_empty()),
            },
            TransactionKind::Expense => TransactionType::Expense {
                category: model.category.unwrap_or_default(),
            },
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            ty,
            amount: MoneyCents::new(model.amount),
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            description: model.description,
            date: model.date,
            image: model.image,
            uid: model.uid,
        })
    }
}
