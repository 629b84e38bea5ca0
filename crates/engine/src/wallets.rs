//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, reconcile::WalletBalance, util::parse_uuid};

/// A wallet.
///
/// A wallet is a representation of a real wallet, a bank account or anything
/// else where money are kept. `amount`, `total_income` and `total_expenses`
/// are caches of the wallet's transactions and only change through
/// reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier for this wallet.
    pub id: Uuid,
    pub name: String,
    pub amount: MoneyCents,
    pub total_income: MoneyCents,
    pub total_expenses: MoneyCents,
    /// Icon URL.
    pub image: Option<String>,
    /// Owner.
    pub uid: String,
    pub created: DateTime<Utc>,
    /// Bumped on every balance change, used to detect concurrent writers.
    pub version: i64,
}

impl Wallet {
    /// A fresh wallet with zeroed counters.
    pub fn new(name: String, image: Option<String>, uid: String, created: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            amount: MoneyCents::ZERO,
            total_income: MoneyCents::ZERO,
            total_expenses: MoneyCents::ZERO,
            image,
            uid,
            created,
            version: 0,
        }
    }

    pub fn balance(&self) -> WalletBalance {
        WalletBalance {
            amount: self.amount,
            total_income: self.total_income,
            total_expenses: self.total_expenses,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub amount: i64,
    #[sea_orm(column_name = "totalIncome")]
    pub total_income: i64,
    #[sea_orm(column_name = "totalExpenses")]
    pub total_expenses: i64,
    pub image: Option<String>,
    pub uid: String,
    pub created: DateTimeUtc,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            amount: ActiveValue::Set(value.amount.cents()),
            total_income: ActiveValue::Set(value.total_income.cents()),
            total_expenses: ActiveValue::Set(value.total_expenses.cents()),
            image: ActiveValue::Set(value.image.clone()),
            uid: ActiveValue::Set(value.uid.clone()),
            created: ActiveValue::Set(value.created),
            version: ActiveValue::Set(value.version),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            name: model.name,
            amount: MoneyCents::new(model.amount),
            total_income: MoneyCents::new(model.total_income),
            total_expenses: MoneyCents::new(model.total_expenses),
            image: model.image,
            uid: model.uid,
            created: model.created,
            version: model.version,
        })
    }
}
