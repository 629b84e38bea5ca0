use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, MoneyCents, ResultEngine, SaveWalletCmd, Wallet, transactions,
    uploader::WALLETS_FOLDER, util::normalize_required_name, wallets,
};

use super::{Engine, require_wallet, with_tx};

/// Totals over every wallet of an owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub amount: MoneyCents,
    pub total_income: MoneyCents,
    pub total_expenses: MoneyCents,
    pub wallets: u64,
}

impl Engine {
    /// Return a wallet owned by `uid`.
    pub async fn wallet(&self, wallet_id: Uuid, uid: &str) -> ResultEngine<Wallet> {
        require_wallet(&self.database, wallet_id, uid).await
    }

    /// Return all wallets of `uid`, newest first.
    pub async fn list_wallets(&self, uid: &str) -> ResultEngine<Vec<Wallet>> {
        let models = wallets::Entity::find()
            .filter(wallets::Column::Uid.eq(uid.to_string()))
            .order_by_desc(wallets::Column::Created)
            .all(&self.database)
            .await?;
        models.into_iter().map(Wallet::try_from).collect()
    }

    /// Creates a wallet, or renames/re-icons it when `cmd.id` is set.
    ///
    /// New wallets start with zeroed counters. Edits never touch the
    /// counters: they only move through transactions.
    pub async fn save_wallet(&self, cmd: SaveWalletCmd) -> ResultEngine<Wallet> {
        let name = match cmd.name.as_deref() {
            Some(name) => Some(normalize_required_name(name, "wallet")?),
            None if cmd.id.is_none() => {
                return Err(EngineError::InvalidInput(
                    "wallet name must not be empty".to_string(),
                ));
            }
            None => None,
        };
        if let Some(wallet_id) = cmd.id {
            require_wallet(&self.database, wallet_id, &cmd.uid).await?;
        }
        let image = self.resolve_image(cmd.image, WALLETS_FOLDER).await?;

        let wallet = match cmd.id {
            None => {
                let name = name.unwrap_or_default();
                let wallet = Wallet::new(name, image, cmd.uid, Utc::now());
                wallets::ActiveModel::from(&wallet)
                    .insert(&self.database)
                    .await?;
                tracing::info!(wallet_id = %wallet.id, uid = %wallet.uid, "wallet created");
                wallet
            }
            Some(wallet_id) => {
                with_tx!(self, |db_tx| {
                    let mut wallet = require_wallet(&db_tx, wallet_id, &cmd.uid).await?;
                    let mut model = wallets::ActiveModel {
                        id: ActiveValue::Unchanged(wallet.id.to_string()),
                        ..Default::default()
                    };
                    if let Some(name) = name {
                        model.name = ActiveValue::Set(name.clone());
                        wallet.name = name;
                    }
                    if let Some(image) = image {
                        model.image = ActiveValue::Set(Some(image.clone()));
                        wallet.image = Some(image);
                    }
                    if model.is_changed() {
                        model.update(&db_tx).await?;
                    }
                    Ok::<_, EngineError>(wallet)
                })?
            }
        };
        Ok(wallet)
    }

    /// Deletes a wallet and all its transactions.
    ///
    /// The wallet goes first, then its transactions in batches of
    /// `cascade_batch_size`. Returns how many transactions were removed.
    /// If the cascade is interrupted, [`Engine::purge_orphan_transactions`]
    /// removes the leftovers.
    pub async fn delete_wallet(&self, wallet_id: Uuid, uid: &str) -> ResultEngine<u64> {
        let wallet = require_wallet(&self.database, wallet_id, uid).await?;
        wallets::Entity::delete_by_id(wallet.id.to_string())
            .exec(&self.database)
            .await?;

        let removed = purge_transactions(
            &self.database,
            Condition::all().add(transactions::Column::WalletId.eq(wallet.id.to_string())),
            self.cascade_batch_size,
        )
        .await
        .inspect_err(|err| {
            tracing::error!(%wallet_id, "wallet deleted but cascade interrupted: {err}");
        })?;

        tracing::info!(%wallet_id, removed, "wallet deleted");
        Ok(removed)
    }

    /// Sums the cached totals of every wallet of `uid`.
    pub async fn owner_summary(&self, uid: &str) -> ResultEngine<OwnerSummary> {
        let wallets = self.list_wallets(uid).await?;
        let mut summary = OwnerSummary {
            amount: MoneyCents::ZERO,
            total_income: MoneyCents::ZERO,
            total_expenses: MoneyCents::ZERO,
            wallets: 0,
        };
        for wallet in &wallets {
            summary.amount = checked_sum(summary.amount, wallet.amount)?;
            summary.total_income = checked_sum(summary.total_income, wallet.total_income)?;
            summary.total_expenses = checked_sum(summary.total_expenses, wallet.total_expenses)?;
            summary.wallets += 1;
        }
        Ok(summary)
    }
}

fn checked_sum(lhs: MoneyCents, rhs: MoneyCents) -> ResultEngine<MoneyCents> {
    lhs.checked_add(rhs)
        .ok_or_else(|| EngineError::InvalidInput("amount too large".to_string()))
}

/// Deletes the transactions matching `condition`, `batch_size` rows at a time.
///
/// Each batch is its own statement.
pub(super) async fn purge_transactions<C: ConnectionTrait>(
    conn: &C,
    condition: Condition,
    batch_size: u64,
) -> ResultEngine<u64> {
    let mut removed = 0;
    loop {
        let ids: Vec<String> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Id)
            .filter(condition.clone())
            .limit(batch_size)
            .into_tuple()
            .all(conn)
            .await?;
        if ids.is_empty() {
            break;
        }

        let batch = ids.len();
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.is_in(ids))
            .exec(conn)
            .await?;
        removed += result.rows_affected;
        tracing::debug!(batch, removed, "transactions batch deleted");

        if result.rows_affected == 0 {
            break;
        }
    }
    Ok(removed)
}
