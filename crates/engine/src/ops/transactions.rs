//! Creating, editing, deleting and listing transactions.
//!
//! Every write keeps the owning wallet's cached totals in step with the
//! transaction log: the wallet update(s) and the transaction document are
//! written in the same DB transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, MoneyCents, ResultEngine, SaveTransactionCmd, Transaction, TransactionType,
    Wallet,
    reconcile::{self, TxEffect, WalletBalance},
    transactions,
    uploader::TRANSACTIONS_FOLDER,
    util::normalize_optional_text,
};

use super::{Engine, require_transaction, require_wallet, with_tx, write_balance};

/// Steps a commit goes through, in order.
///
/// A commit stops at the first failing step; nothing is written before
/// `Persisting`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitStage {
    Validating,
    Reconciling,
    Uploading,
    Persisting,
    Committed,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Reconciling => "reconciling",
            Self::Uploading => "uploading",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub wallet_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidInput(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidInput("limit must be > 0".to_string()));
    }
    Ok(())
}

/// A save request that passed validation.
#[derive(Debug)]
struct Intent {
    id: Option<Uuid>,
    uid: String,
    ty: TransactionType,
    amount: MoneyCents,
    wallet_id: Uuid,
    description: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl Intent {
    fn effect(&self) -> TxEffect {
        TxEffect {
            kind: self.ty.kind(),
            amount: self.amount,
        }
    }

    /// `true` when `prior` already has this amount, kind and wallet, i.e. the
    /// edit cannot change any balance.
    fn keeps_balances_of(&self, prior: &Transaction) -> bool {
        prior.amount == self.amount
            && prior.kind() == self.ty.kind()
            && prior.wallet_id == self.wallet_id
    }
}

fn validate(cmd: &SaveTransactionCmd) -> ResultEngine<Intent> {
    if cmd.amount_minor <= 0 {
        return Err(EngineError::InvalidInput(
            "amount must be > 0".to_string(),
        ));
    }
    let wallet_id = cmd
        .wallet_id
        .ok_or_else(|| EngineError::InvalidInput("wallet is required".to_string()))?;
    let kind = cmd
        .kind
        .ok_or_else(|| EngineError::InvalidInput("transaction type is required".to_string()))?;
    let ty = TransactionType::parse(kind, cmd.category.as_deref())?;

    Ok(Intent {
        id: cmd.id,
        uid: cmd.uid.clone(),
        ty,
        amount: MoneyCents::new(cmd.amount_minor),
        wallet_id,
        description: normalize_optional_text(cmd.description.as_deref()),
        date: cmd.date,
    })
}

/// Wallet writes required by a commit.
#[derive(Debug)]
enum BalancePlan {
    /// Cosmetic edit: no wallet changes.
    Unchanged,
    Single {
        wallet: Wallet,
        balance: WalletBalance,
    },
    Move {
        from: Wallet,
        from_balance: WalletBalance,
        to: Wallet,
        to_balance: WalletBalance,
    },
}

async fn plan_balances<C: ConnectionTrait>(
    conn: &C,
    intent: &Intent,
    prior: Option<&Transaction>,
) -> ResultEngine<BalancePlan> {
    let new = intent.effect();
    match prior {
        None => {
            let wallet = require_wallet(conn, intent.wallet_id, &intent.uid).await?;
            let balance = reconcile::apply_new(wallet.balance(), new)?;
            Ok(BalancePlan::Single { wallet, balance })
        }
        Some(prior) if intent.keeps_balances_of(prior) => Ok(BalancePlan::Unchanged),
        Some(prior) if prior.wallet_id == intent.wallet_id => {
            let wallet = require_wallet(conn, intent.wallet_id, &intent.uid).await?;
            let balance = reconcile::edit_same_wallet(prior.effect(), new, wallet.balance())?;
            Ok(BalancePlan::Single { wallet, balance })
        }
        Some(prior) => {
            let from = require_wallet(conn, prior.wallet_id, &intent.uid).await?;
            let to = require_wallet(conn, intent.wallet_id, &intent.uid).await?;
            let (from_balance, to_balance) =
                reconcile::edit_cross_wallet(prior.effect(), from.balance(), new, to.balance())?;
            Ok(BalancePlan::Move {
                from,
                from_balance,
                to,
                to_balance,
            })
        }
    }
}

/// The stored transaction an edit starts from, with the wallet writes it needs.
#[derive(Debug)]
struct Planned {
    prior: Option<Transaction>,
    plan: BalancePlan,
}

async fn plan_commit<C: ConnectionTrait>(conn: &C, intent: &Intent) -> ResultEngine<Planned> {
    let prior = match intent.id {
        Some(id) => Some(require_transaction(conn, id, &intent.uid).await?),
        None => None,
    };
    let plan = plan_balances(conn, intent, prior.as_ref()).await?;
    Ok(Planned { prior, plan })
}

async fn apply_plan<C: ConnectionTrait>(conn: &C, plan: &BalancePlan) -> ResultEngine<()> {
    match plan {
        BalancePlan::Unchanged => Ok(()),
        BalancePlan::Single { wallet, balance } => write_balance(conn, wallet, *balance).await,
        BalancePlan::Move {
            from,
            from_balance,
            to,
            to_balance,
        } => {
            write_balance(conn, from, *from_balance).await?;
            write_balance(conn, to, *to_balance).await
        }
    }
}

/// Builds the document to store, keeping prior values for fields the request
/// left out.
fn merge(intent: &Intent, prior: Option<&Transaction>, image: Option<&str>) -> Transaction {
    let ty = match (&intent.ty, prior) {
        (TransactionType::Income { category: None }, Some(prior)) => TransactionType::Income {
            category: prior.ty.category().map(ToString::to_string),
        },
        (ty, _) => ty.clone(),
    };
    Transaction {
        id: intent.id.unwrap_or_else(Uuid::new_v4),
        ty,
        amount: intent.amount,
        wallet_id: intent.wallet_id,
        description: intent
            .description
            .clone()
            .or_else(|| prior.and_then(|p| p.description.clone())),
        date: intent
            .date
            .or_else(|| prior.map(|p| p.date))
            .unwrap_or_else(Utc::now),
        image: image
            .map(ToString::to_string)
            .or_else(|| prior.and_then(|p| p.image.clone())),
        uid: intent.uid.clone(),
    }
}

fn log_stage(stage: CommitStage, transaction_id: Option<Uuid>) {
    tracing::debug!(%stage, ?transaction_id, "transaction commit");
}

impl Engine {
    /// Creates a transaction, or edits it when `cmd.id` is set.
    ///
    /// The wallet totals are reconciled before anything is uploaded or
    /// written: a rejected commit leaves no trace. On edit, a request that
    /// keeps amount, type and wallet only rewrites the document.
    pub async fn save_transaction(&self, cmd: SaveTransactionCmd) -> ResultEngine<Transaction> {
        log_stage(CommitStage::Validating, cmd.id);
        let intent = validate(&cmd)?;

        log_stage(CommitStage::Reconciling, intent.id);
        let mut planned = Some(
            plan_commit(&self.database, &intent)
                .await
                .inspect_err(|err| {
                    tracing::warn!(uid = %intent.uid, wallet_id = %intent.wallet_id, "transaction rejected: {err}");
                })?,
        );

        log_stage(CommitStage::Uploading, intent.id);
        let image = self.resolve_image(cmd.image, TRANSACTIONS_FOLDER).await?;

        log_stage(CommitStage::Persisting, intent.id);
        // The first attempt writes the plan computed above, guarded by the
        // wallet versions it was read with. Retries plan again from fresh rows.
        let saved = self
            .retry_on_conflict("save_transaction", || {
                self.persist_transaction(&intent, image.as_deref(), planned.take())
            })
            .await?;

        log_stage(CommitStage::Committed, Some(saved.id));
        tracing::info!(
            transaction_id = %saved.id,
            wallet_id = %saved.wallet_id,
            kind = saved.kind().as_str(),
            amount = %saved.amount,
            edited = intent.id.is_some(),
            "transaction saved"
        );
        Ok(saved)
    }

    async fn persist_transaction(
        &self,
        intent: &Intent,
        image: Option<&str>,
        planned: Option<Planned>,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let Planned { prior, plan } = match planned {
                Some(planned) => planned,
                None => plan_commit(&db_tx, intent).await?,
            };
            apply_plan(&db_tx, &plan).await?;

            let tx = merge(intent, prior.as_ref(), image);
            let active = transactions::ActiveModel::from(&tx);
            if prior.is_some() {
                active.update(&db_tx).await?;
            } else {
                active.insert(&db_tx).await?;
            }
            Ok(tx)
        })
    }

    /// Deletes a transaction and takes its effect out of the wallet.
    ///
    /// `wallet_id` must be the wallet the transaction belongs to.
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        wallet_id: Uuid,
        uid: &str,
    ) -> ResultEngine<()> {
        let removed = self
            .retry_on_conflict("delete_transaction", || {
                self.remove_transaction(transaction_id, wallet_id, uid)
            })
            .await
            .inspect_err(|err| {
                tracing::warn!(%transaction_id, %wallet_id, "transaction not deleted: {err}");
            })?;

        tracing::info!(
            %transaction_id,
            %wallet_id,
            kind = removed.kind().as_str(),
            amount = %removed.amount,
            "transaction deleted"
        );
        Ok(())
    }

    async fn remove_transaction(
        &self,
        transaction_id: Uuid,
        wallet_id: Uuid,
        uid: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let tx = require_transaction(&db_tx, transaction_id, uid).await?;
            if tx.wallet_id != wallet_id {
                return Err(EngineError::KeyNotFound(
                    "transaction not exists".to_string(),
                ));
            }
            let wallet = require_wallet(&db_tx, wallet_id, uid).await?;
            let balance = reconcile::revert_on_delete(tx.effect(), wallet.balance())?;

            write_balance(&db_tx, &wallet, balance).await?;
            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(tx)
        })
    }

    /// Return a transaction owned by `uid`.
    pub async fn transaction(&self, transaction_id: Uuid, uid: &str) -> ResultEngine<Transaction> {
        require_transaction(&self.database, transaction_id, uid).await
    }

    /// Lists transactions owned by `uid`, newest first.
    pub async fn list_transactions(
        &self,
        uid: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;

        let mut query =
            transactions::Entity::find().filter(transactions::Column::Uid.eq(uid.to_string()));
        if let Some(wallet_id) = filter.wallet_id {
            query = query.filter(transactions::Column::WalletId.eq(wallet_id.to_string()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::Date.lt(to));
        }

        let models = query
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Id)
            .limit(filter.limit)
            .all(&self.database)
            .await?;

        models.into_iter().map(Transaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::TransactionKind;

    fn cmd(kind: TransactionKind, amount_minor: i64) -> SaveTransactionCmd {
        SaveTransactionCmd::new("alice", kind, amount_minor, Uuid::new_v4())
    }

    #[test]
    fn validation_rejects_non_positive_amounts() {
        for amount in [0, -5] {
            let err = validate(&cmd(TransactionKind::Income, amount)).unwrap_err();
            assert_eq!(
                err,
                EngineError::InvalidInput("amount must be > 0".to_string())
            );
        }
    }

    #[test]
    fn validation_requires_wallet_and_type() {
        let mut missing_wallet = cmd(TransactionKind::Income, 10);
        missing_wallet.wallet_id = None;
        assert!(matches!(
            validate(&missing_wallet),
            Err(EngineError::InvalidInput(_))
        ));

        let mut missing_kind = cmd(TransactionKind::Income, 10);
        missing_kind.kind = None;
        assert!(matches!(
            validate(&missing_kind),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn validation_requires_expense_category() {
        assert!(validate(&cmd(TransactionKind::Expense, 10)).is_err());
        assert!(validate(&cmd(TransactionKind::Expense, 10).category("food")).is_ok());
    }

    #[test]
    fn merge_keeps_prior_optional_fields() {
        let date = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let prior = Transaction {
            id: Uuid::new_v4(),
            ty: TransactionType::Income {
                category: Some("salary".to_string()),
            },
            amount: MoneyCents::new(100),
            wallet_id: Uuid::new_v4(),
            description: Some("March".to_string()),
            date,
            image: Some("https://cdn/receipt.jpg".to_string()),
            uid: "alice".to_string(),
        };
        let intent = validate(
            &SaveTransactionCmd::new("alice", TransactionKind::Income, 150, prior.wallet_id)
                .id(prior.id),
        )
        .unwrap();

        let merged = merge(&intent, Some(&prior), None);
        assert_eq!(merged.id, prior.id);
        assert_eq!(merged.amount, MoneyCents::new(150));
        assert_eq!(merged.description, prior.description);
        assert_eq!(merged.date, date);
        assert_eq!(merged.image, prior.image);
        assert_eq!(merged.ty.category(), Some("salary"));
    }

    #[test]
    fn cosmetic_edit_is_detected() {
        let wallet_id = Uuid::new_v4();
        let prior = Transaction {
            id: Uuid::new_v4(),
            ty: TransactionType::Expense {
                category: "food".to_string(),
            },
            amount: MoneyCents::new(100),
            wallet_id,
            description: None,
            date: Utc::now(),
            image: None,
            uid: "alice".to_string(),
        };
        let same = validate(
            &SaveTransactionCmd::new("alice", TransactionKind::Expense, 100, wallet_id)
                .category("groceries")
                .description("weekly"),
        )
        .unwrap();
        assert!(same.keeps_balances_of(&prior));

        let other_amount = validate(
            &SaveTransactionCmd::new("alice", TransactionKind::Expense, 101, wallet_id)
                .category("food"),
        )
        .unwrap();
        assert!(!other_amount.keeps_balances_of(&prior));
    }

    #[test]
    fn list_filter_rejects_empty_range() {
        let now = Utc::now();
        let filter = TransactionListFilter {
            from: Some(now),
            to: Some(now),
            ..Default::default()
        };
        assert!(validate_list_filter(&filter).is_err());
    }
}
