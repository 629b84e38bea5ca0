use std::{fmt, future::Future, sync::Arc};

use sea_orm::{ConnectionTrait, DatabaseConnection, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, Wallet,
    reconcile::WalletBalance,
    uploader::{AssetUploader, DisabledUploader, ImageSource},
};

mod balances;
mod transactions;
mod wallets;

pub use balances::WalletAudit;
pub use transactions::{CommitStage, TransactionListFilter};
pub use wallets::OwnerSummary;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Default number of transactions removed per batch when a wallet is deleted.
pub const DEFAULT_CASCADE_BATCH_SIZE: u64 = 500;
/// Default number of retries when a wallet changed under a commit.
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

pub struct Engine {
    database: DatabaseConnection,
    uploader: Arc<dyn AssetUploader>,
    cascade_batch_size: u64,
    commit_retries: u32,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("uploader", &self.uploader)
            .field("cascade_batch_size", &self.cascade_batch_size)
            .field("commit_retries", &self.commit_retries)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Turns an optional image into a durable URL.
    ///
    /// Remote URLs are kept as they are, local files go through the uploader.
    async fn resolve_image(
        &self,
        image: Option<ImageSource>,
        folder: &str,
    ) -> ResultEngine<Option<String>> {
        match image {
            None => Ok(None),
            Some(ImageSource::Url(url)) => Ok(Some(url)),
            Some(ImageSource::Local(path)) => {
                let url = self.uploader.upload(&path, folder).await.inspect_err(|err| {
                    tracing::warn!(folder, path = %path.display(), "image upload failed: {err}");
                })?;
                Ok(Some(url))
            }
        }
    }

    /// Runs `op` again when it fails with [`EngineError::Conflict`], up to
    /// `commit_retries` extra times.
    async fn retry_on_conflict<T, F, Fut>(&self, label: &str, mut op: F) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(EngineError::Conflict(reason)) if attempt < self.commit_retries => {
                    attempt += 1;
                    tracing::warn!(label, attempt, "retrying after conflict: {reason}");
                }
                other => return other,
            }
        }
    }
}

pub(crate) async fn require_wallet<C: ConnectionTrait>(
    conn: &C,
    wallet_id: Uuid,
    uid: &str,
) -> ResultEngine<Wallet> {
    let model = crate::wallets::Entity::find_by_id(wallet_id.to_string())
        .filter(crate::wallets::Column::Uid.eq(uid))
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))?;
    Wallet::try_from(model)
}

pub(crate) async fn require_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction_id: Uuid,
    uid: &str,
) -> ResultEngine<Transaction> {
    let model = crate::transactions::Entity::find_by_id(transaction_id.to_string())
        .filter(crate::transactions::Column::Uid.eq(uid))
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
    Transaction::try_from(model)
}

/// Stores new cached totals for `wallet`.
///
/// The row is only touched if its version is still the one `wallet` was read
/// with; otherwise [`EngineError::Conflict`] is returned and the caller's DB
/// transaction must be dropped.
pub(crate) async fn write_balance<C: ConnectionTrait>(
    conn: &C,
    wallet: &Wallet,
    balance: WalletBalance,
) -> ResultEngine<()> {
    let result = crate::wallets::Entity::update_many()
        .col_expr(crate::wallets::Column::Amount, Expr::value(balance.amount.cents()))
        .col_expr(
            crate::wallets::Column::TotalIncome,
            Expr::value(balance.total_income.cents()),
        )
        .col_expr(
            crate::wallets::Column::TotalExpenses,
            Expr::value(balance.total_expenses.cents()),
        )
        .col_expr(
            crate::wallets::Column::Version,
            Expr::col(crate::wallets::Column::Version).add(1),
        )
        .filter(crate::wallets::Column::Id.eq(wallet.id.to_string()))
        .filter(crate::wallets::Column::Version.eq(wallet.version))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Err(EngineError::Conflict(format!(
            "wallet {} changed while committing",
            wallet.id
        )));
    }
    Ok(())
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    uploader: Arc<dyn AssetUploader>,
    cascade_batch_size: u64,
    commit_retries: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            uploader: Arc::new(DisabledUploader),
            cascade_batch_size: DEFAULT_CASCADE_BATCH_SIZE,
            commit_retries: DEFAULT_COMMIT_RETRIES,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Store used for wallet icons and receipts. Uploads are rejected if unset.
    pub fn uploader(mut self, uploader: Arc<dyn AssetUploader>) -> EngineBuilder {
        self.uploader = uploader;
        self
    }

    /// Transactions deleted per batch when a wallet is removed.
    pub fn cascade_batch_size(mut self, size: u64) -> EngineBuilder {
        self.cascade_batch_size = size;
        self
    }

    pub fn commit_retries(mut self, retries: u32) -> EngineBuilder {
        self.commit_retries = retries;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.cascade_batch_size == 0 {
            return Err(EngineError::InvalidInput(
                "cascade batch size must be > 0".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            uploader: self.uploader,
            cascade_batch_size: self.cascade_batch_size,
            commit_retries: self.commit_retries,
        })
    }
}
