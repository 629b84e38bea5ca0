//! Consistency checks between wallets' cached totals and their transactions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*, sea_query::Query,
};

use crate::{
    ResultEngine, Transaction, Wallet,
    reconcile::{self, WalletBalance},
    transactions, wallets,
};

use super::{Engine, require_wallet, wallets::purge_transactions, with_tx, write_balance};

/// Stored totals of a wallet next to the totals its transactions add up to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAudit {
    pub wallet_id: Uuid,
    pub name: String,
    pub stored: WalletBalance,
    pub computed: WalletBalance,
}

impl WalletAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.computed && self.stored.is_balanced()
    }
}

async fn computed_balance<C: ConnectionTrait>(
    conn: &C,
    wallet: &Wallet,
) -> ResultEngine<WalletBalance> {
    let models = transactions::Entity::find()
        .filter(transactions::Column::WalletId.eq(wallet.id.to_string()))
        .all(conn)
        .await?;
    let mut effects = Vec::with_capacity(models.len());
    for model in models {
        effects.push(Transaction::try_from(model)?.effect());
    }
    Ok(reconcile::replay(effects)?)
}

async fn audit<C: ConnectionTrait>(conn: &C, wallet: Wallet) -> ResultEngine<WalletAudit> {
    let computed = computed_balance(conn, &wallet).await?;
    Ok(WalletAudit {
        wallet_id: wallet.id,
        stored: wallet.balance(),
        name: wallet.name,
        computed,
    })
}

impl Engine {
    /// Replays the transactions of a wallet and compares the result with its
    /// cached totals.
    pub async fn audit_wallet(&self, wallet_id: Uuid, uid: &str) -> ResultEngine<WalletAudit> {
        let wallet = require_wallet(&self.database, wallet_id, uid).await?;
        audit(&self.database, wallet).await
    }

    /// Audits every wallet of `uid`.
    pub async fn audit_wallets(&self, uid: &str) -> ResultEngine<Vec<WalletAudit>> {
        let wallets = self.list_wallets(uid).await?;
        let mut audits = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            let audit = audit(&self.database, wallet).await?;
            if !audit.is_consistent() {
                tracing::warn!(
                    wallet_id = %audit.wallet_id,
                    stored = ?audit.stored,
                    computed = ?audit.computed,
                    "wallet totals drifted"
                );
            }
            audits.push(audit);
        }
        Ok(audits)
    }

    /// Overwrites the cached totals of a wallet with the replayed ones.
    ///
    /// Returns the audit as it was before the repair.
    pub async fn repair_wallet(&self, wallet_id: Uuid, uid: &str) -> ResultEngine<WalletAudit> {
        let before = self
            .retry_on_conflict("repair_wallet", || self.overwrite_balance(wallet_id, uid))
            .await?;

        if before.stored != before.computed {
            tracing::info!(
                %wallet_id,
                stored = ?before.stored,
                computed = ?before.computed,
                "wallet totals repaired"
            );
        }
        Ok(before)
    }

    async fn overwrite_balance(&self, wallet_id: Uuid, uid: &str) -> ResultEngine<WalletAudit> {
        with_tx!(self, |db_tx| {
            let wallet = require_wallet(&db_tx, wallet_id, uid).await?;
            let before = audit(&db_tx, wallet.clone()).await?;
            if before.stored != before.computed {
                write_balance(&db_tx, &wallet, before.computed).await?;
            }
            Ok(before)
        })
    }

    /// Deletes transactions whose wallet no longer exists.
    ///
    /// Picks up where an interrupted wallet delete stopped. Returns how many
    /// transactions were removed.
    pub async fn purge_orphan_transactions(&self) -> ResultEngine<u64> {
        let orphans = Condition::all().add(
            transactions::Column::WalletId.not_in_subquery(
                Query::select()
                    .column(wallets::Column::Id)
                    .from(wallets::Entity)
                    .to_owned(),
            ),
        );
        let removed =
            purge_transactions(&self.database, orphans, self.cascade_batch_size).await?;
        if removed > 0 {
            tracing::info!(removed, "orphan transactions purged");
        }
        Ok(removed)
    }
}
