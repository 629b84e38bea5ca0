use std::path::PathBuf;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineError, ImageSource, MoneyCents, SaveTransactionCmd, SaveWalletCmd,
    TransactionKind, TransactionListFilter, WalletBalance,
};
use migration::MigratorTrait;
use uuid::Uuid;

const UID: &str = "alice";

async fn engine_with_db(batch_size: u64) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .cascade_batch_size(batch_size)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn income(engine: &Engine, wallet_id: Uuid, amount: i64) {
    engine
        .save_transaction(SaveTransactionCmd::new(
            UID,
            TransactionKind::Income,
            amount,
            wallet_id,
        ))
        .await
        .unwrap();
}

async fn count_transactions(db: &DatabaseConnection, wallet_id: Uuid) -> i64 {
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            r#"SELECT COUNT(*) AS n FROM transactions WHERE "walletId" = ?"#,
            vec![wallet_id.to_string().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

#[tokio::test]
async fn new_wallet_starts_at_zero() {
    let (engine, _db) = engine_with_db(500).await;
    let wallet = engine
        .save_wallet(
            SaveWalletCmd::new(UID, "  Savings ")
                .image(ImageSource::Url("https://cdn.test/piggy.png".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(wallet.name, "Savings");
    assert_eq!(wallet.balance(), WalletBalance::EMPTY);
    assert_eq!(wallet.image.as_deref(), Some("https://cdn.test/piggy.png"));
    assert_eq!(engine.wallet(wallet.id, UID).await.unwrap(), wallet);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let (engine, _db) = engine_with_db(500).await;
    let err = engine
        .save_wallet(SaveWalletCmd::new(UID, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert!(engine.list_wallets(UID).await.unwrap().is_empty());
}

#[tokio::test]
async fn local_icon_without_uploader_fails() {
    let (engine, _db) = engine_with_db(500).await;
    let err = engine
        .save_wallet(
            SaveWalletCmd::new(UID, "Cash").image(ImageSource::Local(PathBuf::from("/tmp/a.png"))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UploadFailed(_)));
    assert!(engine.list_wallets(UID).await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_changes_name_only() {
    let (engine, _db) = engine_with_db(500).await;
    let wallet = engine
        .save_wallet(SaveWalletCmd::new(UID, "Cash"))
        .await
        .unwrap();
    income(&engine, wallet.id, 2500).await;

    let edited = engine
        .save_wallet(SaveWalletCmd::edit(UID, wallet.id).name("Pocket"))
        .await
        .unwrap();

    assert_eq!(edited.name, "Pocket");
    assert_eq!(edited.balance(), WalletBalance::new(2500, 2500, 0));
    assert_eq!(edited.created, wallet.created);
    assert_eq!(engine.wallet(wallet.id, UID).await.unwrap(), edited);
}

#[tokio::test]
async fn wallets_are_private_to_their_owner() {
    let (engine, _db) = engine_with_db(500).await;
    let wallet = engine
        .save_wallet(SaveWalletCmd::new(UID, "Cash"))
        .await
        .unwrap();

    assert!(matches!(
        engine.wallet(wallet.id, "bob").await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine
            .save_wallet(SaveWalletCmd::edit("bob", wallet.id).name("Mine"))
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_wallet(wallet.id, "bob").await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(engine.list_wallets("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn foreign_wallet_edit_fails_before_upload() {
    let (engine, _db) = engine_with_db(500).await;
    let wallet = engine
        .save_wallet(SaveWalletCmd::new(UID, "Cash"))
        .await
        .unwrap();

    // The engine has no uploader, so reaching the upload would fail with
    // UploadFailed instead.
    for (uid, wallet_id) in [("bob", wallet.id), (UID, Uuid::new_v4())] {
        let err = engine
            .save_wallet(
                SaveWalletCmd::edit(uid, wallet_id)
                    .image(ImageSource::Local(PathBuf::from("/tmp/a.png"))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }
    assert_eq!(engine.wallet(wallet.id, UID).await.unwrap(), wallet);
}

#[tokio::test]
async fn delete_cascades_in_batches() {
    let (engine, db) = engine_with_db(2).await;
    let doomed = engine
        .save_wallet(SaveWalletCmd::new(UID, "Old card"))
        .await
        .unwrap();
    let kept = engine
        .save_wallet(SaveWalletCmd::new(UID, "Cash"))
        .await
        .unwrap();
    for amount in [100, 200, 300, 400, 500] {
        income(&engine, doomed.id, amount).await;
    }
    income(&engine, kept.id, 50).await;

    let removed = engine.delete_wallet(doomed.id, UID).await.unwrap();

    assert_eq!(removed, 5);
    assert_eq!(count_transactions(&db, doomed.id).await, 0);
    assert_eq!(count_transactions(&db, kept.id).await, 1);
    assert!(matches!(
        engine.wallet(doomed.id, UID).await,
        Err(EngineError::KeyNotFound(_))
    ));
    let remaining = engine
        .list_transactions(UID, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn orphans_are_purged() {
    let (engine, db) = engine_with_db(2).await;
    let wallet = engine
        .save_wallet(SaveWalletCmd::new(UID, "Cash"))
        .await
        .unwrap();
    for amount in [10, 20, 30] {
        income(&engine, wallet.id, amount).await;
    }
    // Simulates a delete interrupted after the wallet row went away.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "DELETE FROM wallets WHERE id = ?",
        vec![wallet.id.to_string().into()],
    ))
    .await
    .unwrap();

    assert_eq!(engine.purge_orphan_transactions().await.unwrap(), 3);
    assert_eq!(count_transactions(&db, wallet.id).await, 0);
    assert_eq!(engine.purge_orphan_transactions().await.unwrap(), 0);
}

#[tokio::test]
async fn summary_adds_up_wallets() {
    let (engine, _db) = engine_with_db(500).await;
    let a = engine
        .save_wallet(SaveWalletCmd::new(UID, "A"))
        .await
        .unwrap();
    let b = engine
        .save_wallet(SaveWalletCmd::new(UID, "B"))
        .await
        .unwrap();
    income(&engine, a.id, 1000).await;
    income(&engine, b.id, 500).await;
    engine
        .save_transaction(
            SaveTransactionCmd::new(UID, TransactionKind::Expense, 200, b.id).category("fuel"),
        )
        .await
        .unwrap();

    let summary = engine.owner_summary(UID).await.unwrap();
    assert_eq!(summary.amount, MoneyCents::new(1300));
    assert_eq!(summary.total_income, MoneyCents::new(1500));
    assert_eq!(summary.total_expenses, MoneyCents::new(200));
    assert_eq!(summary.wallets, 2);

    let empty = engine.owner_summary("bob").await.unwrap();
    assert_eq!(empty.wallets, 0);
    assert_eq!(empty.amount, MoneyCents::ZERO);
}

#[tokio::test]
async fn zero_batch_size_is_refused() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let err = Engine::builder()
        .database(db)
        .cascade_batch_size(0)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
