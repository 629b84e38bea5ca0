//! Wallet and transaction bookkeeping.
//!
//! Wallets cache `amount`, `total_income` and `total_expenses`; every
//! transaction write goes through [`Engine`], which reconciles those caches
//! with the change and stores both in a single DB transaction.

pub use commands::{SaveTransactionCmd, SaveWalletCmd};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{
    CommitStage, DEFAULT_CASCADE_BATCH_SIZE, DEFAULT_COMMIT_RETRIES, Engine, EngineBuilder,
    OwnerSummary, TransactionListFilter, WalletAudit,
};
pub use reconcile::{Rejection, TxEffect, WalletBalance};
pub use transactions::{Transaction, TransactionKind, TransactionType};
pub use uploader::{
    AssetUploader, DisabledUploader, HttpUploader, ImageSource, TRANSACTIONS_FOLDER,
    UploadFuture, WALLETS_FOLDER,
};
pub use wallets::Wallet;

mod commands;
mod error;
mod money;
mod ops;
pub mod reconcile;
mod transactions;
mod uploader;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
