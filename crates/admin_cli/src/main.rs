use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Engine, WalletAudit};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "penny_admin")]
#[command(about = "Admin utilities for Penny (audit and repair wallet totals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./penny.db?mode=rwc")]
    database_url: String,

    /// Transactions deleted per batch by `purge-orphans`.
    #[arg(long, default_value_t = engine::DEFAULT_CASCADE_BATCH_SIZE)]
    batch_size: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare cached wallet totals with their transactions.
    Audit(AuditArgs),
    /// Overwrite the cached totals of a wallet with the replayed ones.
    Repair(RepairArgs),
    /// Delete transactions whose wallet no longer exists.
    PurgeOrphans,
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Owner whose wallets are audited.
    #[arg(long)]
    uid: String,
}

#[derive(Args, Debug)]
struct RepairArgs {
    #[arg(long)]
    uid: String,
    #[arg(long)]
    wallet: Uuid,
}

fn print_audit(audit: &WalletAudit) {
    let state = if audit.is_consistent() { "ok" } else { "DRIFT" };
    println!(
        "{state:5} {} ({}) stored {}/{}/{} computed {}/{}/{}",
        audit.wallet_id,
        audit.name,
        audit.stored.amount,
        audit.stored.total_income,
        audit.stored.total_expenses,
        audit.computed.amount,
        audit.computed.total_income,
        audit.computed.total_expenses,
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter("engine=warn")
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder()
        .database(db)
        .cascade_batch_size(cli.batch_size)
        .build()
        .await?;

    match cli.command {
        Command::Audit(args) => {
            let audits = engine.audit_wallets(&args.uid).await?;
            if audits.is_empty() {
                println!("no wallets for {}", args.uid);
            }
            audits.iter().for_each(print_audit);
            if audits.iter().any(|audit| !audit.is_consistent()) {
                std::process::exit(1);
            }
        }
        Command::Repair(args) => {
            let before = engine.repair_wallet(args.wallet, &args.uid).await?;
            print_audit(&before);
            if before.stored == before.computed {
                println!("nothing to repair");
            } else {
                println!("repaired wallet {}", before.wallet_id);
            }
        }
        Command::PurgeOrphans => {
            let removed = engine.purge_orphan_transactions().await?;
            println!("removed {removed} orphan transactions");
        }
    }

    Ok(())
}
