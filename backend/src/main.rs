//! Operator CLI: applies migrations and drives the ledger against the
//! configured PostgreSQL database and Redis cache.

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use diesel::{Connection, PgConnection};
use diesel_migrations::MigrationHarness;
use ortho_config::OrthoConfig;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use merch_ledger::MIGRATIONS;
use merch_ledger::config::LedgerSettings;
use merch_ledger::domain::ports::{AccountRepository, LedgerOperations};
use merch_ledger::domain::{
    CoinAmount, CredentialHash, ItemName, LedgerError, LedgerService, NewAccount, Username,
};
use merch_ledger::outbound::cache::RedisAggregateCache;
use merch_ledger::outbound::persistence::{DbPool, DieselAccountRepository, DieselLedgerStore};

const PROGRAM: &str = "merch-ledger";

#[derive(Debug, Parser)]
#[command(name = PROGRAM, version, about = "Merch store coin ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Register an account with the starting balance.
    Register {
        #[arg(long)]
        username: String,
        /// Hash produced by the authentication service.
        #[arg(long)]
        credential_hash: String,
    },
    /// Print an account's balance, inventory and coin history.
    Info {
        #[arg(long)]
        username: String,
    },
    /// Transfer coins between accounts.
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: i64,
    },
    /// Buy one unit of a catalog item.
    Buy {
        #[arg(long)]
        username: String,
        #[arg(long)]
        item: String,
    },
}

type Service = LedgerService<DieselLedgerStore, RedisAggregateCache>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = LedgerSettings::load_from_iter([OsString::from(PROGRAM)])
        .map_err(|err| eyre!("failed to load configuration: {err}"))?;

    match cli.command {
        Command::Migrate => migrate(&settings).await,
        Command::Register {
            username,
            credential_hash,
        } => register(&settings, &username, credential_hash).await,
        Command::Info { username } => {
            let service = connect(&settings).await?;
            let account = service.resolve_account(&Username::new(username)?).await?;
            let view = service.aggregate_view(account).await?;
            print_json(&serde_json::to_value(view)?)
        }
        Command::Send { from, to, amount } => {
            let service = connect(&settings).await?;
            let sender = service.resolve_account(&Username::new(from)?).await?;
            let receipt = service
                .send_coins(sender, &Username::new(to)?, CoinAmount::new(amount)?)
                .await
                .map_err(report_commit_state)?;
            print_json(&json!({
                "sender": receipt.sender,
                "recipient": receipt.recipient,
                "amount": receipt.amount,
            }))
        }
        Command::Buy { username, item } => {
            let service = connect(&settings).await?;
            let account = service.resolve_account(&Username::new(username)?).await?;
            let receipt = service
                .buy_item(account, &ItemName::new(item)?)
                .await
                .map_err(report_commit_state)?;
            print_json(&json!({
                "account": receipt.account,
                "item": receipt.item,
                "price": receipt.price,
                "quantity": receipt.quantity,
            }))
        }
    }
}

async fn connect(settings: &LedgerSettings) -> Result<Service> {
    let pool = DbPool::new(settings.pool_config())
        .await
        .wrap_err("failed to connect to the ledger database")?;
    let cache = RedisAggregateCache::connect(settings.cache_pool_config())
        .await
        .wrap_err("failed to connect to the aggregate cache")?;
    Ok(LedgerService::new(
        Arc::new(DieselLedgerStore::new(pool)),
        Arc::new(cache),
        settings.cache_ttl(),
    ))
}

async fn migrate(settings: &LedgerSettings) -> Result<()> {
    let url = settings.database_url().to_owned();
    let applied = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut conn =
            PgConnection::establish(&url).wrap_err("failed to connect for migrations")?;
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| eyre!("migration failed: {err}"))?;
        Ok(versions.len())
    })
    .await??;
    info!(applied, "migrations complete");
    print_json(&json!({ "applied": applied }))
}

async fn register(
    settings: &LedgerSettings,
    username: &str,
    credential_hash: String,
) -> Result<()> {
    let pool = DbPool::new(settings.pool_config())
        .await
        .wrap_err("failed to connect to the ledger database")?;
    let repository = DieselAccountRepository::new(pool);
    let account = repository
        .create(&NewAccount {
            username: Username::new(username)?,
            credential_hash: CredentialHash::new(credential_hash),
        })
        .await?;
    print_json(&json!({
        "id": account.id,
        "username": account.username,
        "balance": account.balance,
    }))
}

fn report_commit_state(error: LedgerError) -> color_eyre::Report {
    if error.committed() {
        color_eyre::Report::new(error).wrap_err("the change was committed; do not retry")
    } else {
        color_eyre::Report::new(error)
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
