use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod equity_csv;

#[derive(Debug, Parser)]
#[command(name = "stockbot_worker")]
struct Args {
    /// Stock directory CSV (`symbol,company_name`, e.g. NSE's EQUITY_L.csv).
    #[arg(long, default_value = "EQUITY_L.csv")]
    csv: PathBuf,

    /// Parse and validate the file without writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockbot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&settings, &args).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(csv = %args.csv.display(), error = %err, "stock directory import failed");
    }
    result
}

async fn run(settings: &stockbot_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let file = std::fs::File::open(&args.csv)
        .with_context(|| format!("failed to open {}", args.csv.display()))?;
    let records = equity_csv::parse_equity_csv(file)?;
    anyhow::ensure!(!records.is_empty(), "{} has no stock rows", args.csv.display());

    if args.dry_run {
        tracing::info!(
            csv = %args.csv.display(),
            dry_run = true,
            rows = records.len(),
            "parsed stock directory"
        );
        return Ok(());
    }

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    stockbot_core::storage::migrate(&pool).await?;

    let affected = stockbot_core::storage::stocks::upsert_stocks(&pool, &records).await?;
    tracing::info!(rows = records.len(), affected, "stock directory upsert completed");
    Ok(())
}

fn init_sentry(settings: &stockbot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
