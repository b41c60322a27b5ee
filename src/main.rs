use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use clean_formidable_entries::cleaner::clean_expired_entries;
use clean_formidable_entries::configuration;
use clean_formidable_entries::repository::PgEntryStore;
use clean_formidable_entries::telemetry;

/// Delete expired Formidable Forms entries and their associated metadata.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Examples:\n  clean-formidable-entries 6months\n  clean-formidable-entries 6months --dry-run"
)]
struct Cli {
    /// How long entries must be kept, e.g. "6months", "1year", "90days".
    expire_time: String,

    /// Show which entries would be deleted without actually deleting them.
    #[arg(long)]
    dry_run: bool,

    /// Path to the configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let subscriber = telemetry::get_subscriber(
        "clean_formidable_entries".into(),
        "info".into(),
        std::io::stdout,
    );
    telemetry::init_subscriber(subscriber);

    let config = configuration::get_config(&cli.config).context("Failed to read configuration")?;

    let pool = PgPoolOptions::new().connect_lazy_with(config.database.connect_options());
    let store = PgEntryStore::new(pool);

    clean_expired_entries(&store, &cli.expire_time, cli.dry_run).await?;

    Ok(())
}
