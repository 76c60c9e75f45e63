use dotenvy::dotenv;
use pocket_ledger::{
    config::{self, database},
    core::report,
    errors::Result,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    match run().await {
        Ok(0) => {
            info!("Ledger is consistent.");
            ExitCode::SUCCESS
        }
        Ok(drifted) => {
            error!(drifted, "Ledger balances disagree with transaction history.");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Start-up failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Opens the store, makes sure the schema exists and reconciles every balance.
/// Returns the number of drifted accounts.
async fn run() -> Result<usize> {
    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(
        page_size = app_config.ledger.page_size,
        "Successfully processed application configuration."
    );

    // 4. Connect and create tables
    let db = database::create_connection(&app_config.database)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Check every stored balance against its history
    let drifts = report::reconcile_balances(&db).await?;
    for drift in &drifts {
        error!(
            account_id = drift.account_id,
            user = %drift.user_id,
            stored = %drift.stored,
            expected = %drift.expected,
            "Balance drift"
        );
    }
    Ok(drifts.len())
}
