use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use tempora_config::{init_tracing, AppConfig};
use tempora_db::crm::pg_repository::PgCrmRepository;
use tempora_db::external::pg_repository::PgExternalRepository;
use tempora_ingest::response::ServiceResponse;
use tempora_ingest::SyncService;

#[derive(Parser)]
#[command(
    name = "tempora-ingest",
    version,
    about = "Synchronize partner clients into local customers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register every catalog organization for syncing
    Init,
    /// Sync one organization
    Sync { code: String },
    /// Sync every catalog organization in turn
    SyncAll,
    /// Show the sync state of every organization
    Status,
    /// Drop synced clients and return an organization to pending
    Reset { code: String },
    /// Browse partner clients without syncing them
    Clients {
        code: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        search: Option<String>,
    },
    /// Client statistics for one organization
    Stats { code: String },
    /// Discard the cached token and request a new one
    RefreshToken,
    /// List the catalog organizations
    Organizations,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    init_tracing("info");

    tracing::info!(service = "tempora-ingest", "starting");

    let config = AppConfig::from_env().expect("failed to load configuration");
    let pool = tempora_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");
    tempora_db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    let service = SyncService::from_config(
        config.partner,
        PgExternalRepository::new(pool.clone()),
        PgCrmRepository::new(pool),
    )
    .expect("failed to build sync service");

    match cli.command {
        Command::Init => emit(service.initialize_catalog().await),
        Command::Sync { code } => emit(service.sync_organization(&code).await),
        Command::SyncAll => emit(service.sync_all().await),
        Command::Status => emit(service.get_sync_status().await),
        Command::Reset { code } => emit(service.reset_organization(&code).await),
        Command::Clients {
            code,
            page,
            limit,
            search,
        } => emit(
            service
                .fetch_clients(&code, page, limit, search.as_deref())
                .await,
        ),
        Command::Stats { code } => emit(service.fetch_stats(&code).await),
        Command::RefreshToken => emit(service.refresh_token().await),
        Command::Organizations => emit(service.get_organizations()),
    }
}

/// Print the envelope as JSON; the exit status follows `success`.
fn emit<T: Serialize>(response: ServiceResponse<T>) -> ExitCode {
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            return ExitCode::FAILURE;
        }
    }

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
