//! galpon-ops - Warehouse operations service
//!
//! Catalog, gate entries, storage, package tracking, labels, reexpedición,
//! notifications, and dashboard statistics. Shares the SQLite database
//! with galpon-vms.

use anyhow::Result;
use clap::Parser;
use galpon_common::config::{
    load_module_config, prepare_database_path, resolve_data_folder,
};
use galpon_common::db::init_database;
use galpon_ops::{build_router, AppState};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "galpon-ops", version, about = "Galpón warehouse operations service")]
struct Cli {
    /// Data folder holding the shared SQLite database
    #[arg(long)]
    data_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting galpon-ops v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let data_folder = resolve_data_folder(cli.data_folder.as_deref(), "GALPON_ROOT");
    let db_path = prepare_database_path(&data_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database ready");

    let module = load_module_config(&pool, "ops").await?;
    if !module.enabled {
        warn!("Module 'ops' is disabled in module_config; exiting");
        return Ok(());
    }

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(module.bind_addr()).await?;
    info!("galpon-ops listening on http://{}", module.bind_addr());
    info!("Health check: http://{}/health", module.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
