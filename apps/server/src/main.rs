#![warn(clippy::all, clippy::pedantic)]

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use sitewatch_service::database::{Database, DatabaseImpl, initialize_database};
use sitewatch_service::monitoring::MonitoringScheduler;
use sitewatch_service::pool::open_pool;
use sitewatch_service::{Config, Error as ServiceError};
use tokio::sync::watch;
use tracing::{error, info, warn};

mod error;
mod routes;

use error::AppError;
use logger::init_tracing;

/// Site availability monitor
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_deref())?.with_env_overrides();
    info!("{config}");

    let pool = open_pool(&config.database.path).await?;
    let conn = pool.get().await.map_err(ServiceError::from)?;
    initialize_database(&conn).await?;
    drop(conn);
    info!("Database ready at {}", config.database.path);

    let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = MonitoringScheduler::new(&config, database.clone())?.spawn(shutdown_rx);

    let ip: IpAddr = config.server.bind.parse()?;
    let served = run_server(SocketAddr::new(ip, config.server.port), web::Data::from(database)).await;

    info!("HTTP server stopped, stopping monitoring");
    if shutdown_tx.send(true).is_err() {
        warn!("Monitoring task already exited");
    }

    // The loop finishes the probe in progress, including its write, before it stops
    let grace = config.shutdown_grace();
    match tokio::time::timeout(grace, monitor).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Monitoring task failed: {e}"),
        Err(_) => warn!("Monitoring did not stop within {grace:?}, exiting anyway"),
    }

    served
}

async fn run_server(addr: SocketAddr, database: web::Data<dyn Database>) -> Result<(), AppError> {
    info!("Listening on http://{addr}");

    HttpServer::new(move || App::new().app_data(database.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
