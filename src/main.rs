use std::process::ExitCode;

use log::{error, info};
use sqlx::postgres::PgPoolOptions;

use tile_conjurer::config::ServerConfig;
use tile_conjurer::service::TileService;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("tile_conjurer.yml"));

    match run(&config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_file(config_path)?;
    let target = config.database.target();

    // The pool connects on first use, not here; an unreachable
    // database surfaces per-request as 500 rather than at startup.
    let pool = PgPoolOptions::new().connect_lazy_with(config.database.connect_options());

    let service = TileService::new(pool, target.clone(), config.sources)?;

    info!("serving tiles from {} at {}", target, config.listen);
    tile_conjurer::server::serve(service, &config.listen).await?;
    info!("shutting down");
    Ok(())
}
