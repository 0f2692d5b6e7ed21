use tracing::{error, info};

use drivebox::{Config, Database, FileStorage, WebServer};

/// Configuration file path, overridable with `DRIVEBOX_CONFIG`.
fn config_path() -> String {
    std::env::var("DRIVEBOX_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
}

#[tokio::main]
async fn main() {
    let path = config_path();
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = drivebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        drivebox::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> drivebox::Result<()> {
    config.validate()?;

    info!("Drivebox {}", env!("CARGO_PKG_VERSION"));

    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, "Database opened");

    let storage = FileStorage::new(&config.storage.path)?;
    info!(path = %config.storage.path, "File storage ready");

    let server = WebServer::new(&config, db.clone(), storage)?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    server.run().await?;
    db.close().await;
    Ok(())
}
