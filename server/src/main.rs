use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;

/// Parses the command line, validates it, and runs the arena until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let world = config.world();
    info!(
        "Arena {}x{} with {} items and {} air pockets",
        world.field_width, world.field_height, world.item_total, world.air_total
    );

    let mut server = Server::new(&config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
