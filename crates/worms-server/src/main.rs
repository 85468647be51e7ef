use tracing_subscriber::EnvFilter;

use worms_server::cli::{self, ServerConfig};
use worms_server::server_loop::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let default_seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u32)
        .unwrap_or(0);

    let config = match ServerConfig::parse(&args, default_seed) {
        Ok(config) => config,
        Err(err) => {
            println!("{err}");
            println!("{}", cli::USAGE);
            std::process::exit(1);
        },
    };

    let server = match Server::bind("::", config.port, config.params).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%err, "failed to start server");
            std::process::exit(1);
        },
    };

    tracing::info!(port = config.port, params = ?config.params, "worms-server listening");

    if let Err(err) = server.run().await {
        tracing::error!(%err, "server loop terminated");
        std::process::exit(1);
    }
}
