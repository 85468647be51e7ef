use tracing_subscriber::EnvFilter;

use worms_client::cli::{self, ClientConfig};
use worms_client::net_client::NetClient;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match ClientConfig::parse(&args) {
        Ok(config) => config,
        Err(err) => {
            println!("{err}");
            println!("{}", cli::USAGE);
            std::process::exit(1);
        },
    };

    let session_id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);

    let client = match NetClient::connect(&config, session_id).await {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(%err, "failed to connect");
            std::process::exit(1);
        },
    };

    tracing::info!(
        game_server = %config.game_server,
        server_port = config.server_port,
        "worms-client bridging to gui"
    );

    if let Err(err) = client.run().await {
        tracing::error!(%err, "client terminated");
        std::process::exit(1);
    }
}
