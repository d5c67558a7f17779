use std::sync::Arc;

use popbridge::config::load_config;
use popbridge::session::SessionRegistry;
use popbridge::transport::websocket::start_websocket_server;
use popbridge::utils::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = load_config().expect("Failed to load configuration");
    logging::init(&config.server.log_level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let registry = Arc::new(SessionRegistry::new(config.server.max_connections));
    start_websocket_server(addr, registry, config).await;
}
