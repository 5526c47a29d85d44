use session_coordinator::clock::SystemClock;
use session_coordinator::config::ServerConfig;
use session_coordinator::engine::Coordinator;
use session_coordinator::server;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = ServerConfig::from_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter)).init();

    let coordinator = Coordinator::new(Arc::new(SystemClock));
    server::run_server(config, coordinator).await
}
