use std::sync::Arc;

use agrigate::config::{load_config, print_schema};
use agrigate::startup;
use agrigate::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    // `--schema` prints the config JSON schema and exits, for editor tooling.
    if std::env::args().any(|arg| arg == "--schema") {
        print_schema();
        return;
    }

    let config = Arc::new(load_config());
    init_logging(&config.logging);

    if let Err(e) = startup::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
