//! Application startup and server initialization.
//!
//! This module handles the creation and configuration of the HTTP server,
//! including initialization of the token service, the store, and route setup.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::TokenService;
use crate::config::ConfigV1;
use crate::routes;
use crate::state::AppState;
use crate::store::create_store;
use crate::weather::WeatherClient;

/// Initializes and runs the application server.
///
/// Sets up the store, token service, and HTTP server with configured
/// routes. Binds to the address specified in the configuration and starts
/// serving requests.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address
/// or encounters a runtime error during execution.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let store = create_store(&config.store).await;
    let tokens = Arc::new(TokenService::new(&config.jwt));
    let weather = Arc::new(WeatherClient::new(&config.weather));

    info!("Starting server on {}", config.bind_address);

    let state = AppState {
        config: config.clone(),
        tokens,
        store,
        weather,
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
