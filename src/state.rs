//! Shared application state.
//!
//! Contains the state that is shared across all request handlers,
//! including configuration, the token service, persistence, and the
//! weather client.

use crate::auth::TokenService;
use crate::config::ConfigV1;
use crate::store::Store;
use crate::weather::WeatherClient;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request handler and contains
/// references to the configuration, token service, store, and
/// weather client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Mints and validates access/refresh tokens.
    pub tokens: Arc<TokenService>,
    /// User and crop persistence.
    pub store: Arc<dyn Store>,
    /// Upstream aggregator for the weather pass-through.
    pub weather: Arc<WeatherClient>,
}
