//! Weather pass-through endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;
use crate::weather::CityWeather;

/// Registers the weather route. Unauthenticated by design: the data is
/// public and the frontend shows it before login.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/weather", get(get_weather))
}

/// Aggregated geocoding + hourly forecast for the configured city list.
/// Any upstream failure fails the whole request; there are no partial
/// results.
async fn get_weather(
    State(state): State<AppState>,
) -> Result<Json<Vec<CityWeather>>, HTTPError> {
    let reports = state.weather.city_reports().await.map_err(|e| {
        error!("Weather aggregation failed: {}", e);
        HTTPError::server("Unable to fetch weather")
    })?;
    Ok(Json(reports))
}
