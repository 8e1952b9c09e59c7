//! Weather pass-through over the Open-Meteo APIs.
//!
//! For each configured city we geocode the name, then fetch an hourly
//! forecast for the returned coordinates and republish it untouched. Nothing
//! is persisted; geocoding lookups are memoized since city coordinates do
//! not move.

#[allow(unused_imports)]
use cached::proc_macro::cached;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Upstream endpoints and the city list to aggregate. The URLs are
/// overridable so tests can point at a local server.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct WeatherConfig {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_cities() -> Vec<String> {
    ["Thiruvananthapuram", "Kochi", "Kozhikode", "Kollam", "Kannur"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            cities: default_cities(),
            timezone: default_timezone(),
        }
    }
}

/// One aggregated entry: the city, its resolved coordinates, and the raw
/// hourly series from the forecast API.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CityWeather {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather: Value,
}

#[derive(Deserialize, Debug)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingMatch>>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
struct GeocodingMatch {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize, Debug)]
struct ForecastResponse {
    hourly: Value,
}

/// Aggregates geocoding and forecast data for the configured city list.
pub struct WeatherClient {
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Self {
        WeatherClient {
            config: config.clone(),
        }
    }

    /// Fetches one entry per configured city. Cities the geocoder does not
    /// know are skipped; any upstream failure fails the whole request.
    pub async fn city_reports(&self) -> Result<Vec<CityWeather>, String> {
        let mut reports = Vec::with_capacity(self.config.cities.len());

        for city in &self.config.cities {
            let location =
                geocode_city(self.config.geocoding_url.clone(), city.clone()).await?;
            let Some((latitude, longitude)) = location else {
                debug!("No geocoding match for city '{}', skipping.", city);
                continue;
            };

            let hourly = fetch_forecast(
                &self.config.forecast_url,
                latitude,
                longitude,
                &self.config.timezone,
            )
            .await?;

            reports.push(CityWeather {
                city: city.clone(),
                latitude,
                longitude,
                weather: hourly,
            });
        }

        Ok(reports)
    }
}

/// Resolves a city name to coordinates. Cached for 600s; coordinates are
/// static, and the geocoder rate-limits aggressive callers.
#[cfg_attr(not(test), cached(time = 600, result = true, sync_writes = true))]
async fn geocode_city(geocoding_url: String, city: String) -> Result<Option<(f64, f64)>, String> {
    debug!("Geocoding city '{}'", city);
    let res = reqwest::Client::new()
        .get(&geocoding_url)
        .query(&[("name", city.as_str())])
        .send()
        .await
        .map_err(|e| format!("Failed to reach geocoding API: {}", e))?;

    if !res.status().is_success() {
        return Err(format!("Geocoding API returned {}", res.status()));
    }

    let body: GeocodingResponse = res
        .json()
        .await
        .map_err(|e| format!("Failed to parse geocoding response: {}", e))?;

    let first = body.results.and_then(|results| results.into_iter().next());
    Ok(first.map(|m| (m.latitude, m.longitude)))
}

/// Fetches the hourly temperature/precipitation series for a coordinate.
async fn fetch_forecast(
    forecast_url: &str,
    latitude: f64,
    longitude: f64,
    timezone: &str,
) -> Result<Value, String> {
    let res = reqwest::Client::new()
        .get(forecast_url)
        .query(&[
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("hourly", "temperature_2m,precipitation".to_string()),
            ("timezone", timezone.to_string()),
        ])
        .send()
        .await
        .map_err(|e| format!("Failed to reach forecast API: {}", e))?;

    if !res.status().is_success() {
        return Err(format!("Forecast API returned {}", res.status()));
    }

    let body: ForecastResponse = res
        .json()
        .await
        .map_err(|e| format!("Failed to parse forecast response: {}", e))?;
    Ok(body.hourly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    /// Test that the default config carries the fixed Kerala city list.
    #[test]
    fn test_default_config() {
        let config = WeatherConfig::default();
        assert_eq!(config.cities.len(), 5);
        assert_eq!(config.cities[0], "Thiruvananthapuram");
        assert_eq!(config.timezone, "Asia/Kolkata");
    }

    /// Test that geocoding picks the first match.
    #[tokio::test]
    async fn test_geocode_city_first_match() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".into(),
                "Kochi".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "results": [
                        {"latitude": 9.93, "longitude": 76.26},
                        {"latitude": 0.0, "longitude": 0.0}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = geocode_city(format!("{}/search", server.url()), "Kochi".to_string()).await;
        m.assert_async().await;
        assert_eq!(result, Ok(Some((9.93, 76.26))));
    }

    /// Test that an unknown city resolves to None rather than an error.
    #[tokio::test]
    async fn test_geocode_city_no_results() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({}).to_string())
            .create_async()
            .await;

        let result =
            geocode_city(format!("{}/search", server.url()), "Atlantis".to_string()).await;
        m.assert_async().await;
        assert_eq!(result, Ok(None));
    }

    /// Test that an upstream failure surfaces as an error.
    #[tokio::test]
    async fn test_geocode_city_upstream_failure() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let result = geocode_city(format!("{}/search", server.url()), "Kochi".to_string()).await;
        m.assert_async().await;
        assert!(result.is_err());
    }

    /// Test that the forecast fetch returns the hourly series untouched.
    #[tokio::test]
    async fn test_fetch_forecast_returns_hourly() {
        let hourly = json!({
            "time": ["2026-08-08T00:00"],
            "temperature_2m": [27.4],
            "precipitation": [0.2]
        });
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"hourly": hourly.clone()}).to_string())
            .create_async()
            .await;

        let result = fetch_forecast(
            &format!("{}/forecast", server.url()),
            9.93,
            76.26,
            "Asia/Kolkata",
        )
        .await;
        m.assert_async().await;
        assert_eq!(result, Ok(hourly));
    }
}
