#![allow(dead_code)]

use std::sync::Arc;

use agrigate::auth::TokenService;
use agrigate::config::{Config, ConfigV1};
use agrigate::routes::create_router;
use agrigate::state::AppState;
use agrigate::store::create_store;
use agrigate::weather::WeatherClient;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::Value;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
store:
  type: "memory"
jwt:
  iss: agrigate-test
  access_secret: test-access-secret
  access_exp: 900
  refresh_secret: test-refresh-secret
  refresh_exp: 86400
cookies:
  secure: false
bind_address: 127.0.0.1:8081
"#;

pub fn load_test_config() -> ConfigV1 {
    load_config_yaml(TEST_CONFIG)
}

pub fn load_config_yaml(yaml: &str) -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(yaml))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

/// Builds the full router against the in-memory store. The state is
/// returned as well so tests can inspect persistence directly.
pub async fn build_app(config: ConfigV1) -> (Router, AppState) {
    let config = Arc::new(config);
    let store = create_store(&config.store).await;
    let tokens = Arc::new(TokenService::new(&config.jwt));
    let weather = Arc::new(WeatherClient::new(&config.weather));

    let state = AppState {
        config: config.clone(),
        tokens,
        store,
        weather,
    };

    (create_router(state.clone()), state)
}

pub fn json_request(path: &str, method: Method, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn request_with_bearer(path: &str, method: Method, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn json_request_with_bearer(
    path: &str,
    method: Method,
    token: &str,
    body: &Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn request_with_cookie(path: &str, method: Method, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

/// Pulls a cookie's value out of the response's Set-Cookie headers.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .find(|cookie| cookie.starts_with(&prefix))
        .map(|cookie| {
            cookie[prefix.len()..]
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

/// The raw Set-Cookie header for a named cookie, attributes included.
pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .find(|cookie| cookie.starts_with(&prefix))
        .map(str::to_string)
}
