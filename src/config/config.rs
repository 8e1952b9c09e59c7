use figment::providers::{Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;
use crate::weather::WeatherConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0, containing store, tokens, weather, etc.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub store: StoreConfig,
    pub bind_address: String,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    pub logging: LoggingConfig,
}

/// Load config from a YAML file named "config.yaml" in the current directory.
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new().merge(Yaml::file("./config.yaml"));
    let config = match figment.extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    match config {
        Config::ConfigV1(c) => c,
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}

/// Signing configuration for the two token classes. Expiries are in seconds;
/// the refresh expiry also becomes the refresh cookie's Max-Age.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct JwtConfig {
    pub iss: String,
    pub access_secret: String,
    pub access_exp: i64,
    pub refresh_secret: String,
    pub refresh_exp: i64,
}

/// Cookie attributes. `secure` should only be disabled for plain-HTTP
/// local development.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CookieConfig {
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig { secure: true }
    }
}
