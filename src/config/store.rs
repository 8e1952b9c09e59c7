use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::mongodb_store::MongoDBConfig;

/// A wrapper for the store configuration. The backend is selected via a
/// "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub backend: StoreBackend,
}

/// The available store backends. MongoDB is the production backend; the
/// memory store backs tests and local development.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "mongo")]
    MongoDB(MongoDBConfig),
    #[serde(rename = "memory")]
    Memory,
}
