use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::{StoreBackend, StoreConfig};
use crate::models::crop::{Crop, CropPatch};
use crate::models::user::User;

/// The Store trait abstracts user and crop persistence.
///
/// Implementations must make the owned-list mutations atomic: appending a
/// crop id on insert and removing it on delete may not go through a
/// read-modify-write of the whole user document, or concurrent requests
/// against the same user would drop entries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a new user, assigning its id. The phone number must be
    /// unique; a duplicate insert is an error.
    async fn insert_user(&self, user: User) -> Result<User, String>;
    async fn find_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, String>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, String>;

    /// Unconditionally overwrites the stored refresh token. `None` clears it.
    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<(), String>;

    /// Compare-and-swap on the stored refresh token: replaces `current` with
    /// `replacement` only if `current` is still the stored value. Returns
    /// false when the swap lost to a concurrent rotation.
    async fn swap_refresh_token(
        &self,
        user_id: &str,
        current: &str,
        replacement: &str,
    ) -> Result<bool, String>;

    /// Persists a new crop, assigning its id, and appends the id to the
    /// owner's list in the same operation.
    async fn insert_crop(&self, owner_id: &str, crop: Crop) -> Result<Crop, String>;
    async fn find_crop(&self, id: &str) -> Result<Option<Crop>, String>;

    /// Resolves a list of crop ids into records, preserving the input order.
    /// Dangling ids are skipped, not errors.
    async fn find_crops(&self, ids: &[String]) -> Result<Vec<Crop>, String>;

    /// Applies a partial update, returning the updated record, or None when
    /// the record no longer exists.
    async fn update_crop(&self, id: &str, patch: &CropPatch) -> Result<Option<Crop>, String>;

    /// Deletes a crop and removes its id from the owner's list. Returns the
    /// deleted record, or None when it was already gone.
    async fn delete_crop(&self, owner_id: &str, id: &str) -> Result<Option<Crop>, String>;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    match &config.backend {
        StoreBackend::MongoDB(mongo_config) => match MongoDBStore::new(mongo_config).await {
            Ok(store) => {
                info!("Successfully created MongoDB store.");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to create MongoDB store: {}", e);
                std::process::exit(1);
            }
        },
        StoreBackend::Memory => {
            info!("Using in-memory store.");
            Arc::new(MemoryStore::new())
        }
    }
}
