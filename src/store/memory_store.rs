use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::crop::{Crop, CropPatch};
use crate::models::user::User;
use crate::store::Store;

/// An in-process `Store` for tests and local development.
///
/// Mutations take the table lock for their whole duration, so the owned-list
/// append/remove and the refresh-token compare-and-swap are as atomic here as
/// their MongoDB counterparts.
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    crops: Mutex<HashMap<String, Crop>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            users: Mutex::new(Vec::new()),
            crops: Mutex::new(HashMap::new()),
        }
    }

    fn lock_users(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, String> {
        self.users
            .lock()
            .map_err(|_| "User table lock poisoned".to_string())
    }

    fn lock_crops(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Crop>>, String> {
        self.crops
            .lock()
            .map_err(|_| "Crop table lock poisoned".to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User, String> {
        let mut users = self.lock_users()?;
        if users.iter().any(|u| u.phone_number == user.phone_number) {
            return Err(format!(
                "Duplicate phone number: {}",
                user.phone_number
            ));
        }
        user.id = Uuid::new_v4().to_string();
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, String> {
        let users = self.lock_users()?;
        Ok(users.iter().find(|u| u.phone_number == phone_number).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, String> {
        let users = self.lock_users()?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<(), String> {
        let mut users = self.lock_users()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        user_id: &str,
        current: &str,
        replacement: &str,
    ) -> Result<bool, String> {
        let mut users = self.lock_users()?;
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) if user.refresh_token.as_deref() == Some(current) => {
                user.refresh_token = Some(replacement.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err("Unknown user id".to_string()),
        }
    }

    async fn insert_crop(&self, owner_id: &str, mut crop: Crop) -> Result<Crop, String> {
        crop.id = Uuid::new_v4().to_string();
        self.lock_crops()?.insert(crop.id.clone(), crop.clone());

        let mut users = self.lock_users()?;
        let owner = users
            .iter_mut()
            .find(|u| u.id == owner_id)
            .ok_or_else(|| "Unknown user id".to_string())?;
        owner.crops.push(crop.id.clone());
        Ok(crop)
    }

    async fn find_crop(&self, id: &str) -> Result<Option<Crop>, String> {
        Ok(self.lock_crops()?.get(id).cloned())
    }

    async fn find_crops(&self, ids: &[String]) -> Result<Vec<Crop>, String> {
        let crops = self.lock_crops()?;
        Ok(ids.iter().filter_map(|id| crops.get(id).cloned()).collect())
    }

    async fn update_crop(&self, id: &str, patch: &CropPatch) -> Result<Option<Crop>, String> {
        let mut crops = self.lock_crops()?;
        match crops.get_mut(id) {
            Some(crop) => {
                crop.apply(patch);
                Ok(Some(crop.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_crop(&self, owner_id: &str, id: &str) -> Result<Option<Crop>, String> {
        let deleted = self.lock_crops()?.remove(id);

        let mut users = self.lock_users()?;
        if let Some(owner) = users.iter_mut().find(|u| u.id == owner_id) {
            owner.crops.retain(|crop_id| crop_id != id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Language, Location, Role};

    fn sample_user(phone: &str) -> User {
        User::new(
            phone.to_string(),
            "hash".to_string(),
            "Ravi".to_string(),
            Role::Farmer,
            None,
            Language::Ml,
            Location {
                district: "Wayanad".to_string(),
                village: "X".to_string(),
                coordinates: None,
            },
            None,
        )
    }

    fn sample_crop(name: &str) -> Crop {
        Crop::new(name.to_string(), "Spice".to_string(), "Monsoon".to_string())
    }

    /// Test that inserting a duplicate phone number is rejected.
    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let store = MemoryStore::new();
        store
            .insert_user(sample_user("9990001111"))
            .await
            .expect("first insert should succeed");
        let result = store.insert_user(sample_user("9990001111")).await;
        assert!(result.is_err(), "Expected duplicate insert to fail");
    }

    /// Test that the refresh-token swap succeeds only against the stored value.
    #[tokio::test]
    async fn test_swap_refresh_token_cas() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(sample_user("9990001111"))
            .await
            .expect("insert should succeed");
        store
            .set_refresh_token(&user.id, Some("token-a"))
            .await
            .expect("set should succeed");

        let won = store
            .swap_refresh_token(&user.id, "token-a", "token-b")
            .await
            .expect("swap should succeed");
        assert!(won);

        // A second rotation with the since-replaced token must lose.
        let lost = store
            .swap_refresh_token(&user.id, "token-a", "token-c")
            .await
            .expect("swap should succeed");
        assert!(!lost);

        let stored = store
            .find_user_by_id(&user.id)
            .await
            .expect("lookup should succeed")
            .expect("user should exist");
        assert_eq!(stored.refresh_token.as_deref(), Some("token-b"));
    }

    /// Test that crop inserts append to the owned list in order.
    #[tokio::test]
    async fn test_insert_crop_appends_in_order() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(sample_user("9990001111"))
            .await
            .expect("insert should succeed");

        let first = store
            .insert_crop(&user.id, sample_crop("Pepper"))
            .await
            .expect("insert should succeed");
        let second = store
            .insert_crop(&user.id, sample_crop("Cardamom"))
            .await
            .expect("insert should succeed");

        let owner = store
            .find_user_by_id(&user.id)
            .await
            .expect("lookup should succeed")
            .expect("user should exist");
        assert_eq!(owner.crops, vec![first.id.clone(), second.id.clone()]);

        let crops = store
            .find_crops(&owner.crops)
            .await
            .expect("resolve should succeed");
        assert_eq!(crops[0].crop_name, "Pepper");
        assert_eq!(crops[1].crop_name, "Cardamom");
    }

    /// Test that deleting a crop removes both the record and the list entry.
    #[tokio::test]
    async fn test_delete_crop_removes_list_entry() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(sample_user("9990001111"))
            .await
            .expect("insert should succeed");
        let crop = store
            .insert_crop(&user.id, sample_crop("Pepper"))
            .await
            .expect("insert should succeed");

        let deleted = store
            .delete_crop(&user.id, &crop.id)
            .await
            .expect("delete should succeed");
        assert_eq!(deleted.map(|c| c.id), Some(crop.id.clone()));

        let owner = store
            .find_user_by_id(&user.id)
            .await
            .expect("lookup should succeed")
            .expect("user should exist");
        assert!(owner.crops.is_empty());
        assert!(store
            .find_crop(&crop.id)
            .await
            .expect("lookup should succeed")
            .is_none());

        // A second delete finds nothing.
        let again = store
            .delete_crop(&user.id, &crop.id)
            .await
            .expect("delete should succeed");
        assert!(again.is_none());
    }

    /// Test that dangling ids are skipped when resolving the owned list.
    #[tokio::test]
    async fn test_find_crops_skips_dangling() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(sample_user("9990001111"))
            .await
            .expect("insert should succeed");
        let crop = store
            .insert_crop(&user.id, sample_crop("Pepper"))
            .await
            .expect("insert should succeed");

        let ids = vec!["gone".to_string(), crop.id.clone()];
        let crops = store.find_crops(&ids).await.expect("resolve should succeed");
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].id, crop.id);
    }
}
