use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson};
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::crop::{Crop, CropPatch};
use crate::models::user::User;
use crate::store::Store;

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug)]
pub struct MongoDBConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// This struct holds references to two collections:
/// - `user_collection`: registered accounts, including each user's owned list
/// - `crop_collection`: crop records referenced from those lists
pub struct MongoDBStore {
    user_collection: Collection<UserDocument>,
    crop_collection: Collection<CropDocument>,
}

/// Document shape for storing users in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct UserDocument {
    _id: ObjectId,
    user: User,
}

/// Document shape for storing crops in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct CropDocument {
    _id: ObjectId,
    crop: Crop,
}

impl MongoDBStore {
    /// Creates a new `MongoDBStore` from the given config.
    /// It initializes client connections, sets up indexes, etc.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB at URI: {}", config.uri);

        // Parse the connection string from the config
        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;

        client_options.app_name = Some("agrigate".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        info!("MongoDB connection established successfully.");

        let database = client.database(&config.database);
        let user_collection = database.collection::<UserDocument>("users");
        let crop_collection = database.collection::<CropDocument>("crops");

        // Unique index on the phone number, the account identifier.
        let mut unique_on_phone = IndexModel::default();
        unique_on_phone.keys = doc! { "user.phoneNumber": 1 };
        unique_on_phone.options = Some(IndexOptions::builder().unique(true).build());

        user_collection
            .create_index(unique_on_phone, None)
            .await
            .map_err(|e| format!("Failed to create unique index on phone number: {}", e))?;

        Ok(Self {
            user_collection,
            crop_collection,
        })
    }

    /// Wrap a `User` in a fresh document, assigning its id.
    fn user_to_doc(mut user: User) -> UserDocument {
        let oid = ObjectId::new();
        user.id = oid.to_hex();
        UserDocument { _id: oid, user }
    }

    /// Wrap a `Crop` in a fresh document, assigning its id.
    fn crop_to_doc(mut crop: Crop) -> CropDocument {
        let oid = ObjectId::new();
        crop.id = oid.to_hex();
        CropDocument { _id: oid, crop }
    }

    /// Parse an id string back into an ObjectId. Ids that never came from
    /// this store simply match nothing.
    fn parse_id(id: &str) -> Option<ObjectId> {
        ObjectId::parse_str(id).ok()
    }
}

#[async_trait]
impl Store for MongoDBStore {
    async fn insert_user(&self, user: User) -> Result<User, String> {
        let user_doc = Self::user_to_doc(user);
        self.user_collection
            .insert_one(user_doc.clone(), None)
            .await
            .map_err(|e| format!("Failed to insert user: {}", e))?;
        Ok(user_doc.user)
    }

    async fn find_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, String> {
        let user_doc = self
            .user_collection
            .find_one(doc! { "user.phoneNumber": phone_number }, None)
            .await
            .map_err(|e| format!("Failed to query user by phone number: {}", e))?;
        Ok(user_doc.map(|d| d.user))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, String> {
        let Some(oid) = Self::parse_id(id) else {
            return Ok(None);
        };
        let user_doc = self
            .user_collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| format!("Failed to query user by id: {}", e))?;
        Ok(user_doc.map(|d| d.user))
    }

    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>) -> Result<(), String> {
        let Some(oid) = Self::parse_id(user_id) else {
            return Err("Unknown user id".to_string());
        };
        let value = match token {
            Some(t) => Bson::String(t.to_string()),
            None => Bson::Null,
        };
        self.user_collection
            .update_one(
                doc! { "_id": oid },
                doc! { "$set": { "user.refreshToken": value } },
                None,
            )
            .await
            .map_err(|e| format!("Failed to store refresh token: {}", e))?;
        Ok(())
    }

    /// Conditional update keyed on the current token value, so of two
    /// concurrent rotations exactly one observes a match.
    async fn swap_refresh_token(
        &self,
        user_id: &str,
        current: &str,
        replacement: &str,
    ) -> Result<bool, String> {
        let Some(oid) = Self::parse_id(user_id) else {
            return Err("Unknown user id".to_string());
        };
        let updated = self
            .user_collection
            .find_one_and_update(
                doc! { "_id": oid, "user.refreshToken": current },
                doc! { "$set": { "user.refreshToken": replacement } },
                None,
            )
            .await
            .map_err(|e| format!("Failed to rotate refresh token: {}", e))?;
        Ok(updated.is_some())
    }

    async fn insert_crop(&self, owner_id: &str, crop: Crop) -> Result<Crop, String> {
        let Some(owner_oid) = Self::parse_id(owner_id) else {
            return Err("Unknown user id".to_string());
        };

        let crop_doc = Self::crop_to_doc(crop);
        self.crop_collection
            .insert_one(crop_doc.clone(), None)
            .await
            .map_err(|e| format!("Failed to insert crop: {}", e))?;

        // $push appends atomically, so two concurrent creates against the
        // same owner cannot drop each other's entry.
        debug!("Appending crop {} to owner {}", crop_doc.crop.id, owner_id);
        self.user_collection
            .update_one(
                doc! { "_id": owner_oid },
                doc! { "$push": { "user.crops": crop_doc.crop.id.clone() } },
                None,
            )
            .await
            .map_err(|e| format!("Failed to append crop to owner list: {}", e))?;

        Ok(crop_doc.crop)
    }

    async fn find_crop(&self, id: &str) -> Result<Option<Crop>, String> {
        let Some(oid) = Self::parse_id(id) else {
            return Ok(None);
        };
        let crop_doc = self
            .crop_collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| format!("Failed to query crop: {}", e))?;
        Ok(crop_doc.map(|d| d.crop))
    }

    async fn find_crops(&self, ids: &[String]) -> Result<Vec<Crop>, String> {
        let oids: Vec<ObjectId> = ids.iter().filter_map(|id| Self::parse_id(id)).collect();
        let mut cursor = self
            .crop_collection
            .find(doc! { "_id": { "$in": oids } }, None)
            .await
            .map_err(|e| format!("Failed to list crops: {}", e))?;

        let mut by_id = HashMap::new();
        while let Some(crop_doc) = cursor
            .try_next()
            .await
            .map_err(|e| format!("Failed to read crop document: {}", e))?
        {
            by_id.insert(crop_doc.crop.id.clone(), crop_doc.crop);
        }

        // Reassemble in owned-list order; dangling ids drop out here.
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn update_crop(&self, id: &str, patch: &CropPatch) -> Result<Option<Crop>, String> {
        let Some(oid) = Self::parse_id(id) else {
            return Ok(None);
        };

        let mut set = doc! {
            "crop.updatedAt": to_bson(&chrono::Utc::now())
                .map_err(|e| format!("Failed to encode timestamp: {}", e))?,
        };
        if let Some(crop_name) = &patch.crop_name {
            set.insert("crop.cropName", crop_name.as_str());
        }
        if let Some(crop_type) = &patch.crop_type {
            set.insert("crop.cropType", crop_type.as_str());
        }
        if let Some(season) = &patch.season {
            set.insert("crop.season", season.as_str());
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .crop_collection
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set }, options)
            .await
            .map_err(|e| format!("Failed to update crop: {}", e))?;
        Ok(updated.map(|d| d.crop))
    }

    async fn delete_crop(&self, owner_id: &str, id: &str) -> Result<Option<Crop>, String> {
        let Some(oid) = Self::parse_id(id) else {
            return Ok(None);
        };
        let Some(owner_oid) = Self::parse_id(owner_id) else {
            return Err("Unknown user id".to_string());
        };

        let deleted = self
            .crop_collection
            .find_one_and_delete(doc! { "_id": oid }, None)
            .await
            .map_err(|e| format!("Failed to delete crop: {}", e))?;

        // $pull removes atomically, mirroring the $push on insert. Run even
        // when the record was already gone so a dangling reference heals.
        self.user_collection
            .update_one(
                doc! { "_id": owner_oid },
                doc! { "$pull": { "user.crops": id } },
                None,
            )
            .await
            .map_err(|e| format!("Failed to remove crop from owner list: {}", e))?;

        Ok(deleted.map(|d| d.crop))
    }
}
