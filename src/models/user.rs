use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The role a user registered under. Admins are provisioned out of band,
/// never via self-registration.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Farmer,
    Buyer,
    Expert,
    Admin,
}

/// UI language preference stored on the user record.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[serde(rename = "en")]
    En,
    #[default]
    #[serde(rename = "ml")]
    Ml,
}

/// Where the user farms. District and village are required at signup;
/// coordinates are an optional [longitude, latitude] pair.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Location {
    pub district: String,
    pub village: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<f64>>,
}

/// The User struct represents a registered account.
///
/// `crops` is the ordered owned list: ids are appended on crop creation and
/// removed on deletion, and the last element is the user's current crop.
/// `refresh_token` holds the single active refresh token, or None when the
/// user is logged out.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub phone_number: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    pub preferred_language: Language,
    pub location: Location,
    pub land_size: Option<f64>,
    pub refresh_token: Option<String>,
    pub crops: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Construct a new User ready for insertion. The store assigns the id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        phone_number: String,
        password_hash: String,
        name: String,
        role: Role,
        email: Option<String>,
        preferred_language: Language,
        location: Location,
        land_size: Option<f64>,
    ) -> Self {
        let now = Utc::now();
        User {
            id: String::new(),
            phone_number,
            password_hash,
            name,
            role,
            email,
            preferred_language,
            location,
            land_size,
            refresh_token: None,
            crops: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The profile returned by signup: everything a client may see,
    /// never the password hash or the refresh token.
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            phone_number: self.phone_number.clone(),
            name: self.name.clone(),
            role: self.role,
            email: self.email.clone(),
            preferred_language: self.preferred_language,
            location: self.location.clone(),
            land_size: self.land_size,
            crops: self.crops.clone(),
        }
    }

    /// The minimal summary returned by login.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            name: self.name.clone(),
            role: self.role,
            phone_number: self.phone_number.clone(),
        }
    }
}

/// Client-facing profile, stripped of credentials.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub phone_number: String,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    pub preferred_language: Language,
    pub location: Location,
    pub land_size: Option<f64>,
    pub crops: Vec<String>,
}

/// Minimal user summary included in the login response.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub name: String,
    pub role: Role,
    pub phone_number: String,
}
