use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A crop record. Advisory documents and disease entries are opaque
/// references maintained elsewhere; this service never resolves them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: String,
    pub crop_name: String,
    pub crop_type: String,
    pub season: String,
    #[serde(default)]
    pub advisory_docs: Vec<String>,
    #[serde(default)]
    pub disease_list: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Crop {
    /// Construct a new Crop ready for insertion. The store assigns the id.
    pub fn new(crop_name: String, crop_type: String, season: String) -> Self {
        let now = Utc::now();
        Crop {
            id: String::new(),
            crop_name,
            crop_type,
            season,
            advisory_docs: Vec::new(),
            disease_list: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update, bumping the modification timestamp.
    pub fn apply(&mut self, patch: &CropPatch) {
        if let Some(crop_name) = &patch.crop_name {
            self.crop_name = crop_name.clone();
        }
        if let Some(crop_type) = &patch.crop_type {
            self.crop_type = crop_type.clone();
        }
        if let Some(season) = &patch.season {
            self.season = season.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// A partial update to a crop record. Absent fields are left untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CropPatch {
    pub crop_name: Option<String>,
    pub crop_type: Option<String>,
    pub season: Option<String>,
}
