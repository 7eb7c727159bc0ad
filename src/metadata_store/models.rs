use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Descriptive metadata for one uploaded image, stored under its blob key.
///
/// All descriptive fields default to empty: a blob whose metadata write was
/// lost reads back as an all-defaults record, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub upload_time: String,
}

impl ImageMetadata {
    /// The record presented for a blob with no metadata row.
    pub fn missing(key: &str) -> Self {
        Self {
            key: key.to_string(),
            title: String::new(),
            description: String::new(),
            tags: BTreeSet::new(),
            upload_time: String::new(),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// PBKDF2 hash string; the clear password never reaches storage and
    /// this field is never serialized outward.
    pub password_hash: String,
}
