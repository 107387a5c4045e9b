use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::movies::repo_types::Genre;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "ADMIN", alias = "Admin")]
    Admin,
    #[default]
    #[serde(alias = "USER", alias = "User")]
    User,
}

/// User document in the `User` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,              // hex ObjectId, immutable once assigned
    pub email: String,
    pub password: String,             // Argon2 hash, never leaves the service
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub favourite_genres: Vec<Genre>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn username(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn favourite_genre_names(&self) -> Vec<String> {
        self.favourite_genres
            .iter()
            .map(|g| g.genre_name.clone())
            .collect()
    }
}
