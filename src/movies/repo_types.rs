use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// Genre tag, embedded by value in movies and in user favourites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub genre_id: i32,
    pub genre_name: String,
}

/// Every genre name must be 2..=100 characters.
pub fn validate_genre_names(genres: &[Genre]) -> Result<(), ValidationError> {
    for g in genres {
        let len = g.genre_name.chars().count();
        if !(2..=100).contains(&len) {
            let mut err = ValidationError::new("genre_name");
            err.message = Some("genre_name must be 2 to 100 characters".into());
            err.add_param("genre_id".into(), &g.genre_id);
            return Err(err);
        }
    }
    Ok(())
}

/// A movie needs at least one well-formed genre.
pub fn validate_movie_genres(genres: &[Genre]) -> Result<(), ValidationError> {
    if genres.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("at least one genre is required".into());
        return Err(err);
    }
    validate_genre_names(genres)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub ranking_value: i32,
    pub ranking_name: String,
}

impl Ranking {
    pub fn from_value(value: i32) -> Self {
        Self {
            ranking_value: value,
            ranking_name: ranking_name_for(value).to_string(),
        }
    }
}

/// Descriptive name for a rating value.
pub fn ranking_name_for(value: i32) -> &'static str {
    match value {
        v if v >= 9 => "excellent",
        v if v >= 7 => "good",
        v if v >= 5 => "average",
        v if v >= 3 => "poor",
        _ => "terrible",
    }
}

/// Movie document in the `Movie` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub imdb_id: String,
    pub title: String,
    pub poster_path: String,
    pub youtube_id: String,
    #[serde(default)]
    pub genre: Vec<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
}

impl Movie {
    pub fn ranking_value(&self) -> Option<i32> {
        self.ranking.as_ref().map(|r| r.ranking_value)
    }
}
