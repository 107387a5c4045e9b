use serde::{Deserialize, Serialize};
use validator::Validate;

use super::repo_types::{validate_movie_genres, Genre, Movie, Ranking};

/// Movie as returned to clients; `_id` is rendered as its hex string.
#[derive(Debug, Clone, Serialize)]
pub struct MovieResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub imdb_id: String,
    pub title: String,
    pub poster_path: String,
    pub youtube_id: String,
    pub genre: Vec<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
}

impl From<Movie> for MovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id.map(|oid| oid.to_hex()),
            imdb_id: m.imdb_id,
            title: m.title,
            poster_path: m.poster_path,
            youtube_id: m.youtube_id,
            genre: m.genre,
            admin_review: m.admin_review,
            ranking: m.ranking,
        }
    }
}

pub fn to_responses(movies: Vec<Movie>) -> Vec<MovieResponse> {
    movies.into_iter().map(MovieResponse::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct RankingInput {
    pub ranking_value: i32,
}

/// Request body for `POST /movies`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMovieRequest {
    #[validate(length(min = 1, message = "imdb_id is required"))]
    pub imdb_id: String,
    #[validate(length(min = 2, max = 500))]
    pub title: String,
    #[validate(url(message = "poster_path must be a valid URL"))]
    pub poster_path: String,
    #[validate(length(min = 1, message = "youtube_id is required"))]
    pub youtube_id: String,
    #[serde(default)]
    #[validate(custom = "validate_movie_genres")]
    pub genre: Vec<Genre>,
    #[serde(default)]
    pub admin_review: Option<String>,
    /// Only the value is taken; the name is derived from it.
    #[serde(default)]
    pub ranking: Option<RankingInput>,
}

/// Request body for `PUT /movies/:imdb_id/review`.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "admin_review is required"))]
    pub admin_review: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 10, message = "rating must be between 1 and 10"))]
    pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TopRatedResponse {
    pub top_rated_movies: Vec<MovieResponse>,
    pub total_found: usize,
    pub minimum_rating: i32,
}

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub movies: Vec<MovieResponse>,
    pub genre: String,
    pub total_found: usize,
}

#[derive(Debug, Serialize)]
pub struct ReviewUpdatedResponse {
    pub message: &'static str,
    pub admin_review: String,
    pub rating: i32,
    pub ranking_name: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendedResponse {
    pub recommended_movies: Vec<MovieResponse>,
    pub based_on_genres: Vec<String>,
    pub total_found: usize,
}

/// Returned when the user has no favourite genres yet.
#[derive(Debug, Serialize)]
pub struct NoFavouritesResponse {
    pub message: &'static str,
    pub movies: Vec<MovieResponse>,
    pub user_genres: Vec<String>,
}
