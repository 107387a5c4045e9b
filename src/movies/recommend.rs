use tracing::{debug, warn};

use super::{repo::MovieQuery, repo_types::Movie};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    worker::run_bounded,
};

pub const RECOMMEND_MIN_RATING: i32 = 6;
pub const RECOMMEND_LIMIT: i64 = 10;

#[derive(Debug)]
pub enum Recommendation {
    /// The user exists but has not picked any genres.
    NoFavourites,
    Found { movies: Vec<Movie>, genres: Vec<String> },
}

/// Well-rated movies sharing at least one genre name with the user's favourites,
/// best first. Genre names must match exactly.
pub async fn recommend(state: &AppState, user_id: &str) -> ApiResult<Recommendation> {
    if user_id.trim().is_empty() {
        return Err(ApiError::bad_request("User ID required"));
    }

    let users = state.users.clone();
    let movies = state.movies.clone();
    let user_id = user_id.to_string();
    run_bounded(state.query_deadlines(), async move {
        let Some(user) = users.find_by_user_id(&user_id).await? else {
            warn!(%user_id, "recommendations for unknown user");
            return Err(ApiError::not_found("User not found"));
        };

        let genres = user.favourite_genre_names();
        if genres.is_empty() {
            debug!(%user_id, "no favourite genres");
            return Ok(Recommendation::NoFavourites);
        }

        let query = MovieQuery {
            genre_in: Some(genres.clone()),
            min_ranking: Some(RECOMMEND_MIN_RATING),
            sort_by_ranking_desc: true,
            limit: Some(RECOMMEND_LIMIT),
            ..MovieQuery::default()
        };
        let movies = movies.find(&query).await?;
        debug!(%user_id, found = movies.len(), "recommendations computed");
        Ok(Recommendation::Found { movies, genres })
    })
    .await
    .into_result()
}
