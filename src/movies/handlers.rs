use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        to_responses, CreateMovieRequest, GenreResponse, MessageResponse, MovieResponse,
        NoFavouritesResponse, RecommendedResponse, ReviewRequest, ReviewUpdatedResponse,
        TopRatedResponse,
    },
    recommend::{recommend, Recommendation},
    services::{self, TOP_RATED_MIN_RATING},
};
use crate::{
    auth::jwt::AuthUser,
    error::{json_body, ApiResult},
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/top-rated", get(top_rated))
        .route("/movies/genre/:genre", get(by_genre))
        .route("/movie/:imdb_id", get(by_imdb_id))
        .route("/movies/recommended/:user_id", get(recommended))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", post(create_movie))
        .route("/movies/:imdb_id/review", put(update_review))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_movies(State(state): State<AppState>) -> ApiResult<Json<Vec<MovieResponse>>> {
    let movies = services::list_all(&state).await?;
    Ok(Json(to_responses(movies)))
}

#[instrument(skip(state))]
pub async fn top_rated(State(state): State<AppState>) -> ApiResult<Json<TopRatedResponse>> {
    let movies = to_responses(services::list_top_rated(&state).await?);
    Ok(Json(TopRatedResponse {
        total_found: movies.len(),
        top_rated_movies: movies,
        minimum_rating: TOP_RATED_MIN_RATING,
    }))
}

#[instrument(skip(state))]
pub async fn by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> ApiResult<Json<GenreResponse>> {
    let movies = to_responses(services::list_by_genre(&state, &genre).await?);
    Ok(Json(GenreResponse {
        total_found: movies.len(),
        movies,
        genre,
    }))
}

/// Always a list, empty when nothing carries the id.
#[instrument(skip(state))]
pub async fn by_imdb_id(
    State(state): State<AppState>,
    Path(imdb_id): Path<String>,
) -> ApiResult<Json<Vec<MovieResponse>>> {
    let movies = services::get_by_imdb_id(&state, &imdb_id).await?;
    Ok(Json(to_responses(movies)))
}

#[instrument(skip(state))]
pub async fn recommended(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Response> {
    let res = match recommend(&state, &user_id).await? {
        Recommendation::NoFavourites => Json(NoFavouritesResponse {
            message: "No favorite genres set for user",
            movies: Vec::new(),
            user_genres: Vec::new(),
        })
        .into_response(),
        Recommendation::Found { movies, genres } => {
            let movies = to_responses(movies);
            Json(RecommendedResponse {
                total_found: movies.len(),
                recommended_movies: movies,
                based_on_genres: genres,
            })
            .into_response()
        }
    };
    Ok(res)
}

#[instrument(skip(state, caller, payload), fields(caller = %caller.sub))]
pub async fn create_movie(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let req = json_body(payload, "Invalid JSON")?;
    services::create(&state, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse { message: "Movie created successfully" }),
    ))
}

#[instrument(skip(state, caller, payload), fields(caller = %caller.sub))]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(imdb_id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewUpdatedResponse>> {
    let req = json_body(payload, "Invalid request data")?;
    let admin_review = req.admin_review.clone();
    let ranking = services::update_admin_review(&state, &imdb_id, req).await?;
    info!(%imdb_id, reviewer = %caller.email, "review saved");
    Ok(Json(ReviewUpdatedResponse {
        message: "Review updated successfully",
        admin_review,
        rating: ranking.ranking_value,
        ranking_name: ranking.ranking_name,
    }))
}
