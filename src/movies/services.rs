use tracing::{info, warn};
use validator::Validate;

use super::{
    dto::{CreateMovieRequest, ReviewRequest},
    repo::MovieQuery,
    repo_types::{Movie, Ranking},
};
use crate::{
    error::{ApiError, ApiResult, StoreError},
    state::AppState,
    worker::{run_bounded, Deadlines},
};

pub const TOP_RATED_MIN_RATING: i32 = 7;
pub const TOP_RATED_LIMIT: i64 = 20;
pub const GENRE_LIMIT: i64 = 20;

/// Runs a movie read through the bounded worker.
pub(crate) async fn fetch(
    state: &AppState,
    deadlines: Deadlines,
    query: MovieQuery,
) -> ApiResult<Vec<Movie>> {
    let movies = state.movies.clone();
    run_bounded(deadlines, async move { Ok(movies.find(&query).await?) })
        .await
        .into_result()
}

/// Whole catalog, unpaginated.
pub async fn list_all(state: &AppState) -> ApiResult<Vec<Movie>> {
    fetch(state, state.write_deadlines(), MovieQuery::all()).await
}

pub async fn list_top_rated(state: &AppState) -> ApiResult<Vec<Movie>> {
    let query = MovieQuery {
        min_ranking: Some(TOP_RATED_MIN_RATING),
        sort_by_ranking_desc: true,
        limit: Some(TOP_RATED_LIMIT),
        ..MovieQuery::default()
    };
    fetch(state, state.query_deadlines(), query).await
}

/// Case-insensitive substring match on genre names. `genre` is taken literally.
pub async fn list_by_genre(state: &AppState, genre: &str) -> ApiResult<Vec<Movie>> {
    if genre.trim().is_empty() {
        return Err(ApiError::bad_request("Genre parameter required"));
    }
    let query = MovieQuery {
        genre_contains: Some(genre.to_string()),
        limit: Some(GENRE_LIMIT),
        ..MovieQuery::default()
    };
    fetch(state, state.query_deadlines(), query).await
}

/// All movies carrying `imdb_id`; zero or one in practice.
pub async fn get_by_imdb_id(state: &AppState, imdb_id: &str) -> ApiResult<Vec<Movie>> {
    fetch(state, state.write_deadlines(), MovieQuery::by_imdb_id(imdb_id)).await
}

fn check_rating(rating: i32) -> ApiResult<()> {
    if !(1..=10).contains(&rating) {
        return Err(ApiError::Validation(format!(
            "ranking_value: must be between 1 and 10, got {rating}"
        )));
    }
    Ok(())
}

pub async fn create(state: &AppState, mut req: CreateMovieRequest) -> ApiResult<Movie> {
    // Whitespace-only ids must fail the required checks.
    req.imdb_id = req.imdb_id.trim().to_string();
    req.youtube_id = req.youtube_id.trim().to_string();
    req.validate()?;
    let ranking = match req.ranking {
        Some(r) => {
            check_rating(r.ranking_value)?;
            Some(Ranking::from_value(r.ranking_value))
        }
        None => None,
    };
    let movie = Movie {
        id: None,
        imdb_id: req.imdb_id,
        title: req.title,
        poster_path: req.poster_path,
        youtube_id: req.youtube_id,
        genre: req.genre,
        admin_review: req.admin_review.filter(|r| !r.trim().is_empty()),
        ranking,
    };

    let movies = state.movies.clone();
    run_bounded(state.write_deadlines(), async move {
        match movies.insert(&movie).await {
            Ok(()) => {
                info!(imdb_id = %movie.imdb_id, title = %movie.title, "movie created");
                Ok(movie)
            }
            Err(StoreError::Duplicate) => {
                warn!(imdb_id = %movie.imdb_id, "duplicate imdb_id");
                Err(ApiError::Validation(format!(
                    "imdb_id: a movie with imdb_id {} already exists",
                    movie.imdb_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await
    .into_result()
}

/// Sets the admin review and rating of a movie and returns the derived ranking.
pub async fn update_admin_review(
    state: &AppState,
    imdb_id: &str,
    req: ReviewRequest,
) -> ApiResult<Ranking> {
    if imdb_id.trim().is_empty() {
        return Err(ApiError::bad_request("Movie ID required"));
    }
    req.validate()?;
    let ranking = Ranking::from_value(req.rating);

    let movies = state.movies.clone();
    let imdb_id = imdb_id.to_string();
    run_bounded(state.query_deadlines(), async move {
        let matched = movies
            .update_review(&imdb_id, &req.admin_review, &ranking)
            .await?;
        if !matched {
            return Err(ApiError::not_found("Movie not found"));
        }
        info!(%imdb_id, rating = ranking.ranking_value, "admin review updated");
        Ok(ranking)
    })
    .await
    .into_result()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fakes::{movie, MemoryMovies, MemoryUsers, StalledMovies};
    use crate::movies::{dto::RankingInput, repo_types::Genre};

    fn state_with(movies: Arc<MemoryMovies>) -> AppState {
        AppState::fake_with(Arc::new(MemoryUsers::default()), movies)
    }

    fn create_req(imdb_id: &str) -> CreateMovieRequest {
        CreateMovieRequest {
            imdb_id: imdb_id.into(),
            title: "Spirited Away".into(),
            poster_path: "https://img.example/spirited.jpg".into(),
            youtube_id: "ByXuk9QqQkk".into(),
            genre: vec![
                Genre { genre_id: 16, genre_name: "Animation".into() },
                Genre { genre_id: 14, genre_name: "Fantasy".into() },
            ],
            admin_review: Some("A classic".into()),
            ranking: Some(RankingInput { ranking_value: 9 }),
        }
    }

    #[tokio::test]
    async fn top_rated_is_bounded_and_sorted() {
        let movies = Arc::new(MemoryMovies::default());
        for i in 0..30 {
            movies.seed(movie(&format!("tt{i:07}"), &["Drama"], Some(i % 11)));
        }
        movies.seed(movie("tt-unranked", &["Drama"], None));
        let state = state_with(movies);

        let top = list_top_rated(&state).await.unwrap();
        assert!(!top.is_empty());
        assert!(top.len() as i64 <= TOP_RATED_LIMIT);
        let values: Vec<i32> = top.iter().map(|m| m.ranking_value().unwrap()).collect();
        assert!(values.iter().all(|v| *v >= TOP_RATED_MIN_RATING));
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn genre_search_is_case_insensitive_and_capped() {
        let movies = Arc::new(MemoryMovies::default());
        movies.seed(movie("tt1", &["Action"], Some(8)));
        movies.seed(movie("tt2", &["Comedy"], Some(8)));
        for i in 0..25 {
            movies.seed(movie(&format!("tt-a{i}"), &["Drama", "ACTION"], None));
        }
        let state = state_with(movies);

        let found = list_by_genre(&state, "action").await.unwrap();
        assert_eq!(found.len() as i64, GENRE_LIMIT);
        assert_eq!(found[0].imdb_id, "tt1");
        assert!(found.iter().all(|m| m.imdb_id != "tt2"));
    }

    #[tokio::test]
    async fn blank_genre_is_rejected() {
        let state = AppState::fake();
        let err = list_by_genre(&state, "  ").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn created_movie_reads_back_identically() {
        let movies = Arc::new(MemoryMovies::default());
        let state = state_with(movies);

        let created = create(&state, create_req("tt0245429")).await.unwrap();
        let found = get_by_imdb_id(&state, "tt0245429").await.unwrap();
        assert_eq!(found.len(), 1);

        let mut stored = found[0].clone();
        assert!(stored.id.is_some());
        stored.id = None;
        assert_eq!(stored, created);
        assert_eq!(stored.ranking.unwrap().ranking_name, "excellent");
    }

    #[tokio::test]
    async fn unknown_imdb_id_yields_empty_list() {
        let state = AppState::fake();
        assert!(get_by_imdb_id(&state, "tt404").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_payloads() {
        let state = AppState::fake();

        let mut req = create_req("tt1");
        req.poster_path = "poster.jpg".into();
        assert!(matches!(create(&state, req).await, Err(ApiError::Validation(_))));

        let mut req = create_req("tt1");
        req.ranking = Some(RankingInput { ranking_value: 11 });
        assert!(matches!(create(&state, req).await, Err(ApiError::Validation(_))));

        let err = create(&state, create_req("   ")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref d) if d.contains("imdb_id")));

        let mut req = create_req("tt1");
        req.youtube_id = "  ".into();
        let err = create(&state, req).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref d) if d.contains("youtube_id")));
        assert!(list_all(&state).await.unwrap().is_empty());

        create(&state, create_req(" tt1 ")).await.unwrap();
        let err = create(&state, create_req("tt1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref d) if d.contains("already exists")));
    }

    #[tokio::test]
    async fn review_derives_ranking_name() {
        let movies = Arc::new(MemoryMovies::default());
        movies.seed(movie("tt1", &["Drama"], None));
        let state = state_with(movies);

        for (rating, name) in [(9, "excellent"), (7, "good"), (5, "average"), (3, "poor"), (1, "terrible")] {
            let req = ReviewRequest { admin_review: "Seen it".into(), rating };
            let ranking = update_admin_review(&state, "tt1", req).await.unwrap();
            assert_eq!(ranking.ranking_name, name);
            assert_eq!(ranking.ranking_value, rating);
        }

        let stored = get_by_imdb_id(&state, "tt1").await.unwrap();
        assert_eq!(stored[0].admin_review.as_deref(), Some("Seen it"));
        assert_eq!(stored[0].ranking, Some(Ranking::from_value(1)));
    }

    #[tokio::test]
    async fn review_rejects_out_of_range_ratings() {
        let movies = Arc::new(MemoryMovies::default());
        movies.seed(movie("tt1", &["Drama"], Some(4)));
        let state = state_with(movies);

        for rating in [0, 11] {
            let req = ReviewRequest { admin_review: "Nope".into(), rating };
            let err = update_admin_review(&state, "tt1", req).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "rating {rating}");
        }
        let stored = get_by_imdb_id(&state, "tt1").await.unwrap();
        assert_eq!(stored[0].ranking_value(), Some(4));
    }

    #[tokio::test]
    async fn review_of_missing_movie_is_not_found() {
        let state = AppState::fake();
        let req = ReviewRequest { admin_review: "Where?".into(), rating: 5 };
        let err = update_admin_review(&state, "tt404", req).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let state = AppState::fake_with(Arc::new(MemoryUsers::default()), Arc::new(StalledMovies));
        let err = list_all(&state).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }
}
