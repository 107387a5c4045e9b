//! In-memory stand-ins for the MongoDB collections.

use std::sync::Mutex;

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{Role, User},
    },
    error::StoreError,
    movies::{
        repo::{MovieQuery, MovieStore},
        repo_types::{Genre, Movie, Ranking},
    },
};

/// A valid movie tagged with `genres`, optionally ranked.
pub fn movie(imdb_id: &str, genres: &[&str], rating: Option<i32>) -> Movie {
    Movie {
        id: None,
        imdb_id: imdb_id.into(),
        title: format!("Film {imdb_id}"),
        poster_path: format!("https://img.example/{imdb_id}.jpg"),
        youtube_id: format!("yt-{imdb_id}"),
        genre: genres
            .iter()
            .enumerate()
            .map(|(i, g)| Genre { genre_id: i as i32 + 1, genre_name: g.to_string() })
            .collect(),
        admin_review: None,
        ranking: rating.map(Ranking::from_value),
    }
}

/// A user with the given favourite genres. The password field is not a real hash.
pub fn user(user_id: &str, genres: &[&str]) -> User {
    User {
        id: None,
        user_id: user_id.into(),
        email: format!("{user_id}@example.com"),
        password: "unused".into(),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        role: Role::User,
        favourite_genres: genres
            .iter()
            .enumerate()
            .map(|(i, g)| Genre { genre_id: i as i32 + 1, genre_name: g.to_string() })
            .collect(),
        token: None,
        refresh_token: None,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

impl MemoryUsers {
    pub fn snapshot(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn seed(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn count_by_email(&self, email: &str) -> Result<u64, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| u.email == email).count() as u64)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == user.email || u.user_id == user.user_id)
        {
            return Err(StoreError::Duplicate);
        }
        let mut stored = user.clone();
        stored.id.get_or_insert_with(ObjectId::new);
        users.push(stored);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.user_id == user_id) {
            Some(u) => {
                u.token = Some(token.to_string());
                u.refresh_token = Some(refresh_token.to_string());
                u.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Sees no existing email on count, then loses the insert to a concurrent writer.
pub struct RacedUsers;

#[async_trait]
impl UserStore for RacedUsers {
    async fn count_by_email(&self, _email: &str) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn insert(&self, _user: &User) -> Result<(), StoreError> {
        Err(StoreError::Duplicate)
    }

    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    async fn find_by_user_id(&self, _user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    async fn update_tokens(
        &self,
        _user_id: &str,
        _token: &str,
        _refresh_token: &str,
        _updated_at: DateTime,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// Keeps insertion order, which stands in for natural store order.
#[derive(Default)]
pub struct MemoryMovies {
    movies: Mutex<Vec<Movie>>,
}

impl MemoryMovies {
    pub fn seed(&self, movie: Movie) {
        let mut stored = movie;
        stored.id.get_or_insert_with(ObjectId::new);
        self.movies.lock().unwrap().push(stored);
    }
}

#[async_trait]
impl MovieStore for MemoryMovies {
    async fn find(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError> {
        let movies = self.movies.lock().unwrap();
        let mut found: Vec<Movie> = movies.iter().filter(|m| query.matches(m)).cloned().collect();
        if query.sort_by_ranking_desc {
            // Stable: equal rankings keep store order.
            found.sort_by(|a, b| b.ranking_value().cmp(&a.ranking_value()));
        }
        if let Some(limit) = query.limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn insert(&self, movie: &Movie) -> Result<(), StoreError> {
        let mut movies = self.movies.lock().unwrap();
        if movies.iter().any(|m| m.imdb_id == movie.imdb_id) {
            return Err(StoreError::Duplicate);
        }
        let mut stored = movie.clone();
        stored.id.get_or_insert_with(ObjectId::new);
        movies.push(stored);
        Ok(())
    }

    async fn update_review(
        &self,
        imdb_id: &str,
        admin_review: &str,
        ranking: &Ranking,
    ) -> Result<bool, StoreError> {
        let mut movies = self.movies.lock().unwrap();
        match movies.iter_mut().find(|m| m.imdb_id == imdb_id) {
            Some(m) => {
                m.admin_review = Some(admin_review.to_string());
                m.ranking = Some(ranking.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A movie store whose calls never complete.
pub struct StalledMovies;

#[async_trait]
impl MovieStore for StalledMovies {
    async fn find(&self, _query: &MovieQuery) -> Result<Vec<Movie>, StoreError> {
        std::future::pending().await
    }

    async fn insert(&self, _movie: &Movie) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn update_review(
        &self,
        _imdb_id: &str,
        _admin_review: &str,
        _ranking: &Ranking,
    ) -> Result<bool, StoreError> {
        std::future::pending().await
    }
}
