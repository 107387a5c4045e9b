use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};

use super::repo_types::{Movie, Ranking};
use crate::error::StoreError;

pub const MOVIE_COLLECTION: &str = "Movie";

/// Filter, sort and limit for a multi-document movie read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieQuery {
    pub imdb_id: Option<String>,
    /// Case-insensitive substring of any embedded genre name.
    pub genre_contains: Option<String>,
    /// Any embedded genre name equal to one of these.
    pub genre_in: Option<Vec<String>>,
    pub min_ranking: Option<i32>,
    pub sort_by_ranking_desc: bool,
    pub limit: Option<i64>,
}

impl MovieQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_imdb_id(imdb_id: impl Into<String>) -> Self {
        Self {
            imdb_id: Some(imdb_id.into()),
            ..Self::default()
        }
    }

    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(id) = &self.imdb_id {
            filter.insert("imdb_id", id.as_str());
        }
        if let Some(fragment) = &self.genre_contains {
            filter.insert(
                "genre.genre_name",
                doc! { "$regex": regex::escape(fragment), "$options": "i" },
            );
        }
        if let Some(names) = &self.genre_in {
            filter.insert("genre.genre_name", doc! { "$in": names.clone() });
        }
        if let Some(min) = self.min_ranking {
            filter.insert("ranking.ranking_value", doc! { "$gte": min });
        }
        filter
    }

    pub fn options(&self) -> FindOptions {
        let mut opts = FindOptions::default();
        if self.sort_by_ranking_desc {
            opts.sort = Some(doc! { "ranking.ranking_value": -1 });
        }
        opts.limit = self.limit;
        opts
    }

    /// Same predicate as [`MovieQuery::filter`], evaluated in process.
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(id) = &self.imdb_id {
            if &movie.imdb_id != id {
                return false;
            }
        }
        if let Some(fragment) = &self.genre_contains {
            let needle = fragment.to_lowercase();
            if !movie
                .genre
                .iter()
                .any(|g| g.genre_name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        if let Some(names) = &self.genre_in {
            if !movie.genre.iter().any(|g| names.contains(&g.genre_name)) {
                return false;
            }
        }
        if let Some(min) = self.min_ranking {
            if !movie.ranking_value().is_some_and(|v| v >= min) {
                return false;
            }
        }
        true
    }
}

/// Access to the `Movie` collection.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn find(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the imdb id is taken.
    async fn insert(&self, movie: &Movie) -> Result<(), StoreError>;
    /// Sets the review and ranking of the movie with `imdb_id`. Returns whether one matched.
    async fn update_review(
        &self,
        imdb_id: &str,
        admin_review: &str,
        ranking: &Ranking,
    ) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoMovies {
    coll: Collection<Movie>,
}

impl MongoMovies {
    pub fn new(db: &Database) -> Self {
        Self {
            coll: db.collection::<Movie>(MOVIE_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "imdb_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.coll.create_index(index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl MovieStore for MongoMovies {
    async fn find(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError> {
        let cursor = self.coll.find(query.filter(), query.options()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, movie: &Movie) -> Result<(), StoreError> {
        self.coll.insert_one(movie, None).await?;
        Ok(())
    }

    async fn update_review(
        &self,
        imdb_id: &str,
        admin_review: &str,
        ranking: &Ranking,
    ) -> Result<bool, StoreError> {
        let res = self
            .coll
            .update_one(
                doc! { "imdb_id": imdb_id },
                doc! { "$set": {
                    "admin_review": admin_review,
                    "ranking": {
                        "ranking_value": ranking.ranking_value,
                        "ranking_name": ranking.ranking_name.as_str(),
                    },
                } },
                None,
            )
            .await?;
        Ok(res.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movies::repo_types::Genre;

    fn movie(genres: &[&str], rating: Option<i32>) -> Movie {
        Movie {
            id: None,
            imdb_id: "tt0000001".into(),
            title: "Some Film".into(),
            poster_path: "https://img.example/p.jpg".into(),
            youtube_id: "yt".into(),
            genre: genres
                .iter()
                .enumerate()
                .map(|(i, g)| Genre { genre_id: i as i32, genre_name: g.to_string() })
                .collect(),
            admin_review: None,
            ranking: rating.map(Ranking::from_value),
        }
    }

    #[test]
    fn genre_fragment_is_escaped_and_case_insensitive() {
        let q = MovieQuery { genre_contains: Some("sci.fi".into()), ..MovieQuery::default() };
        let filter = q.filter();
        let cond = filter.get_document("genre.genre_name").unwrap();
        assert_eq!(cond.get_str("$regex").unwrap(), r"sci\.fi");
        assert_eq!(cond.get_str("$options").unwrap(), "i");

        assert!(q.matches(&movie(&["Sci.Fi"], None)));
        assert!(!q.matches(&movie(&["SciXFi"], None)));
    }

    #[test]
    fn substring_match_ignores_case() {
        let q = MovieQuery { genre_contains: Some("action".into()), ..MovieQuery::default() };
        assert!(q.matches(&movie(&["Action"], None)));
        assert!(q.matches(&movie(&["Drama", "Action-Comedy"], None)));
        assert!(!q.matches(&movie(&["Drama"], None)));
    }

    #[test]
    fn genre_in_is_exact() {
        let q = MovieQuery { genre_in: Some(vec!["Drama".into()]), ..MovieQuery::default() };
        assert!(q.matches(&movie(&["Drama"], None)));
        assert!(!q.matches(&movie(&["drama"], None)));
    }

    #[test]
    fn min_ranking_excludes_unranked() {
        let q = MovieQuery { min_ranking: Some(7), ..MovieQuery::default() };
        assert!(q.matches(&movie(&[], Some(7))));
        assert!(!q.matches(&movie(&[], Some(6))));
        assert!(!q.matches(&movie(&[], None)));
        assert_eq!(
            q.filter(),
            doc! { "ranking.ranking_value": { "$gte": 7 } }
        );
    }

    #[test]
    fn options_carry_sort_and_limit() {
        let q = MovieQuery { sort_by_ranking_desc: true, limit: Some(20), ..MovieQuery::default() };
        let opts = q.options();
        assert_eq!(opts.sort, Some(doc! { "ranking.ranking_value": -1 }));
        assert_eq!(opts.limit, Some(20));
        assert!(MovieQuery::all().filter().is_empty());
    }
}
