use async_trait::async_trait;
use bson::{doc, DateTime, Document};
use mongodb::{options::IndexOptions, Collection, Database, IndexModel};

use crate::auth::repo_types::User;
use crate::error::StoreError;

pub const USER_COLLECTION: &str = "User";

/// Access to the `User` collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count_by_email(&self, email: &str) -> Result<u64, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the email or user id is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, StoreError>;
    /// Overwrites the stored token pair. Returns whether a user matched.
    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime,
    ) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoUsers {
    coll: Collection<User>,
}

impl MongoUsers {
    pub fn new(db: &Database) -> Self {
        Self {
            coll: db.collection::<User>(USER_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for key in ["email", "user_id"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.coll.create_index(index, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUsers {
    async fn count_by_email(&self, email: &str) -> Result<u64, StoreError> {
        Ok(self
            .coll
            .count_documents(doc! { "email": email }, None)
            .await?)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        self.coll.insert_one(user, None).await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.coll.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.coll.find_one(doc! { "user_id": user_id }, None).await?)
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime,
    ) -> Result<bool, StoreError> {
        let res = self
            .coll
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": {
                    "token": token,
                    "refresh_token": refresh_token,
                    "updated_at": updated_at,
                } },
                None,
            )
            .await?;
        Ok(res.matched_count > 0)
    }
}
