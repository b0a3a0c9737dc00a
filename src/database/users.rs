use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};

use super::{MongoDB, USERS};
use crate::models::User;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_google_id(&self, google_id: &str) -> AppResult<Option<User>>;
    async fn insert(&self, user: &User) -> AppResult<ObjectId>;
    /// Replaces the stored document with `user` (matched by `_id`).
    async fn replace(&self, user: &User) -> AppResult<()>;
}

#[async_trait]
impl UserRepository for MongoDB {
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.collection::<User>(USERS).find_one(doc! { "_id": *id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.collection::<User>(USERS).find_one(doc! { "email": email }).await?)
    }

    async fn find_by_google_id(&self, google_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "google_id": google_id })
            .await?)
    }

    async fn insert(&self, user: &User) -> AppResult<ObjectId> {
        let result = self.collection::<User>(USERS).insert_one(user).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("users insert returned a non-ObjectId id".into()))
    }

    async fn replace(&self, user: &User) -> AppResult<()> {
        let id = user
            .id
            .ok_or_else(|| AppError::Internal("cannot replace a user without _id".into()))?;
        let result = self
            .collection::<User>(USERS)
            .replace_one(doc! { "_id": id }, user)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }
}
