use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};

use super::{MongoDB, ASHA_WORKERS};
use crate::models::AshaWorker;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait AshaWorkerRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Option<AshaWorker>>;
    async fn find_by_asha_id(&self, asha_id: &str) -> AppResult<Option<AshaWorker>>;
    async fn insert(&self, worker: &AshaWorker) -> AppResult<ObjectId>;
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
}

#[async_trait]
impl AshaWorkerRepository for MongoDB {
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Option<AshaWorker>> {
        Ok(self
            .collection::<AshaWorker>(ASHA_WORKERS)
            .find_one(doc! { "user_id": *user_id })
            .await?)
    }

    async fn find_by_asha_id(&self, asha_id: &str) -> AppResult<Option<AshaWorker>> {
        Ok(self
            .collection::<AshaWorker>(ASHA_WORKERS)
            .find_one(doc! { "asha_id": asha_id })
            .await?)
    }

    async fn insert(&self, worker: &AshaWorker) -> AppResult<ObjectId> {
        let result = self.collection::<AshaWorker>(ASHA_WORKERS).insert_one(worker).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("ashaworkers insert returned a non-ObjectId id".into()))
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self
            .collection::<AshaWorker>(ASHA_WORKERS)
            .delete_one(doc! { "_id": *id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
