use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

use super::{MongoDB, CHATS, SECTIONS};
use crate::models::{Chat, Section};
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn insert_chat(&self, chat: &Chat) -> AppResult<ObjectId>;
    async fn find_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Chat>>;
    /// Most recently updated first.
    async fn list_chats(&self, owner: &ObjectId) -> AppResult<Vec<Chat>>;
    async fn replace_chat(&self, chat: &Chat) -> AppResult<()>;
    /// Removes the chat and all of its sections.
    async fn delete_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool>;
    async fn insert_section(&self, section: &Section) -> AppResult<ObjectId>;
    /// Insertion order.
    async fn list_sections(&self, chat_id: &ObjectId) -> AppResult<Vec<Section>>;
}

#[async_trait]
impl ChatRepository for MongoDB {
    async fn insert_chat(&self, chat: &Chat) -> AppResult<ObjectId> {
        let result = self.collection::<Chat>(CHATS).insert_one(chat).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("chats insert returned a non-ObjectId id".into()))
    }

    async fn find_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Chat>> {
        Ok(self
            .collection::<Chat>(CHATS)
            .find_one(doc! { "_id": *id, "user_id": *owner })
            .await?)
    }

    async fn list_chats(&self, owner: &ObjectId) -> AppResult<Vec<Chat>> {
        let cursor = self
            .collection::<Chat>(CHATS)
            .find(doc! { "user_id": *owner })
            .sort(doc! { "updated_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_chat(&self, chat: &Chat) -> AppResult<()> {
        let id = chat
            .id
            .ok_or_else(|| AppError::Internal("cannot replace a chat without _id".into()))?;
        self.collection::<Chat>(CHATS)
            .replace_one(doc! { "_id": id, "user_id": chat.user_id }, chat)
            .await?;
        Ok(())
    }

    async fn delete_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool> {
        let result = self
            .collection::<Chat>(CHATS)
            .delete_one(doc! { "_id": *id, "user_id": *owner })
            .await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        let sections = self
            .collection::<Section>(SECTIONS)
            .delete_many(doc! { "chat_id": *id })
            .await?;
        log::debug!("🧹 Removed {} sections of chat {}", sections.deleted_count, id);
        Ok(true)
    }

    async fn insert_section(&self, section: &Section) -> AppResult<ObjectId> {
        let result = self.collection::<Section>(SECTIONS).insert_one(section).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("sections insert returned a non-ObjectId id".into()))
    }

    async fn list_sections(&self, chat_id: &ObjectId) -> AppResult<Vec<Section>> {
        let cursor = self
            .collection::<Section>(SECTIONS)
            .find(doc! { "chat_id": *chat_id })
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
