use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Conversation thread (`chats` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub title: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// One message of a thread (`sections` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub chat_id: ObjectId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct AddMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub id: String,
    pub title: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Chat> for ChatResponse {
    fn from(c: Chat) -> Self {
        ChatResponse {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: c.title,
            created_at: c.created_at.timestamp_millis(),
            updated_at: c.updated_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SectionResponse {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

impl From<Section> for SectionResponse {
    fn from(s: Section) -> Self {
        SectionResponse {
            id: s.id.map(|id| id.to_hex()).unwrap_or_default(),
            role: s.role,
            content: s.content,
            created_at: s.created_at.timestamp_millis(),
        }
    }
}
