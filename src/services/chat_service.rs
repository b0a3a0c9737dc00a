use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use crate::models::{
    AddMessageRequest, Chat, ChatResponse, CreateChatRequest, MessageRole, Section,
    SectionResponse,
};
use crate::services::auth_service::Claims;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

const TITLE_MAX_CHARS: usize = 50;

/// Title derived from the opening user message.
pub fn title_from(content: &str) -> String {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.chars().count() <= TITLE_MAX_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

async fn load_chat(state: &AppState, claims: &Claims, id: &str) -> AppResult<Chat> {
    let id = ObjectId::parse_str(id)?;
    state
        .chats
        .find_chat(&id, &claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))
}

pub async fn create_chat(
    state: &AppState,
    claims: &Claims,
    request: &CreateChatRequest,
) -> AppResult<ChatResponse> {
    let now = BsonDateTime::now();
    let mut chat = Chat {
        id: None,
        user_id: claims.user_id()?,
        title: request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
        created_at: now,
        updated_at: now,
    };
    chat.id = Some(state.chats.insert_chat(&chat).await?);
    Ok(ChatResponse::from(chat))
}

pub async fn list_chats(state: &AppState, claims: &Claims) -> AppResult<Vec<ChatResponse>> {
    let chats = state.chats.list_chats(&claims.user_id()?).await?;
    Ok(chats.into_iter().map(ChatResponse::from).collect())
}

pub async fn get_messages(
    state: &AppState,
    claims: &Claims,
    chat_id: &str,
) -> AppResult<Vec<SectionResponse>> {
    let chat = load_chat(state, claims, chat_id).await?;
    let chat_id = chat
        .id
        .ok_or_else(|| AppError::Internal("stored chat has no _id".into()))?;
    let sections = state.chats.list_sections(&chat_id).await?;
    Ok(sections.into_iter().map(SectionResponse::from).collect())
}

pub async fn add_message(
    state: &AppState,
    claims: &Claims,
    chat_id: &str,
    request: &AddMessageRequest,
) -> AppResult<SectionResponse> {
    if request.content.trim().is_empty() {
        return Err(AppError::bad_request("Message content is required"));
    }

    let mut chat = load_chat(state, claims, chat_id).await?;
    let chat_id = chat
        .id
        .ok_or_else(|| AppError::Internal("stored chat has no _id".into()))?;

    let mut section = Section {
        id: None,
        chat_id,
        role: request.role,
        content: request.content.clone(),
        created_at: BsonDateTime::now(),
    };
    section.id = Some(state.chats.insert_section(&section).await?);

    if chat.title.is_none() && request.role == MessageRole::User {
        chat.title = Some(title_from(&request.content));
    }
    chat.updated_at = section.created_at;
    state.chats.replace_chat(&chat).await?;

    Ok(SectionResponse::from(section))
}

pub async fn delete_chat(state: &AppState, claims: &Claims, chat_id: &str) -> AppResult<()> {
    let id = ObjectId::parse_str(chat_id)?;
    if !state.chats.delete_chat(&id, &claims.user_id()?).await? {
        return Err(AppError::not_found("Chat not found"));
    }
    log::info!("🗑️ Chat {} deleted", chat_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::testing::verified_user;
    use crate::state::testing::TestContext;
    use std::time::Duration;

    fn message(role: MessageRole, content: &str) -> AddMessageRequest {
        AddMessageRequest {
            role,
            content: content.into(),
        }
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = title_from(&"fever ".repeat(20));
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 3);
        assert_eq!(title_from("  \nHeadache since morning\nand nausea"), "Headache since morning");
    }

    #[tokio::test]
    async fn first_user_message_titles_the_chat() {
        let ctx = TestContext::new();
        let claims = verified_user(&ctx, "a@x.in").await;
        let chat = create_chat(&ctx.state, &claims, &CreateChatRequest::default()).await.unwrap();
        assert!(chat.title.is_none());

        add_message(&ctx.state, &claims, &chat.id, &message(MessageRole::Assistant, "Hello!"))
            .await
            .unwrap();
        add_message(&ctx.state, &claims, &chat.id, &message(MessageRole::User, "Child has a fever"))
            .await
            .unwrap();
        add_message(&ctx.state, &claims, &chat.id, &message(MessageRole::User, "Also a cough"))
            .await
            .unwrap();

        let chats = list_chats(&ctx.state, &claims).await.unwrap();
        assert_eq!(chats[0].title.as_deref(), Some("Child has a fever"));

        let messages = get_messages(&ctx.state, &claims, &chat.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello!", "Child has a fever", "Also a cough"]);
    }

    #[tokio::test]
    async fn recently_active_chats_come_first() {
        let ctx = TestContext::new();
        let claims = verified_user(&ctx, "a@x.in").await;
        let older = create_chat(&ctx.state, &claims, &CreateChatRequest::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = create_chat(&ctx.state, &claims, &CreateChatRequest::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        add_message(&ctx.state, &claims, &older.id, &message(MessageRole::User, "ping"))
            .await
            .unwrap();

        let chats = list_chats(&ctx.state, &claims).await.unwrap();
        assert_eq!(chats[0].id, older.id);
        assert_eq!(chats[1].id, newer.id);
    }

    #[tokio::test]
    async fn chats_are_private_to_their_owner() {
        let ctx = TestContext::new();
        let owner = verified_user(&ctx, "a@x.in").await;
        let other = verified_user(&ctx, "b@x.in").await;
        let chat = create_chat(&ctx.state, &owner, &CreateChatRequest::default()).await.unwrap();

        let read = get_messages(&ctx.state, &other, &chat.id).await;
        assert!(matches!(read, Err(AppError::NotFound(_))));
        let write = add_message(&ctx.state, &other, &chat.id, &message(MessageRole::User, "hi")).await;
        assert!(matches!(write, Err(AppError::NotFound(_))));
        assert!(list_chats(&ctx.state, &other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_chat_removes_its_messages() {
        let ctx = TestContext::new();
        let claims = verified_user(&ctx, "a@x.in").await;
        let chat = create_chat(&ctx.state, &claims, &CreateChatRequest { title: Some("Visit".into()) })
            .await
            .unwrap();
        add_message(&ctx.state, &claims, &chat.id, &message(MessageRole::User, "hi"))
            .await
            .unwrap();
        assert_eq!(ctx.store.section_count(), 1);

        delete_chat(&ctx.state, &claims, &chat.id).await.unwrap();
        assert_eq!(ctx.store.section_count(), 0);

        let again = delete_chat(&ctx.state, &claims, &chat.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let ctx = TestContext::new();
        let claims = verified_user(&ctx, "a@x.in").await;
        let chat = create_chat(&ctx.state, &claims, &CreateChatRequest::default()).await.unwrap();
        let result = add_message(&ctx.state, &claims, &chat.id, &message(MessageRole::User, "   ")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
