use actix_web::{web, HttpResponse};

use crate::middleware::auth::Claims;
use crate::models::{AddMessageRequest, ChatResponse, CreateChatRequest, SectionResponse};
use crate::services::chat_service;
use crate::state::AppState;
use crate::utils::{response, AppError};

#[utoipa::path(
    post,
    path = "/chats",
    tag = "Chats",
    request_body = CreateChatRequest,
    responses((status = 201, description = "Chat created", body = ChatResponse)),
    security(("bearer_auth" = []))
)]
pub async fn create_chat(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    request: Option<web::Json<CreateChatRequest>>,
) -> Result<HttpResponse, AppError> {
    let request = request.map(|r| r.into_inner()).unwrap_or_default();
    let chat = chat_service::create_chat(&state, &user, &request).await?;
    Ok(response::created("Chat created", chat))
}

#[utoipa::path(
    get,
    path = "/chats",
    tag = "Chats",
    responses((status = 200, description = "Caller's chats, most recently active first", body = [ChatResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_chats(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let chats = chat_service::list_chats(&state, &user).await?;
    Ok(response::ok("Chats fetched", chats))
}

#[utoipa::path(
    get,
    path = "/chats/{id}/messages",
    tag = "Chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Messages in order", body = [SectionResponse]),
        (status = 404, description = "No such chat for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_messages(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let messages = chat_service::get_messages(&state, &user, &path).await?;
    Ok(response::ok("Messages fetched", messages))
}

#[utoipa::path(
    post,
    path = "/chats/{id}/messages",
    tag = "Chats",
    params(("id" = String, Path, description = "Chat id")),
    request_body = AddMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = SectionResponse),
        (status = 404, description = "No such chat for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_message(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<AddMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let section = chat_service::add_message(&state, &user, &path, &request).await?;
    Ok(response::created("Message added", section))
}

#[utoipa::path(
    delete,
    path = "/chats/{id}",
    tag = "Chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Chat and its messages deleted"),
        (status = 404, description = "No such chat for this caller")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_chat(
    state: web::Data<AppState>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    chat_service::delete_chat(&state, &user, &path).await?;
    Ok(response::message("Chat deleted"))
}
