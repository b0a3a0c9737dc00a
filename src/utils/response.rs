use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn send_response<T: Serialize>(
    status: StatusCode,
    success: bool,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        success,
        message: message.into(),
        data,
    })
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    send_response(StatusCode::OK, true, message, Some(data))
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    send_response(StatusCode::CREATED, true, message, Some(data))
}

pub fn message(message: impl Into<String>) -> HttpResponse {
    send_response::<()>(StatusCode::OK, true, message, None)
}
