use async_trait::async_trait;
use serde::Deserialize;

use crate::utils::{AppError, AppResult};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    // tokeninfo returns booleans as strings
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Checks ID tokens against Google's tokeninfo endpoint.
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: Option<String>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
        }
    }
}

fn identity_from(info: TokenInfo, expected_audience: &str) -> AppResult<GoogleIdentity> {
    if info.aud != expected_audience {
        return Err(AppError::unauthorized("Google token was issued for another client"));
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(AppError::unauthorized("Google account email is not verified"));
    }
    let email = info
        .email
        .ok_or_else(|| AppError::unauthorized("Google token carries no email"))?;

    Ok(GoogleIdentity {
        google_id: info.sub,
        email,
        name: info.name,
        picture: info.picture,
    })
}

#[async_trait]
impl IdTokenVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::Internal("GOOGLE_CLIENT_ID not configured".into()))?;

        let url = format!("{}?id_token={}", GOOGLE_TOKENINFO_URL, urlencoding::encode(id_token));
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            log::warn!("❌ Google rejected ID token: {}", response.status());
            return Err(AppError::unauthorized("Invalid Google token"));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Google tokeninfo: {}", e)))?;

        identity_from(info, client_id)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Accepts tokens of the form `valid:<google_id>:<email>`.
    pub struct StaticVerifier;

    #[async_trait]
    impl IdTokenVerifier for StaticVerifier {
        async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity> {
            let mut parts = id_token.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("valid"), Some(id), Some(email)) => Ok(GoogleIdentity {
                    google_id: id.to_string(),
                    email: email.to_string(),
                    name: Some("Google User".into()),
                    picture: None,
                }),
                _ => Err(AppError::unauthorized("Invalid Google token")),
            }
        }
    }
}
