use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

use crate::utils::{AppError, AppResult};

/// Thin client for the external AI microservice. Bodies are forwarded as-is.
pub struct AiClient {
    client: reqwest::Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build AI client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        log::info!("🤖 {} {}", method, url);

        let mut request = self.client.request(method, &url).header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            log::warn!("❌ AI service {} returned {}", path, status);
            return Err(AppError::Upstream(format!("AI service error: {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse AI response: {}", e)))
    }

    pub async fn predict(&self, body: &Value) -> AppResult<Value> {
        self.call(Method::POST, "/predict", Some(body)).await
    }

    /// Prediction that degrades to a generic result when the service is down.
    pub async fn predict_with_fallback(&self, body: &Value) -> Value {
        match self.predict(body).await {
            Ok(prediction) => prediction,
            Err(e) => {
                log::warn!("⚠️  Symptom prediction unavailable, using fallback: {}", e);
                fallback_prediction()
            }
        }
    }

    pub async fn full_consultation(&self, body: &Value) -> AppResult<Value> {
        self.call(Method::POST, "/ai/full-consultation", Some(body)).await
    }

    pub async fn lifestyle_recommendations(&self, body: &Value) -> AppResult<Value> {
        self.call(Method::POST, "/lifestyle-recommendations", Some(body)).await
    }

    pub async fn symptoms(&self) -> AppResult<Value> {
        self.call(Method::GET, "/symptoms", None).await
    }
}

pub fn fallback_prediction() -> Value {
    json!({
        "disease": "Common Cold",
        "confidence": 0.5,
        "description": "A mild viral infection of the nose and throat.",
        "precautions": [
            "Rest and drink plenty of fluids",
            "Gargle with warm salt water",
            "Consult a doctor if symptoms persist beyond a week"
        ],
        "fallback": true
    })
}
