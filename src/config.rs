use std::env;
use std::str::FromStr;

/// Runtime configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub otp_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub auth_cookie_name: String,
    pub cookie_secure: bool,
    pub cloudinary: CloudinaryConfig,
    pub ai_service_url: String,
    pub ai_timeout_secs: u64,
    pub google_client_id: Option<String>,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:3000,http://127.0.0.1:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parsed_var("PORT", 5000)?,
            database_url,
            jwt: JwtConfig {
                secret: var_or("JWT_SECRET", "default-secret-change-me"),
                issuer: var_or("JWT_ISSUER", "asha-health-service"),
                audience: var_or("JWT_AUDIENCE", "asha-health-api"),
                access_ttl_minutes: parsed_var("ACCESS_TOKEN_TTL_MINUTES", 60)?,
                refresh_ttl_days: parsed_var("REFRESH_TOKEN_TTL_DAYS", 30)?,
            },
            otp_ttl_minutes: parsed_var("OTP_TTL_MINUTES", 10)?,
            bcrypt_cost: parsed_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            cors_origins,
            auth_cookie_name: var_or("AUTH_COOKIE_NAME", "token"),
            cookie_secure: parsed_var("COOKIE_SECURE", false)?,
            cloudinary: CloudinaryConfig {
                cloud_name: var_or("CLOUDINARY_CLOUD_NAME", ""),
                api_key: var_or("CLOUDINARY_API_KEY", ""),
                api_secret: var_or("CLOUDINARY_API_SECRET", ""),
                folder: var_or("CLOUDINARY_FOLDER", "asha"),
            },
            ai_service_url: var_or("AI_SERVICE_URL", "http://localhost:8000"),
            ai_timeout_secs: parsed_var("AI_TIMEOUT_SECS", 30)?,
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            email: EmailConfig {
                api_url: optional_var("EMAIL_API_URL"),
                api_key: optional_var("EMAIL_API_KEY"),
                from: var_or("EMAIL_FROM", "no-reply@asha-health.local"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "mongodb://localhost:27017/asha_test".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "asha-health-service".into(),
                audience: "asha-health-api".into(),
                access_ttl_minutes: 60,
                refresh_ttl_days: 30,
            },
            otp_ttl_minutes: 10,
            bcrypt_cost: 4,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["http://localhost:3000".into()],
            auth_cookie_name: "token".into(),
            cookie_secure: false,
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".into(),
                api_key: "key".into(),
                api_secret: "secret".into(),
                folder: "asha".into(),
            },
            ai_service_url: "http://127.0.0.1:9".into(),
            ai_timeout_secs: 2,
            google_client_id: Some("test-client.apps.googleusercontent.com".into()),
            email: EmailConfig {
                api_url: None,
                api_key: None,
                from: "no-reply@asha-health.local".into(),
            },
        }
    }
}
