use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    AshaWorker,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::AshaWorker => write!(f, "asha_worker"),
        }
    }
}

/// Account document (`users` collection).
///
/// A user is created unverified when an OTP is requested and only becomes
/// usable once the OTP is confirmed. Google sign-ins are created verified and
/// carry no password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    pub picture: Option<String>,
    pub asha_worker_id: Option<ObjectId>,

    // Pending verification; unset once the OTP is confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_expires: Option<BsonDateTime>,

    #[serde(default)]
    pub token_version: u32,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
    pub last_login: Option<BsonDateTime>,
}

impl User {
    pub fn new(email: &str) -> Self {
        let now = BsonDateTime::now();
        Self {
            id: None,
            email: normalize_email(email),
            password: None,
            name: None,
            phone: None,
            role: Role::User,
            is_verified: false,
            is_active: false,
            is_admin: false,
            plan: None,
            google_id: None,
            picture: None,
            asha_worker_id: None,
            otp_hash: None,
            verification_token: None,
            verification_expires: None,
            token_version: 0,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn clear_verification(&mut self) {
        self.otp_hash = None;
        self.verification_token = None;
        self.verification_expires = None;
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_admin: bool,
    pub plan: Option<String>,
    pub picture: Option<String>,
    pub asha_worker_id: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id_hex(),
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            is_verified: user.is_verified,
            is_admin: user.is_admin,
            plan: user.plan.clone(),
            picture: user.picture.clone(),
            asha_worker_id: user.asha_worker_id.map(|id| id.to_hex()),
        }
    }
}
