use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub mod utils;

/// Payload for `POST /register`.
#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub login_name: String,
    #[validate(length(min = 8, max = 72))]
    pub secret: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Payload for `POST /login`.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub secret: String,
}

/// The part of a user that is safe to hand out.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub login_name: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub profile: UserProfile,
    pub credential: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// One rejected input field.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Body of every error response.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}
