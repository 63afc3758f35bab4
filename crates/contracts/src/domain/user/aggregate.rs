use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A back-office account. Referenced by consignment notes as creator and
/// never mutated through that path. The credential is accepted on input but
/// never written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppUser {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
