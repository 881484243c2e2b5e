use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: i64,
}

/// User as exposed over the API (never carries the password hash).
#[derive(Debug, Serialize, ToSchema)]
pub struct UserPublic {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@college.edu")]
    pub email: String,
    #[schema(example = "teacher")]
    pub role: String,
}

impl UserPublic {
    pub fn from_parts(id: i64, name: String, email: String, role_id: i64) -> Self {
        let role = Role::from_id(role_id as u8)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            id,
            name,
            email,
            role,
        }
    }
}
