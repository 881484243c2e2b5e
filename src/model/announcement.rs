use chrono::NaiveDateTime;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Which portal an announcement is addressed to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudienceType {
    Student,
    Teacher,
    Both,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Announcement {
    pub id: i64,
    #[schema(example = "Exam schedule published")]
    pub title: String,
    pub message: String,
    #[schema(example = "both")]
    pub user_type: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
