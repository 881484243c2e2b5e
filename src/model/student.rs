use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[schema(example = "s.iyer@college.edu")]
    pub email: String,
    pub roll_number: Option<String>,
    pub class_name: Option<String>,
    pub branch: Option<String>,
    pub section: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Compact listing used by teacher-facing endpoints.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct StudentSummaryRow {
    pub id: i64,
    pub name: String,
    pub roll_number: Option<String>,
    pub email: String,
    pub branch: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub class: String,
}

impl From<StudentSummaryRow> for StudentSummary {
    fn from(row: StudentSummaryRow) -> Self {
        StudentSummary {
            id: row.id,
            name: row.name,
            roll_no: row.roll_number.unwrap_or_else(|| "N/A".to_string()),
            email: row.email,
            class: format!(
                "{} - {}",
                row.branch.as_deref().unwrap_or("Unknown"),
                row.section.as_deref().unwrap_or("Unknown")
            ),
        }
    }
}
