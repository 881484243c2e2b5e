use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

/// Raw row; `subjects` is a JSON array stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct ClassRow {
    pub id: i64,
    pub branch: String,
    pub section: String,
    pub semester: i64,
    pub class_teacher: Option<i64>,
    pub class_teacher_name: Option<String>,
    pub subjects: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "CSE")]
    pub branch: String,
    #[schema(example = "A")]
    pub section: String,
    #[schema(example = 3)]
    pub semester: i64,
    pub class_teacher: Option<i64>,
    pub class_teacher_name: Option<String>,
    #[schema(example = json!(["Mathematics", "Physics"]))]
    pub subjects: Vec<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl From<ClassRow> for ClassResponse {
    fn from(row: ClassRow) -> Self {
        let subjects = serde_json::from_str(&row.subjects).unwrap_or_default();
        ClassResponse {
            id: row.id,
            branch: row.branch,
            section: row.section,
            semester: row.semester,
            class_teacher: row.class_teacher,
            class_teacher_name: row.class_teacher_name,
            subjects,
            created_at: row.created_at,
        }
    }
}
