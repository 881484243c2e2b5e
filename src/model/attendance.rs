use chrono::NaiveDate;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Attendance status as stored. Parsing is case-insensitive so clients may
/// send "present"/"PRESENT"; the stored form is always the canonical one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, ToSchema)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn from_flag(present: bool) -> Self {
        if present {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| de::Error::unknown_variant(&raw, &["Present", "Absent"]))
    }
}

#[derive(Debug, serde::Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Present")]
    pub status: String,
    pub marked_by: i64,
}

/// Record joined with the student it belongs to.
#[derive(Debug, serde::Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDetail {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub subject: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: String,
    pub marked_by: i64,
}

/// Record joined with both the student and the marking teacher, for the
/// admin-wide listing.
#[derive(Debug, serde::Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceAdminRow {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub subject: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: String,
    pub marked_by: i64,
    pub marked_by_name: Option<String>,
}

/// Percentage of present records, rounded to the nearest integer.
/// 0 when there are no records at all.
pub fn attendance_percentage(present: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as i64
}
