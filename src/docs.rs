use crate::api::attendance::{
    BulkEntry, BulkEntryOutcome, BulkMarkRequest, BulkResults, MarkAttendance,
};
use crate::model::attendance::{
    AttendanceAdminRow, AttendanceDetail, AttendanceRecord, AttendanceStatus,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "College ERP API",
        version = "1.0.0",
        description = r#"
## College ERP Backend

This API powers a role-based school administration system with student,
teacher and admin portals.

### Key Features
- **Attendance**
  - Single and bulk marking per subject and date, duplicate-safe
  - Per-student aggregates (percentage, present/absent counts)
  - Existence check used by the marking UI
- **Subjects, Classes & Students**
  - Teacher-scoped subject lists with stable identifiers
  - Class and student profile management
- **Announcements**
  - Admin-published notices for student/teacher portals

### Security
Protected endpoints use **JWT Bearer authentication**; the role carried in
the token decides which operations are allowed.
"#,
    ),
    paths(
        crate::api::attendance::mark,
        crate::api::attendance::mark_bulk,
        crate::api::attendance::by_student,
        crate::api::attendance::all_records,
        crate::api::attendance::my_summary,
        crate::api::attendance::check,
    ),
    components(
        schemas(
            MarkAttendance,
            BulkMarkRequest,
            BulkEntry,
            BulkEntryOutcome,
            BulkResults,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceDetail,
            AttendanceAdminRow,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance recording and aggregation APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
