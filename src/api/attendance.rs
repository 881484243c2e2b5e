use crate::auth::auth::AuthUser;
use crate::model::attendance::{
    AttendanceAdminRow, AttendanceDetail, AttendanceStatus, attendance_percentage,
};
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::subject::resolve_subject;

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    /// Stable subject id (as digits) or a raw subject name
    #[schema(example = "1")]
    pub subject: String,
    #[serde(rename = "studentId")]
    #[schema(example = 42)]
    pub student_id: i64,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Present", value_type = String)]
    pub status: AttendanceStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkEntry {
    #[schema(example = 42)]
    pub student_id: Option<i64>,
    pub present: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkMarkRequest {
    #[schema(example = 1)]
    pub subject_id: i64,
    #[schema(example = "2026-01-12")]
    pub date: String,
    pub attendance: Vec<BulkEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct BulkEntryOutcome {
    pub student_id: Option<i64>,
    pub message: String,
}

#[derive(Serialize, Default, ToSchema)]
pub struct BulkResults {
    pub success: Vec<BulkEntryOutcome>,
    pub errors: Vec<BulkEntryOutcome>,
}

async fn student_exists(pool: &SqlitePool, student_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role_id = ?)",
    )
    .bind(student_id)
    .bind(Role::Student.id() as i64)
    .fetch_one(pool)
    .await
}

/// Mark attendance for a single student
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance marked", body = Object, example = json!({
            "message": "Attendance marked"
        })),
        (status = 400, description = "Already marked for this student/subject/date", body = Object, example = json!({
            "message": "Already Marked!"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Subject or student not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<MarkAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher()?;

    let subject_name = match resolve_subject(pool.get_ref(), auth.user_id, &payload.subject)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Subject lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })? {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Subject not found"
            })));
        }
    };

    let exists = student_exists(pool.get_ref(), payload.student_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, student_id = payload.student_id, "Student lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    if !exists {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Student not found"
        })));
    }

    // Single conditional insert; the unique (student, subject, date) key
    // makes the duplicate check and the write one atomic step.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (student_id, subject, date, status, marked_by)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(student_id, subject, date) DO NOTHING
        "#,
    )
    .bind(payload.student_id)
    .bind(&subject_name)
    .bind(payload.date)
    .bind(payload.status.as_str())
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, student_id = payload.student_id, "Mark attendance failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Already Marked!"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance marked"
    })))
}

/// Mark attendance for multiple students at once
#[utoipa::path(
    post,
    path = "/api/attendance/mark-bulk",
    request_body = BulkMarkRequest,
    responses(
        (status = 200, description = "Every entry processed", body = Object, example = json!({
            "message": "All attendance records processed successfully"
        })),
        (status = 207, description = "Some entries failed", body = Object, example = json!({
            "message": "Some attendance records were processed"
        })),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Subject not found"),
        (status = 500, description = "No entry could be processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_bulk(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<BulkMarkRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher()?;

    let subject_name = match resolve_subject(
        pool.get_ref(),
        auth.user_id,
        &payload.subject_id.to_string(),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Subject lookup failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Subject not found"
            })));
        }
    };

    let date = match NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid date format"
            })));
        }
    };

    let mut results = BulkResults::default();

    // Entries are independent; one bad student id must not abort the batch.
    for entry in &payload.attendance {
        let Some(student_id) = entry.student_id.filter(|id| *id > 0) else {
            results.errors.push(BulkEntryOutcome {
                student_id: entry.student_id,
                message: "Invalid student ID".to_string(),
            });
            continue;
        };

        match student_exists(pool.get_ref(), student_id).await {
            Ok(true) => {}
            Ok(false) => {
                results.errors.push(BulkEntryOutcome {
                    student_id: Some(student_id),
                    message: "Student not found".to_string(),
                });
                continue;
            }
            Err(e) => {
                results.errors.push(BulkEntryOutcome {
                    student_id: Some(student_id),
                    message: e.to_string(),
                });
                continue;
            }
        }

        let status = AttendanceStatus::from_flag(entry.present);
        let outcome = sqlx::query(
            r#"
            INSERT INTO attendance (student_id, subject, date, status, marked_by)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(student_id, subject, date)
            DO UPDATE SET status = excluded.status, marked_by = excluded.marked_by
            "#,
        )
        .bind(student_id)
        .bind(&subject_name)
        .bind(date)
        .bind(status.as_str())
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await;

        match outcome {
            Ok(_) => results.success.push(BulkEntryOutcome {
                student_id: Some(student_id),
                message: "Attendance recorded".to_string(),
            }),
            Err(e) => results.errors.push(BulkEntryOutcome {
                student_id: Some(student_id),
                message: e.to_string(),
            }),
        }
    }

    // Three-way outcome: all ok / all failed / partial.
    let response = if results.errors.is_empty() {
        HttpResponse::Ok().json(serde_json::json!({
            "message": "All attendance records processed successfully",
            "results": results
        }))
    } else if results.success.is_empty() {
        HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Failed to process any attendance records",
            "results": results
        }))
    } else {
        HttpResponse::MultiStatus().json(serde_json::json!({
            "message": "Some attendance records were processed",
            "results": results
        }))
    };

    Ok(response)
}

/// Attendance records for one student, by admin or student
#[utoipa::path(
    get,
    path = "/api/attendance/student/{id}",
    params(
        ("id" = i64, Path, description = "Student user id")
    ),
    responses(
        (status = 200, description = "Records for the student", body = [AttendanceDetail]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn by_student(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_student()?;

    let student_id = path.into_inner();

    let records = sqlx::query_as::<_, AttendanceDetail>(
        r#"
        SELECT a.id, a.student_id, u.name AS student_name, u.email AS student_email,
               a.subject, a.date, a.status, a.marked_by
        FROM attendance a
        JOIN users u ON u.id = a.student_id
        WHERE a.student_id = ?
        ORDER BY a.date DESC, a.subject
        "#,
    )
    .bind(student_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, student_id, "Failed to fetch attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// All attendance records, admin only
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    responses(
        (status = 200, description = "Every attendance record", body = [AttendanceAdminRow]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn all_records(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let records = sqlx::query_as::<_, AttendanceAdminRow>(
        r#"
        SELECT a.id, a.student_id, u.name AS student_name,
               a.subject, a.date, a.status, a.marked_by, t.name AS marked_by_name
        FROM attendance a
        JOIN users u ON u.id = a.student_id
        LEFT JOIN users t ON t.id = a.marked_by
        ORDER BY a.date DESC, a.id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch attendance records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// Attendance aggregate for the logged-in student's dashboard
#[utoipa::path(
    get,
    path = "/api/attendance/my",
    responses(
        (status = 200, description = "Aggregate for the caller", body = Object, example = json!({
            "attendance": 80,
            "total": 5,
            "present": 4,
            "absent": 1
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;

    let student_id = auth.user_id;

    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE student_id = ?")
            .bind(student_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, student_id, "Failed to count attendance");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let present = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE student_id = ? AND status = ?",
    )
    .bind(student_id)
    .bind(AttendanceStatus::Present.as_str())
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, student_id, "Failed to count present records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "attendance": attendance_percentage(present, total),
        "total": total,
        "present": present,
        "absent": total - present,
    })))
}

/// Check whether attendance exists for a subject on a date (caller's marks only)
#[utoipa::path(
    get,
    path = "/api/attendance/check/{subject_id}/{date}",
    params(
        ("subject_id" = i64, Path, description = "Stable subject id"),
        ("date" = String, Path, description = "Date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Existing records, possibly empty", body = Object, example = json!({
            "message": "No attendance records found for this subject on this date",
            "records": []
        })),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Subject not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64, String)>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher()?;

    let (subject_id, raw_date) = path.into_inner();

    let subject_name = match resolve_subject(pool.get_ref(), auth.user_id, &subject_id.to_string())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, subject_id, "Subject lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })? {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Subject not found"
            })));
        }
    };

    let day = match NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid date format"
            })));
        }
    };
    let Some(next_day) = day.succ_opt() else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid date format"
        })));
    };

    // Half-open day range instead of equality, so records stored with a
    // time-of-day component still match.
    let records = sqlx::query_as::<_, AttendanceDetail>(
        r#"
        SELECT a.id, a.student_id, u.name AS student_name, u.email AS student_email,
               a.subject, a.date, a.status, a.marked_by
        FROM attendance a
        JOIN users u ON u.id = a.student_id
        WHERE a.subject = ? AND a.date >= ? AND a.date < ? AND a.marked_by = ?
        ORDER BY u.name
        "#,
    )
    .bind(&subject_name)
    .bind(day)
    .bind(next_day)
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, subject = %subject_name, "Attendance check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let message = if records.is_empty() {
        "No attendance records found for this subject on this date"
    } else {
        "Attendance has already been marked for this subject on this date"
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "records": records
    })))
}
