use crate::auth::auth::AuthUser;
use crate::model::student::{StudentProfile, StudentSummary, StudentSummaryRow};
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use serde_json::{Value, json};
use sqlx::SqlitePool;

const PROFILE_SELECT: &str = r#"
    SELECT st.id, st.user_id, u.name, u.email, st.roll_number,
           st.class_name, st.branch, st.section, st.created_at
    FROM students st
    JOIN users u ON u.id = st.user_id
"#;

/// Every student profile (admin).
pub async fn list_students(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let students = sqlx::query_as::<_, StudentProfile>(&format!("{} ORDER BY st.id", PROFILE_SELECT))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list students");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(students))
}

/// Number of student profiles (admin).
pub async fn count_students(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count students");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(count))
}

/// Students in a class addressed as "Branch - Section" (teacher or admin).
pub async fn by_class(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher_or_admin()?;

    let class_name = path.into_inner();
    let Some((branch, section)) = class_name.split_once('-') else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Class must be addressed as \"Branch - Section\""
        })));
    };
    let branch = branch.trim();
    let section = section.trim();

    let rows = sqlx::query_as::<_, StudentSummaryRow>(
        r#"
        SELECT u.id, u.name, st.roll_number, u.email, st.branch, st.section
        FROM students st
        JOIN users u ON u.id = st.user_id
        WHERE st.branch = ? AND st.section = ?
        ORDER BY u.name
        "#,
    )
    .bind(branch)
    .bind(section)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, branch, section, "Failed to fetch students by class");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let students: Vec<StudentSummary> = rows.into_iter().map(StudentSummary::from).collect();

    Ok(HttpResponse::Ok().json(students))
}

/// One student profile by id (admin).
pub async fn get_student(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    let student =
        sqlx::query_as::<_, StudentProfile>(&format!("{} WHERE st.id = ?", PROFILE_SELECT))
            .bind(student_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, student_id, "Failed to fetch student");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    match student {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        }))),
    }
}

/// Partial profile update from whatever fields the payload carries (admin).
pub async fn update_student(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    let update = build_update_sql("students", &payload, "id", student_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        tracing::error!(error = %e, student_id, "Failed to update student");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    }

    let student =
        sqlx::query_as::<_, StudentProfile>(&format!("{} WHERE st.id = ?", PROFILE_SELECT))
            .bind(student_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, student_id, "Failed to read back student");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    match student {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        }))),
    }
}

/// Delete a student profile and its enrollments (admin).
pub async fn delete_student(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student_id = path.into_inner();

    sqlx::query("DELETE FROM student_subjects WHERE student_id = ?")
        .bind(student_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, student_id, "Failed to delete enrollments");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(student_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, student_id, "Failed to delete student");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Student deleted successfully"
    })))
}
