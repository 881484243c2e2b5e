use crate::auth::auth::AuthUser;
use crate::model::class::{ClassResponse, ClassRow};
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use utoipa::ToSchema;

const CLASS_SELECT: &str = r#"
    SELECT c.id, c.branch, c.section, c.semester, c.class_teacher,
           u.name AS class_teacher_name, c.subjects, c.created_at
    FROM classes c
    LEFT JOIN users u ON u.id = c.class_teacher
"#;

async fn fetch_class(pool: &SqlitePool, class_id: i64) -> Result<Option<ClassRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassRow>(&format!("{} WHERE c.id = ?", CLASS_SELECT))
        .bind(class_id)
        .fetch_optional(pool)
        .await
}

#[derive(Deserialize, ToSchema)]
pub struct CreateClassReq {
    pub branch: String,
    pub section: String,
    pub semester: i64,
    pub class_teacher: Option<i64>,
    pub subjects: Option<Vec<String>>,
}

/// Create a class (admin).
pub async fn create_class(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateClassReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let subjects = serde_json::to_string(&payload.subjects.clone().unwrap_or_default())
        .unwrap_or_else(|_| "[]".to_string());

    let result = sqlx::query(
        "INSERT INTO classes (branch, section, semester, class_teacher, subjects)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&payload.branch)
    .bind(&payload.section)
    .bind(payload.semester)
    .bind(payload.class_teacher)
    .bind(subjects)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create class");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let created = fetch_class(pool.get_ref(), result.last_insert_rowid())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read back class");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match created {
        Some(row) => Ok(HttpResponse::Created().json(ClassResponse::from(row))),
        None => Ok(HttpResponse::InternalServerError().json(json!({
            "message": "Class not found after insert"
        }))),
    }
}

/// All classes with their class-teacher names (admin or teacher).
pub async fn list_classes(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher_or_admin()?;

    let rows = sqlx::query_as::<_, ClassRow>(&format!("{} ORDER BY c.id", CLASS_SELECT))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list classes");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let classes: Vec<ClassResponse> = rows.into_iter().map(ClassResponse::from).collect();

    Ok(HttpResponse::Ok().json(classes))
}

/// Number of classes (admin).
pub async fn count_classes(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count classes");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(count))
}

/// One class by id (admin or teacher).
pub async fn get_class(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher_or_admin()?;

    let class_id = path.into_inner();
    let row = fetch_class(pool.get_ref(), class_id).await.map_err(|e| {
        tracing::error!(error = %e, class_id, "Failed to fetch class");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(ClassResponse::from(row))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Class not found"
        }))),
    }
}

/// Partial update from whatever fields the payload carries (admin).
pub async fn update_class(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let class_id = path.into_inner();
    let update = build_update_sql("classes", &payload, "id", class_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        tracing::error!(error = %e, class_id, "Failed to update class");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Class not found"
        })));
    }

    let row = fetch_class(pool.get_ref(), class_id).await.map_err(|e| {
        tracing::error!(error = %e, class_id, "Failed to read back class");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(ClassResponse::from(row))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Class not found"
        }))),
    }
}

/// Delete a class (admin).
pub async fn delete_class(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let class_id = path.into_inner();
    let result = sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(class_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, class_id, "Failed to delete class");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Class not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Class deleted successfully"
    })))
}
