use crate::auth::auth::AuthUser;
use crate::model::announcement::{Announcement, AudienceType};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateAnnouncementReq {
    pub title: String,
    pub message: String,
    #[serde(rename = "userType")]
    #[schema(example = "both")]
    pub user_type: String,
}

/// Publish an announcement (admin).
pub async fn create_announcement(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateAnnouncementReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let audience = match payload.user_type.parse::<AudienceType>() {
        Ok(a) => a,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid user type. Allowed: student, teacher, both"
            })));
        }
    };

    if payload.title.trim().is_empty() || payload.message.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Title and message are required"
        })));
    }

    let result = sqlx::query(
        "INSERT INTO announcements (title, message, user_type) VALUES (?, ?, ?)",
    )
    .bind(payload.title.trim())
    .bind(payload.message.trim())
    .bind(audience.to_string())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create announcement");
        actix_web::error::ErrorInternalServerError("Failed to create announcement.")
    })?;

    let created = sqlx::query_as::<_, Announcement>(
        "SELECT id, title, message, user_type, created_at FROM announcements WHERE id = ?",
    )
    .bind(result.last_insert_rowid())
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to read back announcement");
        actix_web::error::ErrorInternalServerError("Failed to create announcement.")
    })?;

    Ok(HttpResponse::Created().json(created))
}

/// All announcements, newest first (any signed-in role).
pub async fn list_announcements(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    let announcements = sqlx::query_as::<_, Announcement>(
        "SELECT id, title, message, user_type, created_at
         FROM announcements
         ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to load announcements");
        actix_web::error::ErrorInternalServerError("Failed to load announcements.")
    })?;

    Ok(HttpResponse::Ok().json(announcements))
}
