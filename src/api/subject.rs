use crate::auth::auth::AuthUser;
use crate::model::role::Role;
use crate::model::student::{StudentSummary, StudentSummaryRow};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

/// Resolve a subject identifier to its canonical name, scoped to the given
/// teacher. Digits resolve against the teacher's stable subject ids; anything
/// else is taken as a raw subject name (subjects are teacher-scoped free
/// text). `None` means the identifier resolves to nothing.
pub async fn resolve_subject(
    pool: &SqlitePool,
    teacher_id: i64,
    ident: &str,
) -> Result<Option<String>, sqlx::Error> {
    let trimmed = ident.trim();

    if let Ok(subject_id) = trimmed.parse::<i64>() {
        return sqlx::query_scalar::<_, String>(
            "SELECT name FROM subjects WHERE id = ? AND teacher_id = ?",
        )
        .bind(subject_id)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await;
    }

    if trimmed.is_empty() {
        return Ok(None);
    }

    Ok(Some(trimmed.to_string()))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct SubjectEntry {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Mathematics")]
    pub name: String,
}

/// Subjects taught by the calling teacher, with their stable ids.
pub async fn teacher_subjects(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher()?;

    let subjects = sqlx::query_as::<_, SubjectEntry>(
        "SELECT id, name FROM subjects WHERE teacher_id = ? ORDER BY id",
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, teacher_id = auth.user_id, "Failed to fetch subjects");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(subjects))
}

#[derive(Serialize, ToSchema)]
pub struct SubjectListing {
    /// Stable id when a teacher owns the subject; class-only names have none
    pub id: Option<i64>,
    pub name: String,
    pub teacher_id: Option<i64>,
}

/// Every subject known to the system: teacher-owned rows plus names that
/// only appear in class subject lists (admin).
pub async fn all_subjects(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let owned = sqlx::query_as::<_, (i64, i64, String)>(
        "SELECT id, teacher_id, name FROM subjects ORDER BY name, id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch subjects");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let class_lists = sqlx::query_scalar::<_, String>("SELECT subjects FROM classes")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch class subjects");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let mut listings: Vec<SubjectListing> = Vec::with_capacity(owned.len());
    let mut seen: Vec<String> = Vec::new();
    for (id, teacher_id, name) in owned {
        if !seen.contains(&name) {
            seen.push(name.clone());
        }
        listings.push(SubjectListing {
            id: Some(id),
            name,
            teacher_id: Some(teacher_id),
        });
    }
    for raw in class_lists {
        let names: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
        for name in names {
            if !seen.contains(&name) {
                seen.push(name.clone());
                listings.push(SubjectListing {
                    id: None,
                    name,
                    teacher_id: None,
                });
            }
        }
    }

    Ok(HttpResponse::Ok().json(listings))
}

/// Looks up a subject row by stable id, enforcing ownership for teachers.
/// Admins may address any subject.
async fn subject_for_caller(
    pool: &SqlitePool,
    auth: &AuthUser,
    subject_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT teacher_id, name FROM subjects WHERE id = ?",
    )
    .bind(subject_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((owner, name)) if auth.role == Role::Admin || owner == auth.user_id => Some(name),
        _ => None,
    })
}

/// Students enrolled in a subject (teacher or admin).
pub async fn students_for_subject(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher_or_admin()?;

    let subject_id = path.into_inner();
    let subject_name = match subject_for_caller(pool.get_ref(), &auth, subject_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, subject_id, "Subject lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })? {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Subject not found"
            })));
        }
    };

    let rows = sqlx::query_as::<_, StudentSummaryRow>(
        r#"
        SELECT u.id, u.name, st.roll_number, u.email, st.branch, st.section
        FROM student_subjects ss
        JOIN students st ON st.id = ss.student_id
        JOIN users u ON u.id = st.user_id
        WHERE ss.subject = ?
        ORDER BY u.name
        "#,
    )
    .bind(&subject_name)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, subject = %subject_name, "Failed to fetch students");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let students: Vec<StudentSummary> = rows.into_iter().map(StudentSummary::from).collect();

    Ok(HttpResponse::Ok().json(students))
}

#[derive(Deserialize, ToSchema)]
pub struct EnrollStudentReq {
    pub student_id: i64,
}

/// Enroll a student (by user id) into a subject (teacher or admin).
pub async fn add_student_to_subject(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<EnrollStudentReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_teacher_or_admin()?;

    let subject_id = path.into_inner();
    let subject_name = match subject_for_caller(pool.get_ref(), &auth, subject_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, subject_id, "Subject lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })? {
        Some(name) => name,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Subject not found"
            })));
        }
    };

    let profile_id =
        sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE user_id = ?")
            .bind(payload.student_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, student_id = payload.student_id, "Student lookup failed");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let Some(profile_id) = profile_id else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    };

    sqlx::query(
        "INSERT INTO student_subjects (student_id, subject) VALUES (?, ?)
         ON CONFLICT(student_id, subject) DO NOTHING",
    )
    .bind(profile_id)
    .bind(&subject_name)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, profile_id, subject = %subject_name, "Enroll failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Student added to subject successfully"
    })))
}

/// Subjects for the logged-in student, each with the owning teacher's name.
pub async fn my_subjects(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;

    let profile_id = sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE user_id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = auth.user_id, "Student profile lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(profile_id) = profile_id else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student profile not found"
        })));
    };

    let rows = sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT ss.subject,
               (SELECT u.name
                FROM subjects sj
                JOIN users u ON u.id = sj.teacher_id
                WHERE sj.name = ss.subject
                ORDER BY sj.id
                LIMIT 1) AS teacher
        FROM student_subjects ss
        WHERE ss.student_id = ?
        ORDER BY ss.subject
        "#,
    )
    .bind(profile_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, profile_id, "Failed to fetch enrolled subjects");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let subjects: Vec<_> = rows
        .into_iter()
        .map(|(name, teacher)| {
            json!({
                "name": name,
                "teacher": teacher.unwrap_or_else(|| "Unassigned".to_string()),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(subjects))
}
