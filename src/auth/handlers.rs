use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, user::UserPublic},
    models::{LoginReqDto, RegisterReq, UserSql},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

use crate::utils::email_cache;
use crate::utils::email_filter;

/// Inserts a new user row and keeps the email filter/cache populated.
/// Returns the new user id.
async fn insert_user(
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    pool: &SqlitePool,
) -> Result<i64, HttpResponse> {
    let hashed = match hash_password(password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            return Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })));
        }
    };

    let result = sqlx::query("INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(&hashed)
        .bind(role.id() as i64)
        .execute(pool)
        .await;

    match result {
        Ok(done) => {
            // keep the fast availability checks in sync with the store
            email_filter::insert(email);
            email_cache::mark_taken(email).await;
            Ok(done.last_insert_rowid())
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                    return Err(HttpResponse::Conflict().json(json!({
                        "error": "Email already registered"
                    })));
                }
            }

            error!(error = %e, "Failed to insert user");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })))
        }
    }
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &SqlitePool) -> bool {
    let email = email.to_lowercase();

    // 1. Cuckoo filter fast negative: definitely-absent emails skip the DB.
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2. Moka cache fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3. Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// User registration handler
pub async fn register(user: web::Json<RegisterReq>, pool: web::Data<SqlitePool>) -> impl Responder {
    let name = user.name.trim();
    let email = user.email.trim().to_lowercase();
    let password = &user.password;

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Name, email and password must not be empty"
        }));
    }

    let role = match user.role.as_deref() {
        Some(raw) => match raw.parse::<Role>() {
            Ok(r) => r,
            Err(_) => {
                return HttpResponse::BadRequest().json(json!({
                    "error": "Invalid role specified"
                }));
            }
        },
        None => Role::Student,
    };

    if !is_email_available(&email, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({
            "error": "Email already registered"
        }));
    }

    match insert_user(name, &email, password, role, pool.get_ref()).await {
        Ok(_) => HttpResponse::Created().json(json!({
            "message": "User registered successfully"
        })),
        Err(err_resp) => err_resp,
    }
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, name, email, password, role_id
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(user.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(u)) => {
            debug!(user_id = u.id, "User found");
            u
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    debug!("Verifying password");

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    let role = match Role::from_id(db_user.role_id as u8) {
        Some(r) => r,
        None => {
            error!(user_id = db_user.id, role_id = db_user.role_id, "Unknown role id");
            return HttpResponse::InternalServerError().finish();
        }
    };

    debug!("Generating access token");

    let token = generate_access_token(
        db_user.id,
        db_user.email.clone(),
        role.id(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!("Login successful");

    HttpResponse::Ok().json(json!({
        "token": token,
        "user": {
            "id": db_user.id,
            "name": db_user.name,
            "role": role.to_string(),
        },
        "message": "loggedIn"
    }))
}

/// List every user account (admin).
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, (i64, String, String, i64)>(
        "SELECT id, name, email, role_id FROM users ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list users");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let users: Vec<UserPublic> = rows
        .into_iter()
        .map(|(id, name, email, role_id)| UserPublic::from_parts(id, name, email, role_id))
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

#[derive(Deserialize)]
pub struct UpdateRoleReq {
    pub role: String,
}

/// Change a user's role (admin).
pub async fn update_user_role(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateRoleReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let role = match payload.role.parse::<Role>() {
        Ok(r) => r,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid role specified"
            })));
        }
    };

    let result = sqlx::query("UPDATE users SET role_id = ? WHERE id = ?")
        .bind(role.id() as i64)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to update user role");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User role updated successfully"
    })))
}

#[derive(Deserialize)]
pub struct CreateTeacherReq {
    pub name: String,
    pub email: String,
    pub password: String,
    pub subjects: Vec<String>,
}

/// Create a teacher account together with its subject list (admin).
/// Each subject gets a stable row id at creation time; attendance APIs
/// resolve subjects by that id from here on.
pub async fn create_teacher(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateTeacherReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let subjects: Vec<String> = payload
        .subjects
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if subjects.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "At least one subject must be assigned to a teacher"
        })));
    }

    let email = payload.email.trim().to_lowercase();
    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "User with this email already exists"
        })));
    }

    let teacher_id = match insert_user(
        payload.name.trim(),
        &email,
        &payload.password,
        Role::Teacher,
        pool.get_ref(),
    )
    .await
    {
        Ok(id) => id,
        Err(err_resp) => return Ok(err_resp),
    };

    for subject in &subjects {
        sqlx::query(
            "INSERT INTO subjects (teacher_id, name) VALUES (?, ?)
             ON CONFLICT(teacher_id, name) DO NOTHING",
        )
        .bind(teacher_id)
        .bind(subject)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, teacher_id, subject = %subject, "Failed to assign subject");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    let assigned = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, name FROM subjects WHERE teacher_id = ? ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, teacher_id, "Failed to read back subjects");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Teacher created successfully",
        "teacher": {
            "id": teacher_id,
            "name": payload.name.trim(),
            "email": email,
            "subjects": assigned
                .into_iter()
                .map(|(id, name)| json!({"id": id, "name": name}))
                .collect::<Vec<_>>(),
        }
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentReq {
    pub name: String,
    pub email: String,
    pub password: String,
    pub class_name: Option<String>,
    pub branch: Option<String>,
    pub section: Option<String>,
    pub roll_number: Option<String>,
    pub subjects: Option<Vec<String>>,
}

/// Create a student account plus its profile, subject enrollments and the
/// backing class record for its (branch, section) pair (admin).
pub async fn create_student(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateStudentReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let email = payload.email.trim().to_lowercase();
    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "User with this email already exists"
        })));
    }

    let user_id = match insert_user(
        payload.name.trim(),
        &email,
        &payload.password,
        Role::Student,
        pool.get_ref(),
    )
    .await
    {
        Ok(id) => id,
        Err(err_resp) => return Ok(err_resp),
    };

    let profile = sqlx::query(
        "INSERT INTO students (user_id, roll_number, class_name, branch, section)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&payload.roll_number)
    .bind(&payload.class_name)
    .bind(&payload.branch)
    .bind(&payload.section)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to create student profile");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let student_id = profile.last_insert_rowid();

    let subjects = payload.subjects.clone().unwrap_or_default();
    for subject in &subjects {
        sqlx::query(
            "INSERT INTO student_subjects (student_id, subject) VALUES (?, ?)
             ON CONFLICT(student_id, subject) DO NOTHING",
        )
        .bind(student_id)
        .bind(subject)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, student_id, subject = %subject, "Failed to enroll subject");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    if let (Some(branch), Some(section)) = (payload.branch.as_deref(), payload.section.as_deref()) {
        if !subjects.is_empty() {
            merge_class_subjects(pool.get_ref(), branch, section, &subjects)
                .await
                .map_err(|e| {
                    error!(error = %e, branch, section, "Failed to merge class subjects");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;
        }
    }

    Ok(HttpResponse::Created().json(json!({
        "message": "Student created successfully",
        "student": {
            "id": user_id,
            "name": payload.name.trim(),
            "email": email,
            "role": Role::Student.to_string(),
            "rollNumber": payload.roll_number,
            "branch": payload.branch,
            "section": payload.section,
            "className": payload.class_name,
            "subjects": subjects,
        }
    })))
}

/// Add the given subjects to the class for (branch, section), creating the
/// class when none exists yet.
async fn merge_class_subjects(
    pool: &SqlitePool,
    branch: &str,
    section: &str,
    subjects: &[String],
) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, subjects FROM classes WHERE branch = ? AND section = ?",
    )
    .bind(branch)
    .bind(section)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some((class_id, raw)) => {
            let mut current: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
            let mut changed = false;
            for subject in subjects {
                if !current.contains(subject) {
                    current.push(subject.clone());
                    changed = true;
                }
            }
            if changed {
                let encoded =
                    serde_json::to_string(&current).unwrap_or_else(|_| "[]".to_string());
                sqlx::query("UPDATE classes SET subjects = ? WHERE id = ?")
                    .bind(encoded)
                    .bind(class_id)
                    .execute(pool)
                    .await?;
            }
        }
        None => {
            let encoded =
                serde_json::to_string(subjects).unwrap_or_else(|_| "[]".to_string());
            sqlx::query(
                "INSERT INTO classes (branch, section, semester, subjects) VALUES (?, ?, 1, ?)",
            )
            .bind(branch)
            .bind(section)
            .bind(encoded)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

/// Delete a user account and its dependent rows (admin).
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(email) = email else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    };

    let cleanup = [
        "DELETE FROM subjects WHERE teacher_id = ?",
        "DELETE FROM student_subjects WHERE student_id IN (SELECT id FROM students WHERE user_id = ?)",
        "DELETE FROM students WHERE user_id = ?",
        "DELETE FROM users WHERE id = ?",
    ];
    for statement in cleanup {
        sqlx::query(statement)
            .bind(user_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to delete user");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
    }

    email_filter::remove(&email);
    email_cache::invalidate(&email).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "User deleted successfully"
    })))
}
