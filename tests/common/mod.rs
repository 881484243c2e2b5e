#![allow(dead_code)]

use actix_web::test::TestRequest;
use college_erp::auth::jwt::generate_access_token;
use college_erp::auth::password::hash_password;
use college_erp::config::Config;
use college_erp::db::run_migrations;
use college_erp::model::role::Role;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Fresh in-memory database. A single connection keeps every query on the
/// same memory-backed store.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 3600,
        rate_login_per_min: 60,
        rate_register_per_min: 60,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
    }
}

pub const TEST_PASSWORD: &str = "password123";

pub async fn create_user(pool: &SqlitePool, name: &str, email: &str, role: Role) -> i64 {
    let hashed = hash_password(TEST_PASSWORD).unwrap();
    sqlx::query("INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(hashed)
        .bind(role.id() as i64)
        .execute(pool)
        .await
        .expect("insert user")
        .last_insert_rowid()
}

pub async fn create_student_profile(pool: &SqlitePool, user_id: i64, branch: &str, section: &str) -> i64 {
    sqlx::query(
        "INSERT INTO students (user_id, roll_number, class_name, branch, section)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(format!("R-{user_id}"))
    .bind(format!("{branch} - {section}"))
    .bind(branch)
    .bind(section)
    .execute(pool)
    .await
    .expect("insert student profile")
    .last_insert_rowid()
}

pub async fn add_subject(pool: &SqlitePool, teacher_id: i64, name: &str) -> i64 {
    sqlx::query("INSERT INTO subjects (teacher_id, name) VALUES (?, ?)")
        .bind(teacher_id)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert subject")
        .last_insert_rowid()
}

pub fn token_for(config: &Config, user_id: i64, email: &str, role: Role) -> String {
    generate_access_token(
        user_id,
        email.to_string(),
        role.id(),
        &config.jwt_secret,
        config.access_token_ttl,
    )
}

fn base(req: TestRequest, token: Option<&str>) -> TestRequest {
    let req = req.peer_addr("127.0.0.1:4711".parse().unwrap());
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    }
}

pub fn get(path: &str, token: &str) -> TestRequest {
    base(TestRequest::get().uri(path), Some(token))
}

pub fn get_anon(path: &str) -> TestRequest {
    base(TestRequest::get().uri(path), None)
}

pub fn post_json(path: &str, token: &str, body: serde_json::Value) -> TestRequest {
    base(TestRequest::post().uri(path), Some(token)).set_json(body)
}

pub fn post_json_anon(path: &str, body: serde_json::Value) -> TestRequest {
    base(TestRequest::post().uri(path), None).set_json(body)
}

pub fn put_json(path: &str, token: &str, body: serde_json::Value) -> TestRequest {
    base(TestRequest::put().uri(path), Some(token)).set_json(body)
}

pub fn patch_json(path: &str, token: &str, body: serde_json::Value) -> TestRequest {
    base(TestRequest::patch().uri(path), Some(token)).set_json(body)
}

pub fn delete(path: &str, token: &str) -> TestRequest {
    base(TestRequest::delete().uri(path), Some(token))
}
