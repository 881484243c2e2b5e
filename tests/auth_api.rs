use actix_web::{App, test, web::Data};
use college_erp::{model::role::Role, routes};
use serde_json::{Value, json};

mod common;
use common::*;

macro_rules! init_app {
    ($pool:expr, $cfg:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($pool.clone()))
                .app_data(Data::new($cfg.clone()))
                .configure(|c| routes::configure(c, $cfg.clone())),
        )
        .await
    };
}

// The email availability filter/cache are process-wide, so every test here
// registers a distinct address.

#[actix_web::test]
async fn register_then_login_then_use_token() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({
                "name": "Asha",
                "email": "reg.flow@college.edu",
                "password": "s3cret-pass",
                "role": "student"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/login",
            json!({"email": "reg.flow@college.edu", "password": "s3cret-pass"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["name"], "Asha");
    assert_eq!(body["user"]["role"], "student");
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::call_service(&app, get("/api/announce", &token).to_request()).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn register_normalizes_email_case() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({
                "name": "Asha",
                "email": "Case.Mixed@College.EDU",
                "password": "s3cret-pass"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/login",
            json!({"email": "case.mixed@college.edu", "password": "s3cret-pass"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let payload = json!({
        "name": "Asha",
        "email": "dup.check@college.edu",
        "password": "s3cret-pass"
    });

    let resp = test::call_service(
        &app,
        post_json_anon("/auth/register", payload.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = test::call_service(&app, post_json_anon("/auth/register", payload).to_request()).await;
    assert_eq!(resp.status(), 409);
}

#[actix_web::test]
async fn register_rejects_unknown_role_and_empty_fields() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({
                "name": "Asha",
                "email": "role.check@college.edu",
                "password": "s3cret-pass",
                "role": "principal"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({"name": "", "email": "empty.name@college.edu", "password": "p"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn login_failures_are_unauthorized() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    create_user(&pool, "Asha", "login.fail@college.edu", Role::Student).await;

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/login",
            json!({"email": "login.fail@college.edu", "password": "wrong"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/login",
            json!({"email": "nobody@college.edu", "password": "wrong"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn protected_scope_requires_bearer_token() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let resp = test::call_service(&app, get_anon("/api/attendance/all").to_request()).await;
    assert_eq!(resp.status(), 401);

    let resp = test::call_service(
        &app,
        get_anon("/api/attendance/all")
            .insert_header(("Authorization", "Token abc"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);

    let resp = test::call_service(
        &app,
        get_anon("/api/attendance/all")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn admin_can_list_users_and_change_roles() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let admin = create_user(&pool, "Root", "root.roles@college.edu", Role::Admin).await;
    let user = create_user(&pool, "Asha", "asha.roles@college.edu", Role::Student).await;
    let admin_token = token_for(&cfg, admin, "root.roles@college.edu", Role::Admin);
    let user_token = token_for(&cfg, user, "asha.roles@college.edu", Role::Student);

    let resp = test::call_service(&app, get("/api/users", &admin_token).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    // students may not administer users
    let resp = test::call_service(&app, get("/api/users", &user_token).to_request()).await;
    assert_eq!(resp.status(), 403);

    let resp = test::call_service(
        &app,
        patch_json(
            &format!("/api/users/{user}/role"),
            &admin_token,
            json!({"role": "teacher"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(
        &app,
        patch_json(
            &format!("/api/users/{user}/role"),
            &admin_token,
            json!({"role": "wizard"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);

    let resp = test::call_service(
        &app,
        patch_json("/api/users/4242/role", &admin_token, json!({"role": "teacher"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn admin_can_delete_users_and_email_frees_up() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let admin = create_user(&pool, "Root", "root.evict@college.edu", Role::Admin).await;
    let admin_token = token_for(&cfg, admin, "root.evict@college.edu", Role::Admin);

    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({
                "name": "Asha",
                "email": "evict.me@college.edu",
                "password": "s3cret-pass"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind("evict.me@college.edu")
        .fetch_one(&pool)
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        delete(&format!("/api/users/{user_id}"), &admin_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(
        &app,
        delete(&format!("/api/users/{user_id}"), &admin_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);

    // the address can be registered again after deletion
    let resp = test::call_service(
        &app,
        post_json_anon(
            "/auth/register",
            json!({
                "name": "Asha II",
                "email": "evict.me@college.edu",
                "password": "s3cret-pass"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
}
