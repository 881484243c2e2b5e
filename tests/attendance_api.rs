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

#[actix_web::test]
async fn mark_then_aggregate_counts_the_record() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;

    let teacher_token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);
    let student_token = token_for(&cfg, student, "asha@college.edu", Role::Student);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark",
            &teacher_token,
            json!({
                "subject": subject.to_string(),
                "studentId": student,
                "date": "2026-03-02",
                "status": "Present"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get("/api/attendance/my", &student_token).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["present"], 1);
    assert_eq!(body["absent"], 0);
    assert_eq!(body["attendance"], 100);
}

#[actix_web::test]
async fn marking_twice_is_a_conflict() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let payload = json!({
        "subject": subject.to_string(),
        "studentId": student,
        "date": "2026-03-02",
        "status": "Present"
    });

    let resp = test::call_service(
        &app,
        post_json("/api/attendance/mark", &token, payload.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(
        &app,
        post_json("/api/attendance/mark", &token, payload).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Already Marked!");
}

#[actix_web::test]
async fn same_date_different_subject_is_allowed() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let maths = add_subject(&pool, teacher, "Mathematics").await;
    let physics = add_subject(&pool, teacher, "Physics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    for subject in [maths, physics] {
        let resp = test::call_service(
            &app,
            post_json(
                "/api/attendance/mark",
                &token,
                json!({
                    "subject": subject.to_string(),
                    "studentId": student,
                    "date": "2026-03-02",
                    "status": "Present"
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }
}

#[actix_web::test]
async fn lowercase_status_is_accepted_and_counted() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let teacher_token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);
    let student_token = token_for(&cfg, student, "asha@college.edu", Role::Student);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark",
            &teacher_token,
            json!({
                "subject": "Mathematics",
                "studentId": student,
                "date": "2026-03-02",
                "status": "present"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get("/api/attendance/my", &student_token).to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["present"], 1);
    assert_eq!(body["attendance"], 100);
}

#[actix_web::test]
async fn unknown_subject_id_is_not_found() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark",
            &token,
            json!({
                "subject": "99",
                "studentId": student,
                "date": "2026-03-02",
                "status": "Present"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Subject not found");
}

#[actix_web::test]
async fn unknown_student_is_not_found() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark",
            &token,
            json!({
                "subject": subject.to_string(),
                "studentId": 4242,
                "date": "2026-03-02",
                "status": "Present"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Student not found");
}

#[actix_web::test]
async fn bulk_mark_mixed_outcome_is_multi_status() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let s1 = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let s2 = create_user(&pool, "Bilal", "bilal@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark-bulk",
            &token,
            json!({
                "subject_id": subject,
                "date": "2026-03-02",
                "attendance": [
                    {"student_id": s1, "present": true},
                    {"student_id": s2, "present": false},
                    {"student_id": null, "present": true},
                    {"student_id": 4242, "present": true}
                ]
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 207);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Some attendance records were processed");
    assert_eq!(body["results"]["success"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"]["errors"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn bulk_remark_updates_in_place() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let admin = create_user(&pool, "Root", "root@college.edu", Role::Admin).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);
    let admin_token = token_for(&cfg, admin, "root@college.edu", Role::Admin);

    for present in [true, false] {
        let resp = test::call_service(
            &app,
            post_json(
                "/api/attendance/mark-bulk",
                &token,
                json!({
                    "subject_id": subject,
                    "date": "2026-03-02",
                    "attendance": [{"student_id": student, "present": present}]
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }

    let resp = test::call_service(
        &app,
        get(&format!("/api/attendance/student/{student}"), &admin_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let records: Value = test::read_body_json(resp).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "Absent");
}

#[actix_web::test]
async fn bulk_mark_with_no_successes_is_server_error() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark-bulk",
            &token,
            json!({
                "subject_id": subject,
                "date": "2026-03-02",
                "attendance": [
                    {"student_id": null, "present": true},
                    {"student_id": 4242, "present": false}
                ]
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Failed to process any attendance records");
    assert_eq!(body["results"]["errors"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn bulk_mark_rejects_bad_date() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark-bulk",
            &token,
            json!({
                "subject_id": subject,
                "date": "not-a-date",
                "attendance": [{"student_id": student, "present": true}]
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid date format");
}

#[actix_web::test]
async fn aggregate_with_no_records_is_zero() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, student, "asha@college.edu", Role::Student);

    let resp = test::call_service(&app, get("/api/attendance/my", &token).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["attendance"], 0);
    assert_eq!(body["total"], 0);
    assert_eq!(body["present"], 0);
    assert_eq!(body["absent"], 0);
}

#[actix_web::test]
async fn four_of_five_present_is_eighty_percent() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let teacher_token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);
    let student_token = token_for(&cfg, student, "asha@college.edu", Role::Student);

    let days = [
        ("2026-03-02", true),
        ("2026-03-03", true),
        ("2026-03-04", false),
        ("2026-03-05", true),
        ("2026-03-06", true),
    ];
    for (date, present) in days {
        let resp = test::call_service(
            &app,
            post_json(
                "/api/attendance/mark-bulk",
                &teacher_token,
                json!({
                    "subject_id": subject,
                    "date": date,
                    "attendance": [{"student_id": student, "present": present}]
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }

    let resp = test::call_service(&app, get("/api/attendance/my", &student_token).to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["attendance"], 80);
    assert_eq!(body["total"], 5);
    assert_eq!(body["present"], 4);
    assert_eq!(body["absent"], 1);
}

#[actix_web::test]
async fn check_is_an_idempotent_read() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let path = format!("/api/attendance/check/{subject}/2026-03-02");

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let resp = test::call_service(&app, get(&path, &token).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[0]["records"].as_array().unwrap().len(), 0);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark-bulk",
            &token,
            json!({
                "subject_id": subject,
                "date": "2026-03-02",
                "attendance": [{"student_id": student, "present": true}]
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let resp = test::call_service(&app, get(&path, &token).to_request()).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
    let records = bodies[0]["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["student_name"], "Asha");
}

#[actix_web::test]
async fn check_rejects_bad_date() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);

    let resp = test::call_service(
        &app,
        get(&format!("/api/attendance/check/{subject}/03-02-2026"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn students_cannot_mark_and_anonymous_is_rejected() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let student_token = token_for(&cfg, student, "asha@college.edu", Role::Student);

    let payload = json!({
        "subject": "Mathematics",
        "studentId": student,
        "date": "2026-03-02",
        "status": "Present"
    });

    let resp = test::call_service(
        &app,
        post_json("/api/attendance/mark", &student_token, payload.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);

    let resp = test::call_service(
        &app,
        post_json_anon("/api/attendance/mark", payload).to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn admin_sees_all_records_with_names() {
    let pool = setup_pool().await;
    let cfg = test_config();
    let app = init_app!(pool, cfg);

    let teacher = create_user(&pool, "Mr. Rao", "rao@college.edu", Role::Teacher).await;
    let subject = add_subject(&pool, teacher, "Mathematics").await;
    let student = create_user(&pool, "Asha", "asha@college.edu", Role::Student).await;
    let admin = create_user(&pool, "Root", "root@college.edu", Role::Admin).await;
    let teacher_token = token_for(&cfg, teacher, "rao@college.edu", Role::Teacher);
    let admin_token = token_for(&cfg, admin, "root@college.edu", Role::Admin);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/attendance/mark",
            &teacher_token,
            json!({
                "subject": subject.to_string(),
                "studentId": student,
                "date": "2026-03-02",
                "status": "Absent"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get("/api/attendance/all", &admin_token).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_name"], "Asha");
    assert_eq!(rows[0]["marked_by_name"], "Mr. Rao");
    assert_eq!(rows[0]["status"], "Absent");

    // teachers cannot use the admin listing
    let resp = test::call_service(&app, get("/api/attendance/all", &teacher_token).to_request()).await;
    assert_eq!(resp.status(), 403);
}
