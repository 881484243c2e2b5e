use crate::{
    api::{announcement, attendance, class, student, subject},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/users")
                    // /users
                    .service(web::resource("").route(web::get().to(handlers::list_users)))
                    // /users/teacher
                    .service(
                        web::resource("/teacher").route(web::post().to(handlers::create_teacher)),
                    )
                    // /users/student
                    .service(
                        web::resource("/student").route(web::post().to(handlers::create_student)),
                    )
                    // /users/{id}/role
                    .service(
                        web::resource("/{id}/role")
                            .route(web::patch().to(handlers::update_user_role)),
                    )
                    // /users/{id}
                    .service(web::resource("/{id}").route(web::delete().to(handlers::delete_user))),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("/mark").route(web::post().to(attendance::mark)))
                    .service(
                        web::resource("/mark-bulk").route(web::post().to(attendance::mark_bulk)),
                    )
                    .service(
                        web::resource("/student/{id}")
                            .route(web::get().to(attendance::by_student)),
                    )
                    .service(web::resource("/all").route(web::get().to(attendance::all_records)))
                    .service(web::resource("/my").route(web::get().to(attendance::my_summary)))
                    .service(
                        web::resource("/check/{subject_id}/{date}")
                            .route(web::get().to(attendance::check)),
                    ),
            )
            .service(
                web::scope("/subjects")
                    // /subjects/teacher
                    .service(
                        web::resource("/teacher").route(web::get().to(subject::teacher_subjects)),
                    )
                    // /subjects/my
                    .service(web::resource("/my").route(web::get().to(subject::my_subjects)))
                    // /subjects
                    .service(web::resource("").route(web::get().to(subject::all_subjects)))
                    // /subjects/{subject_id}/students
                    .service(
                        web::resource("/{subject_id}/students")
                            .route(web::get().to(subject::students_for_subject))
                            .route(web::post().to(subject::add_student_to_subject)),
                    ),
            )
            .service(
                web::scope("/classes")
                    // /classes/count
                    .service(web::resource("/count").route(web::get().to(class::count_classes)))
                    // /classes
                    .service(
                        web::resource("")
                            .route(web::post().to(class::create_class))
                            .route(web::get().to(class::list_classes)),
                    )
                    // /classes/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(class::get_class))
                            .route(web::put().to(class::update_class))
                            .route(web::delete().to(class::delete_class)),
                    ),
            )
            .service(
                web::scope("/students")
                    // /students/count
                    .service(web::resource("/count").route(web::get().to(student::count_students)))
                    // /students/by-class/{class_name}
                    .service(
                        web::resource("/by-class/{class_name}")
                            .route(web::get().to(student::by_class)),
                    )
                    // /students
                    .service(web::resource("").route(web::get().to(student::list_students)))
                    // /students/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(student::get_student))
                            .route(web::put().to(student::update_student))
                            .route(web::delete().to(student::delete_student)),
                    ),
            )
            .service(
                web::scope("/announce").service(
                    web::resource("")
                        .route(web::post().to(announcement::create_announcement))
                        .route(web::get().to(announcement::list_announcements)),
                ),
            ),
    );
}
