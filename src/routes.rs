//! Router assembly: one router per role under `/api/{role}`, upload serving
//! and the cross-cutting layers.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::handlers::{self as account, LoginBody};
use crate::auth::{require_role, RoleGate};
use crate::domain::Role;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::handlers::{admin, educator, parent, shared, student};
use crate::paths::{self, UPLOADS_DIR, UPLOAD_SUBDIRS};
use crate::state::AppState;

/// Build the complete application router
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .nest("/api/admin", admin_routes(&state))
        .nest("/api/educator", educator_routes(&state))
        .nest("/api/student", student_routes(&state))
        .nest("/api/parent", parent_routes(&state));

    for subdir in UPLOAD_SUBDIRS {
        let dir = paths::upload_subdir(state.uploads.root(), subdir);
        router = router.nest_service(&format!("/{}/{}", UPLOADS_DIR, subdir), ServeDir::new(dir));
    }

    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::not_found("Could not find this route!")
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
}

/// Account routes every role has, wrapped around the role's own `approved` routes.
///
/// signup and login are public; logout and acc-status only need a valid
/// token of the role; everything else also needs an approved account.
fn with_account_routes(state: &AppState, role: Role, approved: Router<AppState>) -> Router<AppState> {
    let public = Router::new()
        .route(
            "/signup",
            post(move |State(state): State<AppState>, multipart: Multipart| {
                account::signup(state, role, multipart)
            }),
        )
        .route(
            "/login",
            post(move |State(state): State<AppState>, body: ApiJson<LoginBody>| {
                account::login(state, role, body)
            }),
        );

    let mut any_status = Router::new().route("/logout", post(account::logout));
    if role.needs_approval() {
        any_status = any_status.route("/acc-status/{id}", get(account::acc_status));
    }
    let any_status =
        any_status.route_layer(from_fn_with_state(RoleGate::any_status(state, role), require_role));

    let approved = approved
        .route("/edit-profile", patch(account::edit_profile))
        .route_layer(from_fn_with_state(RoleGate::approved(state, role), require_role));

    public.merge(any_status).merge(approved)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let request_routes = |router: Router<AppState>, path: &str, role: Role| {
        router.route(
            path,
            get(move |State(state): State<AppState>| admin::list_requests(state, role)).patch(
                move |State(state): State<AppState>, body: ApiJson<admin::DecisionBody>| {
                    admin::decide_request(state, role, body)
                },
            ),
        )
    };

    let routes = Router::new()
        .route("/topics", get(admin::dashboard))
        .route(
            "/subjects",
            get(shared::list_subjects)
                .post(admin::create_subject)
                .patch(admin::update_subject),
        )
        .route("/subject/{id}", delete(admin::delete_subject))
        .route("/chapters", post(admin::create_chapter).patch(admin::rename_chapter))
        .route("/chapters/{id}", get(admin::list_chapters))
        .route("/chapter/{id}", delete(admin::delete_chapter))
        .route("/sections", post(admin::create_section).patch(admin::rename_section))
        .route(
            "/sections/{id}",
            get(admin::list_sections).delete(admin::delete_section),
        )
        .route("/topics/{id}", get(admin::list_topic_details))
        .route("/topic/{id}", delete(shared::delete_topic));
    let routes = request_routes(routes, "/educator-requests", Role::Educator);
    let routes = request_routes(routes, "/student-requests", Role::Student);
    let routes = request_routes(routes, "/parent-requests", Role::Parent);

    with_account_routes(state, Role::Admin, routes)
}

/// Comment routes shared by educators and students
fn comment_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/comments/{id}", get(shared::list_comments))
        .route("/comment", post(shared::add_comment))
        .route(
            "/comment/{id}",
            patch(shared::edit_comment).delete(shared::delete_comment),
        )
}

fn educator_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/subjects", get(shared::list_subjects))
        .route("/registered-subjects/{id}", get(educator::registered_subjects))
        .route("/register", post(educator::register))
        .route(
            "/unregister/{educator_id}/{subject_id}",
            delete(educator::unregister),
        )
        .route("/view-students/{id}", get(educator::view_students))
        .route("/chapters/{id}", get(shared::chapter_summaries))
        .route("/sections/{id}", get(shared::section_summaries))
        .route("/topics/{id}", get(shared::list_topics))
        .route("/topic", post(educator::create_topic))
        .route(
            "/topic/{id}",
            get(shared::get_topic)
                .patch(educator::update_topic)
                .delete(shared::delete_topic),
        )
        .route("/quiz", post(educator::create_quiz))
        .route(
            "/quiz/{id}",
            get(educator::quiz_for_section).delete(educator::delete_quiz),
        )
        .route("/question", post(educator::create_question))
        .route(
            "/quiz-stats-students/{subject_id}/{quiz_id}",
            get(educator::quiz_stats),
        );

    with_account_routes(state, Role::Educator, comment_routes(routes))
}

fn student_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/subjects", get(shared::list_subjects))
        .route("/enrolled-subjects/{id}", get(student::enrolled_subjects))
        .route("/enroll", post(student::enroll))
        .route("/chapters/{id}", get(shared::chapter_summaries))
        .route("/sections/{id}", get(shared::section_summaries))
        .route("/topics/{id}", get(shared::list_topics))
        .route("/topic/{id}", get(shared::get_topic))
        .route(
            "/favorites/{subject_id}/{student_id}",
            get(student::favorites_in_subject),
        )
        .route("/favorite", post(student::add_favorite))
        .route(
            "/favorite/{student_id}/{topic_id}",
            get(student::get_favorite).delete(student::delete_favorite),
        )
        .route("/answer", post(student::create_answer))
        .route("/single-answer", post(student::put_single_answer))
        .route("/answer/{id}", get(student::answer_for_quiz))
        .route("/answers/{id}", get(student::single_answers))
        .route("/quiz/{id}", get(student::get_quiz))
        .route("/quiz-record", post(student::save_record))
        .route(
            "/quiz-records/{student_id}/{subject_id}",
            get(student::records_in_subject),
        )
        .route(
            "/quiz-records-for-chapter/{student_id}/{subject_id}/{chapter_id}",
            get(student::records_in_chapter),
        )
        .route(
            "/quiz-record/{student_id}/{section_id}",
            get(student::record_for_section),
        );

    with_account_routes(state, Role::Student, comment_routes(routes))
}

fn parent_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/student-details/{id}", get(parent::student_details))
        .route("/student-progress/{id}", get(parent::student_progress))
        .route("/quiz-records/subjects/{id}", get(parent::enrolled_subjects))
        .route("/get-contacts/{id}", get(parent::contacts));

    with_account_routes(state, Role::Parent, routes)
}
