//! Account handlers shared by all four role routers: signup, login, logout,
//! profile edit and approval status.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::middleware::AuthContext;
use super::password;
use super::token::{generate_token, hash_token};
use crate::db::{self, requests, sessions, users};
use crate::domain::{NewUser, Role, User};
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::services::uploads::{MultipartForm, UploadGuard, UploadKind};
use crate::state::AppState;
use crate::validation::{self, ProfileFields};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn hash_or_internal(password: &str) -> AppResult<String> {
    password::hash_password(password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Open a session for `user_id` and return the client token
fn issue_token(conn: &rusqlite::Connection, user_id: i64, expiry_hours: i64) -> AppResult<String> {
    let token = generate_token();
    sessions::create_session(conn, user_id, &hash_token(&token), expiry_hours)?;
    Ok(token)
}

fn profile_fields(form: &MultipartForm) -> ProfileFields {
    ProfileFields {
        name: form.text_or_empty("name"),
        email: form.text_or_empty("email"),
        phone: form.text_or_empty("phone"),
        password: form.text_or_empty("password"),
    }
}

/// POST /api/{role}/signup - multipart: name, email, phone, password, image?,
/// grade (students), studentId (parents)
pub async fn signup(state: AppState, role: Role, multipart: Multipart) -> AppResult<impl IntoResponse> {
    if role == Role::Admin && !state.config.allow_admin_signup {
        return Err(AppError::forbidden("Admin signup is disabled!"));
    }

    let mut form = MultipartForm::read(multipart).await?;
    let fields = profile_fields(&form).validate()?;
    let grade = match role {
        Role::Student => Some(validation::required(form.text("grade"), "invalid grade!")?),
        _ => None,
    };
    let student_id = match role {
        Role::Parent => Some(validation::parse_id(form.text("studentId"), "invalid student Id!")?),
        _ => None,
    };
    let password_hash = hash_or_internal(&fields.password)?;

    let mut guard = UploadGuard::new();
    let image = state
        .uploads
        .save_opt(UploadKind::Image, form.take_file("image").as_ref(), &mut guard)?
        .unwrap_or_default();

    let (user, token) = {
        let conn = db::try_lock(&state.db)?;
        if users::email_taken(&conn, role, &fields.email, None)? {
            return Err(AppError::unprocessable("User exists already, please login instead."));
        }

        let student_name = match student_id {
            Some(id) => Some(
                users::get_user_with_role(&conn, id, Role::Student)?
                    .ok_or_else(|| AppError::unprocessable("invalid student Id!"))?
                    .name,
            ),
            None => None,
        };

        let tx = conn.unchecked_transaction()?;
        let user_id = users::insert_user(
            &tx,
            &NewUser {
                role,
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                password_hash,
                image,
                grade,
                student_id,
            },
        )?;
        let user = users::get_user(&tx, user_id)?
            .ok_or_else(|| AppError::Internal("Created user vanished".into()))?;
        if role.needs_approval() {
            requests::insert_request(&tx, &user, student_name.as_deref())?;
        }
        let token = issue_token(&tx, user.id, state.config.token_expiry_hours)?;
        tx.commit()?;
        (user, token)
    };

    guard.commit();
    tracing::info!("New {} account {} ({})", role, user.id, user.email);
    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// POST /api/{role}/login - JSON: email, password
pub async fn login(state: AppState, role: Role, ApiJson(body): ApiJson<LoginBody>) -> AppResult<impl IntoResponse> {
    let email = validation::validate_login(&body.email, &body.password)?;

    let conn = db::try_lock(&state.db)?;
    let user = users::find_by_email(&conn, role, &email)?
        .ok_or_else(|| AppError::unauthorized("User is not registered!"))?;
    if !password::verify_password(&body.password, &user.password_hash) {
        tracing::warn!("Failed {} login for {}", role, email);
        return Err(AppError::unauthorized("Invalid password!"));
    }
    let token = issue_token(&conn, user.id, state.config.token_expiry_hours)?;

    Ok(Json(json!({
        "message": "login successful!",
        "user": user,
        "token": token,
    })))
}

/// POST /api/{role}/logout
pub async fn logout(State(state): State<AppState>, auth: AuthContext) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    sessions::delete_session(&conn, &auth.token_hash)?;
    Ok(Json(json!({ "message": "Logged out" })))
}

/// GET /api/{role}/acc-status/{userId}
pub async fn acc_status(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(user_id)?;
    let conn = db::try_lock(&state.db)?;
    let request = requests::get_request_for_user(&conn, user_id)?
        .ok_or_else(|| AppError::not_found("No account request found!"))?;
    Ok(Json(json!({ "status": request.approval })))
}

/// PATCH /api/{role}/edit-profile - multipart: name, email, phone, password, image?
pub async fn edit_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let fields = profile_fields(&form).validate()?;
    let password_hash = hash_or_internal(&fields.password)?;

    let mut guard = UploadGuard::new();
    let new_image = state
        .uploads
        .save_opt(UploadKind::Image, form.take_file("image").as_ref(), &mut guard)?;

    let updated: User = {
        let conn = db::try_lock(&state.db)?;
        if users::email_taken(&conn, auth.role(), &fields.email, Some(auth.user_id()))? {
            return Err(AppError::unprocessable("Email is already used by another account!"));
        }

        let tx = conn.unchecked_transaction()?;
        let update = users::ProfileUpdate {
            name: &fields.name,
            email: &fields.email,
            phone: &fields.phone,
            password_hash: &password_hash,
            image: new_image.as_deref(),
        };
        if !users::update_profile(&tx, auth.user_id(), &update)? {
            return Err(AppError::not_found("User could not be found!"));
        }
        let updated = users::get_user(&tx, auth.user_id())?
            .ok_or_else(|| AppError::not_found("User could not be found!"))?;
        requests::sync_contact_details(&tx, &updated)?;
        tx.commit()?;
        updated
    };

    guard.commit();
    if new_image.is_some() {
        state.uploads.remove(&auth.user.image);
    }
    Ok(Json(json!({ "updatedUser": updated })))
}
