//! Authentication middleware and extractors.
//!
//! Each role router puts its protected routes behind [`require_role`]. The
//! gate resolves the bearer token, checks the user's role (and, unless the
//! route is usable while pending, their approval), then stores an
//! [`AuthContext`] in the request extensions for handlers to extract.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use super::token::hash_token;
use crate::db::{self, requests, sessions};
use crate::domain::{Approval, Role, User};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Authenticated request context.
/// Add this as a handler parameter on routes behind [`require_role`].
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
    /// Hash of the presented token, identifies the session for logout
    pub token_hash: String,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Reject unless the request acts on the caller's own account
    pub fn ensure_self(&self, user_id: i64) -> AppResult<()> {
        if self.user.id == user_id {
            Ok(())
        } else {
            Err(AppError::forbidden("You are not allowed to access this account!"))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication failed!"))
    }
}

/// Gate configuration for one group of routes
#[derive(Clone)]
pub struct RoleGate {
    pub state: AppState,
    pub role: Role,
    /// Pending and declined accounts may pass (logout, acc-status)
    pub allow_unapproved: bool,
}

impl RoleGate {
    pub fn approved(state: &AppState, role: Role) -> Self {
        Self { state: state.clone(), role, allow_unapproved: false }
    }

    pub fn any_status(state: &AppState, role: Role) -> Self {
        Self { state: state.clone(), role, allow_unapproved: true }
    }
}

/// Resolve a bearer token to its user
pub async fn authenticate(parts: &mut Parts, state: &AppState) -> AppResult<AuthContext> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized("Authentication failed!"))?;

    let token_hash = hash_token(bearer.token());
    let conn = db::try_lock(&state.db)?;
    let user = sessions::get_session_user(&conn, &token_hash)?.ok_or_else(|| {
        tracing::debug!("Rejected unknown or expired token");
        AppError::unauthorized("Authentication failed!")
    })?;

    Ok(AuthContext { user, token_hash })
}

/// Middleware: require a signed-in user of the gate's role
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let auth = authenticate(&mut parts, &gate.state).await?;

    if auth.role() != gate.role {
        tracing::warn!(
            "User {} with role {} tried to use {} routes",
            auth.user_id(),
            auth.role(),
            gate.role
        );
        return Err(AppError::forbidden("You are not allowed to perform this action!"));
    }

    if !gate.allow_unapproved && auth.role().needs_approval() {
        let conn = db::try_lock(&gate.state.db)?;
        let approval = requests::get_request_for_user(&conn, auth.user_id())?
            .map(|r| r.approval)
            .unwrap_or(Approval::Pending);
        if approval != Approval::Approved {
            return Err(AppError::forbidden(format!(
                "Your account is {}, wait for an admin to approve it!",
                approval.as_str()
            )));
        }
    }

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}
