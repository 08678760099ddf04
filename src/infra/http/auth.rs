//! Current-user resolution.
//!
//! Session handling belongs to the upstream auth provider; by the time a
//! request reaches this service, the provider's proxy has verified the
//! session and stamped the subject into `x-vetrina-user`. This middleware
//! resolves that subject to a user row. A missing header means anonymous;
//! an unknown subject is treated the same way.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::domain::entities::UserRecord;

use super::error::{ApiError, repo_to_api};
use super::state::AppState;

pub const AUTH_SUBJECT_HEADER: &str = "x-vetrina-user";

/// The resolved caller, present on every request after `resolve_current_user`.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<UserRecord>);

impl MaybeUser {
    pub fn as_user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }
}

pub async fn resolve_current_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let subject = request
        .headers()
        .get(AUTH_SUBJECT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let user = match subject {
        Some(subject) if !subject.is_empty() => {
            match state.users.find_by_auth_subject(&subject).await {
                Ok(user) => {
                    if user.is_none() {
                        warn!(subject, "auth subject has no user row");
                    }
                    user
                }
                Err(error) => return repo_to_api(error).into_response(),
            }
        }
        _ => None,
    };

    request.extensions_mut().insert(MaybeUser(user));
    next.run(request).await
}

/// Gate for admin routes: 401 for anonymous callers, 403 for non-admins.
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    let caller = request
        .extensions()
        .get::<MaybeUser>()
        .cloned()
        .unwrap_or_default();

    match caller.as_user() {
        None => ApiError::unauthorized().into_response(),
        Some(user) if !user.is_admin() => {
            ApiError::forbidden("admin role required").into_response()
        }
        Some(_) => next.run(request).await,
    }
}
