//! Bookmark/favorite toggle handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;

use crate::domain::types::InteractionKind;

use crate::infra::http::auth::MaybeUser;
use crate::infra::http::error::{ApiError, interaction_to_api};
use crate::infra::http::models::{BookmarkToggleResponse, FavoriteToggleResponse};
use crate::infra::http::state::AppState;

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.as_user().ok_or_else(ApiError::unauthorized)?;

    let bookmarked = state
        .interactions
        .toggle(InteractionKind::Bookmark, user, &slug)
        .await
        .map_err(interaction_to_api)?;

    Ok(Json(BookmarkToggleResponse {
        success: true,
        bookmarked,
    }))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.as_user().ok_or_else(ApiError::unauthorized)?;

    let favorited = state
        .interactions
        .toggle(InteractionKind::Favorite, user, &slug)
        .await
        .map_err(interaction_to_api)?;

    Ok(Json(FavoriteToggleResponse {
        success: true,
        favorited,
    }))
}
