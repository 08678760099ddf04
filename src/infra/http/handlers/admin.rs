//! Admin content mutation handlers.
//!
//! All routes here sit behind the admin gate and CSRF validation. Bodies
//! are form-encoded.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use uuid::Uuid;

use crate::application::admin::{
    CreateCategoryCommand, CreatePostCommand, CreateTagCommand, UpdateCategoryCommand,
    UpdatePostCommand, UpdateTagCommand,
};

use crate::infra::http::auth::MaybeUser;
use crate::infra::http::error::{ApiError, admin_to_api};
use crate::infra::http::models::{AdminPost, ApiCategory, ApiTag, CategoryForm, PostForm, TagForm};
use crate::infra::http::state::AppState;

fn parse_tag_ids(form: &PostForm) -> Result<Vec<Uuid>, ApiError> {
    form.parsed_tag_ids()
        .map_err(|err| ApiError::bad_request("invalid tag_ids", Some(err.to_string())))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Form(form): Form<PostForm>,
) -> Result<impl IntoResponse, ApiError> {
    // The admin gate has already run; the caller is present here.
    let author = caller.as_user().ok_or_else(ApiError::unauthorized)?;
    let tag_ids = parse_tag_ids(&form)?;

    let post = state
        .admin
        .create_post(CreatePostCommand {
            title: form.title,
            description: form.description,
            content: form.content,
            media_url: form.media_url,
            premium: form.premium,
            published: form.published,
            status: form.status,
            author_id: author.id,
            category_id: form.category_id,
            tag_ids,
        })
        .await
        .map_err(admin_to_api)?;

    Ok((StatusCode::CREATED, Json(AdminPost::from(post))))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<PostForm>,
) -> Result<impl IntoResponse, ApiError> {
    let tag_ids = parse_tag_ids(&form)?;

    let post = state
        .admin
        .update_post(UpdatePostCommand {
            id,
            title: form.title,
            description: form.description,
            content: form.content,
            media_url: form.media_url,
            premium: form.premium,
            published: form.published,
            status: form.status,
            category_id: form.category_id,
            tag_ids,
        })
        .await
        .map_err(admin_to_api)?;

    Ok(Json(AdminPost::from(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.admin.delete_post(id).await.map_err(admin_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .admin
        .create_category(CreateCategoryCommand {
            name: form.name,
            description: form.description,
            parent_id: form.parent_id,
        })
        .await
        .map_err(admin_to_api)?;

    Ok((StatusCode::CREATED, Json(ApiCategory::from(category))))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<CategoryForm>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .admin
        .update_category(UpdateCategoryCommand {
            id,
            name: form.name,
            description: form.description,
            parent_id: form.parent_id,
        })
        .await
        .map_err(admin_to_api)?;

    Ok(Json(ApiCategory::from(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admin
        .delete_category(id)
        .await
        .map_err(admin_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_tag(
    State(state): State<AppState>,
    Form(form): Form<TagForm>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .admin
        .create_tag(CreateTagCommand { name: form.name })
        .await
        .map_err(admin_to_api)?;

    Ok((StatusCode::CREATED, Json(ApiTag::from(tag))))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<TagForm>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .admin
        .update_tag(UpdateTagCommand {
            id,
            name: form.name,
        })
        .await
        .map_err(admin_to_api)?;

    Ok(Json(ApiTag::from(tag)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.admin.delete_tag(id).await.map_err(admin_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
