//! Public catalog read handlers.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::response::IntoResponse;

use crate::application::catalog::ListPostsRequest;
use crate::domain::filter::FilterParams;

use crate::infra::http::auth::MaybeUser;
use crate::infra::http::error::{ApiError, catalog_to_api};
use crate::infra::http::models::{
    ApiPost, ApiPostDetail, ApiPostList, PopularQuery, PostListQuery,
};
use crate::infra::http::state::AppState;

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = ListPostsRequest {
        filter: FilterParams {
            q: query.q,
            category: query.category,
            subcategory: query.subcategory,
            premium: query.premium,
        },
        sort: query.sort_by,
        page: query.page,
        limit: query.limit,
    };

    let page = state
        .catalog
        .list_posts(&request, caller.as_user())
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(ApiPostList {
        posts: page.posts.into_iter().map(ApiPost::from_annotated).collect(),
        pagination: page.meta,
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .catalog
        .post_by_slug(&slug, caller.as_user())
        .await
        .map_err(catalog_to_api)?;

    match detail {
        Some(detail) => Ok(Json(ApiPostDetail::from_detail(detail, caller.as_user()))),
        None => Err(ApiError::not_found("post not found")),
    }
}

pub async fn popular_posts(
    State(state): State<AppState>,
    Extension(caller): Extension<MaybeUser>,
    Query(query): Query<PopularQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .catalog
        .popular_posts(query.limit, caller.as_user())
        .await
        .map_err(catalog_to_api)?;

    Ok(Json(
        posts
            .into_iter()
            .map(ApiPost::from_annotated)
            .collect::<Vec<_>>(),
    ))
}
