//! Wire models for the public and admin APIs.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::catalog::{AnnotatedPost, PostDetail};
use crate::application::pagination::PageMeta;
use crate::domain::entities::{CategoryRecord, PostRecord, PostSummary, TagRecord, UserRecord};
use crate::domain::types::PostStatus;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub premium: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub premium: bool,
    pub views: i64,
    pub category_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_bookmarked: bool,
    pub is_favorited: bool,
}

impl ApiPost {
    pub fn from_annotated(annotated: AnnotatedPost) -> Self {
        let AnnotatedPost { post, flags } = annotated;
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            description: post.description,
            media_url: post.media_url,
            premium: post.premium,
            views: post.views,
            category_id: post.category_id,
            created_at: post.created_at,
            is_bookmarked: flags.is_bookmarked,
            is_favorited: flags.is_favorited,
        }
    }

    pub fn from_summary(post: PostSummary) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            description: post.description,
            media_url: post.media_url,
            premium: post.premium,
            views: post.views,
            category_id: post.category_id,
            created_at: post.created_at,
            is_bookmarked: false,
            is_favorited: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiPostList {
    pub posts: Vec<ApiPost>,
    pub pagination: PageMeta,
}

/// Post detail. Premium content is a presentation-layer policy: the post is
/// always visible, but `content` is withheld (and `locked` set) for callers
/// without premium access.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPostDetail {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub premium: bool,
    pub status: PostStatus,
    pub views: i64,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub related: Vec<ApiPost>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_bookmarked: bool,
    pub is_favorited: bool,
}

impl ApiPostDetail {
    pub fn from_detail(detail: PostDetail, caller: Option<&UserRecord>) -> Self {
        let PostDetail {
            post,
            tag_names,
            flags,
            related,
        } = detail;

        let locked = post.premium
            && !caller
                .map(UserRecord::has_premium_access)
                .unwrap_or(false);
        let content = if locked { None } else { Some(post.content) };

        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            description: post.description,
            content,
            locked,
            media_url: post.media_url,
            premium: post.premium,
            status: post.status,
            views: post.views,
            category_id: post.category_id,
            tags: tag_names,
            related: related.into_iter().map(ApiPost::from_summary).collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
            is_bookmarked: flags.is_bookmarked,
            is_favorited: flags.is_favorited,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookmarkToggleResponse {
    pub success: bool,
    pub bookmarked: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteToggleResponse {
    pub success: bool,
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl From<CategoryRecord> for ApiCategory {
    fn from(category: CategoryRecord) -> Self {
        Self {
            id: category.id,
            slug: category.slug,
            name: category.name,
            description: category.description,
            parent_id: category.parent_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiTag {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl From<TagRecord> for ApiTag {
    fn from(tag: TagRecord) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name: tag.name,
        }
    }
}

/// Admin post form. `tag_ids` arrives comma-separated so the whole form
/// stays flat urlencoded.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub published: bool,
    pub status: PostStatus,
    pub category_id: Uuid,
    pub tag_ids: Option<String>,
}

impl PostForm {
    pub fn parsed_tag_ids(&self) -> Result<Vec<Uuid>, uuid::Error> {
        match self.tag_ids.as_deref() {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => raw.split(',').map(|id| id.trim().parse()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub name: String,
}

/// Serialize a full admin-side post (content always present).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub views: i64,
    pub author_id: Uuid,
    pub category_id: Uuid,
}

impl From<PostRecord> for AdminPost {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            description: post.description,
            content: post.content,
            media_url: post.media_url,
            premium: post.premium,
            published: post.published,
            status: post.status,
            views: post.views,
            author_id: post.author_id,
            category_id: post.category_id,
        }
    }
}
