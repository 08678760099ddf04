//! Admin content mutations.
//!
//! Create/update/delete for posts, categories, and tags. Every successful
//! mutation invalidates the affected cache tags through the trigger before
//! returning to the caller.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CatalogRepo, CategoriesRepo, CreateCategoryParams, CreatePostParams, CreateTagParams,
    PostsWriteRepo, RepoError, TagsRepo, UpdateCategoryParams, UpdatePostParams, UpdateTagParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("resource not found")]
    NotFound,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AdminError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => AdminError::NotFound,
            other => AdminError::Repo(other),
        }
    }
}

impl From<SlugAsyncError<RepoError>> for AdminError {
    fn from(error: SlugAsyncError<RepoError>) -> Self {
        match error {
            SlugAsyncError::Slug(inner) => AdminError::Slug(inner),
            SlugAsyncError::Predicate(inner) => inner.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub media_url: Option<String>,
    pub premium: bool,
    pub published: bool,
    pub status: PostStatus,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTagCommand {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagCommand {
    pub id: Uuid,
    pub name: String,
}

pub struct AdminContentService {
    posts_read: Arc<dyn CatalogRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    trigger: Arc<CacheTrigger>,
}

impl AdminContentService {
    pub fn new(
        posts_read: Arc<dyn CatalogRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            posts_read,
            posts_write,
            categories,
            tags,
            trigger,
        }
    }

    pub async fn create_post(&self, command: CreatePostCommand) -> Result<PostRecord, AdminError> {
        self.require_category(command.category_id).await?;

        let slug = generate_unique_slug_async(&command.title, |candidate| {
            let posts = Arc::clone(&self.posts_read);
            let candidate = candidate.to_string();
            async move { Ok::<bool, RepoError>(posts.find_post_by_slug(&candidate).await?.is_none()) }
        })
        .await?;

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                slug,
                title: command.title,
                description: command.description,
                content: command.content,
                media_url: command.media_url,
                premium: command.premium,
                published: command.published,
                status: command.status,
                author_id: command.author_id,
                category_id: command.category_id,
            })
            .await?;

        self.posts_write
            .replace_post_tags(post.id, &command.tag_ids)
            .await?;

        self.trigger.post_upserted(post.id, &post.slug, true);
        info!(post_id = %post.id, slug = %post.slug, "post created");
        Ok(post)
    }

    pub async fn update_post(&self, command: UpdatePostCommand) -> Result<PostRecord, AdminError> {
        let existing = self
            .posts_read
            .find_post_by_id(command.id)
            .await?
            .ok_or(AdminError::NotFound)?;
        self.require_category(command.category_id).await?;

        // Tag replacement below can change what a search matches even when
        // the text columns are untouched, so the tag write always counts.
        let searchable_changed = existing.title != command.title
            || existing.description != command.description
            || existing.content != command.content
            || !command.tag_ids.is_empty();

        // Slugs stay stable across edits so published URLs keep working.
        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id: command.id,
                slug: existing.slug.clone(),
                title: command.title,
                description: command.description,
                content: command.content,
                media_url: command.media_url,
                premium: command.premium,
                published: command.published,
                status: command.status,
                category_id: command.category_id,
            })
            .await?;

        self.posts_write
            .replace_post_tags(post.id, &command.tag_ids)
            .await?;

        self.trigger
            .post_upserted(post.id, &post.slug, searchable_changed);
        info!(post_id = %post.id, slug = %post.slug, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .posts_read
            .find_post_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)?;

        self.posts_write.delete_post(id).await?;
        self.trigger.post_deleted(id, &existing.slug);
        info!(post_id = %id, slug = %existing.slug, "post deleted");
        Ok(())
    }

    pub async fn create_category(
        &self,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, AdminError> {
        if let Some(parent_id) = command.parent_id {
            self.require_root_parent(parent_id, None).await?;
        }

        let slug = self.unique_category_slug(&command.name).await?;
        let category = self
            .categories
            .create_category(CreateCategoryParams {
                slug,
                name: command.name,
                description: command.description,
                parent_id: command.parent_id,
            })
            .await?;

        self.trigger.category_changed();
        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        command: UpdateCategoryCommand,
    ) -> Result<CategoryRecord, AdminError> {
        let existing = self
            .categories
            .find_category_by_id(command.id)
            .await?
            .ok_or(AdminError::NotFound)?;

        if let Some(parent_id) = command.parent_id {
            self.require_root_parent(parent_id, Some(command.id)).await?;

            // A category that has children of its own cannot be nested; the
            // hierarchy is a single level deep.
            let all = self.categories.list_categories().await?;
            if all
                .iter()
                .any(|category| category.parent_id == Some(command.id))
            {
                return Err(DomainError::invariant(
                    "a category with subcategories cannot itself have a parent",
                )
                .into());
            }
        }

        let category = self
            .categories
            .update_category(UpdateCategoryParams {
                id: command.id,
                slug: existing.slug,
                name: command.name,
                description: command.description,
                parent_id: command.parent_id,
            })
            .await?;

        self.trigger.category_changed();
        info!(category_id = %category.id, slug = %category.slug, "category updated");
        Ok(category)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), AdminError> {
        self.categories
            .find_category_by_id(id)
            .await?
            .ok_or(AdminError::NotFound)?;

        self.categories.delete_category(id).await?;
        self.trigger.category_changed();
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn create_tag(&self, command: CreateTagCommand) -> Result<TagRecord, AdminError> {
        let slug = generate_unique_slug_async(&command.name, |candidate| {
            let tags = Arc::clone(&self.tags);
            let candidate = candidate.to_string();
            async move { Ok::<bool, RepoError>(tags.find_tag_by_slug(&candidate).await?.is_none()) }
        })
        .await?;

        let tag = self
            .tags
            .create_tag(CreateTagParams {
                slug,
                name: command.name,
            })
            .await?;

        self.trigger.tag_changed();
        info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    pub async fn update_tag(&self, command: UpdateTagCommand) -> Result<TagRecord, AdminError> {
        let existing = self
            .tags
            .find_tag_by_id(command.id)
            .await?
            .ok_or(AdminError::NotFound)?;

        let tag = self
            .tags
            .update_tag(UpdateTagParams {
                id: command.id,
                slug: existing.slug,
                name: command.name,
            })
            .await?;

        self.trigger.tag_changed();
        info!(tag_id = %tag.id, slug = %tag.slug, "tag updated");
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<(), AdminError> {
        self.tags.delete_tag(id).await?;
        self.trigger.tag_changed();
        info!(tag_id = %id, "tag deleted");
        Ok(())
    }

    async fn require_category(&self, id: Uuid) -> Result<CategoryRecord, AdminError> {
        self.categories
            .find_category_by_id(id)
            .await?
            .ok_or_else(|| DomainError::validation("unknown category").into())
    }

    async fn require_root_parent(
        &self,
        parent_id: Uuid,
        child_id: Option<Uuid>,
    ) -> Result<(), AdminError> {
        if child_id == Some(parent_id) {
            return Err(DomainError::invariant("a category cannot be its own parent").into());
        }

        let parent = self
            .categories
            .find_category_by_id(parent_id)
            .await?
            .ok_or_else(|| AdminError::from(DomainError::validation("unknown parent category")))?;

        if !parent.is_root() {
            return Err(DomainError::invariant(
                "parent must be a root category; the hierarchy is single-level",
            )
            .into());
        }

        Ok(())
    }

    async fn unique_category_slug(&self, name: &str) -> Result<String, AdminError> {
        Ok(generate_unique_slug_async(name, |candidate| {
            let categories = Arc::clone(&self.categories);
            let candidate = candidate.to_string();
            async move {
                Ok::<bool, RepoError>(
                    categories
                        .find_category_by_slug(&candidate)
                        .await?
                        .is_none(),
                )
            }
        })
        .await?)
    }
}
