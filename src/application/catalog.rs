//! Catalog query service.
//!
//! The read path for post listings, search, and detail. One request flows
//! through: filter build → pagination → request memo → tagged cache →
//! repository → interaction annotation. The memo and cache steps are pure
//! optimizations; every miss (including a variant mismatch on a cached
//! value) falls through to a live query.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::application::pagination::{Page, PageMeta, PageParams};
use crate::application::repos::{
    CatalogRepo, CategoriesRepo, InteractionsRepo, PostOrdering, RepoError, TagsRepo,
};
use crate::cache::{CachedValue, QueryCache, QueryKey, memo};
use crate::domain::entities::{
    CategoryRecord, InteractionFlags, PostRecord, PostSummary, UserRecord,
};
use crate::domain::filter::{FilterErrors, FilterParams, Predicate, build_post_predicate};
use crate::domain::types::SortOrder;

/// How many related posts a detail response carries.
const RELATED_LIMIT: u32 = 4;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Filter(#[from] FilterErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw listing request as it arrives on the query string.
#[derive(Debug, Clone, Default)]
pub struct ListPostsRequest {
    pub filter: FilterParams,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A listed post with its per-caller interaction flags.
#[derive(Debug, Clone)]
pub struct AnnotatedPost {
    pub post: PostSummary,
    pub flags: InteractionFlags,
}

#[derive(Debug, Clone)]
pub struct PostListPage {
    pub posts: Vec<AnnotatedPost>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub tag_names: Vec<String>,
    pub flags: InteractionFlags,
    pub related: Vec<PostSummary>,
}

pub struct CatalogService {
    posts: Arc<dyn CatalogRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    interactions: Arc<dyn InteractionsRepo>,
    cache: Arc<QueryCache>,
}

impl CatalogService {
    pub fn new(
        posts: Arc<dyn CatalogRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        interactions: Arc<dyn InteractionsRepo>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            interactions,
            cache,
        }
    }

    /// List or search posts.
    pub async fn list_posts(
        &self,
        request: &ListPostsRequest,
        caller: Option<&UserRecord>,
    ) -> Result<PostListPage, CatalogError> {
        let categories = self.preloaded_categories().await?;
        let predicate = build_post_predicate(&request.filter, &categories)?;
        let params = PageParams::from_request(request.page, request.limit);
        let sort = SortOrder::parse(request.sort.as_deref());

        let is_search = predicate.has_text();
        let ordering = match (is_search, sort) {
            // Searches always rank by engagement, then recency.
            (true, _) => PostOrdering::ViewsThenRecency,
            (false, SortOrder::Trending) => PostOrdering::ViewsThenRecency,
            (false, SortOrder::Popular) => PostOrdering::Views,
            (false, SortOrder::Latest) => PostOrdering::Recency,
        };

        let key = if is_search {
            QueryKey::Search {
                filter: predicate.fingerprint(),
                page: params.page(),
                limit: params.limit(),
            }
        } else {
            QueryKey::PostList {
                filter: predicate.fingerprint(),
                ordering,
                page: params.page(),
                limit: params.limit(),
            }
        };

        let page = self.fetch_post_page(key, &predicate, ordering, params).await?;
        let posts = self.annotate(page.items, caller).await?;

        Ok(PostListPage {
            posts,
            meta: page.meta,
        })
    }

    /// Fetch a single post by slug, with tags, related posts, and the
    /// caller's interaction flags. Bumps the view counter fire-and-forget.
    pub async fn post_by_slug(
        &self,
        slug: &str,
        caller: Option<&UserRecord>,
    ) -> Result<Option<PostDetail>, CatalogError> {
        let Some(post) = self.fetch_post(slug).await? else {
            return Ok(None);
        };

        let tag_names = self.tags.list_names_for_post(post.id).await?;
        let related = self.fetch_related(&post).await?;
        let flags = match caller {
            Some(user) => self
                .interactions
                .flags_for(user.id, &[post.id])
                .await?
                .get(&post.id)
                .copied()
                .unwrap_or_default(),
            None => InteractionFlags::default(),
        };

        // The counter bump must never delay or fail the read.
        let posts = Arc::clone(&self.posts);
        let post_id = post.id;
        tokio::spawn(async move {
            if let Err(error) = posts.record_view(post_id).await {
                warn!(error = %error, post_id = %post_id, "failed to record post view");
            }
        });

        Ok(Some(PostDetail {
            post,
            tag_names,
            flags,
            related,
        }))
    }

    /// The most-viewed posts, cached under its own family.
    pub async fn popular_posts(
        &self,
        limit: Option<u32>,
        caller: Option<&UserRecord>,
    ) -> Result<Vec<AnnotatedPost>, CatalogError> {
        let limit = limit.unwrap_or(10).clamp(1, 50);
        let key = QueryKey::Popular { limit };

        let items = if let Some(CachedValue::PostSet(items)) = memo::get(&key) {
            items
        } else if let Some(CachedValue::PostSet(items)) = self.cache.lookup(&key) {
            memo::put(key, CachedValue::PostSet(items.clone()));
            items
        } else {
            let items = self
                .posts
                .list_posts(&Predicate::all(), PostOrdering::Views, limit, 0)
                .await?;
            self.cache
                .store(key.clone(), CachedValue::PostSet(items.clone()));
            memo::put(key, CachedValue::PostSet(items.clone()));
            items
        };

        Ok(self.annotate(items, caller).await?)
    }

    /// The preloaded category list backing slug resolution.
    pub async fn preloaded_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let key = QueryKey::Categories;

        if let Some(CachedValue::Categories(list)) = memo::get(&key) {
            return Ok(list);
        }
        if let Some(CachedValue::Categories(list)) = self.cache.lookup(&key) {
            memo::put(key, CachedValue::Categories(list.clone()));
            return Ok(list);
        }

        let list = self.categories.list_categories().await?;
        self.cache
            .store(key.clone(), CachedValue::Categories(list.clone()));
        memo::put(key, CachedValue::Categories(list.clone()));
        Ok(list)
    }

    async fn fetch_post(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let key = QueryKey::PostBySlug(slug.to_string());

        if let Some(CachedValue::Post(post)) = memo::get(&key) {
            return Ok(Some(post));
        }
        if let Some(CachedValue::Post(post)) = self.cache.lookup(&key) {
            memo::put(key, CachedValue::Post(post.clone()));
            return Ok(Some(post));
        }

        // Absent posts are not negatively cached; a slug published a moment
        // later must become visible on the next request.
        let Some(post) = self.posts.find_post_by_slug(slug).await? else {
            return Ok(None);
        };

        self.cache.store(key.clone(), CachedValue::Post(post.clone()));
        memo::put(key, CachedValue::Post(post.clone()));
        Ok(Some(post))
    }

    async fn fetch_related(&self, post: &PostRecord) -> Result<Vec<PostSummary>, RepoError> {
        let key = QueryKey::Related {
            post_id: post.id,
            limit: RELATED_LIMIT,
        };

        if let Some(CachedValue::PostSet(items)) = memo::get(&key) {
            return Ok(items);
        }
        if let Some(CachedValue::PostSet(items)) = self.cache.lookup(&key) {
            memo::put(key, CachedValue::PostSet(items.clone()));
            return Ok(items);
        }

        let items = self
            .posts
            .list_related(post.id, post.category_id, RELATED_LIMIT)
            .await?;
        self.cache
            .store(key.clone(), CachedValue::PostSet(items.clone()));
        memo::put(key, CachedValue::PostSet(items.clone()));
        Ok(items)
    }

    async fn fetch_post_page(
        &self,
        key: QueryKey,
        predicate: &Predicate,
        ordering: PostOrdering,
        params: PageParams,
    ) -> Result<Page<PostSummary>, RepoError> {
        if let Some(CachedValue::PostPage(page)) = memo::get(&key) {
            return Ok(page);
        }
        if let Some(CachedValue::PostPage(page)) = self.cache.lookup(&key) {
            memo::put(key, CachedValue::PostPage(page.clone()));
            return Ok(page);
        }

        let total = self.posts.count_posts(predicate).await?;
        let meta = PageMeta::compute(total, params);
        let items = if total == 0 || params.offset() >= total {
            Vec::new()
        } else {
            self.posts
                .list_posts(predicate, ordering, params.limit(), params.offset())
                .await?
        };

        let page = Page::new(items, meta);
        self.cache
            .store(key.clone(), CachedValue::PostPage(page.clone()));
        memo::put(key, CachedValue::PostPage(page.clone()));
        Ok(page)
    }

    /// Attach interaction flags. The per-user probe runs only for
    /// authenticated callers; anonymous results carry all-false flags.
    async fn annotate(
        &self,
        items: Vec<PostSummary>,
        caller: Option<&UserRecord>,
    ) -> Result<Vec<AnnotatedPost>, RepoError> {
        let Some(user) = caller else {
            return Ok(items
                .into_iter()
                .map(|post| AnnotatedPost {
                    post,
                    flags: InteractionFlags::default(),
                })
                .collect());
        };

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = items.iter().map(|post| post.id).collect();
        let flags = self.interactions.flags_for(user.id, &ids).await?;

        Ok(items
            .into_iter()
            .map(|post| {
                let post_flags = flags.get(&post.id).copied().unwrap_or_default();
                AnnotatedPost {
                    post,
                    flags: post_flags,
                }
            })
            .collect())
    }
}
