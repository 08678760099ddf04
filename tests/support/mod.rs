//! In-memory repositories and router construction for HTTP surface tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use time::OffsetDateTime;
use uuid::Uuid;

use vetrina::application::admin::AdminContentService;
use vetrina::application::catalog::CatalogService;
use vetrina::application::interactions::InteractionService;
use vetrina::application::repos::{
    CatalogRepo, CategoriesRepo, CreateCategoryParams, CreatePostParams, CreateTagParams,
    InteractionsRepo, PostOrdering, PostsWriteRepo, RepoError, TagsRepo, UpdateCategoryParams,
    UpdatePostParams, UpdateTagParams, UsersRepo,
};
use vetrina::cache::{CacheConfig, CacheTrigger, QueryCache};
use vetrina::domain::entities::{
    CategoryRecord, InteractionFlags, PostRecord, PostSummary, TagRecord, UserRecord,
};
use vetrina::domain::filter::{PostFacts, Predicate};
use vetrina::domain::types::{AccountTier, InteractionKind, PostStatus, UserRole};
use vetrina::infra::http::rate_limit::RateLimiter;
use vetrina::infra::http::{AppState, HealthCheck, build_router};

#[derive(Default)]
struct MemoryState {
    posts: Vec<PostRecord>,
    post_tags: HashMap<Uuid, Vec<Uuid>>,
    categories: Vec<CategoryRecord>,
    tags: Vec<TagRecord>,
    users: Vec<UserRecord>,
    bookmarks: HashSet<(Uuid, Uuid)>,
    favorites: HashSet<(Uuid, Uuid)>,
}

/// One in-memory implementation behind every repository trait.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
    /// How many per-user flag probes have executed; anonymous traffic must
    /// never move this.
    pub flag_probes: AtomicUsize,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, subject: &str, role: UserRole, tier: AccountTier) -> UserRecord {
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: format!("{subject}@example.test"),
            name: Some(subject.to_string()),
            role,
            tier,
            auth_subject: subject.to_string(),
            billing_customer_id: None,
            billing_subscription_id: None,
            billing_period_end: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn add_category(&self, slug: &str, parent_id: Option<Uuid>) -> CategoryRecord {
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            parent_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().categories.push(category.clone());
        category
    }

    pub fn add_tag(&self, slug: &str, name: &str) -> TagRecord {
        let tag = TagRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().tags.push(tag.clone());
        tag
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_post(
        &self,
        slug: &str,
        title: &str,
        category_id: Uuid,
        author_id: Uuid,
        premium: bool,
        views: i64,
        created_at: OffsetDateTime,
        tag_ids: &[Uuid],
    ) -> PostRecord {
        let post = PostRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
            content: format!("{title} content"),
            media_url: None,
            premium,
            published: true,
            status: PostStatus::Approved,
            views,
            author_id,
            category_id,
            created_at,
            updated_at: created_at,
        };
        let mut state = self.state.lock().unwrap();
        state.post_tags.insert(post.id, tag_ids.to_vec());
        state.posts.push(post.clone());
        post
    }

    pub fn find_category(&self, slug: &str) -> Option<Uuid> {
        self.state
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|category| category.slug == slug)
            .map(|category| category.id)
    }

    pub fn seed_bookmark(&self, user_id: Uuid, post_id: Uuid) {
        self.state.lock().unwrap().bookmarks.insert((user_id, post_id));
    }

    fn visible_matching(&self, predicate: &Predicate) -> Vec<PostRecord> {
        let state = self.state.lock().unwrap();
        state
            .posts
            .iter()
            .filter(|post| post.status == PostStatus::Approved && post.published)
            .filter(|post| {
                let tag_ids = state.post_tags.get(&post.id).cloned().unwrap_or_default();
                let tag_names: Vec<String> = state
                    .tags
                    .iter()
                    .filter(|tag| tag_ids.contains(&tag.id))
                    .map(|tag| tag.name.clone())
                    .collect();
                let tag_refs: Vec<&str> = tag_names.iter().map(String::as_str).collect();
                predicate.matches(&PostFacts {
                    title: &post.title,
                    description: &post.description,
                    content: &post.content,
                    tag_names: &tag_refs,
                    category_id: post.category_id,
                    premium: post.premium,
                })
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogRepo for MemoryRepo {
    async fn list_posts(
        &self,
        predicate: &Predicate,
        ordering: PostOrdering,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let mut matching = self.visible_matching(predicate);

        match ordering {
            PostOrdering::Recency => {
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            }
            PostOrdering::Views => {
                matching.sort_by(|a, b| b.views.cmp(&a.views).then(b.id.cmp(&a.id)));
            }
            PostOrdering::ViewsThenRecency => {
                matching.sort_by(|a, b| {
                    b.views
                        .cmp(&a.views)
                        .then(b.created_at.cmp(&a.created_at))
                        .then(b.id.cmp(&a.id))
                });
            }
        }

        Ok(matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(PostSummary::from)
            .collect())
    }

    async fn count_posts(&self, predicate: &Predicate) -> Result<u64, RepoError> {
        Ok(self.visible_matching(predicate).len() as u64)
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|post| {
                post.slug == slug && post.status == PostStatus::Approved && post.published
            })
            .cloned())
    }

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn record_view(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(post) = state.posts.iter_mut().find(|post| post.id == id) {
            post.views += 1;
        }
        Ok(())
    }

    async fn list_related(
        &self,
        post_id: Uuid,
        category_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut related: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| {
                post.category_id == category_id
                    && post.id != post_id
                    && post.status == PostStatus::Approved
                    && post.published
            })
            .collect();
        related.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(related
            .into_iter()
            .take(limit as usize)
            .map(PostSummary::from)
            .collect())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepo {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            description: params.description,
            parent_id: params.parent_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let category = state
            .categories
            .iter_mut()
            .find(|category| category.id == params.id)
            .ok_or(RepoError::NotFound)?;
        category.name = params.name;
        category.description = params.description;
        category.parent_id = params.parent_id;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.categories.len();
        state.categories.retain(|category| category.id != id);
        if state.categories.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for MemoryRepo {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        Ok(self.state.lock().unwrap().tags.clone())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tags
            .iter()
            .find(|tag| tag.slug == slug)
            .cloned())
    }

    async fn find_tag_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tags
            .iter()
            .find(|tag| tag.id == id)
            .cloned())
    }

    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let tag = TagRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let tag = state
            .tags
            .iter_mut()
            .find(|tag| tag.id == params.id)
            .ok_or(RepoError::NotFound)?;
        tag.name = params.name;
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.tags.len();
        state.tags.retain(|tag| tag.id != id);
        if state.tags.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_names_for_post(&self, post_id: Uuid) -> Result<Vec<String>, RepoError> {
        let state = self.state.lock().unwrap();
        let ids = state.post_tags.get(&post_id).cloned().unwrap_or_default();
        Ok(state
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .map(|tag| tag.name.clone())
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepo {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            description: params.description,
            content: params.content,
            media_url: params.media_url,
            premium: params.premium,
            published: params.published,
            status: params.status,
            views: 0,
            author_id: params.author_id,
            category_id: params.category_id,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.description = params.description;
        post.content = params.content;
        post.media_url = params.media_url;
        post.premium = params.premium;
        post.published = params.published;
        post.status = params.status;
        post.category_id = params.category_id;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.post_tags.remove(&id);
        Ok(())
    }

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        self.state
            .lock()
            .unwrap()
            .post_tags
            .insert(post_id, tag_ids.to_vec());
        Ok(())
    }
}

#[async_trait]
impl InteractionsRepo for MemoryRepo {
    async fn toggle(
        &self,
        kind: InteractionKind,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.lock().unwrap();
        let set = match kind {
            InteractionKind::Bookmark => &mut state.bookmarks,
            InteractionKind::Favorite => &mut state.favorites,
        };
        if set.insert((user_id, post_id)) {
            Ok(true)
        } else {
            set.remove(&(user_id, post_id));
            Ok(false)
        }
    }

    async fn flags_for(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InteractionFlags>, RepoError> {
        self.flag_probes.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(post_ids
            .iter()
            .map(|post_id| {
                (
                    *post_id,
                    InteractionFlags {
                        is_bookmarked: state.bookmarks.contains(&(user_id, *post_id)),
                        is_favorited: state.favorites.contains(&(user_id, *post_id)),
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepo {
    async fn find_by_auth_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|user| user.auth_subject == subject)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}

#[async_trait]
impl HealthCheck for MemoryRepo {
    async fn healthy(&self) -> bool {
        true
    }
}

pub struct Harness {
    pub router: Router,
    pub repo: Arc<MemoryRepo>,
    pub cache: Arc<QueryCache>,
}

pub fn build_harness(rate_limit_max: u32) -> Harness {
    let repo = Arc::new(MemoryRepo::new());
    let cache = Arc::new(QueryCache::new(CacheConfig::default()));
    let trigger = Arc::new(CacheTrigger::new(cache.clone()));

    let catalog = Arc::new(CatalogService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        cache.clone(),
    ));
    let interactions = Arc::new(InteractionService::new(repo.clone(), repo.clone()));
    let admin = Arc::new(AdminContentService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        trigger,
    ));

    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), rate_limit_max));

    let state = AppState {
        catalog,
        interactions,
        admin,
        users: repo.clone(),
        health: repo.clone(),
        rate_limiter,
    };

    Harness {
        router: build_router(state),
        repo,
        cache,
    }
}
