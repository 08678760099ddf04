use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CatalogRepo, CreatePostParams, PostOrdering, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostRecord, PostSummary};
use crate::domain::filter::Predicate;
use crate::domain::types::PostStatus;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str = "p.id, p.slug, p.title, p.description, p.content, p.media_url, \
     p.premium, p.published, p.status, p.views, p.author_id, p.category_id, \
     p.created_at, p.updated_at";

const SUMMARY_COLUMNS: &str = "p.id, p.slug, p.title, p.description, p.media_url, p.premium, \
     p.views, p.category_id, p.created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    slug: String,
    title: String,
    description: String,
    content: String,
    media_url: Option<String>,
    premium: bool,
    published: bool,
    status: PostStatus,
    views: i64,
    author_id: Uuid,
    category_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            description: row.description,
            content: row.content,
            media_url: row.media_url,
            premium: row.premium,
            published: row.published,
            status: row.status,
            views: row.views,
            author_id: row.author_id,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    slug: String,
    title: String,
    description: String,
    media_url: Option<String>,
    premium: bool,
    views: i64,
    category_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<SummaryRow> for PostSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            description: row.description,
            media_url: row.media_url,
            premium: row.premium,
            views: row.views,
            category_id: row.category_id,
            created_at: row.created_at,
        }
    }
}

fn push_ordering(qb: &mut QueryBuilder<'_, sqlx::Postgres>, ordering: PostOrdering) {
    match ordering {
        PostOrdering::Recency => {
            qb.push(" ORDER BY p.created_at DESC, p.id DESC ");
        }
        PostOrdering::Views => {
            qb.push(" ORDER BY p.views DESC, p.id DESC ");
        }
        PostOrdering::ViewsThenRecency => {
            qb.push(" ORDER BY p.views DESC, p.created_at DESC, p.id DESC ");
        }
    }
}

#[async_trait]
impl CatalogRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        predicate: &Predicate,
        ordering: PostOrdering,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM posts p WHERE 1=1 "));
        Self::apply_public_scope(&mut qb);
        qb.push(" AND ");
        Self::push_predicate(&mut qb, predicate);

        push_ordering(&mut qb, ordering);

        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);

        let rows = qb
            .build_query_as::<SummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn count_posts(&self, predicate: &Predicate) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_public_scope(&mut qb);
        qb.push(" AND ");
        Self::push_predicate(&mut qb, predicate);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             WHERE p.slug = $1 AND p.status = $2 AND p.published = TRUE"
        ))
        .bind(slug)
        .bind(PostStatus::Approved)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_post_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        // Unscoped: this lookup backs admin edits, which must see drafts.
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn record_view(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_related(
        &self,
        post_id: Uuid,
        category_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM posts p \
             WHERE p.category_id = $1 AND p.id <> $2 \
               AND p.status = $3 AND p.published = TRUE \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $4"
        ))
        .bind(category_id)
        .bind(post_id)
        .bind(PostStatus::Approved)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts \
             (slug, title, description, content, media_url, premium, published, status, \
              author_id, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&params.slug)
        .bind(&params.title)
        .bind(&params.description)
        .bind(&params.content)
        .bind(&params.media_url)
        .bind(params.premium)
        .bind(params.published)
        .bind(params.status)
        .bind(params.author_id)
        .bind(params.category_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET \
             slug = $2, title = $3, description = $4, content = $5, media_url = $6, \
             premium = $7, published = $8, status = $9, category_id = $10, \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(params.id)
        .bind(&params.slug)
        .bind(&params.title)
        .bind(&params.description)
        .bind(&params.content)
        .bind(&params.media_url)
        .bind(params.premium)
        .bind(params.published)
        .bind(params.status)
        .bind(params.category_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) \
                 SELECT $1, tag_id FROM unnest($2::uuid[]) AS tag_id",
            )
            .bind(post_id)
            .bind(tag_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
