//! Postgres-backed repository implementations.

mod categories;
mod interactions;
mod posts;
mod tags;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;
use crate::domain::filter::{Predicate, TextField};
use crate::domain::types::PostStatus;
use crate::infra::http::HealthCheck;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Posts visible on the public read path: approved and published.
    fn apply_public_scope(qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" AND p.status = ");
        qb.push_bind(PostStatus::Approved);
        qb.push(" AND p.published = TRUE ");
    }

    /// Compile a filter predicate into SQL in one pass.
    ///
    /// The caller has already emitted `WHERE 1=1` (or an open paren); this
    /// appends one parenthesized boolean expression.
    fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
        match predicate {
            Predicate::And(children) => {
                if children.is_empty() {
                    qb.push("TRUE");
                    return;
                }
                qb.push("(");
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        qb.push(" AND ");
                    }
                    Self::push_predicate(qb, child);
                }
                qb.push(")");
            }
            Predicate::Or(children) => {
                if children.is_empty() {
                    qb.push("FALSE");
                    return;
                }
                qb.push("(");
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        qb.push(" OR ");
                    }
                    Self::push_predicate(qb, child);
                }
                qb.push(")");
            }
            Predicate::Field { field, needle } => {
                let column = match field {
                    TextField::Title => "p.title",
                    TextField::Description => "p.description",
                    TextField::Content => "p.content",
                };
                qb.push(column);
                qb.push(" ILIKE ");
                qb.push_bind(like_pattern(needle));
            }
            Predicate::TagName(needle) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM post_tags pt \
                     INNER JOIN tags t ON t.id = pt.tag_id \
                     WHERE pt.post_id = p.id AND t.name ILIKE ",
                );
                qb.push_bind(like_pattern(needle));
                qb.push(")");
            }
            Predicate::CategoryIn(ids) => {
                if ids.is_empty() {
                    qb.push("FALSE");
                } else {
                    qb.push("p.category_id = ANY(");
                    qb.push_bind(ids.clone());
                    qb.push(")");
                }
            }
            Predicate::Premium(premium) => {
                qb.push("p.premium = ");
                qb.push_bind(*premium);
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthCheck for PostgresRepositories {
    async fn healthy(&self) -> bool {
        self.health_check().await.is_ok()
    }
}

/// Wrap a needle in `%...%`, escaping LIKE metacharacters so a search term
/// containing `%` or `_` matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("sunset"), "%sunset%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }
}
