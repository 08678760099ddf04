use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{InteractionsRepo, RepoError};
use crate::domain::entities::InteractionFlags;
use crate::domain::types::InteractionKind;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

fn table_for(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Bookmark => "bookmarks",
        InteractionKind::Favorite => "favorites",
    }
}

#[async_trait]
impl InteractionsRepo for PostgresRepositories {
    async fn toggle(
        &self,
        kind: InteractionKind,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, RepoError> {
        let table = table_for(kind);

        // The (user_id, post_id) unique pair is the concurrency guard: when
        // two toggles race, exactly one insert lands and the loser falls
        // into the delete branch.
        let inserted = sqlx::query(&format!(
            "INSERT INTO {table} (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, post_id) DO NOTHING"
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if inserted == 1 {
            return Ok(true);
        }

        sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = $1 AND post_id = $2"
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(false)
    }

    async fn flags_for(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InteractionFlags>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(sqlx::FromRow)]
        struct FlagRow {
            post_id: Uuid,
            is_bookmarked: bool,
            is_favorited: bool,
        }

        let rows = sqlx::query_as::<_, FlagRow>(
            "SELECT ids.post_id, \
                    EXISTS (SELECT 1 FROM bookmarks b \
                            WHERE b.user_id = $1 AND b.post_id = ids.post_id) AS is_bookmarked, \
                    EXISTS (SELECT 1 FROM favorites f \
                            WHERE f.user_id = $1 AND f.post_id = ids.post_id) AS is_favorited \
             FROM unnest($2::uuid[]) AS ids(post_id)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.post_id,
                    InteractionFlags {
                        is_bookmarked: row.is_bookmarked,
                        is_favorited: row.is_favorited,
                    },
                )
            })
            .collect())
    }
}
