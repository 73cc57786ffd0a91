//! Schema bootstrap
//!
//! Tables are generated from the entity definitions so PostgreSQL and
//! SQLite get the same layout. Creation is idempotent.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::debug;

/// Create every table and index that does not exist yet.
///
/// Order follows the foreign keys: a table is created after the tables it
/// references.
pub async fn create_all<C: ConnectionTrait>(db: &C) -> Result<()> {
    create_table(db, AccountEntity).await?;
    create_table(db, ProfileEntity).await?;
    create_table(db, HashtagEntity).await?;
    create_table(db, TweetEntity).await?;
    create_table(db, TweetHashtagEntity).await?;
    create_table(db, FollowEntity).await?;
    create_table(db, LikeEntity).await?;
    create_table(db, RetweetEntity).await?;
    create_table(db, NotificationEntity).await?;
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    debug!(table = entity.table_name(), "Table ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::db::DbPool;

    #[tokio::test]
    async fn test_create_all_is_idempotent() {
        let pool = DbPool::in_memory().await.unwrap();
        super::create_all(pool.write()).await.unwrap();
        pool.ping().await.unwrap();
    }
}
