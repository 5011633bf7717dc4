//! Create-if-missing DDL derived from the entities.
//!
//! This is not a migration system: it only creates tables and indexes that do
//! not exist yet, which is what tests and fresh SQLite files need.

use crate::db::models::{
    AuthorColumn, AuthorEntity, PaperAuthorColumn, PaperAuthorEntity, PaperEntity,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Schema};
use tracing::debug;

/// Create the catalog tables and lookup indexes on `conn`
pub async fn bootstrap_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    // Referenced tables first so the association table's foreign keys resolve.
    let mut tables = [
        schema.create_table_from_entity(AuthorEntity),
        schema.create_table_from_entity(PaperEntity),
        schema.create_table_from_entity(PaperAuthorEntity),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        conn.execute(backend.build(&*table)).await?;
    }

    for index in lookup_indexes() {
        conn.execute(backend.build(&index)).await?;
    }

    debug!(backend = ?backend, "Catalog schema ensured");
    Ok(())
}

fn lookup_indexes() -> Vec<IndexCreateStatement> {
    vec![
        // Matcher lookups start from the exact name.
        Index::create()
            .if_not_exists()
            .name("idx_authors_name")
            .table(AuthorEntity)
            .col(AuthorColumn::Name)
            .to_owned(),
        // Deletion guard and author-side joins go through author_id.
        Index::create()
            .if_not_exists()
            .name("idx_paper_authors_author_id")
            .table(PaperAuthorEntity)
            .col(PaperAuthorColumn::AuthorId)
            .to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let pool = DbPool::in_memory().await.unwrap();
        bootstrap_schema(pool.write()).await.unwrap();
        pool.ping().await.unwrap();
    }
}
