//! Explicit transaction boundary for multi-row catalog writes

use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait, QuerySelect, Select,
    TransactionTrait,
};
use tracing::{debug, warn};

use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics;

/// One all-or-nothing group of writes.
///
/// Every statement issued through [`UnitOfWork::conn`] commits together or
/// not at all. Dropping a unit of work without committing rolls it back, so
/// a cancelled request leaves nothing behind.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    label: &'static str,
}

impl UnitOfWork {
    /// Open a transaction on the primary connection
    pub async fn begin(pool: &DbPool, label: &'static str) -> Result<Self> {
        let txn = pool
            .write()
            .begin()
            .await
            .map_err(|e| AppError::Transaction {
                message: format!("{}: begin failed: {}", label, e),
            })?;

        debug!(unit = label, "Unit of work started");
        Ok(Self { txn, label })
    }

    /// Connection bound to this transaction
    pub fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub async fn commit(self) -> Result<()> {
        let label = self.label;
        self.txn.commit().await.map_err(|e| AppError::Transaction {
            message: format!("{}: commit failed: {}", label, e),
        })?;

        debug!(unit = label, "Unit of work committed");
        Ok(())
    }

    /// Roll back everything written so far
    pub async fn abort(self) {
        let label = self.label;
        metrics::record_unit_of_work_aborted();

        // A failed rollback still discards the transaction when the
        // connection returns to the pool.
        if let Err(e) = self.txn.rollback().await {
            warn!(unit = label, error = %e, "Rollback failed");
        } else {
            debug!(unit = label, "Unit of work aborted");
        }
    }

    /// Commit on `Ok`, abort on `Err`, and hand the result back
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                self.abort().await;
                Err(err)
            }
        }
    }
}

/// Row-lock the selected rows until the surrounding transaction ends.
///
/// SQLite has no `FOR UPDATE`; its writers are already serialised.
pub(crate) fn for_update<E, C>(select: Select<E>, conn: &C) -> Select<E>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    match conn.get_database_backend() {
        DbBackend::Sqlite => select,
        _ => select.lock_exclusive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AuthorActiveModel, AuthorEntity};
    use sea_orm::{ActiveModelTrait, PaginatorTrait, Set};

    async fn insert_author(uow: &UnitOfWork, name: &str) {
        let now = chrono::Utc::now();
        AuthorActiveModel {
            name: Set(name.to_string()),
            email: Set(None),
            affiliation: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(uow.conn())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let pool = DbPool::in_memory().await.unwrap();
        let uow = UnitOfWork::begin(&pool, "test").await.unwrap();
        insert_author(&uow, "Grace Hopper").await;
        uow.commit().await.unwrap();

        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_abort_discards() {
        let pool = DbPool::in_memory().await.unwrap();
        let uow = UnitOfWork::begin(&pool, "test").await.unwrap();
        insert_author(&uow, "Grace Hopper").await;
        uow.abort().await;

        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drop_discards() {
        let pool = DbPool::in_memory().await.unwrap();
        {
            let uow = UnitOfWork::begin(&pool, "test").await.unwrap();
            insert_author(&uow, "Grace Hopper").await;
        }

        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_finish_routes_on_result() {
        let pool = DbPool::in_memory().await.unwrap();

        let uow = UnitOfWork::begin(&pool, "test").await.unwrap();
        insert_author(&uow, "Kept").await;
        uow.finish(Ok(())).await.unwrap();

        let uow = UnitOfWork::begin(&pool, "test").await.unwrap();
        insert_author(&uow, "Dropped").await;
        let failed: Result<()> = uow.finish(Err(AppError::validation("nope"))).await;
        assert!(failed.is_err());

        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 1);
    }
}
