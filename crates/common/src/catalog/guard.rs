//! Keeps author deletion from leaving a paper without authors

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::{info, warn};

use crate::catalog::unit_of_work::for_update;
use crate::db::models::{
    Author, AuthorEntity, PaperAuthorColumn, PaperAuthorEntity, PaperColumn, PaperEntity,
};
use crate::errors::{AppError, Result};
use crate::metrics;

/// Gate in front of author removal.
///
/// A paper must keep at least one author, so an author who is the only one
/// on any paper cannot be deleted until a co-author is added or the paper
/// goes away.
pub struct DeletionGuard<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> DeletionGuard<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Ids of the papers `author_id` is the sole author of, ascending
    pub async fn blocking_papers(&self, author_id: i32) -> Result<Vec<i32>> {
        let linked = self.linked_papers(author_id).await?;
        self.lock_papers(&linked).await?;
        self.sole_authored(linked).await
    }

    /// Load the author and confirm it may be removed.
    ///
    /// Papers are locked before the author row, the order a paper rewrite
    /// takes them in when its new links check the author key.
    pub async fn check(&self, author_id: i32) -> Result<Author> {
        let locked = self.linked_papers(author_id).await?;
        self.lock_papers(&locked).await?;

        let author = for_update(AuthorEntity::find_by_id(author_id), self.conn)
            .one(self.conn)
            .await?
            .ok_or(AppError::AuthorNotFound { id: author_id })?;

        // Links committed before the author lock was granted
        let linked = self.linked_papers(author_id).await?;
        let late: Vec<i32> = linked
            .iter()
            .copied()
            .filter(|id| !locked.contains(id))
            .collect();
        self.lock_papers(&late).await?;

        let paper_ids = self.sole_authored(linked).await?;
        if !paper_ids.is_empty() {
            metrics::record_deletion_blocked();
            warn!(author_id, papers = ?paper_ids, "Author deletion blocked");
            return Err(AppError::SoleAuthor {
                author_id,
                paper_ids,
            });
        }

        Ok(author)
    }

    async fn linked_papers(&self, author_id: i32) -> Result<Vec<i32>> {
        Ok(PaperAuthorEntity::find()
            .select_only()
            .column(PaperAuthorColumn::PaperId)
            .filter(PaperAuthorColumn::AuthorId.eq(author_id))
            .order_by_asc(PaperAuthorColumn::PaperId)
            .into_tuple()
            .all(self.conn)
            .await?)
    }

    /// Hold the papers so a concurrent rewrite cannot drop a co-author
    /// between the count and the delete
    async fn lock_papers(&self, paper_ids: &[i32]) -> Result<()> {
        if paper_ids.is_empty() {
            return Ok(());
        }

        for_update(
            PaperEntity::find()
                .filter(PaperColumn::Id.is_in(paper_ids.iter().copied()))
                .order_by_asc(PaperColumn::Id),
            self.conn,
        )
        .all(self.conn)
        .await?;
        Ok(())
    }

    async fn sole_authored(&self, paper_ids: Vec<i32>) -> Result<Vec<i32>> {
        if paper_ids.is_empty() {
            return Ok(Vec::new());
        }

        let counts: Vec<(i32, i64)> = PaperAuthorEntity::find()
            .select_only()
            .column(PaperAuthorColumn::PaperId)
            .column_as(Expr::col(PaperAuthorColumn::AuthorId).count(), "links")
            .filter(PaperAuthorColumn::PaperId.is_in(paper_ids))
            .group_by(PaperAuthorColumn::PaperId)
            .order_by_asc(PaperAuthorColumn::PaperId)
            .into_tuple()
            .all(self.conn)
            .await?;

        Ok(counts
            .into_iter()
            .filter(|&(_, links)| links == 1)
            .map(|(paper_id, _)| paper_id)
            .collect())
    }

    /// Check, then delete the author's association rows and the author row
    pub async fn remove(&self, author_id: i32) -> Result<Author> {
        let author = self.check(author_id).await?;

        let unlinked = PaperAuthorEntity::delete_many()
            .filter(PaperAuthorColumn::AuthorId.eq(author_id))
            .exec(self.conn)
            .await?
            .rows_affected;

        AuthorEntity::delete_by_id(author_id).exec(self.conn).await?;

        info!(author_id, unlinked, "Author removed");
        Ok(author)
    }
}
