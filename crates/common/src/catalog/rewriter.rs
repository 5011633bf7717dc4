//! Replaces the author set of a paper as one step

use std::collections::BTreeSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::debug;

use crate::catalog::unit_of_work::for_update;
use crate::db::models::{
    Paper, PaperAuthorActiveModel, PaperAuthorColumn, PaperAuthorEntity, PaperEntity,
};
use crate::errors::{AppError, Result};

/// What a rewrite changed, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub removed: u64,
    pub inserted: u64,
}

/// Clear-then-reconnect of association rows.
///
/// Bind it to a [`UnitOfWork`](crate::catalog::UnitOfWork) connection: the two
/// statements are only safe when nobody can observe the state between them.
pub struct AssociationRewriter<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> AssociationRewriter<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Load and lock the paper, failing with `PaperNotFound`.
    ///
    /// Call this before resolving authors so a missing paper aborts the unit
    /// before any author row is written.
    pub async fn ensure_paper(&self, paper_id: i32) -> Result<Paper> {
        for_update(PaperEntity::find_by_id(paper_id), self.conn)
            .one(self.conn)
            .await?
            .ok_or(AppError::PaperNotFound { id: paper_id })
    }

    /// Author ids currently linked to the paper, ascending
    pub async fn current(&self, paper_id: i32) -> Result<Vec<i32>> {
        let links = PaperAuthorEntity::find()
            .filter(PaperAuthorColumn::PaperId.eq(paper_id))
            .order_by_asc(PaperAuthorColumn::AuthorId)
            .all(self.conn)
            .await?;

        Ok(links.into_iter().map(|link| link.author_id).collect())
    }

    /// Make `author_ids` the paper's exact author set.
    ///
    /// Taking `&Paper` means the caller already went through
    /// [`AssociationRewriter::ensure_paper`] or just inserted the row.
    pub async fn replace(&self, paper: &Paper, author_ids: &[i32]) -> Result<RewriteSummary> {
        let ids: BTreeSet<i32> = author_ids.iter().copied().collect();
        if ids.is_empty() {
            return Err(AppError::validation("At least one author is required"));
        }

        let removed = PaperAuthorEntity::delete_many()
            .filter(PaperAuthorColumn::PaperId.eq(paper.id))
            .exec(self.conn)
            .await?
            .rows_affected;

        let links = ids.iter().map(|&author_id| PaperAuthorActiveModel {
            paper_id: Set(paper.id),
            author_id: Set(author_id),
        });

        let inserted = PaperAuthorEntity::insert_many(links)
            .exec_without_returning(self.conn)
            .await?;

        debug!(paper_id = paper.id, removed, inserted, "Associations rewritten");

        Ok(RewriteSummary { removed, inserted })
    }
}
