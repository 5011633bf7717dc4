//! Paper store: create, read, list, update and delete papers with their authors

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::filter::PaperQuery;
use crate::catalog::input::NewPaper;
use crate::catalog::matcher::AuthorMatcher;
use crate::catalog::rewriter::AssociationRewriter;
use crate::catalog::unit_of_work::{for_update, UnitOfWork};
use crate::catalog::views::{attach_authors, PaperPage, PaperWithAuthors};
use crate::db::models::{
    PaperActiveModel, PaperAuthorColumn, PaperAuthorEntity, PaperColumn, PaperEntity,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::OperationTimer;

#[derive(Clone)]
pub struct PaperStore {
    pool: DbPool,
}

impl PaperStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a paper and link its authors, creating the ones that do not
    /// match an existing identity
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_paper(&self, input: NewPaper) -> Result<PaperWithAuthors> {
        let timer = OperationTimer::start("paper", "create");
        input.validate().map_err(AppError::from)?;

        let uow = UnitOfWork::begin(&self.pool, "create_paper").await?;
        let result = insert_paper(uow.conn(), input).await;
        let created = timer.finish(uow.finish(result).await)?;

        info!(
            paper_id = created.paper.id,
            authors = created.authors.len(),
            "Paper created"
        );
        Ok(created)
    }

    pub async fn get_paper_by_id(&self, id: i32) -> Result<PaperWithAuthors> {
        let conn = self.pool.read();
        let paper = PaperEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or(AppError::PaperNotFound { id })?;

        let mut views = attach_authors(conn, vec![paper]).await?;
        views.pop().ok_or(AppError::PaperNotFound { id })
    }

    /// Filtered page of papers in ascending id order, plus the unpaginated total
    #[instrument(skip(self, query), fields(filters = query.filters().len()))]
    pub async fn get_all_papers(&self, query: &PaperQuery) -> Result<PaperPage> {
        let timer = OperationTimer::start("paper", "list");
        let conn = self.pool.read();
        let page = query.page();

        let result = async {
            let select = PaperEntity::find().filter(query.condition());
            let total = select.clone().count(conn).await?;

            let papers = select
                .order_by_asc(PaperColumn::Id)
                .limit(page.limit)
                .offset(page.offset)
                .all(conn)
                .await?;

            Ok::<_, AppError>(PaperPage {
                papers: attach_authors(conn, papers).await?,
                total,
                limit: page.limit,
                offset: page.offset,
            })
        }
        .await;

        timer.finish(result)
    }

    /// Replace a paper's fields and its whole author set in one unit of work
    #[instrument(skip(self, input), fields(paper_id = id))]
    pub async fn update_paper(&self, id: i32, input: NewPaper) -> Result<PaperWithAuthors> {
        let timer = OperationTimer::start("paper", "update");
        input.validate().map_err(AppError::from)?;

        let uow = UnitOfWork::begin(&self.pool, "update_paper").await?;
        let result = rewrite_paper(uow.conn(), id, input).await;
        let updated = timer.finish(uow.finish(result).await)?;

        info!(
            paper_id = id,
            authors = updated.authors.len(),
            "Paper updated"
        );
        Ok(updated)
    }

    /// Remove the paper and its association rows; the authors stay
    #[instrument(skip(self), fields(paper_id = id))]
    pub async fn delete_paper(&self, id: i32) -> Result<()> {
        let timer = OperationTimer::start("paper", "delete");

        let uow = UnitOfWork::begin(&self.pool, "delete_paper").await?;
        let result = remove_paper(uow.conn(), id).await;
        let unlinked = timer.finish(uow.finish(result).await)?;

        info!(paper_id = id, unlinked, "Paper deleted");
        Ok(())
    }
}

async fn insert_paper<C: ConnectionTrait>(conn: &C, input: NewPaper) -> Result<PaperWithAuthors> {
    let authors = AuthorMatcher::new(conn)
        .resolve_or_create(&input.authors)
        .await?;

    let now = Utc::now();
    let paper = PaperActiveModel {
        title: Set(input.title),
        published_in: Set(input.published_in),
        year: Set(input.year),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let ids: Vec<i32> = authors.iter().map(|author| author.id).collect();
    AssociationRewriter::new(conn).replace(&paper, &ids).await?;

    Ok(PaperWithAuthors { paper, authors })
}

async fn rewrite_paper<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    input: NewPaper,
) -> Result<PaperWithAuthors> {
    let rewriter = AssociationRewriter::new(conn);
    let paper = rewriter.ensure_paper(id).await?;

    let authors = AuthorMatcher::new(conn)
        .resolve_or_create(&input.authors)
        .await?;
    let ids: Vec<i32> = authors.iter().map(|author| author.id).collect();
    rewriter.replace(&paper, &ids).await?;

    let mut active: PaperActiveModel = paper.into();
    active.title = Set(input.title);
    active.published_in = Set(input.published_in);
    active.year = Set(input.year);
    active.updated_at = Set(Utc::now().into());
    let paper = active.update(conn).await?;

    Ok(PaperWithAuthors { paper, authors })
}

async fn remove_paper<C: ConnectionTrait>(conn: &C, id: i32) -> Result<u64> {
    for_update(PaperEntity::find_by_id(id), conn)
        .one(conn)
        .await?
        .ok_or(AppError::PaperNotFound { id })?;

    let unlinked = PaperAuthorEntity::delete_many()
        .filter(PaperAuthorColumn::PaperId.eq(id))
        .exec(conn)
        .await?
        .rows_affected;

    PaperEntity::delete_by_id(id).exec(conn).await?;
    Ok(unlinked)
}
