//! Author store: explicit author management, outside the matcher

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::filter::{contains_pattern, lower};
use crate::catalog::guard::DeletionGuard;
use crate::catalog::input::{non_empty, NewAuthor, Page};
use crate::catalog::unit_of_work::{for_update, UnitOfWork};
use crate::catalog::views::{attach_papers, AuthorPage, AuthorWithPapers};
use crate::db::models::{Author, AuthorActiveModel, AuthorColumn, AuthorEntity};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::OperationTimer;

/// Author listing parameters; both filters are case-insensitive substrings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorQuery {
    pub name: Option<String>,
    pub affiliation: Option<String>,
    pub page: Page,
}

impl AuthorQuery {
    /// Blank filters are treated as absent
    pub fn new(name: Option<&str>, affiliation: Option<&str>, page: Page) -> Self {
        Self {
            name: non_empty(name.map(str::trim)),
            affiliation: non_empty(affiliation.map(str::trim)),
            page,
        }
    }

    pub fn matches(&self, author: &Author) -> bool {
        let contains = |value: Option<&str>, term: &Option<String>| match term {
            Some(term) => value
                .map(|v| v.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(false),
            None => true,
        };

        contains(Some(author.name.as_str()), &self.name)
            && contains(author.affiliation.as_deref(), &self.affiliation)
    }

    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(name) = &self.name {
            condition = condition
                .add(lower((AuthorEntity, AuthorColumn::Name)).like(contains_pattern(name)));
        }
        if let Some(affiliation) = &self.affiliation {
            condition = condition.add(
                lower((AuthorEntity, AuthorColumn::Affiliation)).like(contains_pattern(affiliation)),
            );
        }
        condition
    }
}

#[derive(Clone)]
pub struct AuthorStore {
    pool: DbPool,
}

impl AuthorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert an author as given. No identity matching happens here, so this
    /// can create a row that duplicates an existing identity.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_author(&self, input: NewAuthor) -> Result<AuthorWithPapers> {
        let timer = OperationTimer::start("author", "create");
        input.validate().map_err(AppError::from)?;

        let now = Utc::now();
        let result = AuthorActiveModel {
            name: Set(input.name),
            email: Set(non_empty(input.email.as_deref())),
            affiliation: Set(non_empty(input.affiliation.as_deref())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.pool.write())
        .await
        .map_err(AppError::from);
        let author = timer.finish(result)?;

        info!(author_id = author.id, "Author created");
        Ok(AuthorWithPapers {
            author,
            papers: Vec::new(),
        })
    }

    pub async fn get_author_by_id(&self, id: i32) -> Result<AuthorWithPapers> {
        let conn = self.pool.read();
        let author = AuthorEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or(AppError::AuthorNotFound { id })?;

        let mut views = attach_papers(conn, vec![author]).await?;
        views.pop().ok_or(AppError::AuthorNotFound { id })
    }

    #[instrument(skip(self, query))]
    pub async fn get_all_authors(&self, query: &AuthorQuery) -> Result<AuthorPage> {
        let timer = OperationTimer::start("author", "list");
        let conn = self.pool.read();
        let page = query.page;

        let result = async {
            let select = AuthorEntity::find().filter(query.condition());
            let total = select.clone().count(conn).await?;

            let authors = select
                .order_by_asc(AuthorColumn::Id)
                .limit(page.limit)
                .offset(page.offset)
                .all(conn)
                .await?;

            Ok::<_, AppError>(AuthorPage {
                authors: attach_papers(conn, authors).await?,
                total,
                limit: page.limit,
                offset: page.offset,
            })
        }
        .await;

        timer.finish(result)
    }

    /// Overwrite the author's fields in place. Papers keep pointing at the
    /// same row, and an identity collision with another row is left alone.
    #[instrument(skip(self, input), fields(author_id = id))]
    pub async fn update_author(&self, id: i32, input: NewAuthor) -> Result<AuthorWithPapers> {
        let timer = OperationTimer::start("author", "update");
        input.validate().map_err(AppError::from)?;

        let uow = UnitOfWork::begin(&self.pool, "update_author").await?;
        let result = overwrite_author(uow.conn(), id, input).await;
        let updated = timer.finish(uow.finish(result).await)?;

        info!(author_id = id, "Author updated");
        Ok(updated)
    }

    /// Delete the author unless that would leave a paper without authors
    #[instrument(skip(self), fields(author_id = id))]
    pub async fn delete_author(&self, id: i32) -> Result<()> {
        let timer = OperationTimer::start("author", "delete");

        let uow = UnitOfWork::begin(&self.pool, "delete_author").await?;
        let result = DeletionGuard::new(uow.conn()).remove(id).await;
        timer.finish(uow.finish(result).await)?;

        Ok(())
    }
}

async fn overwrite_author<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    input: NewAuthor,
) -> Result<AuthorWithPapers> {
    let author = for_update(AuthorEntity::find_by_id(id), conn)
        .one(conn)
        .await?
        .ok_or(AppError::AuthorNotFound { id })?;

    let mut active: AuthorActiveModel = author.into();
    active.name = Set(input.name);
    active.email = Set(non_empty(input.email.as_deref()));
    active.affiliation = Set(non_empty(input.affiliation.as_deref()));
    active.updated_at = Set(Utc::now().into());
    let author = active.update(conn).await?;

    let mut views = attach_papers(conn, vec![author]).await?;
    views.pop().ok_or(AppError::AuthorNotFound { id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing;

    fn new_author(name: &str, email: Option<&str>, affiliation: Option<&str>) -> NewAuthor {
        NewAuthor {
            name: name.to_string(),
            email: email.map(str::to_owned),
            affiliation: affiliation.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn test_create_normalises_empty_optionals() {
        let (_, _, authors) = testing::stores().await;
        let created = authors
            .create_author(new_author("Frances Allen", Some(""), Some("IBM")))
            .await
            .unwrap();

        assert_eq!(created.author.email, None);
        assert_eq!(created.author.affiliation.as_deref(), Some("IBM"));
        assert!(created.papers.is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let (_, _, authors) = testing::stores().await;
        let err = authors
            .create_author(new_author("   ", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_author_reads_include_papers() {
        let (_, papers, authors) = testing::stores().await;
        let first = papers
            .create_paper(testing::paper("ALGOL 60", "CACM", 1960, &["John Backus", "Peter Naur"]))
            .await
            .unwrap();
        let second = papers
            .create_paper(testing::paper("Can Programming Be Liberated", "CACM", 1978, &["John Backus"]))
            .await
            .unwrap();
        let backus = first.authors[0].id;

        let view = authors.get_author_by_id(backus).await.unwrap();
        let ids: Vec<i32> = view.papers.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.paper.id, second.paper.id]);

        assert!(matches!(
            authors.get_author_by_id(404).await.unwrap_err(),
            AppError::AuthorNotFound { id: 404 }
        ));
    }

    #[tokio::test]
    async fn test_listing_filters_and_pages() {
        let (_, _, authors) = testing::stores().await;
        for (name, affiliation) in [
            ("Alice Smith", Some("MIT")),
            ("Alicia Keys", Some("Stanford")),
            ("Bob Smith", Some("mit csail")),
            ("Carol White", None),
        ] {
            authors
                .create_author(new_author(name, None, affiliation))
                .await
                .unwrap();
        }

        let list = |name: Option<&str>, affiliation: Option<&str>, page: Page| {
            let query = AuthorQuery::new(name, affiliation, page);
            let authors = authors.clone();
            async move { authors.get_all_authors(&query).await.unwrap() }
        };
        let names = |page: &AuthorPage| {
            page.authors
                .iter()
                .map(|a| a.author.name.clone())
                .collect::<Vec<_>>()
        };

        let smiths = list(Some("SMITH"), None, Page::default()).await;
        assert_eq!(names(&smiths), vec!["Alice Smith", "Bob Smith"]);

        let mit_smiths = list(Some("smith"), Some("mit"), Page::default()).await;
        assert_eq!(mit_smiths.total, 2);

        let alice_mit = list(Some("ali"), Some("mit"), Page::default()).await;
        assert_eq!(names(&alice_mit), vec!["Alice Smith"]);

        let everyone = list(Some(""), None, Page::new(2, 2).unwrap()).await;
        assert_eq!(everyone.total, 4);
        assert_eq!(names(&everyone), vec!["Bob Smith", "Carol White"]);
    }

    #[test]
    fn test_query_matches_in_memory() {
        let now = chrono::Utc::now().into();
        let author = Author {
            id: 1,
            name: "Barbara Liskov".into(),
            email: None,
            affiliation: None,
            created_at: now,
            updated_at: now,
        };

        assert!(AuthorQuery::new(Some("lisk"), None, Page::default()).matches(&author));
        assert!(!AuthorQuery::new(None, Some("mit"), Page::default()).matches(&author));
        assert!(AuthorQuery::new(Some(" "), None, Page::default()).matches(&author));
    }

    #[tokio::test]
    async fn test_update_keeps_paper_links() {
        let (_, papers, authors) = testing::stores().await;
        let paper = papers
            .create_paper(testing::paper("Abstraction Mechanisms in CLU", "CACM", 1977, &["B. Liskov"]))
            .await
            .unwrap();
        let id = paper.authors[0].id;

        let updated = authors
            .update_author(id, new_author("Barbara Liskov", Some("liskov@mit.edu"), Some("MIT")))
            .await
            .unwrap();

        assert_eq!(updated.author.id, id);
        assert_eq!(updated.author.name, "Barbara Liskov");
        assert_eq!(updated.papers.len(), 1);

        let refreshed = papers.get_paper_by_id(paper.paper.id).await.unwrap();
        assert_eq!(refreshed.authors[0].name, "Barbara Liskov");

        assert!(matches!(
            authors.update_author(999, new_author("Nobody", None, None)).await.unwrap_err(),
            AppError::AuthorNotFound { id: 999 }
        ));
    }

    #[tokio::test]
    async fn test_sole_author_unblocks_after_co_author_or_paper_removal() {
        let (_, papers, authors) = testing::stores().await;
        let paper = papers
            .create_paper(testing::paper("Lisp", "CACM", 1960, &["John McCarthy"]))
            .await
            .unwrap();
        let mccarthy = paper.authors[0].id;

        let err = authors.delete_author(mccarthy).await.unwrap_err();
        assert!(matches!(err, AppError::SoleAuthor { .. }));
        assert_eq!(papers.get_paper_by_id(paper.paper.id).await.unwrap().authors.len(), 1);

        papers
            .update_paper(
                paper.paper.id,
                testing::paper("Lisp", "CACM", 1960, &["John McCarthy", "Steve Russell"]),
            )
            .await
            .unwrap();
        authors.delete_author(mccarthy).await.unwrap();

        let remaining = papers.get_paper_by_id(paper.paper.id).await.unwrap();
        assert_eq!(remaining.authors.len(), 1);
        assert_eq!(remaining.authors[0].name, "Steve Russell");

        let solo = papers
            .create_paper(testing::paper("Worse Is Better", "AI Expert", 1991, &["Richard Gabriel"]))
            .await
            .unwrap();
        let gabriel = solo.authors[0].id;
        papers.delete_paper(solo.paper.id).await.unwrap();
        authors.delete_author(gabriel).await.unwrap();

        assert!(matches!(
            authors.delete_author(gabriel).await.unwrap_err(),
            AppError::AuthorNotFound { .. }
        ));
    }
}
