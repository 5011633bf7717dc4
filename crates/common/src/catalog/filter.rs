//! Paper listing filters.
//!
//! A query is a flat list of [`PaperFilter`]s that must all hold. Each filter
//! has two interpretations: [`PaperFilter::matches`] evaluates it against a
//! loaded paper, and [`PaperFilter::expr`] turns it into SQL for the store.
//! They agree on ASCII text. Case folding in SQL is the database's `LOWER()`,
//! which on SQLite leaves non-ASCII letters as they are, so there `"ärger"`
//! does not find `"Ärger"` although `matches` would.
//!
//! Author terms are the interesting case. Every term has to be satisfied by
//! *some* author of the paper, and different terms may be satisfied by
//! different authors, so `["alice", "bob"]` keeps a paper written by Alice and
//! Bob but drops one written by Alice alone.

use sea_orm::sea_query::{Expr, Func, LikeExpr, Query, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};

use crate::catalog::input::{Page, DEFAULT_LIMIT};
use crate::db::models::{
    Author, AuthorColumn, AuthorEntity, Paper, PaperAuthorColumn, PaperAuthorEntity, PaperColumn,
    PaperEntity,
};
use crate::errors::{AppError, Result};

/// One predicate over a paper and its authors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperFilter {
    /// Publication year equals
    YearEquals(i32),
    /// Venue contains the substring, ignoring case
    VenueContains(String),
    /// Some author's name contains the substring, ignoring case
    AuthorNameContains(String),
}

impl PaperFilter {
    pub fn matches(&self, paper: &Paper, authors: &[Author]) -> bool {
        match self {
            PaperFilter::YearEquals(year) => paper.year == *year,
            PaperFilter::VenueContains(term) => contains_ignore_case(&paper.published_in, term),
            PaperFilter::AuthorNameContains(term) => authors
                .iter()
                .any(|author| contains_ignore_case(&author.name, term)),
        }
    }

    /// SQL form, evaluated against the `papers` table
    pub fn expr(&self) -> SimpleExpr {
        match self {
            PaperFilter::YearEquals(year) => PaperColumn::Year.eq(*year),
            PaperFilter::VenueContains(term) => {
                lower((PaperEntity, PaperColumn::PublishedIn)).like(contains_pattern(term))
            }
            PaperFilter::AuthorNameContains(term) => {
                // papers.id IN (SELECT paper_id FROM paper_authors JOIN authors ... WHERE lower(name) LIKE ...)
                let linked = Query::select()
                    .column((PaperAuthorEntity, PaperAuthorColumn::PaperId))
                    .from(PaperAuthorEntity)
                    .inner_join(
                        AuthorEntity,
                        Expr::col((AuthorEntity, AuthorColumn::Id))
                            .equals((PaperAuthorEntity, PaperAuthorColumn::AuthorId)),
                    )
                    .and_where(lower((AuthorEntity, AuthorColumn::Name)).like(contains_pattern(term)))
                    .to_owned();

                Expr::col((PaperEntity, PaperColumn::Id)).in_subquery(linked)
            }
        }
    }
}

/// Validated filters plus the page to return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperQuery {
    filters: Vec<PaperFilter>,
    page: Page,
}

impl PaperQuery {
    /// Every paper, first page
    pub fn all() -> Self {
        Self {
            filters: Vec::new(),
            page: Page::default(),
        }
    }

    pub fn builder() -> QueryFilterBuilder {
        QueryFilterBuilder::default()
    }

    pub fn filters(&self) -> &[PaperFilter] {
        &self.filters
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Same query, different window
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    /// In-memory evaluation of the whole filter list
    pub fn matches(&self, paper: &Paper, authors: &[Author]) -> bool {
        self.filters.iter().all(|filter| filter.matches(paper, authors))
    }

    /// SQL condition for the whole filter list; empty means "every paper"
    pub fn condition(&self) -> Condition {
        self.filters
            .iter()
            .fold(Condition::all(), |condition, filter| condition.add(filter.expr()))
    }
}

impl Default for PaperQuery {
    fn default() -> Self {
        Self::all()
    }
}

/// Collects optional listing parameters and validates them into a [`PaperQuery`]
#[derive(Debug, Clone, Default)]
pub struct QueryFilterBuilder {
    year: Option<i32>,
    published_in: Option<String>,
    authors: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryFilterBuilder {
    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn published_in(mut self, venue: Option<impl Into<String>>) -> Self {
        self.published_in = venue.map(Into::into);
        self
    }

    pub fn author(mut self, term: impl Into<String>) -> Self {
        self.authors.push(term.into());
        self
    }

    pub fn authors<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset;
        self
    }

    /// Validate and freeze; every problem is reported, not just the first
    pub fn build(self) -> Result<PaperQuery> {
        let mut messages = Vec::new();
        let mut filters = Vec::new();

        if let Some(year) = self.year {
            if year <= 1900 {
                messages.push("Year must be greater than 1900".to_string());
            }
            filters.push(PaperFilter::YearEquals(year));
        }

        if let Some(venue) = self.published_in {
            if venue.trim().is_empty() {
                messages.push("Invalid publishedIn parameter".to_string());
            }
            filters.push(PaperFilter::VenueContains(venue));
        }

        for term in self.authors {
            if term.trim().is_empty() {
                messages.push("Invalid author parameter".to_string());
                continue;
            }
            filters.push(PaperFilter::AuthorNameContains(term));
        }

        let page = Page::new(
            self.limit.unwrap_or(DEFAULT_LIMIT),
            self.offset.unwrap_or(0),
        );
        if let Err(AppError::Validation { messages: page_messages }) = &page {
            messages.extend(page_messages.iter().cloned());
        }

        if !messages.is_empty() {
            messages.dedup();
            return Err(AppError::Validation { messages });
        }

        Ok(PaperQuery {
            filters,
            page: page?,
        })
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn lower<T>(column: T) -> Expr
where
    T: sea_orm::sea_query::IntoColumnRef,
{
    Expr::expr(Func::lower(Expr::col(column)))
}

/// `%term%` with LIKE metacharacters escaped so they match literally
pub(crate) fn contains_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(&term.to_lowercase()))).escape('\\')
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
