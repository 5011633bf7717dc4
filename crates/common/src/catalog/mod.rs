//! Catalog core
//!
//! Papers and authors joined many-to-many, with:
//! - Author identity matching and deduplication on paper writes
//! - Atomic replacement of a paper's author set
//! - Filtered, paginated paper listing
//! - A guard against deleting the last author of a paper

mod authors;
mod filter;
mod guard;
mod identity;
mod input;
mod matcher;
mod papers;
mod rewriter;
mod unit_of_work;
mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use authors::{AuthorQuery, AuthorStore};
pub use filter::{PaperFilter, PaperQuery, QueryFilterBuilder};
pub use guard::DeletionGuard;
pub use identity::AuthorIdentity;
pub use input::{AuthorInput, NewAuthor, NewPaper, Page, DEFAULT_LIMIT, MAX_LIMIT};
pub use matcher::{AuthorMatcher, Resolution};
pub use papers::PaperStore;
pub use rewriter::{AssociationRewriter, RewriteSummary};
pub use unit_of_work::UnitOfWork;
pub use views::{AuthorPage, AuthorWithPapers, PaperPage, PaperWithAuthors};
