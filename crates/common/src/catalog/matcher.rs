//! Resolves author descriptions to existing rows or new ones

use std::collections::BTreeSet;

use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::debug;

use crate::catalog::identity::AuthorIdentity;
use crate::catalog::input::AuthorInput;
use crate::db::models::{Author, AuthorActiveModel, AuthorColumn, AuthorEntity};
use crate::errors::Result;
use crate::metrics;

/// Outcome of matching one description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An author with the same identity already exists (lowest id wins)
    Existing(Author),
    /// Nothing matched; a row has to be created
    Create(AuthorIdentity),
}

/// Author lookup bound to a connection, normally a unit of work
pub struct AuthorMatcher<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> AuthorMatcher<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Lowest-id author carrying `identity`, if any.
    ///
    /// Rows sharing an identity can exist when they were created outside the
    /// matcher; ordering by id keeps the choice stable however the store
    /// happens to return them.
    pub async fn find_match(&self, identity: &AuthorIdentity) -> Result<Option<Author>> {
        AuthorEntity::find()
            .filter(identity.condition())
            .order_by_asc(AuthorColumn::Id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Match every description without writing anything.
    ///
    /// Repeated identities collapse into one resolution, keeping the first
    /// occurrence's position.
    pub async fn resolve(&self, inputs: &[AuthorInput]) -> Result<Vec<Resolution>> {
        let mut seen = BTreeSet::new();
        let mut resolutions = Vec::with_capacity(inputs.len());

        for input in inputs {
            let identity = AuthorIdentity::from(input);
            if !seen.insert(identity.clone()) {
                continue;
            }

            let resolution = match self.find_match(&identity).await? {
                Some(author) => Resolution::Existing(author),
                None => Resolution::Create(identity),
            };
            resolutions.push(resolution);
        }

        Ok(resolutions)
    }

    /// Match every description and insert rows for the unmatched ones.
    ///
    /// Returns the distinct resolved authors ordered by id. Run inside the same
    /// unit of work as the association rewrite so an abort also removes the
    /// authors created here.
    pub async fn resolve_or_create(&self, inputs: &[AuthorInput]) -> Result<Vec<Author>> {
        let resolutions = self.resolve(inputs).await?;

        let mut authors = Vec::with_capacity(resolutions.len());
        let mut created = 0;

        for resolution in resolutions {
            match resolution {
                Resolution::Existing(author) => authors.push(author),
                Resolution::Create(identity) => {
                    authors.push(self.create(identity).await?);
                    created += 1;
                }
            }
        }

        metrics::record_author_resolution(authors.len() - created, created);
        debug!(
            matched = authors.len() - created,
            created,
            "Authors resolved"
        );

        authors.sort_by_key(|author| author.id);
        authors.dedup_by_key(|author| author.id);
        Ok(authors)
    }

    async fn create(&self, identity: AuthorIdentity) -> Result<Author> {
        let now = chrono::Utc::now();

        let author = AuthorActiveModel {
            name: Set(identity.name),
            email: Set(identity.email),
            affiliation: Set(identity.affiliation),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        author.insert(self.conn).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing;
    use crate::db::DbPool;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_unknown_author_is_marked_for_creation() {
        let pool = DbPool::in_memory().await.unwrap();
        let matcher = AuthorMatcher::new(pool.write());

        let resolutions = matcher
            .resolve(&[AuthorInput::named("Barbara Liskov")])
            .await
            .unwrap();

        assert_eq!(
            resolutions,
            vec![Resolution::Create(AuthorIdentity::new("Barbara Liskov", None, None))]
        );
        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lowest_id_wins_among_duplicates() {
        let pool = DbPool::in_memory().await.unwrap();
        let first = testing::insert_author(&pool, "Edsger Dijkstra", Some("ewd@utexas.edu"), None).await;
        let second = testing::insert_author(&pool, "Edsger Dijkstra", Some("ewd@utexas.edu"), None).await;
        assert!(first.id < second.id);

        let matcher = AuthorMatcher::new(pool.write());
        let identity = AuthorIdentity::new("Edsger Dijkstra", Some("ewd@utexas.edu"), None);
        for _ in 0..3 {
            let found = matcher.find_match(&identity).await.unwrap().unwrap();
            assert_eq!(found.id, first.id);
        }
    }

    #[tokio::test]
    async fn test_null_parts_do_not_match_filled_parts() {
        let pool = DbPool::in_memory().await.unwrap();
        testing::insert_author(&pool, "Tony Hoare", Some("car@ox.ac.uk"), None).await;

        let matcher = AuthorMatcher::new(pool.write());
        let without_email = AuthorIdentity::new("Tony Hoare", None, None);
        assert!(matcher.find_match(&without_email).await.unwrap().is_none());

        let empty_email = AuthorIdentity::new("Tony Hoare", Some(""), None);
        assert!(matcher.find_match(&empty_email).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_description_creates_one_row() {
        let pool = DbPool::in_memory().await.unwrap();
        let matcher = AuthorMatcher::new(pool.write());

        let authors = matcher
            .resolve_or_create(&[
                AuthorInput::named("Leslie Lamport"),
                AuthorInput::named("Leslie Lamport").with_email(""),
            ])
            .await
            .unwrap();

        assert_eq!(authors.len(), 1);
        assert_eq!(AuthorEntity::find().count(pool.read()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolution_set_ignores_input_order() {
        let pool = DbPool::in_memory().await.unwrap();
        let knuth = testing::insert_author(&pool, "Donald Knuth", None, Some("Stanford")).await;
        let matcher = AuthorMatcher::new(pool.write());

        let forward = matcher
            .resolve_or_create(&[
                AuthorInput::named("Donald Knuth").with_affiliation("Stanford"),
                AuthorInput::named("Robert Floyd"),
            ])
            .await
            .unwrap();
        let backward = matcher
            .resolve_or_create(&[
                AuthorInput::named("Robert Floyd"),
                AuthorInput::named("Donald Knuth").with_affiliation("Stanford"),
            ])
            .await
            .unwrap();

        let ids = |authors: &[Author]| authors.iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(&forward), ids(&backward));
        assert_eq!(forward[0].id, knuth.id);
    }
}
