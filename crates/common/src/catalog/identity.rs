//! Natural key used to recognise an author across paper writes

use sea_orm::{ColumnTrait, Condition};

use crate::catalog::input::{non_empty, AuthorInput, NewAuthor};
use crate::db::models::{Author, AuthorColumn};

/// The `(name, email, affiliation)` triple two author rows must share to be
/// the same person.
///
/// Comparison is exact and case-sensitive. Empty strings are folded into
/// `None` on construction so "absent" and "empty" name the same identity.
/// This is a lookup key only; rows are still addressed by their surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
}

impl AuthorIdentity {
    pub fn new(name: impl Into<String>, email: Option<&str>, affiliation: Option<&str>) -> Self {
        Self {
            name: name.into(),
            email: non_empty(email),
            affiliation: non_empty(affiliation),
        }
    }

    /// Identity of an existing row
    pub fn of(author: &Author) -> Self {
        Self::new(
            author.name.clone(),
            author.email.as_deref(),
            author.affiliation.as_deref(),
        )
    }

    /// In-memory form of [`AuthorIdentity::condition`]
    pub fn matches(&self, author: &Author) -> bool {
        *self == Self::of(author)
    }

    /// SQL predicate selecting the rows that carry this identity.
    ///
    /// A `None` component must match NULL, which `=` never does.
    pub fn condition(&self) -> Condition {
        let email = match &self.email {
            Some(email) => AuthorColumn::Email.eq(email.clone()),
            None => AuthorColumn::Email.is_null(),
        };
        let affiliation = match &self.affiliation {
            Some(affiliation) => AuthorColumn::Affiliation.eq(affiliation.clone()),
            None => AuthorColumn::Affiliation.is_null(),
        };

        Condition::all()
            .add(AuthorColumn::Name.eq(self.name.clone()))
            .add(email)
            .add(affiliation)
    }
}

impl From<&AuthorInput> for AuthorIdentity {
    fn from(input: &AuthorInput) -> Self {
        Self::new(
            input.name.clone(),
            input.email.as_deref(),
            input.affiliation.as_deref(),
        )
    }
}

impl From<&NewAuthor> for AuthorIdentity {
    fn from(input: &NewAuthor) -> Self {
        Self::new(
            input.name.clone(),
            input.email.as_deref(),
            input.affiliation.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, QueryFilter, QueryTrait};

    use crate::db::models::AuthorEntity;

    fn row(name: &str, email: Option<&str>, affiliation: Option<&str>) -> Author {
        let now = chrono::Utc::now().into();
        Author {
            id: 1,
            name: name.into(),
            email: email.map(Into::into),
            affiliation: affiliation.map(Into::into),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_and_absent_are_the_same_identity() {
        let absent = AuthorIdentity::from(&AuthorInput::named("Ada"));
        let empty = AuthorIdentity::from(&AuthorInput::named("Ada").with_email(""));
        assert_eq!(absent, empty);
        assert!(absent.matches(&row("Ada", None, None)));
    }

    #[test]
    fn test_matching_is_exact() {
        let identity = AuthorIdentity::new("Ada Lovelace", Some("ada@x.org"), None);
        assert!(identity.matches(&row("Ada Lovelace", Some("ada@x.org"), None)));
        assert!(!identity.matches(&row("ada lovelace", Some("ada@x.org"), None)));
        assert!(!identity.matches(&row("Ada Lovelace ", Some("ada@x.org"), None)));
        assert!(!identity.matches(&row("Ada Lovelace", Some("ada@x.org"), Some("Analytical"))));
    }

    #[test]
    fn test_condition_uses_is_null_for_missing_parts() {
        let identity = AuthorIdentity::new("Ada", None, Some("Cambridge"));
        let sql = AuthorEntity::find()
            .filter(identity.condition())
            .build(sea_orm::DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""email" IS NULL"#), "{sql}");
        assert!(sql.contains(r#""affiliation" = 'Cambridge'"#), "{sql}");
        assert!(sql.contains(r#""name" = 'Ada'"#), "{sql}");
    }
}
