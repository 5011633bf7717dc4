//! Fixtures shared by the catalog tests

use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};

use crate::catalog::{AuthorInput, AuthorStore, NewPaper, PaperStore};
use crate::db::models::{
    Author, AuthorActiveModel, AuthorColumn, AuthorEntity, PaperAuthor, PaperAuthorColumn,
    PaperAuthorEntity,
};
use crate::db::DbPool;

pub async fn stores() -> (DbPool, PaperStore, AuthorStore) {
    let pool = DbPool::in_memory().await.expect("in-memory catalog");
    (pool.clone(), PaperStore::new(pool.clone()), AuthorStore::new(pool))
}

/// Insert a row directly, bypassing the matcher
pub async fn insert_author(
    pool: &DbPool,
    name: &str,
    email: Option<&str>,
    affiliation: Option<&str>,
) -> Author {
    let now = chrono::Utc::now();
    AuthorActiveModel {
        name: Set(name.to_string()),
        email: Set(email.map(str::to_owned)),
        affiliation: Set(affiliation.map(str::to_owned)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(pool.write())
    .await
    .expect("insert author")
}

pub fn paper(title: &str, venue: &str, year: i32, authors: &[&str]) -> NewPaper {
    NewPaper {
        title: title.to_string(),
        published_in: venue.to_string(),
        year,
        authors: authors.iter().map(|name| AuthorInput::named(*name)).collect(),
    }
}

/// Every author and association row, for before/after comparisons
pub async fn snapshot(pool: &DbPool) -> (Vec<Author>, Vec<PaperAuthor>) {
    let authors = AuthorEntity::find()
        .order_by_asc(AuthorColumn::Id)
        .all(pool.read())
        .await
        .expect("load authors");
    let links = PaperAuthorEntity::find()
        .order_by_asc(PaperAuthorColumn::PaperId)
        .order_by_asc(PaperAuthorColumn::AuthorId)
        .all(pool.read())
        .await
        .expect("load associations");
    (authors, links)
}
