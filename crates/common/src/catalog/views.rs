//! Read models returned by the stores

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::db::models::{
    Author, AuthorEntity, Paper, PaperAuthorColumn, PaperAuthorEntity, PaperEntity,
};
use crate::errors::Result;

/// A paper together with its authors, ordered by author id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperWithAuthors {
    #[serde(flatten)]
    pub paper: Paper,
    pub authors: Vec<Author>,
}

impl PaperWithAuthors {
    pub fn author_ids(&self) -> Vec<i32> {
        self.authors.iter().map(|author| author.id).collect()
    }
}

/// An author together with the papers they are linked to, ordered by paper id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorWithPapers {
    #[serde(flatten)]
    pub author: Author,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperPage {
    pub papers: Vec<PaperWithAuthors>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorPage {
    pub authors: Vec<AuthorWithPapers>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Load the authors of every paper with one query, keeping the paper order
pub(crate) async fn attach_authors<C: ConnectionTrait>(
    conn: &C,
    papers: Vec<Paper>,
) -> Result<Vec<PaperWithAuthors>> {
    if papers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = papers.iter().map(|paper| paper.id).collect();
    let rows = PaperAuthorEntity::find()
        .filter(PaperAuthorColumn::PaperId.is_in(ids))
        .order_by_asc(PaperAuthorColumn::AuthorId)
        .find_also_related(AuthorEntity)
        .all(conn)
        .await?;

    let mut by_paper: HashMap<i32, Vec<Author>> = HashMap::new();
    for (link, author) in rows {
        if let Some(author) = author {
            by_paper.entry(link.paper_id).or_default().push(author);
        }
    }

    Ok(papers
        .into_iter()
        .map(|paper| {
            let authors = by_paper.remove(&paper.id).unwrap_or_default();
            PaperWithAuthors { paper, authors }
        })
        .collect())
}

/// Load the papers of every author with one query, keeping the author order
pub(crate) async fn attach_papers<C: ConnectionTrait>(
    conn: &C,
    authors: Vec<Author>,
) -> Result<Vec<AuthorWithPapers>> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = authors.iter().map(|author| author.id).collect();
    let rows = PaperAuthorEntity::find()
        .filter(PaperAuthorColumn::AuthorId.is_in(ids))
        .order_by_asc(PaperAuthorColumn::PaperId)
        .find_also_related(PaperEntity)
        .all(conn)
        .await?;

    let mut by_author: HashMap<i32, Vec<Paper>> = HashMap::new();
    for (link, paper) in rows {
        if let Some(paper) = paper {
            by_author.entry(link.author_id).or_default().push(paper);
        }
    }

    Ok(authors
        .into_iter()
        .map(|author| {
            let papers = by_author.remove(&author.id).unwrap_or_default();
            AuthorWithPapers { author, papers }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing;

    #[tokio::test]
    async fn test_attach_keeps_input_order() {
        let (pool, papers, _) = testing::stores().await;
        let first = papers
            .create_paper(testing::paper("A Relational Model", "CACM", 1970, &["Edgar Codd"]))
            .await
            .unwrap();
        let second = papers
            .create_paper(testing::paper("System R", "TODS", 1976, &["Jim Gray", "Edgar Codd"]))
            .await
            .unwrap();

        let views = attach_authors(pool.read(), vec![second.paper.clone(), first.paper.clone()])
            .await
            .unwrap();

        assert_eq!(views[0].paper.id, second.paper.id);
        assert_eq!(views[0].authors.len(), 2);
        assert!(views[0].authors[0].id < views[0].authors[1].id);
        assert_eq!(views[1].author_ids(), first.author_ids());
    }

    #[tokio::test]
    async fn test_attach_to_nothing() {
        let pool = crate::db::DbPool::in_memory().await.unwrap();
        assert!(attach_authors(pool.read(), Vec::new()).await.unwrap().is_empty());
        assert!(attach_papers(pool.read(), Vec::new()).await.unwrap().is_empty());
    }

    #[test]
    fn test_paper_view_is_flat_camel_case() {
        let now = chrono::Utc::now().into();
        let view = PaperWithAuthors {
            paper: Paper {
                id: 1,
                title: "T".into(),
                published_in: "V".into(),
                year: 2001,
                created_at: now,
                updated_at: now,
            },
            authors: Vec::new(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["publishedIn"], "V");
        assert!(json["authors"].as_array().unwrap().is_empty());
    }
}
