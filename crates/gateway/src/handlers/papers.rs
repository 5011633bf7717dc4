//! Paper management handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::handlers::{json_body, parse_id, present, with_messages, QueryPairs, RawPage};
use crate::AppState;
use paperbase_common::{
    catalog::{NewPaper, PaperPage, PaperQuery, PaperWithAuthors},
    errors::Result,
};

/// Create a paper, matching or creating its authors
pub async fn create_paper(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewPaper>, JsonRejection>,
) -> Result<(StatusCode, Json<PaperWithAuthors>)> {
    let input = json_body(payload)?;
    let created = state.papers.create_paper(input).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List papers; `author` may repeat and every term must match some author
pub async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<Json<PaperPage>> {
    let query = paper_query(&params, state.config.catalog.default_page_size)?;
    let page = state.papers.get_all_papers(&query).await?;

    Ok(Json(page))
}

pub async fn get_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaperWithAuthors>> {
    let id = parse_id(&id)?;
    Ok(Json(state.papers.get_paper_by_id(id).await?))
}

/// Replace a paper's fields and author set
pub async fn update_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<NewPaper>, JsonRejection>,
) -> Result<Json<PaperWithAuthors>> {
    let id = parse_id(&id)?;
    let input = json_body(payload)?;

    Ok(Json(state.papers.update_paper(id, input).await?))
}

pub async fn delete_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    state.papers.delete_paper(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn paper_query(params: &QueryPairs, default_limit: u64) -> Result<PaperQuery> {
    let mut messages = Vec::new();
    let mut page = RawPage::default();
    let mut builder = PaperQuery::builder();

    for (key, value) in present(params) {
        if page.accept(key, value, &mut messages) {
            continue;
        }
        match key {
            "year" => match value.trim().parse::<i32>() {
                Ok(year) => builder = builder.year(Some(year)),
                Err(_) => messages.push("Year must be a valid integer".to_string()),
            },
            "publishedIn" => builder = builder.published_in(Some(value)),
            "author" => builder = builder.author(value),
            _ => {}
        }
    }

    let built = builder
        .limit(Some(page.limit.unwrap_or(default_limit)))
        .offset(page.offset)
        .build();

    with_messages(messages, built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperbase_common::catalog::{Page, PaperFilter};
    use paperbase_common::AppError;

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_author_terms() {
        let query = paper_query(
            &pairs(&[("author", "alice"), ("author", "bob"), ("year", "2020")]),
            10,
        )
        .unwrap();

        assert_eq!(
            query.filters(),
            &[
                PaperFilter::YearEquals(2020),
                PaperFilter::AuthorNameContains("alice".into()),
                PaperFilter::AuthorNameContains("bob".into()),
            ]
        );
        assert_eq!(query.page(), Page::new(10, 0).unwrap());
    }

    #[test]
    fn test_configured_default_limit() {
        let query = paper_query(&pairs(&[("offset", "20")]), 25).unwrap();
        assert_eq!(query.page(), Page::new(25, 20).unwrap());
    }

    #[test]
    fn test_bad_parameters_are_all_reported() {
        let err = paper_query(
            &pairs(&[("year", "last"), ("limit", "500"), ("offset", "-2"), ("author", " ")]),
            10,
        )
        .unwrap_err();

        match err {
            AppError::Validation { messages } => {
                assert!(messages.contains(&"Year must be a valid integer".to_string()));
                assert!(messages.contains(&"Offset cannot be negative".to_string()));
                assert!(messages.contains(&"Limit must be between 1 and 100".to_string()));
                assert!(messages.contains(&"Invalid author parameter".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_values_are_absent() {
        let query = paper_query(
            &pairs(&[
                ("year", ""),
                ("publishedIn", ""),
                ("author", ""),
                ("limit", ""),
                ("offset", ""),
            ]),
            10,
        )
        .unwrap();

        assert!(query.filters().is_empty());
        assert_eq!(query.page(), Page::new(10, 0).unwrap());
    }

    #[test]
    fn test_year_range_is_checked_after_parsing() {
        let err = paper_query(&pairs(&[("year", "1850")]), 10).unwrap_err();
        match err {
            AppError::Validation { messages } => {
                assert_eq!(messages, vec!["Year must be greater than 1900".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
