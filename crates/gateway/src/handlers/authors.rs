//! Author management handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::handlers::{json_body, parse_id, present, with_messages, QueryPairs, RawPage};
use crate::AppState;
use paperbase_common::{
    catalog::{AuthorPage, AuthorQuery, AuthorWithPapers, NewAuthor, Page},
    errors::Result,
};

pub async fn create_author(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewAuthor>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthorWithPapers>)> {
    let input = json_body(payload)?;
    let created = state.authors.create_author(input).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List authors filtered by `name` and `affiliation` substrings
pub async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<Json<AuthorPage>> {
    let query = author_query(&params, state.config.catalog.default_page_size)?;
    Ok(Json(state.authors.get_all_authors(&query).await?))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AuthorWithPapers>> {
    let id = parse_id(&id)?;
    Ok(Json(state.authors.get_author_by_id(id).await?))
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<NewAuthor>, JsonRejection>,
) -> Result<Json<AuthorWithPapers>> {
    let id = parse_id(&id)?;
    let input = json_body(payload)?;

    Ok(Json(state.authors.update_author(id, input).await?))
}

/// Delete an author; refused while they are the only author of a paper
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    state.authors.delete_author(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn author_query(params: &QueryPairs, default_limit: u64) -> Result<AuthorQuery> {
    let mut messages = Vec::new();
    let mut page = RawPage::default();
    let mut name = None;
    let mut affiliation = None;

    for (key, value) in present(params) {
        if page.accept(key, value, &mut messages) {
            continue;
        }
        match key {
            "name" => name = Some(value),
            "affiliation" => affiliation = Some(value),
            _ => {}
        }
    }

    let page = Page::new(
        page.limit.unwrap_or(default_limit),
        page.offset.unwrap_or(0),
    );
    let page = with_messages(messages, page)?;

    Ok(AuthorQuery::new(name, affiliation, page))
}
