//! API handlers module

pub mod authors;
pub mod health;
pub mod papers;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use paperbase_common::errors::{AppError, Result};

/// Query string as ordered pairs, so repeated keys survive
pub type QueryPairs = Vec<(String, String)>;

/// Pairs that carry a value; `?year=` is the same as leaving `year` out
pub(crate) fn present(params: &QueryPairs) -> impl Iterator<Item = (&str, &str)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.as_str(), value.as_str()))
}

/// Parse a path id; ids are positive 32-bit integers
pub(crate) fn parse_id(raw: &str) -> Result<i32> {
    let id: i64 = raw.trim().parse().map_err(|_| AppError::InvalidFormat {
        message: "Invalid ID format".to_string(),
    })?;

    match i32::try_from(id) {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::validation("ID must be a positive integer")),
    }
}

/// Unwrap a JSON body, turning axum's rejection into our error envelope
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidFormat {
            message: rejection.body_text(),
        })
}

/// `limit` and `offset` as sent, before range checks
#[derive(Debug, Default)]
pub(crate) struct RawPage {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RawPage {
    /// Consume `limit`/`offset`; returns false for any other key
    pub fn accept(&mut self, key: &str, value: &str, messages: &mut Vec<String>) -> bool {
        match key {
            "limit" => match value.trim().parse::<i64>() {
                Ok(limit) if limit >= 0 => self.limit = Some(limit as u64),
                Ok(_) => messages.push("Limit must be between 1 and 100".to_string()),
                Err(_) => messages.push("Limit must be a valid integer".to_string()),
            },
            "offset" => match value.trim().parse::<i64>() {
                Ok(offset) if offset >= 0 => self.offset = Some(offset as u64),
                Ok(_) => messages.push("Offset cannot be negative".to_string()),
                Err(_) => messages.push("Offset must be a valid integer".to_string()),
            },
            _ => return false,
        }
        true
    }
}

/// Merge parse-time messages with the ones the core reported
pub(crate) fn with_messages<T>(mut messages: Vec<String>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) if messages.is_empty() => Ok(value),
        Ok(_) => Err(AppError::Validation { messages }),
        Err(AppError::Validation { messages: more }) => {
            messages.extend(more);
            messages.dedup();
            Err(AppError::Validation { messages })
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::InvalidFormat { .. })));
        assert!(matches!(parse_id("0"), Err(AppError::Validation { .. })));
        assert!(matches!(parse_id("-3"), Err(AppError::Validation { .. })));
        assert!(matches!(parse_id("99999999999"), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_raw_page() {
        let mut page = RawPage::default();
        let mut messages = Vec::new();

        assert!(page.accept("limit", "25", &mut messages));
        assert!(page.accept("offset", "-1", &mut messages));
        assert!(!page.accept("year", "2001", &mut messages));

        assert_eq!(page.limit, Some(25));
        assert_eq!(page.offset, None);
        assert_eq!(messages, vec!["Offset cannot be negative"]);
    }

    #[test]
    fn test_raw_page_non_integers() {
        let mut page = RawPage::default();
        let mut messages = Vec::new();

        page.accept("limit", "ten", &mut messages);
        page.accept("offset", "1.5", &mut messages);
        page.accept("limit", "-4", &mut messages);

        assert_eq!(page.limit, None);
        assert_eq!(
            messages,
            vec![
                "Limit must be a valid integer",
                "Offset must be a valid integer",
                "Limit must be between 1 and 100",
            ]
        );
    }

    #[test]
    fn test_present_skips_empty_values() {
        let params = vec![
            ("year".to_string(), "".to_string()),
            ("author".to_string(), " ".to_string()),
            ("limit".to_string(), "5".to_string()),
        ];
        let kept: Vec<_> = present(&params).collect();
        assert_eq!(kept, vec![("author", " "), ("limit", "5")]);
    }

    #[test]
    fn test_with_messages_merges() {
        let merged = with_messages::<()>(
            vec!["Offset cannot be negative".into()],
            Err(AppError::validation("Year must be greater than 1900")),
        );
        match merged {
            Err(AppError::Validation { messages }) => assert_eq!(messages.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
