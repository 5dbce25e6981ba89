//! Shared types for the API layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::llm::ReplyGenerator;

/// Shared context for all API routes: where the database lives and how
/// replies are generated. Each request opens its own connection.
#[derive(Clone)]
pub struct ApiContext {
    db_path: PathBuf,
    pub generator: Arc<dyn ReplyGenerator>,
}

impl ApiContext {
    pub fn new(db_path: PathBuf, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self { db_path, generator }
    }

    /// Open a connection to the application database.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }
}

/// Parse and clamp an integer query parameter.
/// Malformed values fall back to the default.
pub fn parse_int_param(
    params: &HashMap<String, String>,
    name: &str,
    default: i64,
    min: Option<i64>,
    max: Option<i64>,
) -> i64 {
    let mut value = params
        .get(name)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default);
    if let Some(min) = min {
        value = value.max(min);
    }
    if let Some(max) = max {
        value = value.min(max);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_valid_value() {
        let p = params(&[("limit", "10")]);
        assert_eq!(parse_int_param(&p, "limit", 20, Some(1), Some(100)), 10);
    }

    #[test]
    fn missing_param_uses_default() {
        let p = params(&[]);
        assert_eq!(parse_int_param(&p, "limit", 20, Some(1), Some(100)), 20);
    }

    #[test]
    fn malformed_param_uses_default() {
        let p = params(&[("limit", "abc")]);
        assert_eq!(parse_int_param(&p, "limit", 20, Some(1), Some(100)), 20);
    }

    #[test]
    fn clamps_to_bounds() {
        let p = params(&[("limit", "-5")]);
        assert_eq!(parse_int_param(&p, "limit", 20, Some(1), Some(100)), 1);

        let p = params(&[("limit", "500")]);
        assert_eq!(parse_int_param(&p, "limit", 20, Some(1), Some(100)), 100);
    }

    #[test]
    fn context_opens_database_at_path() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(
            tmp.path().join("api.db"),
            Arc::new(crate::llm::MockReplyGenerator::replying("ok")),
        );
        let conn = ctx.open_db().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
