//! Search request for the enriched citation records endpoint

use crate::error::{Error, ErrorContext};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Upstream refuses pages larger than this.
pub const MAX_ROWS_PER_REQUEST: u32 = 1000;
pub const DEFAULT_ROWS: u32 = 50;

/// A Lucene query against the records endpoint with paging and field selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub criteria: String,
    #[serde(default)]
    pub start: u32,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_rows() -> u32 {
    DEFAULT_ROWS
}

impl SearchRequest {
    pub fn new(criteria: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            start: 0,
            rows: DEFAULT_ROWS,
            fields: Vec::new(),
        }
    }

    pub fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Trimmed, de-duplicated and sorted field names.
    ///
    /// Two requests selecting the same fields in a different order share a
    /// cache key.
    pub fn normalized_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }

    pub fn validate(&self) -> Result<()> {
        if self.criteria.trim().is_empty() {
            return Err(Error::validation_with_context(
                "Criteria cannot be empty",
                ErrorContext::new()
                    .with_field_path("search.criteria")
                    .with_source("request_validator"),
            ));
        }
        if self.rows > MAX_ROWS_PER_REQUEST {
            return Err(Error::validation_with_context(
                format!("Maximum rows is {} per request", MAX_ROWS_PER_REQUEST),
                ErrorContext::new()
                    .with_field_path("search.rows")
                    .with_details(format!("got {}", self.rows))
                    .with_source("request_validator"),
            ));
        }
        Ok(())
    }

    /// Form body for `POST .../records`. `fl` is only sent when fields were selected.
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("criteria", self.criteria.clone()),
            ("start", self.start.to_string()),
            ("rows", self.rows.to_string()),
        ];
        let fields: Vec<&str> = self
            .fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if !fields.is_empty() {
            params.push(("fl", fields.join(",")));
        }
        params
    }
}
