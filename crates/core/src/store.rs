//! RestBackend trait: the row store all durable state lives in.
//!
//! Every read and write goes through a PostgREST-shaped interface: tables of
//! JSON rows, filtered by column equality, optionally ordered and limited.
//! Implementations: Supabase over HTTP, in-memory (for testing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// A single row as returned by the store.
pub type Row = serde_json::Value;

/// An equality filter on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// Sort direction on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc(String),
    Desc(String),
}

/// Which rows a select, update or delete addresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowQuery {
    #[serde(default)]
    pub filters: Vec<Filter>,

    /// Comma-separated column list; `None` selects every column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order::Asc(column.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order::Desc(column.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query-string pairs: `col=eq.v`, `select`, `order`, `limit`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect();
        if let Some(select) = &self.select {
            params.push(("select".into(), select.clone()));
        }
        match &self.order {
            Some(Order::Asc(col)) => params.push(("order".into(), format!("{col}.asc"))),
            Some(Order::Desc(col)) => params.push(("order".into(), format!("{col}.desc"))),
            None => {}
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

/// What a write should hand back (the PostgREST `Prefer: return=` header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    /// Echo the written rows.
    Representation,
    /// Return nothing.
    Minimal,
}

impl Returning {
    pub fn header_value(self) -> &'static str {
        match self {
            Self::Representation => "return=representation",
            Self::Minimal => "return=minimal",
        }
    }
}

/// The core RestBackend trait.
///
/// No transactions, no retries: each call is one independent request.
#[async_trait]
pub trait RestBackend: Send + Sync {
    /// The backend name (e.g., "supabase", "in_memory").
    fn name(&self) -> &str;

    async fn select(&self, table: &str, query: &RowQuery) -> std::result::Result<Vec<Row>, StoreError>;

    /// Insert rows. Returns the written rows for `Returning::Representation`.
    async fn insert(
        &self,
        table: &str,
        rows: Vec<Row>,
        returning: Returning,
    ) -> std::result::Result<Vec<Row>, StoreError>;

    /// Patch every row the query's filters match.
    async fn update(
        &self,
        table: &str,
        query: &RowQuery,
        patch: Row,
        returning: Returning,
    ) -> std::result::Result<Vec<Row>, StoreError>;

    /// Delete every row the query's filters match.
    async fn delete(&self, table: &str, query: &RowQuery) -> std::result::Result<(), StoreError>;
}
