//! In-memory backend: useful for testing and offline demos.
//!
//! Interprets the same [`RowQuery`] the Supabase backend encodes: equality
//! filters, single-column ordering, limit and column projection. Inserted
//! rows get an `id` and `created_at` when they lack one.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use scopepilot_core::error::StoreError;
use scopepilot_core::store::{Order, RestBackend, Returning, Row, RowQuery};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put rows into a table verbatim.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a table's rows in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// Make every request against `table` fail with a 503.
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    async fn check(&self, table: &str) -> Result<(), StoreError> {
        if self.failing.read().await.contains(table) {
            return Err(StoreError::Http {
                table: table.to_string(),
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

fn matches(row: &Row, query: &RowQuery) -> bool {
    query.filters.iter().all(|f| match row.get(&f.column) {
        Some(Value::String(s)) => *s == f.value,
        Some(Value::Number(n)) => n.to_string() == f.value,
        Some(Value::Bool(b)) => b.to_string() == f.value,
        _ => false,
    })
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        // PostgREST sorts nulls last ascending
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn project(row: &Row, select: Option<&str>) -> Row {
    let Some(columns) = select else {
        return row.clone();
    };
    let mut out = serde_json::Map::new();
    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if column == "*" {
            return row.clone();
        }
        out.insert(column.to_string(), row.get(column).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

#[async_trait]
impl RestBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>, StoreError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        match &query.order {
            Some(Order::Asc(col)) => rows.sort_by(|a, b| compare(a.get(col), b.get(col))),
            Some(Order::Desc(col)) => {
                // Newest insert first among equal keys
                rows.reverse();
                rows.sort_by(|a, b| compare(b.get(col), a.get(col)));
            }
            None => {}
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows.iter().map(|r| project(r, query.select.as_deref())).collect())
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Row>,
        returning: Returning,
    ) -> Result<Vec<Row>, StoreError> {
        self.check(table).await?;
        let mut written = Vec::with_capacity(rows.len());
        for mut row in rows {
            let Value::Object(map) = &mut row else {
                return Err(StoreError::Decode {
                    table: table.to_string(),
                    reason: "rows must be JSON objects".into(),
                });
            };
            if !map.contains_key("id") {
                map.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
            if !map.contains_key("created_at") {
                map.insert(
                    "created_at".into(),
                    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
                );
            }
            written.push(row);
        }

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(written.iter().cloned());

        Ok(match returning {
            Returning::Representation => written,
            Returning::Minimal => Vec::new(),
        })
    }

    async fn update(
        &self,
        table: &str,
        query: &RowQuery,
        patch: Row,
        returning: Returning,
    ) -> Result<Vec<Row>, StoreError> {
        self.check(table).await?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::Decode {
                table: table.to_string(),
                reason: "patch must be a JSON object".into(),
            });
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(r, query)) {
                if let Value::Object(map) = row {
                    for (k, v) in &patch {
                        map.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        Ok(match returning {
            Returning::Representation => updated,
            Returning::Minimal => Vec::new(),
        })
    }

    async fn delete(&self, table: &str, query: &RowQuery) -> Result<(), StoreError> {
        self.check(table).await?;
        if let Some(rows) = self.tables.write().await.get_mut(table) {
            rows.retain(|r| !matches(r, query));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn filters_order_limit_and_projection() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                "contract_versions",
                vec![
                    json!({"agreement_id": "a1", "version_number": 1, "content": "v1"}),
                    json!({"agreement_id": "a1", "version_number": 3, "content": "v3"}),
                    json!({"agreement_id": "a2", "version_number": 9, "content": "other"}),
                    json!({"agreement_id": "a1", "version_number": 2, "content": "v2"}),
                ],
            )
            .await;

        let rows = backend
            .select(
                "contract_versions",
                &RowQuery::new()
                    .eq("agreement_id", "a1")
                    .select("version_number")
                    .order_desc("version_number")
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"version_number": 3})]);
    }

    #[tokio::test]
    async fn numeric_filter_matches_number_columns() {
        let backend = InMemoryBackend::new();
        backend.seed("t", vec![json!({"n": 2}), json!({"n": 3})]).await;
        let rows = backend.select("t", &RowQuery::new().eq("n", 3)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let backend = InMemoryBackend::new();
        let rows = backend
            .insert(
                "contract_notes",
                vec![json!({"agreement_id": "a1", "note_text": "hi"})],
                Returning::Representation,
            )
            .await
            .unwrap();
        assert!(rows[0]["id"].is_string());
        assert!(rows[0]["created_at"].is_string());

        let minimal = backend
            .insert("contract_notes", vec![json!({"note_text": "x"})], Returning::Minimal)
            .await
            .unwrap();
        assert!(minimal.is_empty());
        assert_eq!(backend.rows("contract_notes").await.len(), 2);
    }

    #[tokio::test]
    async fn desc_order_prefers_latest_insert_on_ties() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                "contract_review_drafts",
                vec![
                    json!({"agreement_id": "a1", "content": "old", "created_at": "2025-01-01"}),
                    json!({"agreement_id": "a1", "content": "new", "created_at": "2025-01-01"}),
                ],
            )
            .await;
        let rows = backend
            .select(
                "contract_review_drafts",
                &RowQuery::new().eq("agreement_id", "a1").order_desc("created_at").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["content"], "new");
    }

    #[tokio::test]
    async fn update_patches_matching_rows_only() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                "contract_agreements",
                vec![json!({"id": "a1", "current_version": 1}), json!({"id": "a2", "current_version": 1})],
            )
            .await;
        let updated = backend
            .update(
                "contract_agreements",
                &RowQuery::new().eq("id", "a1"),
                json!({"current_version": 2}),
                Returning::Representation,
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        let rows = backend.rows("contract_agreements").await;
        assert_eq!(rows[0]["current_version"], 2);
        assert_eq!(rows[1]["current_version"], 1);
    }

    #[tokio::test]
    async fn delete_removes_matching_rows() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                "estimate_wbs_rows",
                vec![json!({"estimate_id": "e1"}), json!({"estimate_id": "e2"})],
            )
            .await;
        backend
            .delete("estimate_wbs_rows", &RowQuery::new().eq("estimate_id", "e1"))
            .await
            .unwrap();
        assert_eq!(backend.rows("estimate_wbs_rows").await, vec![json!({"estimate_id": "e2"})]);
    }

    #[tokio::test]
    async fn failing_table_returns_http_error() {
        let backend = InMemoryBackend::new();
        backend.fail_table("contract_versions").await;
        let err = backend
            .select("contract_versions", &RowQuery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Http { status: 503, .. }));
        assert!(backend.select("contract_notes", &RowQuery::new()).await.is_ok());
    }
}
