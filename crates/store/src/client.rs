//! Typed access to the estimate and contract tables.
//!
//! [`RemoteStore`] is the only place that knows table names, column lists and
//! PostgREST query shapes. Every operation returns a typed `Result`; callers
//! that want "empty on failure" wrap a read in [`RemoteStore::read_or_default`].

use chrono::{SecondsFormat, Utc};
use scopepilot_config::StoreConfig;
use scopepilot_core::domain::{
    Agreement, AgreementNote, AgreementVersion, Artifact, ArtifactListing, EstimateSummary,
    Exemplar, QuoteRecord, RateOverride, ReviewDraft, RoleRate, WbsRow,
};
use scopepilot_core::error::StoreError;
use scopepilot_core::store::{RestBackend, Returning, Row, RowQuery};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::supabase::SupabaseBackend;

pub mod tables {
    pub const ESTIMATES: &str = "estimates";
    pub const ARTIFACTS: &str = "estimate_artifacts";
    pub const REQUIREMENTS: &str = "estimate_requirements";
    pub const BUSINESS_CASE: &str = "estimate_business_case";
    pub const WBS_ROWS: &str = "estimate_wbs_rows";
    pub const QUOTE: &str = "estimate_quote";
    pub const QUOTE_RATES: &str = "estimate_quote_rates";
    pub const QUOTE_OVERRIDES: &str = "estimate_quote_overrides";
    pub const EXEMPLARS: &str = "contract_exemplars";
    pub const AGREEMENTS: &str = "contract_agreements";
    pub const VERSIONS: &str = "contract_versions";
    pub const NOTES: &str = "contract_notes";
    pub const REVIEW_DRAFTS: &str = "contract_review_drafts";
}

/// Author recorded on notes the copilot writes.
pub const COPILOT_AUTHOR: &str = "Copilot";

const ARTIFACT_LIMIT: usize = 8;
const EXEMPLAR_LIMIT: usize = 10;

/// A new agreement plus the content of its first version.
#[derive(Debug, Clone)]
pub struct NewAgreement {
    pub agreement_type: String,
    pub counterparty: String,
    pub content: String,
    pub linked_estimate_id: Option<String>,
    /// Notes for the version-1 snapshot
    pub version_notes: String,
}

/// Client for the remote row store.
///
/// Built without a backend when credentials are missing; every operation then
/// fails fast with [`StoreError::NotConfigured`].
#[derive(Clone)]
pub struct RemoteStore {
    backend: Option<Arc<dyn RestBackend>>,
    public_base_url: Option<String>,
    exemplar_bucket: String,
}

impl RemoteStore {
    pub fn new(backend: Arc<dyn RestBackend>, public_base_url: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            public_base_url: Some(public_base_url.into().trim_end_matches('/').to_string()),
            exemplar_bucket: "policy-exemplars".into(),
        }
    }

    /// A store with no backend: reads degrade to empty, writes are refused.
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            public_base_url: None,
            exemplar_bucket: "policy-exemplars".into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = match SupabaseBackend::from_config(config) {
            Ok(backend) => {
                info!(url = backend.base_url(), "Remote store configured");
                let base = backend.base_url().to_string();
                Self::new(Arc::new(backend), base)
            }
            Err(StoreError::NotConfigured) => {
                warn!("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set; store-backed tools will degrade");
                Self::unconfigured()
            }
            Err(e) => return Err(e),
        };
        Ok(store.with_exemplar_bucket(config.exemplar_bucket.clone()))
    }

    pub fn with_exemplar_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.exemplar_bucket = bucket.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("none")
    }

    fn backend(&self) -> Result<&dyn RestBackend, StoreError> {
        self.backend.as_deref().ok_or(StoreError::NotConfigured)
    }

    /// Await a read, turning any failure into `T::default()`.
    ///
    /// Missing credentials are expected and logged at debug; anything else is
    /// a warning.
    pub async fn read_or_default<T, F>(&self, what: &str, read: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T, StoreError>>,
    {
        match read.await {
            Ok(value) => value,
            Err(StoreError::NotConfigured) => {
                debug!(what, "Store not configured, using empty result");
                T::default()
            }
            Err(e) => {
                warn!(what, error = %e, "Store read failed, using empty result");
                T::default()
            }
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: RowQuery,
    ) -> Result<Vec<T>, StoreError> {
        let rows = self.backend()?.select(table, &query).await?;
        decode(table, rows)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: RowQuery,
    ) -> Result<Option<T>, StoreError> {
        Ok(self.select(table, query.limit(1)).await?.into_iter().next())
    }

    async fn insert_one<T: DeserializeOwned>(&self, table: &str, row: Row) -> Result<T, StoreError> {
        let written = self
            .backend()?
            .insert(table, vec![row.clone()], Returning::Representation)
            .await?;
        // PostgREST may return nothing under restrictive policies; echo the payload
        let row = written.into_iter().next().unwrap_or(row);
        decode_one(table, row)
    }

    // --- Estimates ---

    pub async fn estimate(&self, estimate_id: &str) -> Result<Option<EstimateSummary>, StoreError> {
        self.select_one(
            tables::ESTIMATES,
            RowQuery::new().eq("id", estimate_id).select("id,name,owner,stage"),
        )
        .await
    }

    /// The newest artifacts for an estimate.
    pub async fn artifacts(&self, estimate_id: &str) -> Result<Vec<Artifact>, StoreError> {
        self.select(
            tables::ARTIFACTS,
            RowQuery::new()
                .eq("estimate_id", estimate_id)
                .select("filename,created_at,size_bytes")
                .order_desc("created_at")
                .limit(ARTIFACT_LIMIT),
        )
        .await
    }

    /// Artifacts, keeping a load failure as a value for display.
    pub async fn artifact_listing(&self, estimate_id: &str) -> ArtifactListing {
        match self.artifacts(estimate_id).await {
            Ok(artifacts) => ArtifactListing::Loaded(artifacts),
            Err(StoreError::NotConfigured) => ArtifactListing::Loaded(Vec::new()),
            Err(e) => {
                warn!(estimate_id, error = %e, "Unable to load artifacts");
                ArtifactListing::Unavailable(e.to_string())
            }
        }
    }

    pub async fn requirements_content(&self, estimate_id: &str) -> Result<String, StoreError> {
        self.content_of(tables::REQUIREMENTS, estimate_id).await
    }

    pub async fn business_case_content(&self, estimate_id: &str) -> Result<String, StoreError> {
        self.content_of(tables::BUSINESS_CASE, estimate_id).await
    }

    async fn content_of(&self, table: &str, estimate_id: &str) -> Result<String, StoreError> {
        let row: Option<Row> = self
            .select_one(table, RowQuery::new().eq("estimate_id", estimate_id).select("content"))
            .await?;
        Ok(row
            .and_then(|r| r.get("content").and_then(|c| c.as_str()).map(String::from))
            .unwrap_or_default())
    }

    pub async fn wbs_rows(&self, estimate_id: &str) -> Result<Vec<WbsRow>, StoreError> {
        self.select(
            tables::WBS_ROWS,
            RowQuery::new()
                .eq("estimate_id", estimate_id)
                .select("id,task_code,description,role,hours,assumptions,sort_order")
                .order_asc("sort_order"),
        )
        .await
    }

    pub async fn quote_record(&self, estimate_id: &str) -> Result<Option<QuoteRecord>, StoreError> {
        self.select_one(
            tables::QUOTE,
            RowQuery::new()
                .eq("estimate_id", estimate_id)
                .select("currency,payment_terms,delivery_timeline,delivered"),
        )
        .await
    }

    pub async fn quote_rates(&self, estimate_id: &str) -> Result<Vec<RoleRate>, StoreError> {
        self.select(
            tables::QUOTE_RATES,
            RowQuery::new().eq("estimate_id", estimate_id).select("role,rate"),
        )
        .await
    }

    pub async fn quote_overrides(&self, estimate_id: &str) -> Result<Vec<RateOverride>, StoreError> {
        self.select(
            tables::QUOTE_OVERRIDES,
            RowQuery::new().eq("estimate_id", estimate_id).select("wbs_row_id,rate"),
        )
        .await
    }

    /// Replace an estimate's WBS: delete every row, then insert `rows` in order.
    pub async fn replace_wbs_rows(&self, estimate_id: &str, rows: &[WbsRow]) -> Result<(), StoreError> {
        let backend = self.backend()?;
        backend
            .delete(tables::WBS_ROWS, &RowQuery::new().eq("estimate_id", estimate_id))
            .await?;

        if rows.is_empty() {
            return Ok(());
        }

        let payload: Vec<Row> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                json!({
                    "estimate_id": estimate_id,
                    "task_code": row.task_code,
                    "description": row.description,
                    "role": row.role,
                    "hours": row.hours,
                    "assumptions": row.assumptions,
                    "sort_order": idx,
                })
            })
            .collect();
        backend.insert(tables::WBS_ROWS, payload, Returning::Minimal).await?;
        info!(estimate_id, count = rows.len(), "WBS rows replaced");
        Ok(())
    }

    // --- Contracts ---

    /// The newest exemplars of a contract type, with their public download URL.
    pub async fn exemplars(&self, contract_type: &str) -> Result<Vec<Exemplar>, StoreError> {
        let mut exemplars: Vec<Exemplar> = self
            .select(
                tables::EXEMPLARS,
                RowQuery::new()
                    .select("id,title,type,summary,storage_path,tags,uploaded_by,created_at")
                    .eq("type", contract_type)
                    .order_desc("created_at")
                    .limit(EXEMPLAR_LIMIT),
            )
            .await?;
        for exemplar in &mut exemplars {
            exemplar.public_url = self.exemplar_url(exemplar.storage_path.as_deref());
        }
        Ok(exemplars)
    }

    fn exemplar_url(&self, storage_path: Option<&str>) -> Option<String> {
        let base = self.public_base_url.as_deref()?;
        let path = storage_path?.trim_start_matches('/');
        Some(format!(
            "{base}/storage/v1/object/public/{}/{path}",
            self.exemplar_bucket
        ))
    }

    pub async fn agreement(&self, agreement_id: &str) -> Result<Option<Agreement>, StoreError> {
        self.select_one(
            tables::AGREEMENTS,
            RowQuery::new()
                .eq("id", agreement_id)
                .select("id,type,counterparty,content,current_version,linked_estimate_id"),
        )
        .await
    }

    pub async fn latest_review_draft(&self, agreement_id: &str) -> Result<Option<ReviewDraft>, StoreError> {
        self.select_one(
            tables::REVIEW_DRAFTS,
            RowQuery::new()
                .eq("agreement_id", agreement_id)
                .select("agreement_id,content,created_at")
                .order_desc("created_at"),
        )
        .await
    }

    pub async fn save_review_draft(&self, draft: &ReviewDraft) -> Result<ReviewDraft, StoreError> {
        let row = serde_json::to_value(draft).map_err(|e| StoreError::Decode {
            table: tables::REVIEW_DRAFTS.into(),
            reason: e.to_string(),
        })?;
        self.insert_one(tables::REVIEW_DRAFTS, row).await
    }

    /// Highest stored version number for an agreement, if any.
    pub async fn latest_version_number(&self, agreement_id: &str) -> Result<Option<u32>, StoreError> {
        let row: Option<Row> = self
            .select_one(
                tables::VERSIONS,
                RowQuery::new()
                    .eq("agreement_id", agreement_id)
                    .select("version_number")
                    .order_desc("version_number"),
            )
            .await?;
        Ok(row
            .and_then(|r| r.get("version_number").and_then(|v| v.as_u64()))
            .and_then(|v| u32::try_from(v).ok()))
    }

    pub async fn versions(&self, agreement_id: &str) -> Result<Vec<AgreementVersion>, StoreError> {
        self.select(
            tables::VERSIONS,
            RowQuery::new()
                .eq("agreement_id", agreement_id)
                .order_asc("version_number"),
        )
        .await
    }

    pub async fn insert_version(&self, version: &AgreementVersion) -> Result<AgreementVersion, StoreError> {
        let row = json!({
            "agreement_id": version.agreement_id,
            "version_number": version.version_number,
            "content": version.content,
            "notes": version.notes,
        });
        self.insert_one(tables::VERSIONS, row).await
    }

    /// Point the agreement at new content and version number.
    pub async fn update_agreement_content(
        &self,
        agreement_id: &str,
        content: &str,
        current_version: u32,
    ) -> Result<(), StoreError> {
        let patch = json!({
            "content": content,
            "current_version": current_version,
            "updated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        self.backend()?
            .update(
                tables::AGREEMENTS,
                &RowQuery::new().eq("id", agreement_id),
                patch,
                Returning::Representation,
            )
            .await?;
        Ok(())
    }

    pub async fn notes(&self, agreement_id: &str, limit: usize) -> Result<Vec<AgreementNote>, StoreError> {
        self.select(
            tables::NOTES,
            RowQuery::new()
                .eq("agreement_id", agreement_id)
                .select("note_text,created_at")
                .order_desc("created_at")
                .limit(limit),
        )
        .await
    }

    pub async fn add_note(
        &self,
        agreement_id: &str,
        note_text: &str,
        created_by: &str,
    ) -> Result<AgreementNote, StoreError> {
        let row = json!({
            "agreement_id": agreement_id,
            "note_text": note_text,
            "created_by": created_by,
        });
        self.insert_one(tables::NOTES, row).await
    }

    /// Insert an agreement at version 1 together with its first snapshot.
    pub async fn create_agreement(&self, new: NewAgreement) -> Result<Agreement, StoreError> {
        let row = json!({
            "type": new.agreement_type,
            "counterparty": new.counterparty,
            "content": new.content,
            "linked_estimate_id": new.linked_estimate_id,
            "current_version": 1,
        });
        let written = self
            .backend()?
            .insert(tables::AGREEMENTS, vec![row], Returning::Representation)
            .await?;
        let row = written.into_iter().next().ok_or_else(|| StoreError::Decode {
            table: tables::AGREEMENTS.into(),
            reason: "Failed to create agreement".into(),
        })?;
        let agreement: Agreement = decode_one(tables::AGREEMENTS, row)?;

        self.insert_version(&AgreementVersion {
            agreement_id: agreement.id.clone(),
            version_number: 1,
            content: new.content,
            notes: Some(new.version_notes),
            created_at: None,
        })
        .await?;

        info!(agreement_id = %agreement.id, agreement_type = %agreement.agreement_type, "Agreement created");
        Ok(agreement)
    }
}

fn decode<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(|row| decode_one(table, row)).collect()
}

fn decode_one<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode {
        table: table.to_string(),
        reason: e.to_string(),
    })
}
