//! State shared by every backend tool.

use scopepilot_config::{AppConfig, PricingConfig};
use scopepilot_contracts::{ContractError, ContractResult, DocumentDrafter};
use scopepilot_core::error::StoreError;
use scopepilot_core::tool::ToolResult;
use scopepilot_core::domain::{QuoteSummary, WbsRow};
use scopepilot_estimates::compute_quote_summary;
use scopepilot_store::RemoteStore;
use tracing::warn;

pub struct ToolContext {
    pub store: RemoteStore,
    pub pricing: PricingConfig,
    pub drafter: DocumentDrafter,
}

impl ToolContext {
    pub fn new(store: RemoteStore, config: &AppConfig) -> ContractResult<Self> {
        Ok(Self {
            store,
            pricing: config.pricing.clone(),
            drafter: DocumentDrafter::from_config(&config.drafting)?,
        })
    }

    /// WBS rows and their priced summary. Reads that fail count as empty.
    pub async fn quote_summary(&self, estimate_id: &str) -> (Vec<WbsRow>, QuoteSummary) {
        let store = &self.store;
        let rows = store.read_or_default("WBS rows", store.wbs_rows(estimate_id)).await;
        let quote = store.read_or_default("quote", store.quote_record(estimate_id)).await;
        let rates = store.read_or_default("quote rates", store.quote_rates(estimate_id)).await;
        let overrides = store
            .read_or_default("quote overrides", store.quote_overrides(estimate_id))
            .await;

        let summary = compute_quote_summary(
            &rows,
            quote.as_ref(),
            &rates,
            &overrides,
            self.pricing.default_role_rate,
            &self.pricing.default_currency,
        );
        (rows, summary)
    }
}

/// Turn a workflow error into a structured tool failure.
///
/// Raw store errors are prefixed with what was being attempted; everything
/// else already reads as a user-facing sentence.
pub(crate) fn contract_failure(action: &str, err: ContractError) -> ToolResult {
    match err {
        ContractError::Store(StoreError::NotConfigured) => ToolResult::failure(StoreError::NotConfigured.to_string()),
        ContractError::Store(e) => {
            warn!(action, error = %e, "Store request failed");
            ToolResult::failure(format!("Unable to {action}: {e}"))
        }
        other => ToolResult::failure(other.to_string()),
    }
}
