//! Agreement workflows for ScopePilot.
//!
//! Everything the copilot does to a contract lives here:
//!
//! - **review**: scan agreement text against house policy and emit
//!   [`Proposal`]s (replace-or-append edits with a rationale).
//! - **redline**: apply a selection of proposals to content.
//! - **versioning**: persist the result as the next agreement version.
//! - **validation**: check a SOW against the estimate it was drafted from.
//! - **drafting**: render MSA and SOW documents from an estimate.
//!
//! # Flow
//!
//! ```text
//! ┌──────────────┐    ┌────────────┐    ┌────────────┐    ┌─────────────┐
//! │ review draft │───▶│  Proposals │───▶│  redline   │───▶│ new version │
//! │ or agreement │    │ prop-1..4  │    │ (selected) │    │ + note      │
//! └──────────────┘    └────────────┘    └────────────┘    └─────────────┘
//! ```

pub mod drafting;
pub mod redline;
pub mod review;
pub mod validation;
pub mod versioning;

pub use drafting::{DocumentDrafter, MsaInput, Party, SowInput};
pub use redline::{ApplyOutcome, apply_proposals_to_content};
pub use review::{Proposal, ReviewReport, generate_proposals, review_agreement};
pub use validation::{
    Discrepancy, DiscrepancyCategory, Severity, ValidationReport, validate_agreement,
    validate_sow_against_estimate,
};
pub use versioning::{ApplyRequest, ApplyResult, apply_selected_proposals, next_version_number};

use scopepilot_core::error::StoreError;

pub type ContractResult<T> = std::result::Result<T, ContractError>;

/// Errors from the agreement workflows.
///
/// Display strings are shown to the user verbatim by the tools layer.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Provide at least one proposal_id to apply.")]
    NoProposalIds,

    #[error("Agreement {0} was not found.")]
    AgreementNotFound(String),

    #[error("Estimate {0} was not found.")]
    EstimateNotFound(String),

    #[error("No proposals available. Upload or paste a client draft to generate proposals first.")]
    NoProposals,

    #[error("No proposals matched ids {0:?}. Run a review again to refresh proposals.")]
    NoProposalsMatched(Vec<String>),

    #[error("Validation is only available for SOW agreements")]
    NotSow,

    /// A write in the apply workflow failed part-way.
    #[error("Unable to apply proposals: {0}")]
    ApplyFailed(StoreError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("template error: {0}")]
    Template(String),
}
