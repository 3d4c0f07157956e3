//! Estimate-side logic for ScopePilot.
//!
//! Pure functions over rows already loaded from the store: turn requirements
//! and artifacts into a work-breakdown structure, price a WBS against quote
//! rates, and summarize uploaded artifacts for the Business Case and
//! Requirements stages.

pub mod artifacts;
pub mod quote;
pub mod wbs;

pub use artifacts::{
    BUSINESS_CASE_INTRO, BUSINESS_CASE_OUTRO, REQUIREMENTS_INTRO, REQUIREMENTS_OUTRO,
    extract_requirement_highlights, summarize_from_artifacts,
};
pub use quote::{DEFAULT_ROLE_RATE, compute_quote_summary, format_amount, format_money, round_cents};
pub use wbs::compose_wbs_rows;
