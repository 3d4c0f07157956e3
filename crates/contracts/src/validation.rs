//! SOW validation against the estimate it was drafted from.

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use scopepilot_config::PricingConfig;
use scopepilot_core::domain::QuoteSummary;
use scopepilot_estimates::compute_quote_summary;
use scopepilot_store::RemoteStore;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::info;

use crate::{ContractError, ContractResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyCategory {
    Scope,
    Hours,
    PaymentTerms,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: String,
    pub category: DiscrepancyCategory,
    pub severity: Severity,
    pub message: String,
    pub reference: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub discrepancies: Vec<Discrepancy>,
    pub summary: String,
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    fn from_discrepancies(discrepancies: Vec<Discrepancy>) -> Self {
        let valid = !discrepancies.iter().any(|d| d.severity == Severity::Error);
        let summary = if valid {
            "SOW aligns with estimate. No critical discrepancies found.".to_string()
        } else {
            format!("Found {} discrepancy(ies) requiring attention.", discrepancies.len())
        };
        Self {
            valid,
            discrepancies,
            summary,
            validated_at: Utc::now(),
        }
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("validation pattern is valid")
}

static NET_TERMS: LazyLock<[(Regex, &'static str); 4]> = LazyLock::new(|| {
    [
        (pattern(r"net\s*30"), "Net 30"),
        (pattern(r"net\s*45"), "Net 45"),
        (pattern(r"net\s*60"), "Net 60"),
        (pattern(r"net\s*90"), "Net 90"),
    ]
});

static HOUR_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        pattern(r"approximately\s+(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)"),
        pattern(r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)\s*(?:total|combined|estimated|approximately)?"),
        pattern(r"estimated.*?(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)"),
    ]
});

static ANY_HOURS: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)"));

/// `38.0` prints as `38`, `37.5` as `37.5`.
fn display_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Hours the SOW claims: first hit of the specific patterns, else the
/// largest bare `N hours` mention. Zero when nothing is mentioned.
fn mentioned_hours(content_lower: &str) -> f64 {
    let first = HOUR_PATTERNS.iter().find_map(|re| {
        re.captures(content_lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    });
    match first {
        Some(hours) if hours > 0.0 => hours,
        _ => ANY_HOURS
            .captures_iter(content_lower)
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
            .filter(|h| *h > 0.0)
            .fold(0.0, f64::max),
    }
}

/// Compare SOW text with the estimate's priced WBS.
pub fn validate_sow_against_estimate(sow_content: &str, estimate: &QuoteSummary) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();
    let content = sow_content.to_lowercase();

    if let Some(expected_terms) = estimate.payment_terms.as_deref().filter(|t| !t.is_empty()) {
        let estimate_terms = expected_terms.to_lowercase();
        let sow_terms = NET_TERMS
            .iter()
            .find(|(re, _)| re.is_match(&content))
            .map(|(_, label)| *label);

        match sow_terms {
            Some(found) if found.to_lowercase() != estimate_terms => discrepancies.push(Discrepancy {
                id: "payment-terms-1".into(),
                category: DiscrepancyCategory::PaymentTerms,
                severity: Severity::Error,
                message: format!(
                    "Payment terms mismatch: SOW specifies \"{found}\" but estimate quote requires \"{expected_terms}\""
                ),
                reference: "Payment Terms section".into(),
                expected: expected_terms.into(),
                actual: found.into(),
            }),
            None if estimate_terms.contains("net") => discrepancies.push(Discrepancy {
                id: "payment-terms-2".into(),
                category: DiscrepancyCategory::PaymentTerms,
                severity: Severity::Warning,
                message: format!(
                    "SOW does not specify payment terms, but estimate quote requires \"{expected_terms}\""
                ),
                reference: "Payment Terms section".into(),
                expected: expected_terms.into(),
                actual: "Not specified".into(),
            }),
            _ => {}
        }
    }

    let total_hours = estimate.total_hours;
    let mentioned = mentioned_hours(&content);
    if mentioned > 0.0 && total_hours > 0.0 {
        let percent = (mentioned - total_hours).abs() / total_hours * 100.0;
        if percent > 10.0 {
            discrepancies.push(Discrepancy {
                id: "hours-1".into(),
                category: DiscrepancyCategory::Hours,
                severity: if percent > 20.0 { Severity::Error } else { Severity::Warning },
                message: format!(
                    "Hour discrepancy: SOW mentions approximately {} hours, but WBS totals {} hours ({percent:.1}% difference)",
                    display_number(mentioned),
                    display_number(total_hours),
                ),
                reference: "Scope/Effort section".into(),
                expected: format!("{} hours", display_number(total_hours)),
                actual: format!("~{} hours", display_number(mentioned)),
            });
        }
    } else if mentioned == 0.0 && total_hours > 0.0 {
        discrepancies.push(Discrepancy {
            id: "hours-2".into(),
            category: DiscrepancyCategory::Hours,
            severity: Severity::Warning,
            message: format!(
                "SOW does not clearly specify total hours, but WBS totals {} hours",
                display_number(total_hours)
            ),
            reference: "Scope/Effort section".into(),
            expected: format!("Mention ~{} hours", display_number(total_hours)),
            actual: "Not specified".into(),
        });
    }

    // Only significant tasks (> 8h) count; a task is referenced when any of
    // its longer words appears in the SOW.
    let missing: Vec<&str> = estimate
        .lines
        .iter()
        .filter(|line| !line.description.is_empty() && line.hours > 8.0)
        .filter(|line| {
            let description = line.description.to_lowercase();
            !description
                .split_whitespace()
                .filter(|w| w.chars().count() > 4)
                .any(|w| content.contains(w))
        })
        .map(|line| line.description.as_str())
        .collect();

    if (1..=3).contains(&missing.len()) {
        let shown = missing.iter().take(2).copied().collect::<Vec<_>>().join(", ");
        let more = if missing.len() > 2 { "..." } else { "" };
        discrepancies.push(Discrepancy {
            id: "scope-1".into(),
            category: DiscrepancyCategory::Scope,
            severity: Severity::Warning,
            message: format!("SOW may be missing references to WBS tasks: {shown}{more}"),
            reference: "Scope/Deliverables section".into(),
            expected: "Include all approved WBS tasks".into(),
            actual: format!("{} task(s) not clearly referenced", missing.len()),
        });
    }

    if let Some(timeline) = estimate.delivery_timeline.as_deref().filter(|t| !t.is_empty()) {
        let mentioned = ["deliver", "timeline", "schedule"].iter().any(|k| content.contains(k));
        if !mentioned {
            discrepancies.push(Discrepancy {
                id: "timeline-1".into(),
                category: DiscrepancyCategory::Timeline,
                severity: Severity::Info,
                message: format!(
                    "SOW does not explicitly reference delivery timeline, but estimate specifies: \"{timeline}\""
                ),
                reference: "Delivery/Timeline section".into(),
                expected: timeline.into(),
                actual: "Not specified".into(),
            });
        }
    }

    discrepancies
}

/// Validate a stored SOW against its linked estimate.
pub async fn validate_agreement(
    store: &RemoteStore,
    pricing: &PricingConfig,
    agreement_id: &str,
) -> ContractResult<ValidationReport> {
    let agreement = store
        .agreement(agreement_id)
        .await?
        .ok_or_else(|| ContractError::AgreementNotFound(agreement_id.to_string()))?;

    if !agreement.is_sow() {
        return Err(ContractError::NotSow);
    }

    let Some(estimate_id) = agreement.linked_estimate_id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(ValidationReport {
            valid: false,
            discrepancies: Vec::new(),
            summary: "No estimate linked to this SOW".into(),
            validated_at: Utc::now(),
        });
    };

    if store.estimate(estimate_id).await?.is_none() {
        return Err(ContractError::EstimateNotFound(estimate_id.to_string()));
    }

    let rows = store.wbs_rows(estimate_id).await?;
    let quote = store.quote_record(estimate_id).await?;
    let rates = store.read_or_default("quote rates", store.quote_rates(estimate_id)).await;
    let overrides = store
        .read_or_default("quote overrides", store.quote_overrides(estimate_id))
        .await;
    let summary = compute_quote_summary(
        &rows,
        quote.as_ref(),
        &rates,
        &overrides,
        pricing.default_role_rate,
        &pricing.default_currency,
    );

    let report = ValidationReport::from_discrepancies(validate_sow_against_estimate(&agreement.content, &summary));
    info!(
        agreement_id,
        estimate_id,
        valid = report.valid,
        discrepancies = report.discrepancies.len(),
        "SOW validated"
    );
    Ok(report)
}
