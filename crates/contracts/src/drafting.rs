//! MSA and SOW drafting.
//!
//! Documents are Tera HTML templates compiled into the binary. Template names
//! end in `.html`, so every interpolated value is HTML-escaped.

use chrono::NaiveDate;
use scopepilot_config::DraftingConfig;
use scopepilot_core::domain::{EstimateSummary, QuoteSummary, WbsRow};
use scopepilot_estimates::{format_amount, round_cents};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::debug;

use crate::{ContractError, ContractResult};

const MSA_TEMPLATE: &str = "msa.html";
const SOW_TEMPLATE: &str = "sow.html";

const DEFAULT_PAYMENT_TERMS: &str = "Net 30";
const DEFAULT_TIMELINE: &str = "Delivery within 8 weeks";
const DEFAULT_SCOPE: &str =
    "Deliver a production-ready implementation as specified in the requirements and business case.";
const DEPOSIT_SHARE: f64 = 0.2;

/// The service provider signing every drafted agreement.
#[derive(Debug, Clone, Serialize)]
pub struct Party {
    pub legal_name: String,
    pub short_name: String,
    pub entity: String,
    pub address: String,
    pub governing_law: String,
}

impl From<&DraftingConfig> for Party {
    fn from(config: &DraftingConfig) -> Self {
        Self {
            legal_name: config.provider_legal_name.clone(),
            short_name: config.provider_short_name.clone(),
            entity: config.provider_entity.clone(),
            address: config.provider_address.clone(),
            governing_law: config.governing_law.clone(),
        }
    }
}

pub struct MsaInput<'a> {
    pub estimate: &'a EstimateSummary,
    pub business_case: &'a str,
    pub requirement_highlights: &'a [String],
    pub quote: &'a QuoteSummary,
    pub counterparty: &'a str,
    pub date: NaiveDate,
}

pub struct SowInput<'a> {
    pub estimate: &'a EstimateSummary,
    pub wbs_rows: &'a [WbsRow],
    pub quote: &'a QuoteSummary,
    pub counterparty: &'a str,
    pub date: NaiveDate,
}

#[derive(Serialize)]
struct RoleGroup<'a> {
    role: &'a str,
    rows: Vec<&'a WbsRow>,
}

/// Group rows by role, keeping first-appearance order of roles.
fn group_by_role(rows: &[WbsRow]) -> Vec<RoleGroup<'_>> {
    let mut groups: Vec<RoleGroup<'_>> = Vec::new();
    for row in rows {
        let role = if row.role.is_empty() { "Other" } else { row.role.as_str() };
        match groups.iter_mut().find(|g| g.role == role) {
            Some(group) => group.rows.push(row),
            None => groups.push(RoleGroup { role, rows: vec![row] }),
        }
    }
    groups
}

fn number_arg(value: &tera::Value) -> f64 {
    match value {
        tera::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// `120000` → `120,000.00`. Usage: `amount | money`
fn tera_money_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(format_amount(number_arg(value))))
}

/// `12.0` → `12`, `7.5` → `7.5`. Usage: `row.hours | hours`
fn tera_hours_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let hours = round_cents(number_arg(value));
    let text = if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        hours.to_string()
    };
    Ok(tera::Value::String(text))
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

fn project_name(estimate: &EstimateSummary) -> &str {
    or_default(Some(estimate.name.as_str()), "Project")
}

/// Renders agreement documents for one provider party.
pub struct DocumentDrafter {
    tera: Tera,
    party: Party,
}

impl DocumentDrafter {
    pub fn new(party: Party) -> ContractResult<Self> {
        let mut tera = Tera::default();
        tera.register_filter("money", tera_money_filter);
        tera.register_filter("hours", tera_hours_filter);
        tera.add_raw_templates(vec![
            (MSA_TEMPLATE, include_str!("../templates/msa.html")),
            (SOW_TEMPLATE, include_str!("../templates/sow.html")),
        ])
        .map_err(|e| ContractError::Template(e.to_string()))?;
        Ok(Self { tera, party })
    }

    pub fn from_config(config: &DraftingConfig) -> ContractResult<Self> {
        Self::new(Party::from(config))
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    fn base_context(&self, counterparty: &str, quote: &QuoteSummary) -> Context {
        let mut context = Context::new();
        context.insert("party", &self.party);
        context.insert("counterparty", counterparty);
        context.insert("currency", or_default(Some(quote.currency.as_str()), "USD"));
        context.insert("total_cost", &quote.total_cost);
        context.insert(
            "payment_terms",
            or_default(quote.payment_terms.as_deref(), DEFAULT_PAYMENT_TERMS),
        );
        context
    }

    fn render(&self, template: &str, context: &Context) -> ContractResult<String> {
        let html = self
            .tera
            .render(template, context)
            .map_err(|e| ContractError::Template(e.to_string()))?;
        debug!(template, bytes = html.len(), "Rendered agreement document");
        Ok(html)
    }

    /// Master service agreement with an engagement overview schedule.
    pub fn build_msa_content(&self, input: &MsaInput<'_>) -> ContractResult<String> {
        let mut context = self.base_context(input.counterparty, input.quote);
        context.insert("effective_day", &input.date.format("%d").to_string());
        context.insert("effective_month", &input.date.format("%B").to_string());
        context.insert("effective_year", &input.date.format("%Y").to_string());
        context.insert("project_name", project_name(input.estimate));
        context.insert("business_case", input.business_case.trim());
        context.insert("highlights", input.requirement_highlights);
        self.render(MSA_TEMPLATE, &context)
    }

    /// Statement of work priced from the quote summary.
    pub fn build_sow_content(&self, input: &SowInput<'_>) -> ContractResult<String> {
        let quote = input.quote;
        let payment_terms = or_default(quote.payment_terms.as_deref(), DEFAULT_PAYMENT_TERMS);
        let average_rate = if quote.total_hours > 0.0 {
            quote.total_cost / quote.total_hours
        } else {
            0.0
        };
        let billing_cycle = if payment_terms.starts_with("Net 15") { "2 week" } else { "monthly" };

        let mut context = self.base_context(input.counterparty, quote);
        context.insert("msa_date", &input.date.format("%B %d, %Y").to_string());
        context.insert("project_name", project_name(input.estimate));
        context.insert(
            "scope_description",
            or_default(input.estimate.description.as_deref(), DEFAULT_SCOPE),
        );
        context.insert("wbs_groups", &group_by_role(input.wbs_rows));
        context.insert("average_rate", &format!("{average_rate:.2}"));
        context.insert("billing_cycle", billing_cycle);
        context.insert("total_hours", &quote.total_hours);
        context.insert("deposit", &(quote.total_cost * DEPOSIT_SHARE));
        context.insert(
            "delivery_timeline",
            or_default(quote.delivery_timeline.as_deref(), DEFAULT_TIMELINE),
        );
        self.render(SOW_TEMPLATE, &context)
    }
}
