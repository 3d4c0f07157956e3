//! Quote totals: price every WBS row against role rates and overrides.

use scopepilot_core::domain::{QuoteLine, QuoteRecord, QuoteSummary, RateOverride, RoleRate, WbsRow};
use std::collections::HashMap;

/// Hourly rate for a role the quote does not price.
pub const DEFAULT_ROLE_RATE: f64 = 150.0;

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price `rows` and total them.
///
/// Rate precedence per row: a positive override for the row id, else the
/// quote's rate for the row's role (case-insensitive), else `default_rate`.
/// Costs are rounded to cents per line; totals are rounded again.
pub fn compute_quote_summary(
    rows: &[WbsRow],
    quote: Option<&QuoteRecord>,
    rates: &[RoleRate],
    overrides: &[RateOverride],
    default_rate: f64,
    default_currency: &str,
) -> QuoteSummary {
    let rate_map: HashMap<String, f64> = rates
        .iter()
        .map(|r| (r.role.to_lowercase(), r.rate))
        .collect();
    let override_map: HashMap<&str, f64> = overrides
        .iter()
        .map(|o| (o.wbs_row_id.as_str(), o.rate))
        .collect();

    let mut total_cost = 0.0;
    let mut total_hours = 0.0;
    let lines: Vec<QuoteLine> = rows
        .iter()
        .map(|row| {
            let base_rate = rate_map
                .get(&row.role.to_lowercase())
                .copied()
                .unwrap_or(default_rate);
            let rate = row
                .id
                .as_deref()
                .and_then(|id| override_map.get(id).copied())
                .filter(|r| *r > 0.0)
                .unwrap_or(base_rate);
            let cost = round_cents(row.hours * rate);
            total_cost += cost;
            total_hours += row.hours;
            QuoteLine {
                task_code: row.task_code.clone(),
                description: row.description.clone(),
                role: row.role.clone(),
                hours: row.hours,
                rate,
                cost,
            }
        })
        .collect();

    QuoteSummary {
        currency: quote
            .and_then(|q| q.currency.clone())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_currency.to_string()),
        total_cost: round_cents(total_cost),
        total_hours: round_cents(total_hours),
        payment_terms: quote.and_then(|q| q.payment_terms.clone()),
        delivery_timeline: quote.and_then(|q| q.delivery_timeline.clone()),
        lines,
    }
}

/// `1234567.891` → `"1,234,567.89"`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// `("USD", 120000.0)` → `"USD 120,000.00"`.
pub fn format_money(currency: &str, value: f64) -> String {
    format!("{currency} {}", format_amount(value))
}
