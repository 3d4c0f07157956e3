//! Work-breakdown structure composition.
//!
//! A generated WBS is a fixed delivery skeleton, one deep-dive task per
//! requirement highlight and one ingestion task per recent artifact.

use scopepilot_core::domain::{Artifact, WbsRow};
use tracing::debug;

/// (task code, description, role, hours, assumptions)
const BASE_ROWS: [(&str, &str, &str, f64, &str); 5] = [
    (
        "DISC-101",
        "Run discovery & alignment workshops with stakeholders.",
        "Engagement Lead",
        12.0,
        "Two sessions, 90 minutes each.",
    ),
    (
        "ARCH-110",
        "Draft solution architecture, risks, and dependencies.",
        "Solutions Architect",
        16.0,
        "Leverage prior architectures if applicable.",
    ),
    (
        "PLAN-210",
        "Translate requirements into role-based task plan.",
        "Project Planner",
        10.0,
        "Validated requirements available.",
    ),
    (
        "BACK-330",
        "Estimate backend/API build tasks aligned to scope.",
        "Backend Engineer",
        32.0,
        "CRUD + integrations scoped in requirements.",
    ),
    (
        "QA-450",
        "Define QA strategy and effort for regression/smoke.",
        "QA Lead",
        14.0,
        "Manual regression only for initial pass.",
    ),
];

const MAX_ARTIFACT_ROWS: usize = 2;
const MIN_ROWS: usize = 5;

/// Compose WBS rows from requirement highlights and the newest artifacts.
///
/// Row order is stable: skeleton, then `REQ-NNN`, then `ART-XXX`, then the
/// buffer row when the plan would otherwise be thinner than five tasks.
pub fn compose_wbs_rows(artifacts: &[Artifact], highlights: &[String]) -> Vec<WbsRow> {
    let mut rows: Vec<WbsRow> = BASE_ROWS
        .iter()
        .map(|(code, description, role, hours, assumptions)| {
            WbsRow::new(*code, *description, *role, *hours, *assumptions)
        })
        .collect();

    for (idx, highlight) in highlights.iter().enumerate() {
        rows.push(WbsRow::new(
            format!("REQ-{:03}", idx + 1),
            format!("Requirement deep dive: {highlight}"),
            if idx % 2 == 0 { "Business Analyst" } else { "Technical Lead" },
            6.0 + idx as f64 * 2.0,
            "Assumes requirement remains in scope.",
        ));
    }

    for artifact in artifacts.iter().take(MAX_ARTIFACT_ROWS) {
        let prefix: String = artifact.filename.chars().take(3).collect::<String>().to_uppercase();
        rows.push(WbsRow::new(
            format!("ART-{prefix}"),
            format!("Ingest {} for estimation inputs.", artifact.filename),
            "Discovery Lead",
            6.0,
            "Emphasize scope & constraints captured in artifact.",
        ));
    }

    if rows.len() < MIN_ROWS {
        rows.push(WbsRow::new(
            "BUF-999",
            "General engineering buffer for spikes/risks.",
            "Engineering Lead",
            8.0,
            "Covers unforeseen clarifications.",
        ));
    }

    debug!(
        rows = rows.len(),
        highlights = highlights.len(),
        artifacts = artifacts.len(),
        "Composed WBS rows"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            filename: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn skeleton_only_without_inputs() {
        let rows = compose_wbs_rows(&[], &[]);
        let codes: Vec<&str> = rows.iter().map(|r| r.task_code.as_str()).collect();
        assert_eq!(codes, vec!["DISC-101", "ARCH-110", "PLAN-210", "BACK-330", "QA-450"]);
        let hours: f64 = rows.iter().map(|r| r.hours).sum();
        assert_eq!(hours, 84.0);
        assert!(rows.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn requirement_rows_alternate_roles_and_grow_hours() {
        let highlights = vec!["SSO".to_string(), "Reporting".to_string(), "Audit".to_string()];
        let rows = compose_wbs_rows(&[], &highlights);
        assert_eq!(rows.len(), 8);

        let req: Vec<&WbsRow> = rows.iter().filter(|r| r.task_code.starts_with("REQ-")).collect();
        assert_eq!(req[0].task_code, "REQ-001");
        assert_eq!(req[0].description, "Requirement deep dive: SSO");
        assert_eq!(req[0].role, "Business Analyst");
        assert_eq!(req[0].hours, 6.0);
        assert_eq!(req[1].role, "Technical Lead");
        assert_eq!(req[1].hours, 8.0);
        assert_eq!(req[2].task_code, "REQ-003");
        assert_eq!(req[2].hours, 10.0);
    }

    #[test]
    fn only_two_artifacts_become_rows() {
        let artifacts = vec![artifact("brief.pdf"), artifact("rfp.docx"), artifact("extra.txt")];
        let rows = compose_wbs_rows(&artifacts, &[]);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[5].task_code, "ART-BRI");
        assert_eq!(rows[5].description, "Ingest brief.pdf for estimation inputs.");
        assert_eq!(rows[5].role, "Discovery Lead");
        assert_eq!(rows[6].task_code, "ART-RFP");
    }

    #[test]
    fn short_and_multibyte_filenames() {
        let rows = compose_wbs_rows(&[artifact("é1"), artifact("über-plan.pdf")], &[]);
        assert_eq!(rows[5].task_code, "ART-É1");
        assert_eq!(rows[6].task_code, "ART-ÜBE");
    }

    #[test]
    fn buffer_row_not_needed_with_full_skeleton() {
        let rows = compose_wbs_rows(&[], &[]);
        assert!(rows.iter().all(|r| r.task_code != "BUF-999"));
    }
}
