//! Apply proposals to agreement text.

use serde::Serialize;

use crate::review::Proposal;

/// Edited content plus which proposals landed in place and which were
/// appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub content: String,
    pub applied: Vec<String>,
    pub appended: Vec<String>,
}

/// Apply `proposals` in order.
///
/// A proposal whose `before` occurs in the working text replaces its first
/// occurrence; otherwise its `after` is appended after a blank line. Each
/// proposal sees the output of the previous one. No conflict detection.
pub fn apply_proposals_to_content(content: &str, proposals: &[Proposal]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome {
        content: content.to_string(),
        ..Default::default()
    };

    for proposal in proposals {
        if !proposal.before.is_empty() && outcome.content.contains(&proposal.before) {
            outcome.content = outcome.content.replacen(&proposal.before, &proposal.after, 1);
            outcome.applied.push(proposal.id.clone());
        } else {
            outcome.content.push_str("\n\n");
            outcome.content.push_str(&proposal.after);
            outcome.appended.push(proposal.id.clone());
        }
    }

    outcome
}
