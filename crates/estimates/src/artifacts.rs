//! Artifact summaries and requirement highlights.

use regex_lite::Regex;
use scopepilot_core::domain::ArtifactListing;
use std::sync::LazyLock;

pub const BUSINESS_CASE_INTRO: &str =
    "### Executive Summary\nCopilot reviewed the latest artifacts and captured the following signals:";
pub const BUSINESS_CASE_OUTRO: &str = "Use these signals to finalize the Business Case stage.";

pub const REQUIREMENTS_INTRO: &str =
    "### Requirements Backlog\nEach uploaded artifact maps to at least one requirement:";
pub const REQUIREMENTS_OUTRO: &str = "Validate this list in the UI to unlock downstream stages.";

/// Markdown list of an estimate's artifacts between `intro` and `outro`.
///
/// A failed load prints the failure under the intro and drops the outro.
pub fn summarize_from_artifacts(listing: &ArtifactListing, intro: &str, outro: &str) -> String {
    let artifacts = match listing {
        ArtifactListing::Unavailable(error) => return format!("{intro}\n\n- {error}"),
        ArtifactListing::Loaded(artifacts) => artifacts,
    };

    if artifacts.is_empty() {
        return format!("{intro}\n\n- No artifacts were found for this estimate.\n\n{outro}");
    }

    let mut parts = vec![intro.to_string(), String::new()];
    parts.extend(
        artifacts
            .iter()
            .map(|a| format!("- {} ({} bytes)", a.filename, a.size_bytes)),
    );
    parts.push(String::new());
    parts.push(outro.to_string());
    parts.join("\n")
}

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// The first `limit` non-empty text lines of an HTML requirements document.
///
/// `&nbsp;` becomes a space and every tag a line break.
pub fn extract_requirement_highlights(content: &str, limit: usize) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let text = content.replace("&nbsp;", " ");
    let cleaned = HTML_TAG.replace_all(&text, "\n");
    cleaned
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(String::from)
        .collect()
}
