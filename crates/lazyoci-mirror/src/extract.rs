//! Extracts the set of image references a chart renders, by invoking the
//! Helm CLI's `template` command and scanning its stdout rather than
//! parsing the chart's templates directly — charts commonly produce
//! `image:` lines syntactically, and the templating engine has already
//! resolved every `{{ }}` expression by the time this scans it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use lazyoci_core::{remap, subprocess, Result};

const TEMPLATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const RELEASE_NAME: &str = "lazyoci-extract";

fn image_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*image:\s*(.+)$").expect("static pattern is valid"))
}

/// Render `chart_dir` and return every normalized image reference it
/// contains, deduplicated and sorted.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Subprocess`] if `helm template` fails.
pub async fn extract_image_references(chart_dir: &Path) -> Result<Vec<String>> {
    let output = subprocess::run(
        "helm",
        [
            "template",
            RELEASE_NAME,
            &chart_dir.display().to_string(),
            "--no-hooks",
            "--include-crds=false",
        ],
        None,
        None,
        TEMPLATE_TIMEOUT,
    )
    .await?;

    Ok(references_from_rendered(&output.stdout_string()))
}

/// Scan already-rendered manifest text for image references, applying the
/// same line-matching and normalization rules as [`extract_image_references`].
/// Split out for testing without a Helm CLI on hand.
fn references_from_rendered(rendered: &str) -> Vec<String> {
    let pattern = image_line_pattern();
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for line in rendered.lines() {
        let Some(captures) = pattern.captures(line) else {
            continue;
        };
        let raw = captures[1].trim();
        if raw.contains("{{") || raw == "\"null\"" || raw == "null" {
            continue;
        }
        let unquoted = raw.trim_matches('"');
        let normalized = remap::normalize(unquoted);
        if normalized.is_empty() || !seen.insert(normalized.clone()) {
            continue;
        }
        references.push(normalized);
    }

    references.sort();
    references
}
