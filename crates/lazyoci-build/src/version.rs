//! Resolves `{{ .Version }}` and its derived fields with the priority
//! chain from §3: an explicit environment override wins outright; failing
//! that, the caller-supplied tag if it parses as semver; failing that,
//! the nearest upstream tag from version-control history.

use std::path::Path;

use semver::Version as SemVer;

use lazyoci_core::template::TemplateVars;

use crate::git;

/// Resolve the version-family template fields and merge them into
/// `vars`. Leaves every version field as `None` (not rendered unless
/// referenced) if no source in the priority chain yields a parseable
/// semver string.
pub async fn resolve_version_fields(vars: &mut TemplateVars, env_override: Option<&str>, caller_tag: Option<&str>, repo_dir: &Path) {
    let raw = if let Some(v) = env_override.filter(|v| !v.is_empty()) {
        Some(v.to_string())
    } else if let Some(tag) = caller_tag.filter(|t| parses_as_semver(t)) {
        Some(tag.to_string())
    } else {
        let nearest = git::nearest_tag(repo_dir).await;
        (!nearest.is_empty()).then_some(nearest)
    };

    let Some(raw) = raw else {
        return;
    };

    vars.version_raw = Some(raw.clone());
    let Some(parsed) = parse_semver_lenient(&raw) else {
        return;
    };

    vars.version = Some(format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch));
    vars.version_major = Some(parsed.major.to_string());
    vars.version_minor = Some(parsed.minor.to_string());
    vars.version_patch = Some(parsed.patch.to_string());
    vars.version_major_minor = Some(format!("{}.{}", parsed.major, parsed.minor));
    if !parsed.pre.is_empty() {
        vars.version_prerelease = Some(parsed.pre.to_string());
    }
}

fn parses_as_semver(text: &str) -> bool {
    parse_semver_lenient(text).is_some()
}

/// `semver::Version::parse` rejects a leading `v`, which both git tags
/// and caller-supplied release tags commonly carry; strip it before
/// parsing.
fn parse_semver_lenient(text: &str) -> Option<SemVer> {
    let stripped = text.strip_prefix('v').unwrap_or(text);
    SemVer::parse(stripped).ok()
}
