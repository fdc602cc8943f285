//! Property-based tests for template variable substitution.
//!
//! These tests verify the behavioral contracts of [`lazyoci_core::template`]:
//! - A placeholder whose field is populated always renders to that value,
//!   verbatim, regardless of what other fields are set.
//! - Text outside `{{ .Field }}` placeholders passes through unchanged.
//! - A field that is absent or empty always renders as an error, never as
//!   an empty substitution.

use lazyoci_core::error::Error;
use lazyoci_core::template::TemplateVars;
use proptest::prelude::*;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Known placeholder field names, paired with the `TemplateVars` setter
/// that populates them. Kept in sync with `TemplateVars::lookup`.
const FIELDS: &[&str] = &[
    "Registry",
    "Tag",
    "GitSHA",
    "GitBranch",
    "Timestamp",
    "ChartVersion",
    "Version",
    "VersionMajor",
    "VersionMinor",
    "VersionPatch",
    "VersionPrerelease",
    "VersionMajorMinor",
    "VersionRaw",
];

fn field_name_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(FIELDS)
}

/// A value safe to substitute: never empty, never containing `{{` or `}}`
/// (which would be re-interpreted as another placeholder).
fn field_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._/-]{0,20}".prop_map(String::from)
}

/// Arbitrary surrounding literal text, free of brace characters.
fn literal_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ./:_-]{0,20}".prop_map(String::from)
}

fn set_field(vars: &mut TemplateVars, field: &str, value: String) {
    match field {
        "Registry" => vars.registry = Some(value),
        "Tag" => vars.tag = Some(value),
        "GitSHA" => vars.git_sha = Some(value),
        "GitBranch" => vars.git_branch = Some(value),
        "Timestamp" => vars.timestamp = Some(value),
        "ChartVersion" => vars.chart_version = Some(value),
        "Version" => vars.version = Some(value),
        "VersionMajor" => vars.version_major = Some(value),
        "VersionMinor" => vars.version_minor = Some(value),
        "VersionPatch" => vars.version_patch = Some(value),
        "VersionPrerelease" => vars.version_prerelease = Some(value),
        "VersionMajorMinor" => vars.version_major_minor = Some(value),
        "VersionRaw" => vars.version_raw = Some(value),
        other => panic!("unknown field in test strategy: {other}"),
    }
}

// =============================================================================
// Property Tests: Substitution
// =============================================================================

proptest! {
    /// Contract: a populated field renders to its exact value, with no
    /// extra whitespace or escaping.
    #[test]
    fn populated_field_renders_verbatim(
        field in field_name_strategy(),
        value in field_value_strategy(),
    ) {
        let mut vars = TemplateVars::default();
        set_field(&mut vars, field, value.clone());

        let template = format!("{{{{ .{field} }}}}");
        let rendered = vars.render(&template).expect("populated field should render");
        prop_assert_eq!(rendered, value);
    }

    /// Contract: literal text surrounding a placeholder is carried through
    /// unchanged on both sides.
    #[test]
    fn surrounding_literal_text_is_preserved(
        prefix in literal_text_strategy(),
        suffix in literal_text_strategy(),
        field in field_name_strategy(),
        value in field_value_strategy(),
    ) {
        let mut vars = TemplateVars::default();
        set_field(&mut vars, field, value.clone());

        let template = format!("{prefix}{{{{ .{field} }}}}{suffix}");
        let rendered = vars.render(&template).expect("populated field should render");
        prop_assert_eq!(rendered, format!("{prefix}{value}{suffix}"));
    }

    /// Contract: a template with no placeholders renders identically to its
    /// input, no matter which fields happen to be set.
    #[test]
    fn text_without_placeholders_passes_through(text in literal_text_strategy()) {
        let vars = TemplateVars::default();
        prop_assume!(!text.contains("{{"));
        let rendered = vars.render(&text).expect("plain text always renders");
        prop_assert_eq!(rendered, text);
    }

    /// Contract: an unset field is always a render error, never an empty
    /// substitution, regardless of which field it is.
    #[test]
    fn unset_field_is_always_an_error(field in field_name_strategy()) {
        let vars = TemplateVars::default();
        let template = format!("{{{{ .{field} }}}}");
        let err = vars.render(&template).unwrap_err();
        prop_assert!(matches!(err, Error::Template(ref f) if f == field));
    }

    /// Contract: two placeholders for the same field in one template both
    /// substitute to the same value.
    #[test]
    fn repeated_placeholder_substitutes_consistently(
        field in field_name_strategy(),
        value in field_value_strategy(),
    ) {
        let mut vars = TemplateVars::default();
        set_field(&mut vars, field, value.clone());

        let template = format!("{{{{ .{field} }}}}-{{{{ .{field} }}}}");
        let rendered = vars.render(&template).expect("populated field should render");
        prop_assert_eq!(rendered, format!("{value}-{value}"));
    }
}
