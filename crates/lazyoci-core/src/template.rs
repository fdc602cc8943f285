//! Double-brace template variable substitution.
//!
//! The renderer is deliberately not a general template engine: no
//! conditionals, no loops, no user-defined functions. It recognizes
//! `{{ .Field }}` placeholders (optional surrounding whitespace) against a
//! flat [`TemplateVars`] record and substitutes the field's value. A
//! placeholder naming a field that is absent or empty is a render error;
//! the renderer never silently substitutes an empty string.

use crate::error::{Error, Result};

/// The flat set of variables available to tag and registry-path templates.
///
/// Every field is optional: fields are populated by the caller (the build
/// orchestrator) from the environment, the invocation options, and version
/// control history before rendering begins.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    /// `{{ .Registry }}` — base registry path, from `LAZYOCI_REGISTRY`.
    pub registry: Option<String>,
    /// `{{ .Tag }}` — the caller-supplied tag for this invocation.
    pub tag: Option<String>,
    /// `{{ .GitSHA }}` — short commit id.
    pub git_sha: Option<String>,
    /// `{{ .GitBranch }}` — current branch name.
    pub git_branch: Option<String>,
    /// `{{ .Timestamp }}` — UTC, second precision, RFC 3339.
    pub timestamp: Option<String>,
    /// `{{ .ChartVersion }}` — populated only for helm-chart artifacts.
    pub chart_version: Option<String>,
    /// `{{ .Version }}` — resolved semver string.
    pub version: Option<String>,
    /// `{{ .VersionMajor }}`.
    pub version_major: Option<String>,
    /// `{{ .VersionMinor }}`.
    pub version_minor: Option<String>,
    /// `{{ .VersionPatch }}`.
    pub version_patch: Option<String>,
    /// `{{ .VersionPrerelease }}`.
    pub version_prerelease: Option<String>,
    /// `{{ .VersionMajorMinor }}` — `"{major}.{minor}"`.
    pub version_major_minor: Option<String>,
    /// `{{ .VersionRaw }}` — the unparsed version string the caller gave.
    pub version_raw: Option<String>,
}

impl TemplateVars {
    fn lookup(&self, field: &str) -> Option<&str> {
        let value = match field {
            "Registry" => &self.registry,
            "Tag" => &self.tag,
            "GitSHA" => &self.git_sha,
            "GitBranch" => &self.git_branch,
            "Timestamp" => &self.timestamp,
            "ChartVersion" => &self.chart_version,
            "Version" => &self.version,
            "VersionMajor" => &self.version_major,
            "VersionMinor" => &self.version_minor,
            "VersionPatch" => &self.version_patch,
            "VersionPrerelease" => &self.version_prerelease,
            "VersionMajorMinor" => &self.version_major_minor,
            "VersionRaw" => &self.version_raw,
            _ => return None,
        };
        value.as_deref()
    }

    /// Render `template`, substituting every `{{ .Field }}` placeholder.
    ///
    /// # Errors
    /// Returns [`Error::Template`] naming the first placeholder whose field
    /// is unrecognized, absent, or resolves to an empty string.
    pub fn render(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                return Err(Error::Template(format!(
                    "unterminated placeholder in template: {template:?}"
                )));
            };
            let raw_field = after_open[..end].trim();
            let field = raw_field.strip_prefix('.').ok_or_else(|| {
                Error::Template(format!("placeholder '{{{{{raw_field}}}}}' lacks leading '.'"))
            })?;

            match self.lookup(field) {
                Some(value) if !value.is_empty() => out.push_str(value),
                _ => return Err(Error::Template(field.to_string())),
            }

            rest = &after_open[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            registry: Some("r.example".to_string()),
            chart_version: Some("0.1.0".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn renders_known_fields() {
        let out = vars().render("{{ .Registry }}/charts/mychart").unwrap();
        assert_eq!(out, "r.example/charts/mychart");
    }

    #[test]
    fn renders_chart_version() {
        assert_eq!(vars().render("{{ .ChartVersion }}").unwrap(), "0.1.0");
    }

    #[test]
    fn tolerates_no_placeholders() {
        assert_eq!(vars().render("latest").unwrap(), "latest");
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = vars().render("{{ .Tag }}").unwrap_err();
        assert!(matches!(err, Error::Template(ref f) if f == "Tag"));
    }

    #[test]
    fn empty_value_is_an_error_not_empty_substitution() {
        let mut v = vars();
        v.tag = Some(String::new());
        let err = v.render("{{ .Tag }}").unwrap_err();
        assert!(matches!(err, Error::Template(ref f) if f == "Tag"));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let err = vars().render("{{ .Bogus }}").unwrap_err();
        assert!(matches!(err, Error::Template(ref f) if f == "Bogus"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        assert!(vars().render("{{ .Registry").is_err());
    }

    #[test]
    fn multiple_placeholders_in_one_template() {
        let out = vars()
            .render("{{ .Registry }}/charts/mychart:{{ .ChartVersion }}")
            .unwrap();
        assert_eq!(out, "r.example/charts/mychart:0.1.0");
    }
}
