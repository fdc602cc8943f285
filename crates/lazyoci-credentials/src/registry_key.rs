//! Registry-key normalization for the Docker `config.json`-backed backends.
//!
//! Docker config keys are free-form strings: `docker.io`, a bare host, a
//! scheme-qualified URL, or a versioned API root. Lookups probe a small
//! set of alternative forms rather than requiring an exact match.

/// Known aliases for the major public Docker registry. Closed set: an
/// unrecognized alias is simply not found, rather than accepted as a new
/// alias at lookup time.
const DOCKER_HUB_ALIASES: &[&str] = &["docker.io", "registry-1.docker.io", "index.docker.io"];

/// The canonical Docker config key for the public Docker Hub index.
const DOCKER_HUB_CANONICAL: &str = "https://index.docker.io/v1/";

fn strip_scheme_and_trailing_slash(raw: &str) -> &str {
    raw.strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw)
        .trim_end_matches('/')
}

/// Build the ordered list of keys to probe for `registry_host` against a
/// Docker-config-shaped map: the host itself, its Docker Hub alias (when
/// applicable), both scheme-qualified forms, and both versioned API roots.
#[must_use]
pub fn candidate_keys(registry_host: &str) -> Vec<String> {
    let bare = strip_scheme_and_trailing_slash(registry_host);
    let mut keys = vec![registry_host.to_string()];

    if DOCKER_HUB_ALIASES.contains(&bare) {
        keys.push(DOCKER_HUB_CANONICAL.to_string());
    }
    if registry_host == DOCKER_HUB_CANONICAL {
        for alias in DOCKER_HUB_ALIASES {
            keys.push((*alias).to_string());
        }
    }

    keys.push(format!("https://{bare}"));
    keys.push(format!("http://{bare}"));
    keys.push(format!("{bare}/v1/"));
    keys.push(format!("{bare}/v2/"));
    keys.push(bare.to_string());

    keys.dedup();
    keys
}
