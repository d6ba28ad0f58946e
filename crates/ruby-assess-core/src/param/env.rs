use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z0-9_]+|\{[^}]*\})").expect("environment variable pattern is valid")
});

/// Expand `$NAME` and `${NAME}` from the process environment.
///
/// References to variables that are not set are left as written.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

pub(crate) fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR
        .replace_all(input, |caps: &Captures| {
            let raw = &caps[1];
            let name = raw
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .unwrap_or(raw);
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
