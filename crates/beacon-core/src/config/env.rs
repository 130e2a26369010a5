use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

fn braced_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env pattern"))
}

fn shell_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("valid env pattern")
    })
}

/// Substitute environment variables in the format ${VAR_NAME}.
///
/// Unset variables are left as written so the parser reports them.
pub fn substitute_env_vars(content: &str) -> String {
    braced_pattern()
        .replace_all(content, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expand `$VAR` and `${VAR}` references, shell style.
///
/// Unset variables expand to the empty string.
pub fn expand_env(value: &str) -> String {
    shell_pattern()
        .replace_all(value, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}
