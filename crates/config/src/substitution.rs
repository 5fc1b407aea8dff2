use anyhow::Result;
use regex::Regex;
use std::env;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("placeholder regex is valid"))
}

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
///
/// Unset variables keep their placeholder; the validator reports them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let mut missing_vars = Vec::new();

    let result = placeholder_regex().replace_all(content, |caps: &regex::Captures<'_>| {
        let placeholder = &caps[0];
        let var_name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");

        match env::var(var_name) {
            Ok(value) => {
                debug!(var = var_name, "Substituting environment variable");
                value
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                placeholder.to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may use defaults or fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Names of placeholders still present in a value
pub fn unresolved_env_vars(content: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string()))
        .collect()
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    placeholder_regex().is_match(content)
}
