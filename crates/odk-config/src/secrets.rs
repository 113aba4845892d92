//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `api.token_env: "ODK_API_TOKEN"`).
//! - At startup, callers invoke [`resolve_secrets`] once and hand the result to
//!   constructors; `std::env::var` is not scattered across the codebase.
//! - `Debug` output **redacts** values.
//! - Error messages reference the env var **NAME**, never the value.

use anyhow::{bail, Result};

use crate::ClientConfig;

/// Secrets for one client instantiation.
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer token for the order service. `None` if the named env var was
    /// absent or blank; the service is then called without `Authorization`.
    pub api_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve secrets named by `cfg` using `lookup` (normally
/// `|k| std::env::var(k).ok()`).
///
/// # Errors
/// Fails if `api.token_env` is blank, since that can only be a config mistake.
pub fn resolve_secrets<F>(cfg: &ClientConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let var = cfg.api.token_env.trim();
    if var.is_empty() {
        bail!("SECRETS_CONFIG: api.token_env must name an environment variable");
    }

    let api_token = lookup(var).filter(|v| !v.trim().is_empty());
    Ok(ResolvedSecrets { api_token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_in_debug() {
        let s = ResolvedSecrets {
            api_token: Some("super-secret".to_string()),
        };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn blank_env_value_resolves_to_none() {
        let cfg = ClientConfig::default();
        let s = resolve_secrets(&cfg, |_| Some("   ".to_string())).unwrap();
        assert!(s.api_token.is_none());
    }

    #[test]
    fn named_variable_is_read() {
        let cfg = ClientConfig::default();
        let s = resolve_secrets(&cfg, |k| (k == "ODK_API_TOKEN").then(|| "t0k".to_string()))
            .unwrap();
        assert_eq!(s.api_token.as_deref(), Some("t0k"));
    }
}
