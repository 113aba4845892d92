//! odk-config
//!
//! Layered YAML configuration for the orderdesk client.
//!
//! Documents are merged in order (earlier = base, later = override), converted
//! to JSON, checked for secret literals, canonicalized and hashed. The typed
//! [`ClientConfig`] view is extracted from the merged JSON; every key is
//! optional and falls back to the defaults documented on each field.

pub mod secrets;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use secrets::{resolve_secrets, ResolvedSecrets};

/// Env var that replaces `api.base_url` when set.
pub const ENV_API_URL: &str = "ODK_API_URL";

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "eyJ",        // inline JWT bearer token
];

/// JSON pointers the client actually reads. Anything else in a config file is
/// reported by [`report_unused_keys`].
pub const KNOWN_POINTERS: &[&str] = &[
    "/api/base_url",
    "/api/timeout_ms",
    "/api/token_env",
    "/submission/channel",
    "/submission/release_delay_ms",
    "/allowed_events/prefer_filtered",
    "/logging/level",
];

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Service root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Transport timeout for every request.
    pub timeout_ms: u64,
    /// NAME of the env var holding an optional bearer token.
    pub token_env: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10_000,
            token_env: "ODK_API_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
    /// Value of the `processed_via` metadata key attached to every event.
    pub channel: String,
    /// How long the busy flag stays set after a submission resolves.
    pub release_delay_ms: u64,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            channel: "web_interface".to_string(),
            release_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedEventsSettings {
    /// Query the business-rule filtered endpoint before the classic one.
    pub prefer_filtered: bool,
}

impl Default for AllowedEventsSettings {
    fn default() -> Self {
        Self {
            prefer_filtered: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub submission: SubmissionSettings,
    pub allowed_events: AllowedEventsSettings,
    pub logging: LoggingSettings,
}

impl ClientConfig {
    /// Extract the typed view from merged config JSON.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: ClientConfig = serde_json::from_value(config_json.clone())
            .context("config does not match the client schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in
    /// production; tests pass a closure over a fixed map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(
                "CONFIG_INVALID api.base_url='{}': must start with http:// or https://",
                url
            );
        }
        if self.api.timeout_ms == 0 {
            bail!("CONFIG_INVALID api.timeout_ms must be > 0");
        }
        if self.submission.channel.trim().is_empty() {
            bail!("CONFIG_INVALID submission.channel must not be empty");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unused-key guard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Leaf pointers no known key covers, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Leaves of `config_json` that no entry in [`KNOWN_POINTERS`] covers.
/// With [`UnusedKeyPolicy::Fail`] a non-empty report is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused: Vec<String> = leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !KNOWN_POINTERS.iter().any(|known| covers(known, ptr)))
        .collect();
    unused.sort();
    unused.dedup();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        let shown: Vec<&str> = unused.iter().take(12).map(String::as_str).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s): {}",
            unused.len(),
            shown.join(", ")
        );
    }

    Ok(UnusedKeyReport {
        unused_leaf_pointers: unused,
    })
}

/// `/api` covers `/api/base_url` but not `/apix`.
fn covers(known: &str, ptr: &str) -> bool {
    match ptr.strip_prefix(known) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every scalar (or empty container) in `v` with its JSON pointer. Empty
/// objects at the root produce nothing.
fn leaves(v: &Value) -> Vec<(String, &Value)> {
    fn walk<'a>(v: &'a Value, ptr: String, out: &mut Vec<(String, &'a Value)>) {
        match v {
            Value::Object(map) if !map.is_empty() => {
                for (k, child) in map {
                    let token = k.replace('~', "~0").replace('/', "~1");
                    walk(child, format!("{ptr}/{token}"), out);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, child) in items.iter().enumerate() {
                    walk(child, format!("{ptr}/{i}"), out);
                }
            }
            _ if ptr.is_empty() => {}
            _ => out.push((ptr, v)),
        }
    }

    let mut out = Vec::new();
    walk(v, String::new(), &mut out);
    out
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn client(&self) -> Result<ClientConfig> {
        ClientConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        // Empty or comment-only files are empty layers.
        if layer.is_null() {
            continue;
        }
        let layer = serde_json::to_value(layer).context("yaml->json conversion failed")?;
        merge_into(&mut merged, layer);
    }

    reject_secret_literals(&merged)?;

    // serde_json's default Map is ordered by key, so this is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other value in `layer` replaces the base.
fn merge_into(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                merge_into(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, other) => *slot = other,
    }
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    for (ptr, leaf) in leaves(v) {
        let Some(s) = leaf.as_str().map(str::trim) else {
            continue;
        };
        if s.len() >= 8 && SECRET_PREFIXES.iter().any(|p| s.starts_with(p)) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_pointer_covers_only_whole_segments() {
        assert!(covers("/api", "/api/base_url"));
        assert!(covers("/api/base_url", "/api/base_url"));
        assert!(!covers("/api/base", "/api/base_url"));
        assert!(!covers("/api", "/apix"));
    }

    #[test]
    fn leaves_escape_tokens_and_skip_empty_root() {
        assert!(leaves(&json!({})).is_empty());
        let v = json!({"a/b": {"c~d": 1}, "list": [true], "empty": {}});
        let ptrs: Vec<String> = leaves(&v).into_iter().map(|(p, _)| p).collect();
        assert_eq!(ptrs, ["/a~1b/c~0d", "/empty", "/list/0"]);
    }

    #[test]
    fn later_layer_wins_and_objects_merge() {
        let mut base = json!({"api": {"base_url": "http://a", "timeout_ms": 5}});
        merge_into(&mut base, json!({"api": {"base_url": "http://b"}, "logging": {"level": "debug"}}));
        assert_eq!(
            base,
            json!({"api": {"base_url": "http://b", "timeout_ms": 5}, "logging": {"level": "debug"}})
        );
    }

    #[test]
    fn empty_documents_yield_defaults() {
        let loaded = load_layered_yaml_from_strings(&[]).unwrap();
        assert_eq!(loaded.client().unwrap(), ClientConfig::default());
        let loaded = load_layered_yaml_from_strings(&["", "# only a comment"]).unwrap();
        assert_eq!(loaded.client().unwrap(), ClientConfig::default());
    }
}
