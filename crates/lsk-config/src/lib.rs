//! Layered YAML configuration with a secret-literal guard and a canonical
//! config hash.
//!
//! Config files merge in order (later docs override earlier ones). Secret
//! material must never appear as a literal value — the gateway signing key
//! is named by an env var and read at startup. The canonical-JSON SHA-256
//! hash identifies the effective config in logs.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // provider secret keys
    "sk_live",    // live-mode keys
    "sk_test",    // test-mode keys
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub daemon: DaemonSection,
    pub gateway: GatewaySection,
    pub lock: LockSection,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSection {
    /// Bind address for the HTTP surface.
    pub bind: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8710".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewaySection {
    /// Provider API base. Absent = no provider; payment creation degrades
    /// to the hosted simulation page.
    pub endpoint: Option<String>,
    pub app_id: Option<String>,
    /// Where the provider posts callbacks.
    pub notify_url: String,
    /// Where the tenant lands after checkout.
    pub return_url: String,
    /// Env var holding the shared signing key. Never a literal here.
    pub secret_env: String,
    /// Hard timeout on gateway calls, seconds.
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            endpoint: None,
            app_id: None,
            notify_url: "http://127.0.0.1:8710/v1/payments/notify".to_string(),
            return_url: "http://127.0.0.1:8710/orders".to_string(),
            secret_env: "LSK_GATEWAY_SECRET".to_string(),
            timeout_secs: 5,
        }
    }
}

impl GatewaySection {
    /// Read the signing key from the named env var.
    pub fn signing_key(&self) -> Result<Vec<u8>> {
        let key = std::env::var(&self.secret_env)
            .with_context(|| format!("missing env var {}", self.secret_env))?;
        Ok(key.into_bytes())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockSection {
    /// Bounded wait for the create lock, seconds.
    pub wait_secs: u64,
    /// TTL on an acquired key, seconds.
    pub ttl_secs: u64,
}

impl Default for LockSection {
    fn default() -> Self {
        Self {
            wait_secs: 3,
            ttl_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    pub expiry_period_secs: u64,
    pub reminder_period_secs: u64,
    pub reminder_lookahead_secs: u64,
    pub stale_period_secs: u64,
    pub unpaid_timeout_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            expiry_period_secs: 60,
            reminder_period_secs: 60,
            reminder_lookahead_secs: 300,
            stale_period_secs: 300,
            unpaid_timeout_secs: 1800,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// The effective config plus its identity hash.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub config_hash: String,
}

/// Load and merge YAML files in order; later paths override earlier ones.
/// No paths yields the built-in defaults.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs = Vec::with_capacity(paths.len());
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read config path: {p}"))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical.as_bytes());

    let config: AppConfig =
        serde_json::from_value(merged).context("config did not match the expected shape")?;
    Ok(LoadedConfig {
        config,
        config_hash,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    walk_leaf_strings(v, "", &mut |path, s| {
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={path} value=REDACTED");
        }
        Ok(())
    })
}

fn walk_leaf_strings(
    v: &Value,
    path: &str,
    f: &mut impl FnMut(&str, &str) -> Result<()>,
) -> Result<()> {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                walk_leaf_strings(vv, &format!("{path}/{k}"), f)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                walk_leaf_strings(vv, &format!("{path}/{i}"), f)?;
            }
            Ok(())
        }
        Value::String(s) => f(path, s),
        _ => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
