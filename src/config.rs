use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// Set via GATE_PORT. Default: 3000.
    pub port: u16,
    /// JSON document holding all access records. Set via GATE_STORE_PATH.
    pub store_path: PathBuf,
    /// Protected script released to approved identifiers. Set via GATE_PAYLOAD_PATH.
    pub payload_path: PathBuf,
    /// Per-request server timeout. Set via GATE_REQUEST_TIMEOUT_SECS. Default: 30.
    pub request_timeout: Duration,
    pub client: ClientConfig,
}

/// Settings used by the `poll` command.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gate server. Set via GATE_URL.
    pub gate_url: String,
    /// Pause between polls. Set via GATE_POLL_INTERVAL_SECS. Default: 3.
    pub poll_interval: Duration,
    /// Total wait budget. Set via GATE_POLL_TIMEOUT_SECS. Default: 120.
    pub poll_timeout: Duration,
    /// Program the released payload is piped into. Set via GATE_INTERPRETER.
    pub interpreter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gate_url: "http://localhost:3000".into(),
            poll_interval: Duration::from_secs(3),
            poll_timeout: Duration::from_secs(120),
            interpreter: "node".into(),
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let defaults = ClientConfig::default();

    let gate_url = std::env::var("GATE_URL").unwrap_or(defaults.gate_url);
    reqwest::Url::parse(&gate_url).with_context(|| format!("GATE_URL is not a valid URL: {}", gate_url))?;

    let poll_interval = nonzero_secs_var("GATE_POLL_INTERVAL_SECS", defaults.poll_interval)?;

    Ok(Config {
        port: std::env::var("GATE_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .unwrap_or(3000),
        store_path: std::env::var("GATE_STORE_PATH")
            .unwrap_or_else(|_| "users.json".into())
            .into(),
        payload_path: std::env::var("GATE_PAYLOAD_PATH")
            .unwrap_or_else(|_| "protected.js".into())
            .into(),
        request_timeout: nonzero_secs_var("GATE_REQUEST_TIMEOUT_SECS", Duration::from_secs(30))?,
        client: ClientConfig {
            gate_url,
            poll_interval,
            poll_timeout: secs_var("GATE_POLL_TIMEOUT_SECS")?.unwrap_or(defaults.poll_timeout),
            interpreter: std::env::var("GATE_INTERPRETER").unwrap_or(defaults.interpreter),
        },
    })
}

fn secs_var(name: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got '{}'", name, v))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        _ => Ok(None),
    }
}

/// Like `secs_var`, but a zero value is a configuration error.
fn nonzero_secs_var(name: &str, default: Duration) -> anyhow::Result<Duration> {
    let value = secs_var(name)?.unwrap_or(default);
    if value.is_zero() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
