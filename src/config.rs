use crate::analytics::strength::{Breakpoint, StrengthCurve};
use crate::habits::DeletePolicy;
use crate::storage::StorageSettings;
use crate::storage::retry::RetryPolicy;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_RELATIVE_PATH: &str = ".habitledger/config.toml";
const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    pub storage: StorageSettings,
    pub retry: RetryPolicy,
    pub strength: StrengthCurve,
    pub on_delete: DeletePolicy,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLedgerConfig {
    version: Option<u32>,
    storage: Option<RawStorageConfig>,
    retry: Option<RawRetryConfig>,
    strength: Option<RawStrengthConfig>,
    habits: Option<RawHabitsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStorageConfig {
    busy_timeout_secs: Option<u64>,
    cache_size_kib: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRetryConfig {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStrengthConfig {
    breakpoints: Option<Vec<RawBreakpoint>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBreakpoint {
    days: Option<u32>,
    score: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawHabitsConfig {
    on_delete: Option<String>,
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_RELATIVE_PATH)
}

/// Loads `.habitledger/config.toml` under `root`; `None` when the file is absent.
pub fn load_config(root: &Path) -> Result<Option<LedgerConfig>> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read ledger config {}", path.display()))?;
    let parsed: RawLedgerConfig =
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(validate_config(parsed, &path)?))
}

pub fn load_config_or_default(root: &Path) -> Result<LedgerConfig> {
    Ok(load_config(root)?.unwrap_or_default())
}

fn validate_config(raw: RawLedgerConfig, path: &Path) -> Result<LedgerConfig> {
    let version = raw
        .version
        .ok_or_else(|| anyhow::anyhow!("{} missing required `version`", path.display()))?;
    if version != SUPPORTED_VERSION {
        bail!(
            "{} has unsupported version {version}; expected version = {SUPPORTED_VERSION}",
            path.display()
        );
    }

    let defaults = LedgerConfig::default();

    let storage = match raw.storage {
        None => defaults.storage,
        Some(storage) => {
            let busy_timeout = storage
                .busy_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.storage.busy_timeout);
            if busy_timeout.is_zero() {
                bail!("{} has zero `[storage].busy_timeout_secs`", path.display());
            }
            StorageSettings {
                busy_timeout,
                cache_size_kib: storage
                    .cache_size_kib
                    .unwrap_or(defaults.storage.cache_size_kib),
            }
        }
    };

    let retry = match raw.retry {
        None => defaults.retry,
        Some(retry) => {
            let max_attempts = retry.max_attempts.unwrap_or(defaults.retry.max_attempts);
            if max_attempts == 0 {
                bail!("{} has zero `[retry].max_attempts`", path.display());
            }
            let initial_delay = retry
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.initial_delay);
            let max_delay = retry
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay);
            if max_delay < initial_delay {
                bail!(
                    "{} has `[retry].max_delay_ms` below `initial_delay_ms`",
                    path.display()
                );
            }
            RetryPolicy {
                max_attempts,
                initial_delay,
                max_delay,
            }
        }
    };

    let strength = match raw.strength.and_then(|s| s.breakpoints) {
        None => defaults.strength,
        Some(raw_points) => {
            let mut points = Vec::with_capacity(raw_points.len());
            for (idx, point) in raw_points.into_iter().enumerate() {
                let days = point.days.ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} missing `days` for `[[strength.breakpoints]]` at index {idx}",
                        path.display()
                    )
                })?;
                let score = point.score.ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} missing `score` for `[[strength.breakpoints]]` at index {idx}",
                        path.display()
                    )
                })?;
                points.push(Breakpoint { days, score });
            }
            StrengthCurve::new(points)
                .with_context(|| format!("{} invalid `[strength]`", path.display()))?
        }
    };

    let on_delete = match raw
        .habits
        .and_then(|h| h.on_delete)
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        None | Some("retain") => DeletePolicy::Retain,
        Some("cascade") => DeletePolicy::Cascade,
        Some(other) => bail!(
            "{} has unsupported `[habits].on_delete = \"{other}\"`; expected `retain` or `cascade`",
            path.display()
        ),
    };

    Ok(LedgerConfig {
        storage,
        retry,
        strength,
        on_delete,
    })
}
