//! Environment-driven startup configuration.
//!
//! Loaded once via `dotenvy` + `std::env`, validated eagerly so a bad port or
//! malformed duration aborts process start rather than surfacing as a
//! confusing runtime failure. Mirrors the teacher's `bootstrap::config`
//! env-loading shape and `config::validation` helper style, folded into one
//! module since this system's configuration surface is far smaller than the
//! teacher's multi-provider workflow config.

use std::time::Duration;

use crate::error::CoordinatorError;

#[derive(Debug, Clone)]
pub struct AiRankerConfig {
    pub enabled: bool,
    pub provider_key: Option<String>,
    pub model: String,
    pub fallback_enabled: bool,
    pub temperature: f64,
    pub max_candidates: usize,
    pub min_confidence: f64,
    pub request_timeout: Duration,
}

impl Default for AiRankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider_key: None,
            model: "claude-3-haiku-20240307".to_string(),
            fallback_enabled: true,
            temperature: 0.1,
            max_candidates: 10,
            min_confidence: 0.3,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CascadePolicy {
    pub max_attempts: usize,
    pub attempt_timeout: Duration,
    pub min_quality: f64,
    pub stop_on_first: bool,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_millis(5_000),
            min_quality: 0.3,
            stop_on_first: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthSweepSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub failure_threshold: u32,
}

impl Default for HealthSweepSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(30),
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub http_port: u16,
    pub rpc_port: u16,
    pub ai: AiRankerConfig,
    pub cascade: CascadePolicy,
    pub registry_store_url: Option<String>,
    pub changelog_max_entries: usize,
    pub log_format: LogFormat,
    pub rust_log: String,
    pub health_sweep: HealthSweepSettings,
    pub inbound_default_deadline: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, CoordinatorError> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| CoordinatorError::MisconfigurationOnStartup {
            message: format!("{key}: cannot parse {raw:?}"),
        }),
    }
}

fn validate_range(key: &str, value: f64, min: f64, max: f64) -> Result<(), CoordinatorError> {
    if value < min || value > max {
        return Err(CoordinatorError::MisconfigurationOnStartup {
            message: format!("{key}={value} out of range [{min}, {max}]"),
        });
    }
    Ok(())
}

impl CoordinatorConfig {
    /// Loads configuration from the process environment (after attempting to
    /// load a `.env` file via `dotenvy`), validating every field eagerly.
    pub fn from_env() -> Result<Self, CoordinatorError> {
        let _ = dotenvy::dotenv();

        let http_port: u16 = parse_env("HTTP_PORT", 3000)?;
        let rpc_port: u16 = parse_env("RPC_PORT", 50051)?;

        let ai_enabled: bool = parse_env("AI_ENABLED", false)?;
        let ai_provider_key = env_var("AI_PROVIDER_KEY");
        if ai_enabled && ai_provider_key.is_none() {
            return Err(CoordinatorError::MisconfigurationOnStartup {
                message: "AI_ENABLED=true requires AI_PROVIDER_KEY".into(),
            });
        }
        let ai_model = env_var("AI_MODEL").unwrap_or_else(|| AiRankerConfig::default().model);
        let ai_fallback_enabled: bool = parse_env("AI_FALLBACK_ENABLED", true)?;

        let max_attempts: usize = parse_env("CASCADE_MAX_ATTEMPTS", 5)?;
        let attempt_timeout_ms: u64 = parse_env("CASCADE_ATTEMPT_TIMEOUT_MS", 5_000)?;
        let min_quality: f64 = parse_env("CASCADE_MIN_QUALITY", 0.3)?;
        validate_range("CASCADE_MIN_QUALITY", min_quality, 0.0, 1.0)?;
        let stop_on_first: bool = parse_env("CASCADE_STOP_ON_FIRST", true)?;

        let registry_store_url = env_var("REGISTRY_STORE_URL");
        let changelog_max_entries: usize = parse_env("CHANGELOG_MAX_ENTRIES", 1_000)?;

        let rust_log = env_var("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let log_format = match env_var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(CoordinatorError::MisconfigurationOnStartup {
                    message: format!("LOG_FORMAT must be json or pretty, got {other:?}"),
                })
            }
            None if cfg!(debug_assertions) => LogFormat::Pretty,
            None => LogFormat::Json,
        };

        let health_sweep_enabled: bool = parse_env("HEALTH_SWEEP_ENABLED", false)?;
        let health_sweep_interval_secs: u64 = parse_env("HEALTH_SWEEP_INTERVAL_SECS", 30)?;
        let health_failure_threshold: u32 = parse_env("HEALTH_FAILURE_THRESHOLD", 3)?;
        let inbound_default_deadline_ms: u64 = parse_env("INBOUND_DEFAULT_DEADLINE_MS", 60_000)?;

        Ok(Self {
            http_port,
            rpc_port,
            ai: AiRankerConfig {
                enabled: ai_enabled,
                provider_key: ai_provider_key,
                model: ai_model,
                fallback_enabled: ai_fallback_enabled,
                ..AiRankerConfig::default()
            },
            cascade: CascadePolicy {
                max_attempts,
                attempt_timeout: Duration::from_millis(attempt_timeout_ms),
                min_quality,
                stop_on_first,
            },
            registry_store_url,
            changelog_max_entries,
            log_format,
            rust_log,
            health_sweep: HealthSweepSettings {
                enabled: health_sweep_enabled,
                interval: Duration::from_secs(health_sweep_interval_secs),
                failure_threshold: health_failure_threshold,
            },
            inbound_default_deadline: Duration::from_millis(inbound_default_deadline_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // std::env mutation races across tests in the same binary; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_coordinator_env() {
        for key in [
            "HTTP_PORT", "RPC_PORT", "AI_ENABLED", "AI_PROVIDER_KEY", "AI_MODEL",
            "AI_FALLBACK_ENABLED", "CASCADE_MAX_ATTEMPTS", "CASCADE_ATTEMPT_TIMEOUT_MS",
            "CASCADE_MIN_QUALITY", "CASCADE_STOP_ON_FIRST", "REGISTRY_STORE_URL",
            "CHANGELOG_MAX_ENTRIES", "RUST_LOG", "LOG_FORMAT", "HEALTH_SWEEP_ENABLED",
            "HEALTH_SWEEP_INTERVAL_SECS", "HEALTH_FAILURE_THRESHOLD", "INBOUND_DEFAULT_DEADLINE_MS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_load_without_any_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_coordinator_env();
        let config = CoordinatorConfig::from_env().unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.rpc_port, 50051);
        assert!(!config.ai.enabled);
        assert_eq!(config.cascade.max_attempts, 5);
    }

    #[test]
    fn ai_enabled_without_key_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_coordinator_env();
        std::env::set_var("AI_ENABLED", "true");
        let err = CoordinatorConfig::from_env().unwrap_err();
        assert!(matches!(err, CoordinatorError::MisconfigurationOnStartup { .. }));
        std::env::remove_var("AI_ENABLED");
    }

    #[test]
    fn out_of_range_quality_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_coordinator_env();
        std::env::set_var("CASCADE_MIN_QUALITY", "1.5");
        let err = CoordinatorConfig::from_env().unwrap_err();
        assert!(matches!(err, CoordinatorError::MisconfigurationOnStartup { .. }));
        std::env::remove_var("CASCADE_MIN_QUALITY");
    }
}
