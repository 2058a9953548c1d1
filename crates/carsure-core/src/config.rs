use crate::app_config::{AiProvider, AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_UPLOAD_BYTES: &str = "10485760";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_flag = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_bool(var, &raw),
            Err(_) => Ok(default),
        }
    };

    let firebase_database_url = require("FIREBASE_DATABASE_URL")?;

    // FLASK_ENV is honoured for deployments that still export the old name.
    let env_raw = lookup("CARSURE_ENV")
        .or_else(|_| lookup("FLASK_ENV"))
        .unwrap_or_else(|_| "development".to_string());
    let env = parse_environment(&env_raw);
    let dev_mode = parse_flag("DEV_MODE", false)?;

    let bind_addr = parse_addr("CARSURE_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("CARSURE_LOG_LEVEL", "info");

    let firebase_project_id = optional("FIREBASE_PROJECT_ID");
    let firebase_api_key = optional("FIREBASE_API_KEY");
    let firebase_list_timeout_secs = parse_u64("CARSURE_FIREBASE_LIST_TIMEOUT_SECS", "4")?;

    let mut gemini_api_keys: Vec<String> = optional("GEMINI_API_KEY").into_iter().collect();
    gemini_api_keys.extend(split_list(&or_default("GEMINI_BACKUP_KEYS", "")));
    gemini_api_keys.dedup();

    let gemini_model = or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL);
    let gemini_timeout_secs = parse_u64("GEMINI_TIMEOUT_SECS", "60")?;

    let is_dev = matches!(env, Environment::Development) || dev_mode;
    let ai_provider = resolve_ai_provider(
        optional("CARSURE_AI_PROVIDER").as_deref(),
        !gemini_api_keys.is_empty(),
        is_dev,
    )?;

    let detector_url = optional("CARSURE_DETECTOR_URL");
    let detector_enabled = parse_flag("CARSURE_DETECTOR_ENABLED", true)? && detector_url.is_some();

    let admin_uids = split_list(&or_default("CARSURE_ADMIN_UIDS", ""));
    let store_raw_image = parse_flag("CARSURE_STORE_RAW_IMAGE", false)?;
    let max_upload_bytes = parse_usize("CARSURE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

    Ok(AppConfig {
        env,
        dev_mode,
        bind_addr,
        log_level,
        firebase_database_url,
        firebase_project_id,
        firebase_api_key,
        firebase_list_timeout_secs,
        gemini_api_keys,
        gemini_model,
        gemini_timeout_secs,
        ai_provider,
        detector_url,
        detector_enabled,
        admin_uids,
        store_raw_image,
        max_upload_bytes,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s.trim().to_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "test" | "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Picks the vision backend.
///
/// An explicit `CARSURE_AI_PROVIDER` wins. Without it, Gemini is used when a
/// key exists; development falls back to the mock, anything else fails.
fn resolve_ai_provider(
    explicit: Option<&str>,
    has_keys: bool,
    is_dev: bool,
) -> Result<AiProvider, ConfigError> {
    match explicit.map(str::to_lowercase).as_deref() {
        Some("mock") => Ok(AiProvider::Mock),
        Some("gemini") if has_keys => Ok(AiProvider::Gemini),
        Some("gemini") => Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string())),
        Some(other) => Err(ConfigError::InvalidEnvVar {
            var: "CARSURE_AI_PROVIDER".to_string(),
            reason: format!("expected 'gemini' or 'mock', got '{other}'"),
        }),
        None if has_keys => Ok(AiProvider::Gemini),
        None if is_dev => Ok(AiProvider::Mock),
        None => Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string())),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
