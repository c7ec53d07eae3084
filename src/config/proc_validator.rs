//! Configuration validation with aggregated errors: every issue is collected
//! into one `Vec<String>` so that a broken file is reported in a single pass.

use tracing::{error, info};
use url::Url;

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::sources::{AuthConfig, ServiceConfig};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_auth(&cfg.auth, &mut errors);
    validate_settings(&cfg.settings, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(errors)
    }
}

/// AUTH VALIDATION
fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    if !auth.have_credentials() {
        errors.push(
            "auth: credentials are missing; set 'tokens', 'user' and 'password', \
             or 'client_id' and 'client_secret'"
                .to_string(),
        );
    }

    if let Some(url) = &auth.token_url {
        if let Err(e) = Url::parse(url) {
            errors.push(format!("auth.token_url '{}' is not a valid URL: {}", url, e));
        }
    }

    if auth.scopes.iter().any(|s| s.trim().is_empty() || s.contains(' ')) {
        errors.push("auth.scopes must not contain empty values or spaces".to_string());
    }

    for path in &auth.trusted_cas {
        if !path.is_file() {
            errors.push(format!(
                "auth.trusted_cas file '{}' doesn't exist",
                path.display()
            ));
        }
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(s) = settings.freshness_seconds {
        if s > 60 * 60 * 24 {
            errors.push(format!(
                "settings.freshness_seconds ({}) is unreasonably large",
                s
            ));
        }
    }

    if let Some(metrics) = &settings.metrics {
        if !metrics.path.starts_with('/') {
            errors.push(format!(
                "settings.metrics.path '{}' must start with '/'",
                metrics.path
            ));
        }
        if metrics.is_enabled && metrics.subsystem.as_deref().unwrap_or("").is_empty() {
            errors.push(
                "settings.metrics.subsystem is required when metrics are enabled".to_string(),
            );
        }
    }

    if let Some(server) = &settings.server {
        if server.host.is_empty() {
            errors.push("settings.server.host must not be empty".to_string());
        }
        if server.port.parse::<u16>().is_err() {
            errors.push(format!(
                "settings.server.port '{}' must be a valid port number",
                server.port
            ));
        }
        if !server.token_path.starts_with('/') {
            errors.push(format!(
                "settings.server.token_path '{}' must start with '/'",
                server.token_path
            ));
        }
    }

    if let Some(logging) = &settings.logging {
        let allowed = ["trace", "debug", "info", "warn", "error"];
        if !allowed.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, allowed
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(m) = retry.multiplier {
        if !m.is_finite() || m < 1.0 {
            errors.push(format!(
                "{}.multiplier ({}) must be a finite number >= 1.0",
                path, m
            ));
        }
    }
    if let (Some(initial), Some(max)) = (retry.initial_interval_ms, retry.max_interval_ms) {
        if max < initial {
            errors.push(format!(
                "{}.max_interval_ms ({}) must be >= initial_interval_ms ({})",
                path, max, initial
            ));
        }
    }
    if retry.max_elapsed_ms == Some(0) {
        errors.push(format!("{}.max_elapsed_ms must be > 0", path));
    }
}
