use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::sources::ServiceConfig;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("can't read config file '{}'", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new(
            "info".to_owned(),
            LogFormat::Compact,
        ));
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config).map_err(|errors| {
        anyhow!(
            "config is not valid, total errors: {}\n{}",
            errors.len(),
            errors.join("\n")
        )
    })?;

    Ok(service_config)
}

/// Replaces `${VAR}` and `${VAR:default}` with the environment value, the default,
/// or an empty string.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}
