use std::time::Duration;

use thiserror::Error;

use crate::auth::AccessPolicy;

pub const DEFAULT_TIMEOUT_MS: u64 = 2500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Settings read once at cold start.
#[derive(Debug, Clone)]
pub struct Config {
    pub freshdesk_url: String,
    pub freshdesk_web_url: String,
    pub freshdesk_api_key: String,
    pub freshdesk_timeout: Duration,
    pub slack_signing_secret: String,
    pub access: AccessPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let freshdesk_url = required("FRESHDESK_URL")?.trim_end_matches('/').to_string();
        let freshdesk_web_url = lookup("FRESHDESK_WEB_URL")
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| freshdesk_url.clone());
        let freshdesk_api_key = required("FRESHDESK_API_KEY")?;
        let slack_signing_secret = required("SLACK_SIGNING_SECRET")?;

        let limit_users = match lookup("LIMIT_USERS") {
            Some(value) => parse_bool("LIMIT_USERS", &value)?,
            None => true,
        };
        let approved_users = lookup("APPROVED_USERS")
            .map(|value| parse_user_list("APPROVED_USERS", &value))
            .transpose()?
            .unwrap_or_default();

        let freshdesk_timeout = match lookup("FRESHDESK_TIMEOUT_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "FRESHDESK_TIMEOUT_MS",
                    value: value.clone(),
                })?,
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        Ok(Self {
            freshdesk_url,
            freshdesk_web_url,
            freshdesk_api_key,
            freshdesk_timeout,
            slack_signing_secret,
            access: AccessPolicy::new(limit_users, approved_users),
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

/// Accepts either a JSON array (`["alice","bob"]`) or `alice,bob`.
fn parse_user_list(var: &'static str, value: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed).map_err(|_| ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string)
        .collect())
}
