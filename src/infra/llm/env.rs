use std::time::Duration;

use crate::domain::LlmError;

pub(crate) const ENV_GLOBAL_TIMEOUT_SECS: &str = "HABITLOOM_LLM_TIMEOUT_SECS";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn read_env_var(name: &str) -> Result<Option<String>, LlmError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(LlmError::validation(format!(
            "{name} could not be read: {error}"
        ))),
    }
}

/// Reads `primary`, then each fallback in order.
pub(crate) fn read_first_env_var(
    primary: &str,
    fallbacks: &[&str],
) -> Result<Option<String>, LlmError> {
    if let Some(value) = read_env_var(primary)? {
        return Ok(Some(value));
    }
    for name in fallbacks {
        if let Some(value) = read_env_var(name)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, LlmError> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        LlmError::validation(format!("{name} must be a positive integer in seconds"))
    })?;
    if parsed == 0 {
        return Err(LlmError::validation(format!(
            "{name} must be greater than 0 seconds"
        )));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout_from_env(name: &str) -> Result<Option<Duration>, LlmError> {
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

/// Provider timeout wins; the global variable is only read when it is absent.
pub(crate) fn resolve_timeout_with_global_fallback<F>(
    provider_timeout: Option<Duration>,
    read_global_timeout: F,
) -> Result<Duration, LlmError>
where
    F: FnOnce() -> Result<Option<Duration>, LlmError>,
{
    if let Some(timeout) = provider_timeout {
        return Ok(timeout);
    }

    Ok(read_global_timeout()?.unwrap_or(DEFAULT_TIMEOUT))
}

pub(crate) fn provider_timeout_from_env(name: &str) -> Result<Duration, LlmError> {
    resolve_timeout_with_global_fallback(read_timeout_from_env(name)?, || {
        read_timeout_from_env(ENV_GLOBAL_TIMEOUT_SECS)
    })
}
