use crate::config::types::{
    ApiConfig, Config, CredentialsConfig, HarvestConfig, OutputConfig, PaginationConfig,
};
use crate::ConfigError;
use url::Url;

/// Hard cap on results per query enforced by the search API
pub const API_RESULT_CAP: usize = 10_000;

/// Validates the entire configuration
///
/// Date ordering is not checked here. An empty or inverted range is rejected
/// by the harvest entry point without being an error.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_api_config(&config.api)?;
    validate_pagination_config(&config.pagination)?;
    validate_output_config(&config.output)?;
    if let Some(credentials) = &config.credentials {
        validate_credentials(credentials)?;
    }
    Ok(())
}

/// Validates the harvest target
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_subreddit(&config.subreddit)?;

    if config.results_per_day < 1 || config.results_per_day > 1000 {
        return Err(ConfigError::Validation(format!(
            "results-per-day must be between 1 and 1000, got {}",
            config.results_per_day
        )));
    }

    if config.sort_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sort-type cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a subreddit name: alphanumerics and underscores, no `r/` prefix
fn validate_subreddit(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "subreddit cannot be empty".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "subreddit must contain only letters, digits and underscores (without 'r/'), got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("search-base-url", &config.search_base_url)?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.page_limit < 1 || config.page_limit > API_RESULT_CAP {
        return Err(ConfigError::Validation(format!(
            "page-limit must be between 1 and {}, got {}",
            API_RESULT_CAP, config.page_limit
        )));
    }

    if config.cutoff < 1 || config.cutoff > config.page_limit {
        return Err(ConfigError::Validation(format!(
            "cutoff must be between 1 and page-limit ({}), got {}",
            config.page_limit, config.cutoff
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_credentials(config: &CredentialsConfig) -> Result<(), ConfigError> {
    if config.client_id.trim().is_empty() || config.secret_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client-id and secret-key cannot be empty".to_string(),
        ));
    }

    validate_http_url("token-url", &config.token_url)?;
    validate_http_url("oauth-base-url", &config.oauth_base_url)?;

    Ok(())
}

/// Validates that a configured endpoint parses and uses HTTP(S)
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
