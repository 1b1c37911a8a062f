use crate::config::types::{
    CrawlerConfig, NotifierConfig, ServiceConfig, SinkConfig, SourcesConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &ServiceConfig) -> Result<(), ConfigError> {
    validate_sources(&config.sources)?;
    validate_crawler_config(&config.crawler)?;
    validate_sink_config(&config.sink)?;
    validate_notifier_config(&config.notifier)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    validate_http_url("latest-url", &config.latest_url)?;
    validate_http_url("home-url", &config.home_url)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 1024 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 1024, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.timeout_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "timeout_retries must be <= 10, got {}",
            config.timeout_retries
        )));
    }

    if config.detail_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "detail_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_rounds < 1 {
        return Err(ConfigError::Validation(format!(
            "max_rounds must be >= 1, got {}",
            config.max_rounds
        )));
    }

    if !matches!(config.manifest_scheme.as_str(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "manifest_scheme must be 'http' or 'https', got '{}'",
            config.manifest_scheme
        )));
    }

    Ok(())
}

fn validate_sink_config(config: &SinkConfig) -> Result<(), ConfigError> {
    validate_http_url("sink base-url", &config.base_url)?;

    if !config.publish_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "publish_path must start with '/', got '{}'",
            config.publish_path
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "sink timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_notifier_config(config: &NotifierConfig) -> Result<(), ConfigError> {
    if config.topic.trim().is_empty() {
        return Err(ConfigError::Validation(
            "notifier topic cannot be empty".to_string(),
        ));
    }

    if let Some(url) = &config.config_url {
        validate_http_url("config-url", url)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Accepts absolute http(s) URLs only
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
