use crate::config::types::{
    Config, ExtractionConfig, LimitsConfig, SearchConfig, TransportConfig,
};
use crate::extract::parse_selector;
use crate::ConfigError;
use url::Url;

/// Largest accepted results budget
pub const MAX_RESULTS_WANTED: u32 = 100_000;

/// Largest accepted page ceiling
pub const MAX_PAGES: u32 = 10_000;

/// Validates the entire configuration
///
/// Called once at startup (after CLI overrides are applied); any error here
/// aborts the run before a single page is fetched.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_limits_config(&config.limits)?;
    validate_transport_config(&config.transport)?;
    validate_extraction_config(&config.extraction)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates search parameters
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if let Some(start_url) = &config.start_url {
        validate_http_url("start_url", start_url)?;
    } else {
        validate_http_url("base_url", &config.base_url)?;
    }

    if let (Some(min), Some(max)) = (config.year_min, config.year_max) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "year_min ({}) cannot be greater than year_max ({})",
                min, max
            )));
        }
    }

    if let Some(zip) = &config.zip {
        if zip.trim().is_empty() {
            return Err(ConfigError::Validation("zip cannot be blank".to_string()));
        }
    }

    Ok(())
}

/// Validates the results budget
fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.results_wanted < 1 || config.results_wanted > MAX_RESULTS_WANTED {
        return Err(ConfigError::Validation(format!(
            "results_wanted must be between 1 and {}, got {}",
            MAX_RESULTS_WANTED, config.results_wanted
        )));
    }

    if config.max_pages < 1 || config.max_pages > MAX_PAGES {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES, config.max_pages
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    Ok(())
}

/// Validates transport settings
fn validate_transport_config(config: &TransportConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    for proxy in &config.proxy_urls {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e)))?;
        reqwest::Proxy::all(proxy.as_str())
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e)))?;
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction rules, including every CSS selector
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    validate_http_url("site_origin", &config.site_origin)?;
    validate_http_url(
        "structured.listing_url_base",
        &config.structured.listing_url_base,
    )?;

    if config.block_indicators.iter().any(|i| i.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "block_indicators cannot contain blank entries".to_string(),
        ));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.structured.listing_type.is_empty() {
        return Err(ConfigError::Validation(
            "structured.listing_type cannot be empty".to_string(),
        ));
    }

    let markup = &config.markup;
    for selector in [
        config.next_page_selector.as_str(),
        config.structured.anchor.as_str(),
        markup.card.as_str(),
        markup.year.as_str(),
        markup.make.as_str(),
        markup.model.as_str(),
        markup.trim.as_str(),
        markup.price.as_str(),
        markup.mileage.as_str(),
        markup.location.as_str(),
        markup.link.as_str(),
    ] {
        parse_selector(selector)?;
    }

    Ok(())
}

/// Checks that `value` is an absolute http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("f", "https://example.com/").is_ok());
        assert!(validate_http_url("f", "http://127.0.0.1:8080/x").is_ok());

        assert!(validate_http_url("f", "").is_err());
        assert!(validate_http_url("f", "example.com").is_err());
        assert!(validate_http_url("f", "ftp://example.com/").is_err());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = Config::default();
        config.limits.results_wanted = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.limits.max_pages = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_oversized_budget_rejected() {
        let mut config = Config::default();
        config.limits.results_wanted = MAX_RESULTS_WANTED + 1;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.limits.max_pages = u32::MAX;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.limits.results_wanted = MAX_RESULTS_WANTED;
        config.limits.max_pages = MAX_PAGES;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = Config::default();
        config.limits.max_concurrency = 0;
        assert!(validate(&config).is_err());

        config.limits.max_concurrency = 101;
        assert!(validate(&config).is_err());

        config.limits.max_concurrency = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_year_range() {
        let mut config = Config::default();
        config.search.year_min = Some(2020);
        config.search.year_max = Some(2020);
        assert!(validate(&config).is_ok());

        config.search.year_max = Some(2019);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_start_url_must_be_http() {
        let mut config = Config::default();
        config.search.start_url = Some("file:///etc/passwd".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = Config::default();
        config.extraction.markup.card = "[[[".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_blank_block_indicator_rejected() {
        let mut config = Config::default();
        config.extraction.block_indicators.push("  ".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let mut config = Config::default();
        config.transport.proxy_urls = vec!["not a proxy".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }
}
