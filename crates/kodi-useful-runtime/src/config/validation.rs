//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AddonConfig, AddonSection, LogOutput, LoggingConfig, RouterConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &AddonConfig) -> ConfigResult<()> {
    validate_addon_config(&config.addon)?;
    validate_router_config(&config.router)?;
    validate_logging_config(&config.logging, &config.addon)?;
    Ok(())
}

/// Validates the add-on identity.
fn validate_addon_config(addon: &AddonSection) -> ConfigResult<()> {
    if addon.id.contains(char::is_whitespace) {
        return Err(ConfigError::validation("Add-on id cannot contain whitespace"));
    }

    if let Some(base) = &addon.base_url {
        validate_base_url(base)?;
    }

    Ok(())
}

/// Validates the route key and the carried parameter.
fn validate_router_config(router: &RouterConfig) -> ConfigResult<()> {
    if router.route_param.is_empty() {
        return Err(ConfigError::missing_field("router.route_param"));
    }

    validate_query_key(&router.route_param)?;

    if let Some(carry) = router.carry_param() {
        validate_query_key(carry)?;
        if carry == router.route_param {
            return Err(ConfigError::validation(
                "Carry parameter must differ from the route parameter",
            ));
        }
    }

    Ok(())
}

/// File output needs an explicit path or an add-on id to derive one from.
fn validate_logging_config(logging: &LoggingConfig, addon: &AddonSection) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() && addon.id.is_empty() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates a query key.
fn validate_query_key(key: &str) -> ConfigResult<()> {
    if key.contains(['=', '&', '?', '#']) {
        return Err(ConfigError::validation(format!(
            "Query key cannot contain '=', '&', '?' or '#': {key}"
        )));
    }
    Ok(())
}

/// Validates a base URL.
fn validate_base_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("addon.base_url"));
    }

    match url.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => {}
        _ => return Err(ConfigError::invalid_url(url, "URL must include a scheme")),
    }

    if url.contains('?') {
        return Err(ConfigError::invalid_url(url, "Base URL cannot carry a query"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_config() {
        let config = AddonConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_route_param() {
        let mut config = AddonConfig::default();
        config.router.route_param = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.router.route_param = "a&b".into();
        assert!(validate_config(&config).is_err());

        config.router.route_param = "content_type".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = AddonConfig::default();
        config.addon.base_url = Some("plugin.video.vk".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        config.addon.base_url = Some("plugin://plugin.video.vk/?r=x".into());
        assert!(validate_config(&config).is_err());

        config.addon.base_url = Some("plugin://plugin.video.vk/".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_file_output() {
        let mut config = AddonConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some("addon.log".into());
        assert!(validate_config(&config).is_ok());

        config.logging.file_path = None;
        config.addon.id = "plugin.video.vk".into();
        assert!(validate_config(&config).is_ok());
    }
}
