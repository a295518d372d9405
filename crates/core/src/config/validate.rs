use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Collection concurrency is at least 1
/// - Sanitized name length is at least 1
/// - VBR quality is within 0..=9
/// - Toolchain distribution URL is set when auto-install is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.download.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "download.max_concurrent_downloads must be at least 1".to_string(),
        ));
    }

    if config.download.sanitize_max_length == 0 {
        return Err(ConfigError::ValidationError(
            "download.sanitize_max_length must be at least 1".to_string(),
        ));
    }

    if config.converter.vbr_quality > 9 {
        return Err(ConfigError::ValidationError(format!(
            "converter.vbr_quality must be between 0 and 9, got {}",
            config.converter.vbr_quality
        )));
    }

    if config.toolchain.auto_install && config.toolchain.distribution_base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "toolchain.distribution_base_url cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.download.max_concurrent_downloads = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("max_concurrent_downloads"));
    }

    #[test]
    fn test_validate_vbr_quality_range() {
        let mut config = Config::default();
        config.converter.vbr_quality = 10;
        assert!(validate_config(&config).is_err());

        config.converter.vbr_quality = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_distribution_url() {
        let mut config = Config::default();
        config.toolchain.distribution_base_url = "  ".to_string();
        assert!(validate_config(&config).is_err());

        // Irrelevant when nothing will be downloaded.
        config.toolchain.auto_install = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_sanitize_length() {
        let mut config = Config::default();
        config.download.sanitize_max_length = 0;
        assert!(validate_config(&config).is_err());
    }
}
