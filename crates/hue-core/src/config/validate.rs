//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_ms must be > 0".into(),
            ));
        }
        if self.api.parallel == 0 {
            return Err(ConfigError::ValidationError(
                "api.parallel must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.images.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "images.supported_formats must not be empty".into(),
            ));
        }
        if self.prompts.available.is_empty() {
            return Err(ConfigError::ValidationError(
                "prompts.available must define at least one prompt".into(),
            ));
        }
        if !self.prompts.available.contains_key(&self.prompts.default) {
            return Err(ConfigError::ValidationError(format!(
                "prompts.default '{}' is not one of prompts.available",
                self.prompts.default
            )));
        }
        if !self.output.filename.contains("{timestamp}") {
            return Err(ConfigError::ValidationError(
                "output.filename must contain {timestamp}".into(),
            ));
        }
        if !matches!(
            self.performance.timing_mode.as_str(),
            "standard" | "precise"
        ) {
            return Err(ConfigError::ValidationError(
                "performance.timing_mode must be \"standard\" or \"precise\"".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_zero_parallel() {
        let mut config = Config::default();
        config.api.parallel = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.parallel"));
    }

    #[test]
    fn test_validate_rejects_unknown_default_prompt() {
        let mut config = Config::default();
        config.prompts.default = "missing".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn test_validate_rejects_empty_prompt_set() {
        let mut config = Config::default();
        config.prompts.available.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one prompt"));
    }

    #[test]
    fn test_validate_rejects_filename_without_timestamp() {
        let mut config = Config::default();
        config.output.filename = "results.json".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{timestamp}"));
    }

    #[test]
    fn test_validate_rejects_unknown_timing_mode() {
        let mut config = Config::default();
        config.performance.timing_mode = "exact".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing_mode"));
    }
}
