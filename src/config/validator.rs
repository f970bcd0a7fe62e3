//! Settings validation: ranges, URL pieces and relationship catalog consistency.

use crate::config::Settings;
use crate::error::ConfigError;
use crate::model::catalog;

const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1"];

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !matches!(settings.scheme.as_str(), "http" | "https") {
        return Err(ConfigError::InvalidSetting {
            name: "scheme",
            reason: format!("expected http or https, got {}", settings.scheme),
        });
    }
    if settings.api_prefix.is_empty() || settings.api_prefix.contains('/') {
        return Err(ConfigError::InvalidSetting {
            name: "api_prefix",
            reason: "must be a single non-empty path segment".into(),
        });
    }
    if !SUPPORTED_VERSIONS.contains(&settings.version.as_str()) {
        return Err(ConfigError::InvalidSetting {
            name: "version",
            reason: format!("supported versions are {}", SUPPORTED_VERSIONS.join(", ")),
        });
    }
    if let Some(base) = &settings.proxy_base_url {
        if !(base.starts_with("http://") || base.starts_with("https://")) || base.ends_with('/') {
            return Err(ConfigError::InvalidSetting {
                name: "proxy_base_url",
                reason: "must be an absolute http(s) URL without a trailing slash".into(),
            });
        }
    }
    if settings.default_top == 0 || settings.default_top > settings.max_top {
        return Err(ConfigError::InvalidSetting {
            name: "default_top",
            reason: format!("must be between 1 and max_top ({})", settings.max_top),
        });
    }
    if settings.max_expand_depth == 0 {
        return Err(ConfigError::InvalidSetting {
            name: "max_expand_depth",
            reason: "must be at least 1".into(),
        });
    }
    if settings.capabilities.is_empty() {
        return Err(ConfigError::InvalidSetting {
            name: "capabilities",
            reason: "at least one entity type must be enabled".into(),
        });
    }
    catalog::validate()
}
