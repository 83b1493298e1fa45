//! Codec configuration
//!
//! Loaded from an optional TOML file. Every key has a default, so an empty
//! file and no file at all behave the same.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod util;

/// Which VMess share form the serializer emits
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VMessFormat {
    /// `vmess://base64(scy:id@add:port)?query`
    V1,
    /// `vmess://base64(json)`
    #[default]
    V2,
}

/// Options the serializer honors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ShareOptions {
    pub vmess_format: VMessFormat,
}

/// Codec configuration parsed from a TOML file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CodecConfig {
    /// VMess share form, default `v2`
    #[serde(default)]
    pub vmess_format: VMessFormat,

    /// Tag written into engine outbounds, default "proxy"
    #[serde(default = "default_outbound_tag")]
    pub outbound_tag: String,

    /// Batch import skips bad lines (`true`) or stops at the first one
    #[serde(default = "default_true")]
    pub skip_invalid: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            vmess_format: VMessFormat::default(),
            outbound_tag: default_outbound_tag(),
            skip_invalid: true,
        }
    }
}

impl CodecConfig {
    /// Parse codec config from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CodecConfig =
            toml::from_str(content).context("Failed to parse codec config TOML")?;

        if config.outbound_tag.trim().is_empty() {
            anyhow::bail!("outbound_tag must not be empty");
        }

        Ok(config)
    }

    /// Load codec config from file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read codec config from {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Loads the config if a path is given, defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(Path::new(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn share_options(&self) -> ShareOptions {
        ShareOptions {
            vmess_format: self.vmess_format,
        }
    }
}

fn default_outbound_tag() -> String {
    "proxy".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = CodecConfig::from_toml("").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert_eq!(config.outbound_tag, "proxy");
        assert!(config.skip_invalid);
        assert_eq!(config.vmess_format, VMessFormat::V2);
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            vmess_format = "v1"
            outbound_tag = "upstream"
            skip_invalid = false
        "#;
        let config = CodecConfig::from_toml(toml).unwrap();
        assert_eq!(config.vmess_format, VMessFormat::V1);
        assert_eq!(config.outbound_tag, "upstream");
        assert!(!config.skip_invalid);
        assert_eq!(config.share_options().vmess_format, VMessFormat::V1);
    }

    #[test]
    fn test_empty_tag_rejected() {
        assert!(CodecConfig::from_toml(r#"outbound_tag = " ""#).is_err());
    }

    #[test]
    fn test_unknown_vmess_format_rejected() {
        assert!(CodecConfig::from_toml(r#"vmess_format = "v3""#).is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(CodecConfig::load(None).unwrap(), CodecConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(CodecConfig::load(Some("/nonexistent/sharelink.toml")).is_err());
    }
}
