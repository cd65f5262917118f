//! YAML configuration for the bulk and export commands.
//!
//! ```yaml
//! bulk:
//!   max_rows: 1000
//!   max_bytes: 3900000
//!   max_line_bytes: 102400
//!   verify: true
//! ```
//!
//! Command-line flags take precedence over file values, file values over
//! the built-in defaults.

use crate::bulk::{BatchLimits, DEFAULT_MAX_BYTES, DEFAULT_MAX_ROWS};
use crate::reader::DEFAULT_MAX_LINE_BYTES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bulk settings as they appear in the YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkSection {
    /// Rows per bulk statement
    pub max_rows: Option<usize>,
    /// Input bytes per bulk statement
    pub max_bytes: Option<usize>,
    /// Longest accepted input line
    pub max_line_bytes: Option<usize>,
    /// Verify row counts after conversion
    pub verify: Option<bool>,
}

/// Complete YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbExportYamlConfig {
    pub bulk: BulkSection,
}

impl DbExportYamlConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DbExportYamlConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }
}

/// Effective settings after merging flags, file and defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub limits: BatchLimits,
    pub max_line_bytes: usize,
    pub verify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: BatchLimits::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            verify: true,
        }
    }
}

impl Settings {
    /// Merge command-line overrides over an optional config file.
    pub fn resolve(file: Option<&DbExportYamlConfig>, flags: &BulkSection) -> anyhow::Result<Self> {
        let from_file = file.map(|c| c.bulk.clone()).unwrap_or_default();

        let settings = Settings {
            limits: BatchLimits {
                max_rows: flags
                    .max_rows
                    .or(from_file.max_rows)
                    .unwrap_or(DEFAULT_MAX_ROWS),
                max_bytes: flags
                    .max_bytes
                    .or(from_file.max_bytes)
                    .unwrap_or(DEFAULT_MAX_BYTES),
            },
            max_line_bytes: flags
                .max_line_bytes
                .or(from_file.max_line_bytes)
                .unwrap_or(DEFAULT_MAX_LINE_BYTES),
            verify: flags.verify.or(from_file.verify).unwrap_or(true),
        };

        if settings.limits.max_rows == 0 {
            anyhow::bail!("max_rows must be greater than 0");
        }
        if settings.limits.max_bytes == 0 {
            anyhow::bail!("max_bytes must be greater than 0");
        }
        if settings.max_line_bytes == 0 {
            anyhow::bail!("max_line_bytes must be greater than 0");
        }

        Ok(settings)
    }

    /// Load `path` if given, then merge `flags` over it.
    pub fn load(path: Option<&Path>, flags: &BulkSection) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => Some(DbExportYamlConfig::load(p).map_err(|e| {
                anyhow::anyhow!("failed to load config {}: {}", p.display(), e)
            })?),
            None => None,
        };
        Self::resolve(file.as_ref(), flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
bulk:
  max_rows: 500
  max_line_bytes: 2048
"#;
        let config = DbExportYamlConfig::parse(yaml).unwrap();
        assert_eq!(config.bulk.max_rows, Some(500));
        assert_eq!(config.bulk.max_bytes, None);
        assert_eq!(config.bulk.max_line_bytes, Some(2048));
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = DbExportYamlConfig::parse("{}").unwrap();
        let settings = Settings::resolve(Some(&config), &BulkSection::default()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_flags_override_file() {
        let config = DbExportYamlConfig::parse("bulk:\n  max_rows: 500\n  verify: false\n").unwrap();
        let flags = BulkSection {
            max_rows: Some(10),
            ..Default::default()
        };
        let settings = Settings::resolve(Some(&config), &flags).unwrap();
        assert_eq!(settings.limits.max_rows, 10);
        assert_eq!(settings.limits.max_bytes, DEFAULT_MAX_BYTES);
        assert!(!settings.verify);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let flags = BulkSection {
            max_rows: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(None, &flags).is_err());
    }
}
