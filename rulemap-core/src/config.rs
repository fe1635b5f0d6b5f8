//! Configuration for rulemap, loadable from `rulemap.toml`.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulemapConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Conformance checker behavior.
    #[serde(default)]
    pub checker: CheckerConfig,
}

impl RulemapConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`crate::RulemapError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::RulemapError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level hint for the embedding tool: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Conformance checker behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Whether action-side assertions may widen enumerations. When disabled,
    /// an out-of-set literal is an error even on the action side.
    #[serde(default = "default_true")]
    pub grow_enumerations: bool,
    /// Whether action-side assertions may introduce brand-new attributes.
    /// When disabled, a missing attribute is an error on both sides.
    #[serde(default = "default_true")]
    pub synthesize_attributes: bool,
    /// Stop *reporting* (not checking) after this many findings per run;
    /// 0 means unlimited.
    #[serde(default)]
    pub max_findings_per_run: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            grow_enumerations: true,
            synthesize_attributes: true,
            max_findings_per_run: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
