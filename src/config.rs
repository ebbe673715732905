//! Configuration module.
//!
//! Handles loading, validating, and merging `shrinkray.toml`. Stock defaults
//! are overridden by the config file, which is in turn overridden by
//! command-line flags. Every layer is a sparse TOML table merged over the one
//! below it before deserializing.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [transform]
//! format = "webp"          # webp | jpeg | png | original
//! quality = 0.8            # 0.0-1.0, ignored for png
//!
//! [transform.resize]
//! mode = "none"            # none | percentage | dimensions
//! scale = 0.5              # percentage mode, 0 < scale <= 1
//! # width = 800            # dimensions mode
//! # height = 600           # dimensions mode
//! preserve_aspect = true   # dimensions mode: fit inside instead of stretch
//!
//! [queue]
//! pacing_delay_ms = 300    # pause before each job
//! export_cooldown_ms = 1000 # minimum spacing between exports
//! auto_export = false      # export each job as soon as it is done
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{FormatChoice, Quality, ResizeRule, TransformConfig};
use crate::queue::QueueSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "shrinkray.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `shrinkray.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// How each image is transformed.
    pub transform: TransformSettings,
    /// Queue timing and export behaviour.
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    ///
    /// The core clamps out-of-range values; the config file is stricter so
    /// that a typo like `quality = 80` is reported instead of silently
    /// becoming `1.0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let quality = self.transform.quality;
        if !quality.is_finite() || !(0.0..=1.0).contains(&quality) {
            return Err(ConfigError::Validation(
                "transform.quality must be 0.0-1.0".into(),
            ));
        }
        let resize = &self.transform.resize;
        match resize.mode {
            ResizeMode::None => {}
            ResizeMode::Percentage => {
                if !resize.scale.is_finite() || resize.scale <= 0.0 || resize.scale > 1.0 {
                    return Err(ConfigError::Validation(
                        "transform.resize.scale must be in (0, 1]".into(),
                    ));
                }
            }
            ResizeMode::Dimensions => {
                if resize.width.is_none() && resize.height.is_none() {
                    return Err(ConfigError::Validation(
                        "transform.resize needs width and/or height in dimensions mode".into(),
                    ));
                }
                if resize.width == Some(0) || resize.height == Some(0) {
                    return Err(ConfigError::Validation(
                        "transform.resize width/height must be non-zero".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The per-enqueue snapshot handed to the queue.
    pub fn transform_config(&self) -> TransformConfig {
        let resize = &self.transform.resize;
        TransformConfig {
            resize: match resize.mode {
                ResizeMode::None => ResizeRule::None,
                ResizeMode::Percentage => ResizeRule::Percentage {
                    scale: resize.scale,
                },
                ResizeMode::Dimensions => ResizeRule::Dimensions {
                    width: resize.width,
                    height: resize.height,
                    preserve_aspect: resize.preserve_aspect,
                },
            },
            format: self.transform.format,
            quality: Quality::new(self.transform.quality),
        }
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            pacing_delay: Duration::from_millis(self.queue.pacing_delay_ms),
            export_cooldown: Duration::from_millis(self.queue.export_cooldown_ms),
            auto_export: self.queue.auto_export,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformSettings {
    pub format: FormatChoice,
    pub quality: f32,
    pub resize: ResizeSettings,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            format: FormatChoice::default(),
            quality: Quality::DEFAULT,
            resize: ResizeSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    #[default]
    None,
    Percentage,
    Dimensions,
}

/// Flat view of a [`ResizeRule`].
///
/// All fields can be present at once so a file can keep, say, a `scale`
/// around while `mode` selects which one applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeSettings {
    pub mode: ResizeMode,
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub preserve_aspect: bool,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            mode: ResizeMode::None,
            scale: 0.5,
            width: None,
            height: None,
            preserve_aspect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub pacing_delay_ms: u64,
    pub export_cooldown_ms: u64,
    pub auto_export: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: 300,
            export_cooldown_ms: 1000,
            auto_export: false,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the bottom layer of every merge.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; anything else
/// in the overlay replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read and parse a config file.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `shrinkray.toml` from `dir` if it exists.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_config_file(&config_path).map(Some)
}

/// Merge `overlay` over `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// An explicit `path` must exist. Without one, `shrinkray.toml` in `dir` is
/// used when present and stock defaults otherwise.
pub fn load_config(path: Option<&Path>, dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => Some(read_config_file(path)?),
        None => load_raw_config(dir)?,
    };
    resolve_config(base, overlay)
}

pub fn stock_config_toml() -> &'static str {
    r##"# Shrinkray Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Shrinkray reads ./shrinkray.toml, or the file given with --config.
# Command-line flags override values from the file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Transform
# ---------------------------------------------------------------------------
[transform]
# Output format: "webp", "jpeg", "png", or "original".
# "original" keeps JPEG and WebP sources as they are and writes PNG for
# everything else (including SVG).
format = "webp"

# Encoding quality from 0.0 (smallest) to 1.0 (best).
# Ignored for PNG, which is always lossless.
quality = 0.8

[transform.resize]
# "none"        keep the source size
# "percentage"  multiply both sides by `scale`
# "dimensions"  use `width` and/or `height`
mode = "none"

# Percentage mode: 0 < scale <= 1. Images are never upscaled.
scale = 0.5

# Dimensions mode: give one or both.
# width = 800
# height = 600

# Dimensions mode with both sides given: fit inside the box (true) or
# stretch to exactly width x height (false).
preserve_aspect = true

# ---------------------------------------------------------------------------
# Queue
# ---------------------------------------------------------------------------
[queue]
# Pause before each job starts, in milliseconds.
pacing_delay_ms = 300

# Minimum spacing between two exports, in milliseconds.
# After an automatic export the next job also waits this long.
export_cooldown_ms = 1000

# Export each image as soon as it is done, instead of all at the end.
auto_export = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.transform.format, FormatChoice::Webp);
        assert_eq!(config.transform.quality, 0.8);
        assert_eq!(config.transform.resize.mode, ResizeMode::None);
        assert_eq!(config.queue.pacing_delay_ms, 300);
        assert_eq!(config.queue.export_cooldown_ms, 1000);
        assert!(!config.queue.auto_export);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[transform]
format = "jpeg"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.transform.format, FormatChoice::Jpeg);
        // Default values preserved
        assert_eq!(config.transform.quality, 0.8);
        assert_eq!(config.queue, QueueConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r#"
[transform]
qualty = 0.5
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let toml = r#"
[transform]
format = "avif"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_out_of_range() {
        let mut config = AppConfig::default();
        config.transform.quality = 80.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.transform.quality = -0.1;
        assert!(config.validate().is_err());
        config.transform.quality = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_scale_only_checked_in_percentage_mode() {
        let mut config = AppConfig::default();
        config.transform.resize.scale = 2.0;
        assert!(config.validate().is_ok());

        config.transform.resize.mode = ResizeMode::Percentage;
        assert!(config.validate().is_err());
        config.transform.resize.scale = 0.0;
        assert!(config.validate().is_err());
        config.transform.resize.scale = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_dimensions_need_a_side() {
        let mut config = AppConfig::default();
        config.transform.resize.mode = ResizeMode::Dimensions;
        assert!(config.validate().is_err());

        config.transform.resize.height = Some(600);
        assert!(config.validate().is_ok());

        config.transform.resize.width = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    // =========================================================================
    // Conversion tests
    // =========================================================================

    #[test]
    fn transform_config_from_dimensions() {
        let toml = r#"
[transform]
format = "png"
quality = 0.3

[transform.resize]
mode = "dimensions"
width = 800
preserve_aspect = false
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let transform = config.transform_config();
        assert_eq!(transform.format, FormatChoice::Png);
        assert_eq!(transform.quality, Quality::new(0.3));
        assert_eq!(
            transform.resize,
            ResizeRule::Dimensions {
                width: Some(800),
                height: None,
                preserve_aspect: false,
            }
        );
    }

    #[test]
    fn transform_config_ignores_scale_outside_percentage_mode() {
        let config = AppConfig::default();
        assert_eq!(config.transform_config().resize, ResizeRule::None);
    }

    #[test]
    fn queue_settings_from_millis() {
        let toml = r#"
[queue]
pacing_delay_ms = 0
export_cooldown_ms = 250
auto_export = true
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let settings = config.queue_settings();
        assert_eq!(settings.pacing_delay, Duration::ZERO);
        assert_eq!(settings.export_cooldown, Duration::from_millis(250));
        assert!(settings.auto_export);
    }

    // =========================================================================
    // merge_toml / loading tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[queue]
pacing_delay_ms = 300
export_cooldown_ms = 1000
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[queue]
pacing_delay_ms = 0
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let queue = merged.get("queue").unwrap();
        assert_eq!(queue.get("pacing_delay_ms").unwrap().as_integer(), Some(0));
        // cooldown preserved from base
        assert_eq!(
            queue.get("export_cooldown_ms").unwrap().as_integer(),
            Some(1000)
        );
    }

    #[test]
    fn merge_toml_scalar_replaces_table() {
        let base: toml::Value = toml::from_str("[a]\nb = 1").unwrap();
        let overlay: toml::Value = toml::from_str("a = 2").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn stock_defaults_round_trip() {
        let value = stock_defaults_value().unwrap();
        let config = resolve_config(value, None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn stock_config_toml_matches_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn resolve_config_rejects_invalid_overlay() {
        let overlay: toml::Value = toml::from_str("[transform]\nquality = 1.5").unwrap();
        let result = resolve_config(stock_defaults_value().unwrap(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_config_reads_file_in_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[transform.resize]\nmode = \"percentage\"\nscale = 0.25\n",
        )
        .unwrap();

        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(
            config.transform_config().resize,
            ResizeRule::Percentage { scale: 0.25 }
        );
    }

    #[test]
    fn load_config_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let result = load_config(Some(&missing), tmp.path());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();

        let result = load_config(None, tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
