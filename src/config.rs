//! Photo-strip configuration.
//!
//! Handles loading, validating, and merging `photo-strip.toml`. The file is
//! optional: stock defaults reproduce the classic strip exactly, and a user
//! file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `photo-strip.toml` in the working directory, or any file passed with
//! `--config`. An explicitly named file must exist.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [strip]
//! base_width = 240          # Logical strip width
//! scale = 3                 # Output pixels per logical unit
//! padding = 16              # Logical padding around the frames
//! gap = 12                  # Logical gap between frames
//! caption_band = 80         # Logical height of the caption band
//! paper = "#f5f1e8"         # Background color
//!
//! [caption]
//! label = "PHOTO COLLECTION"
//! label_color = "#374151"
//! date_color = "#6b7280"
//! label_size = 12.0         # Logical font size of the label line
//! date_size = 10.0          # Logical font size of the date line
//! line_offset = 12.0        # Distance of each line from the band center
//! # label_font = "fonts/Inter-Bold.ttf"
//! # date_font = "fonts/Inter-Regular.ttf"
//!
//! [capture]
//! countdown = 3             # Countdown start (seconds)
//! lead_in_ms = 500          # Pause before the first countdown
//! next_shot_ms = 1000       # Pause after keeping a shot
//! retake_ms = 500           # Pause after discarding a shot
//! magic_ms = 3000           # "Creating magic" pause for gallery strips
//! quality = 80              # JPEG quality of captured and uploaded frames
//! upload_size = [400, 300]  # Uploads are cropped to 4:3 and resized to this
//!
//! [export]
//! quality = 98
//! share_title = "Photo Collection"
//! share_text = "Check out my photo collection!"
//! share_file_name = "photo-collection.jpg"
//! page_url = "https://example.com/photo-strip"
//!
//! [processing]
//! max_processes = 4         # Max parallel decoders (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::imaging::{LayoutSpec, calculate_strip_layout};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "photo-strip.toml";

/// Largest accepted strip width or height, in output pixels.
pub const MAX_STRIP_SIDE: u32 = 16_384;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `photo-strip.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotoStripConfig {
    /// Strip geometry and paper.
    pub strip: StripConfig,
    /// Caption text, colors and fonts.
    pub caption: CaptionConfig,
    /// Countdown timings and frame encoding.
    pub capture: CaptureConfig,
    /// Export encoding and share texts.
    pub export: ExportConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PhotoStripConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strip = &self.strip;
        if strip.base_width == 0 || strip.scale == 0 {
            return Err(ConfigError::Validation(
                "strip.base_width and strip.scale must be non-zero".into(),
            ));
        }
        if strip.padding.saturating_mul(2) >= strip.base_width {
            return Err(ConfigError::Validation(
                "strip.padding must leave room for the frames (2 * padding < base_width)".into(),
            ));
        }
        match calculate_strip_layout(&strip.layout_spec()) {
            Some(layout) if layout.width <= MAX_STRIP_SIDE && layout.height <= MAX_STRIP_SIDE => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "strip is larger than {MAX_STRIP_SIDE}x{MAX_STRIP_SIDE} pixels; lower strip.scale or the logical sizes"
                )));
            }
        }
        for (key, value) in [
            ("strip.paper", &strip.paper),
            ("caption.label_color", &self.caption.label_color),
            ("caption.date_color", &self.caption.date_color),
        ] {
            parse_hex_color(value)
                .map_err(|_| ConfigError::Validation(format!("{key} must be #rrggbb, got {value:?}")))?;
        }
        if self.capture.countdown == 0 {
            return Err(ConfigError::Validation(
                "capture.countdown must be non-zero".into(),
            ));
        }
        if self.capture.upload_size.contains(&0) {
            return Err(ConfigError::Validation(
                "capture.upload_size values must be non-zero".into(),
            ));
        }
        for (key, quality) in [
            ("capture.quality", self.capture.quality),
            ("export.quality", self.export.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.caption.label_size <= 0.0 || self.caption.date_size <= 0.0 {
            return Err(ConfigError::Validation(
                "caption font sizes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Strip geometry, in logical units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StripConfig {
    pub base_width: u32,
    /// Output pixels per logical unit.
    pub scale: u32,
    pub padding: u32,
    pub gap: u32,
    pub caption_band: u32,
    /// Background color, `#rrggbb`.
    pub paper: String,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            base_width: 240,
            scale: 3,
            padding: 16,
            gap: 12,
            caption_band: 80,
            paper: "#f5f1e8".to_string(),
        }
    }
}

impl StripConfig {
    pub fn layout_spec(&self) -> LayoutSpec {
        LayoutSpec {
            base_width: self.base_width,
            scale: self.scale,
            padding: self.padding,
            gap: self.gap,
            caption_band: self.caption_band,
        }
    }
}

/// Caption lines in the bottom band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    pub label: String,
    pub label_color: String,
    pub date_color: String,
    pub label_size: f32,
    pub date_size: f32,
    pub line_offset: f32,
    /// TTF/OTF for the label line, replacing the bundled DejaVu Sans Bold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_font: Option<PathBuf>,
    /// TTF/OTF for the date line, replacing the bundled DejaVu Sans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_font: Option<PathBuf>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            label: "PHOTO COLLECTION".to_string(),
            label_color: "#374151".to_string(),
            date_color: "#6b7280".to_string(),
            label_size: 12.0,
            date_size: 10.0,
            line_offset: 12.0,
            label_font: None,
            date_font: None,
        }
    }
}

/// Camera countdown timings and frame encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub countdown: u32,
    pub lead_in_ms: u64,
    pub next_shot_ms: u64,
    pub retake_ms: u64,
    pub magic_ms: u64,
    /// JPEG quality for captured stills and cropped uploads.
    pub quality: u32,
    /// `[width, height]` of cropped uploads.
    pub upload_size: [u32; 2],
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown: 3,
            lead_in_ms: 500,
            next_shot_ms: 1000,
            retake_ms: 500,
            magic_ms: 3000,
            quality: 80,
            upload_size: [400, 300],
        }
    }
}

/// Export encoding and the texts of the share action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub quality: u32,
    pub share_title: String,
    pub share_text: String,
    /// File name used when the share action shares the image itself.
    pub share_file_name: String,
    /// Page reference shared when files cannot be.
    pub page_url: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quality: 98,
            share_title: "Photo Collection".to_string(),
            share_text: "Check out my photo collection!".to_string(),
            share_file_name: "photo-collection.jpg".to_string(),
            page_url: "https://example.com/photo-strip".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel decode workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse `#rrggbb` into RGB bytes.
pub fn parse_hex_color(value: &str) -> Result<[u8; 3], ConfigError> {
    let invalid = || ConfigError::Validation(format!("invalid color {value:?}"));
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PhotoStripConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PhotoStripConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PhotoStripConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config.
///
/// With an explicit `path` the file must exist; without one,
/// [`DEFAULT_CONFIG_FILE`] is used when present and stock defaults otherwise.
/// Relative font paths are resolved against the config file's directory.
pub fn load_config(path: Option<&Path>) -> Result<PhotoStripConfig, ConfigError> {
    let (file, overlay) = match path {
        Some(p) => {
            let value: toml::Value = toml::from_str(&fs::read_to_string(p)?)?;
            (p.to_path_buf(), Some(value))
        }
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            let value = load_raw_config(&p)?;
            (p, value)
        }
    };
    let mut config = resolve_config(stock_defaults_value()?, overlay)?;

    let base_dir = file.parent().unwrap_or(Path::new(""));
    for font in [&mut config.caption.label_font, &mut config.caption.date_font]
        .into_iter()
        .flatten()
    {
        if font.is_relative() {
            *font = base_dir.join(&*font);
        }
    }
    Ok(config)
}

/// Returns a fully-commented stock `photo-strip.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Strip Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./photo-strip.toml, or from the path given with
# --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Strip geometry
# ---------------------------------------------------------------------------
[strip]
# Logical width of the strip. Output width is base_width * scale.
base_width = 240

# Output pixels per logical unit. 3 gives a 720px wide strip.
scale = 3

# Logical padding around the frames and logical gap between them.
padding = 16
gap = 12

# Logical height of the caption band below the frames.
caption_band = 80

# Background ("paper") color.
paper = "#f5f1e8"

# ---------------------------------------------------------------------------
# Caption
# ---------------------------------------------------------------------------
[caption]
label = "PHOTO COLLECTION"
label_color = "#374151"
date_color = "#6b7280"

# Logical font sizes, multiplied by strip.scale.
label_size = 12.0
date_size = 10.0

# Logical distance of each line from the middle of the caption band.
line_offset = 12.0

# TTF/OTF fonts for the two lines, relative to this file.
# Unset lines use the bundled DejaVu Sans (bold label, regular date).
# label_font = "fonts/Inter-Bold.ttf"
# date_font = "fonts/Inter-Regular.ttf"

# ---------------------------------------------------------------------------
# Capture
# ---------------------------------------------------------------------------
[capture]
# Countdown before each shot, in seconds.
countdown = 3

# Pauses before a countdown starts (milliseconds).
lead_in_ms = 500      # first shot
next_shot_ms = 1000   # after keeping a shot
retake_ms = 500       # after discarding a shot

# Pause while a gallery strip is being created.
magic_ms = 3000

# JPEG quality of captured and uploaded frames (1-100).
quality = 80

# Uploads are center-cropped to 4:3 and resized to [width, height].
upload_size = [400, 300]

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# JPEG quality of the exported strip (1-100).
quality = 98

# Texts of the share action.
share_title = "Photo Collection"
share_text = "Check out my photo collection!"
share_file_name = "photo-collection.jpg"

# Page reference shared when the image itself cannot be.
page_url = "https://example.com/photo-strip"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel decode workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_classic_strip() {
        let config = PhotoStripConfig::default();
        assert_eq!(config.strip.base_width, 240);
        assert_eq!(config.strip.scale, 3);
        assert_eq!(config.strip.paper, "#f5f1e8");
        assert_eq!(config.caption.label, "PHOTO COLLECTION");
        assert_eq!(config.capture.countdown, 3);
        assert_eq!(config.capture.upload_size, [400, 300]);
        assert_eq!(config.export.quality, 98);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[strip]
paper = "#ffffff"
"##;
        let config: PhotoStripConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.strip.paper, "#ffffff");
        // Default values preserved
        assert_eq!(config.strip.scale, 3);
        assert_eq!(config.caption.date_color, "#6b7280");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r##"
[strip]
papr = "#ffffff"
"##;
        assert!(toml::from_str::<PhotoStripConfig>(toml).is_err());
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(toml::from_str::<PhotoStripConfig>("[video]\nfps = 30\n").is_err());
    }

    // =========================================================================
    // Hex colors
    // =========================================================================

    #[test]
    fn parse_hex_color_accepts_rrggbb() {
        assert_eq!(parse_hex_color("#f5f1e8").unwrap(), [0xf5, 0xf1, 0xe8]);
        assert_eq!(parse_hex_color("#374151").unwrap(), [0x37, 0x41, 0x51]);
    }

    #[test]
    fn parse_hex_color_rejects_other_forms() {
        for bad in ["f5f1e8", "#fff", "#gggggg", "#f5f1e8ff", "#é5f1e"] {
            assert!(parse_hex_color(bad).is_err(), "{bad} should be rejected");
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_rejects_bad_color() {
        let mut config = PhotoStripConfig::default();
        config.caption.label_color = "navy".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("caption.label_color"));
    }

    #[test]
    fn validate_rejects_padding_wider_than_strip() {
        let mut config = PhotoStripConfig::default();
        config.strip.padding = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_strip() {
        let mut config = PhotoStripConfig::default();
        config.strip.base_width = 100_000;
        config.strip.scale = 100_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("16384x16384"), "{err}");

        // Fits in u32 but exceeds the side limit: 772 * 22 = 16984.
        let mut config = PhotoStripConfig::default();
        config.strip.scale = 22;
        assert!(config.validate().is_err());

        // 772 * 21 = 16212.
        let mut config = PhotoStripConfig::default();
        config.strip.scale = 21;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_scale_and_countdown() {
        let mut config = PhotoStripConfig::default();
        config.strip.scale = 0;
        assert!(config.validate().is_err());

        let mut config = PhotoStripConfig::default();
        config.capture.countdown = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_quality_out_of_range() {
        let mut config = PhotoStripConfig::default();
        config.export.quality = 101;
        assert!(config.validate().is_err());

        let mut config = PhotoStripConfig::default();
        config.capture.quality = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Merging and loading
    // =========================================================================

    #[test]
    fn merge_toml_overlays_nested_keys() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[capture]\ncountdown = 5\n").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.capture.countdown, 5);
        assert_eq!(config.capture.lead_in_ms, 500);
    }

    #[test]
    fn resolve_config_validates_after_merge() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[export]\nquality = 0\n").unwrap();
        assert!(matches!(
            resolve_config(base, Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_reads_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(
            &path,
            r##"
[caption]
label = "BOOTH"
label_font = "fonts/bold.ttf"

[processing]
max_processes = 2
"##,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.caption.label, "BOOTH");
        assert_eq!(config.processing.max_processes, Some(2));
        // Font path resolved next to the config file
        assert_eq!(
            config.caption.label_font,
            Some(tmp.path().join("fonts/bold.ttf"))
        );
        // Unspecified values should be defaults
        assert_eq!(config.caption.date_color, "#6b7280");
    }

    #[test]
    fn load_config_missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "[strip\nscale = ").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_raw_config_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join("photo-strip.toml")).unwrap().is_none());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: PhotoStripConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = PhotoStripConfig::default();
        assert_eq!(config.strip.paper, defaults.strip.paper);
        assert_eq!(config.caption.line_offset, defaults.caption.line_offset);
        assert_eq!(config.capture.magic_ms, defaults.capture.magic_ms);
        assert_eq!(config.export.share_file_name, defaults.export.share_file_name);
        assert_eq!(config.processing.max_processes, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let capped = ProcessingConfig {
            max_processes: Some(cores + 10),
        };
        assert_eq!(effective_threads(&capped), cores);
        let one = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&one), 1);
    }
}
