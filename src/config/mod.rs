//! Conversion settings shared by the calibration and box filtering stages.

use std::fs;
use std::io::Write;

use serde::{Deserialize, Serialize};
use yaml_rust::{Yaml, YamlLoader};

use crate::camera::Resolution;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("YAML error: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for ConfigError {
    fn from(err: yaml_rust::ScanError) -> Self {
        ConfigError::YamlError(err.to_string())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// A box covered by a nearer box by more than this fraction is dropped.
    pub occlusion_threshold: f64,
    /// Boxes thinner than this width/height ratio are dropped.
    pub min_aspect_ratio: f64,
    /// Resize images and intrinsics to this size when set.
    pub target_image_size: Option<Resolution>,
    /// Pad instead of stretch when resizing.
    pub padding: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            occlusion_threshold: 0.5,
            min_aspect_ratio: 0.0,
            target_image_size: None,
            padding: true,
        }
    }
}

impl ConversionConfig {
    /// Loads settings from a YAML file. Missing keys keep their defaults.
    pub fn load_from_yaml(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;
        let mut config = ConversionConfig::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };

        if let Some(value) = float_field(doc, "occlusion_threshold")? {
            config.occlusion_threshold = value;
        }
        if let Some(value) = float_field(doc, "min_aspect_ratio")? {
            config.min_aspect_ratio = value;
        }
        match &doc["padding"] {
            Yaml::BadValue | Yaml::Null => {}
            value => {
                config.padding = value
                    .as_bool()
                    .ok_or_else(|| invalid("padding", "not a boolean"))?;
            }
        }
        match &doc["target_image_size"] {
            Yaml::BadValue | Yaml::Null => {}
            size => {
                let dimension = |key: &str| {
                    size[key]
                        .as_i64()
                        .filter(|value| *value >= 0)
                        .map(|value| value as u32)
                        .ok_or_else(|| invalid("target_image_size", format!("'{key}' not an integer")))
                };
                config.target_image_size = Some(Resolution {
                    width: dimension("width")?,
                    height: dimension("height")?,
                });
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_yaml(&self, path: &str) -> Result<(), ConfigError> {
        let yaml_string =
            serde_yaml::to_string(self).map_err(|e| ConfigError::YamlError(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.occlusion_threshold) {
            return Err(invalid("occlusion_threshold", "must lie in [0, 1]"));
        }
        if !self.min_aspect_ratio.is_finite() || self.min_aspect_ratio < 0.0 {
            return Err(invalid("min_aspect_ratio", "must be finite and non-negative"));
        }
        if let Some(size) = &self.target_image_size {
            if size.width == 0 || size.height == 0 {
                return Err(invalid(
                    "target_image_size",
                    format!("{}x{} has no pixels", size.width, size.height),
                ));
            }
        }
        Ok(())
    }
}

fn float_field(doc: &Yaml, key: &str) -> Result<Option<f64>, ConfigError> {
    match &doc[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(value) => Ok(Some(*value as f64)),
        value => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(key, "not a number")),
    }
}
