//! Validation settings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest accepted image, in bytes.
pub const MIN_IMAGE_SIZE: u64 = 10 * 1024;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

/// Caller-supplied settings for a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Locations are given per product in a `locations` column.
    pub custom_locations: bool,
    /// Location names accepted in the `locations` column.
    pub valid_locations: Vec<String>,
    /// Smallest accepted image, in bytes.
    pub min_image_size: u64,
    /// Largest accepted image, in bytes.
    pub max_image_size: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            custom_locations: false,
            valid_locations: Vec::new(),
            min_image_size: MIN_IMAGE_SIZE,
            max_image_size: MAX_IMAGE_SIZE,
        }
    }
}

impl ValidatorConfig {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.min_image_size > config.max_image_size {
            return Err(Error::InvalidBounds {
                min: config.min_image_size,
                max: config.max_image_size,
            });
        }
        Ok(config)
    }

    /// Enable custom-location mode with the given valid names.
    pub fn with_custom_locations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_locations = true;
        self.valid_locations.extend(names.into_iter().map(Into::into));
        self
    }

    /// Override the accepted image size range.
    pub fn with_image_bounds(mut self, min: u64, max: u64) -> Self {
        self.min_image_size = min;
        self.max_image_size = max;
        self
    }
}
