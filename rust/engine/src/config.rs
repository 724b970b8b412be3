// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables.

use ifc_takeoff_processing::DEFAULT_DENSITY;
use std::path::{Path, PathBuf};

const METADATA_FILE_NAME: &str = "metadata.json";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding uploaded models and their artefacts.
    pub uploads_dir: PathBuf,
    /// Per-file metadata JSON.
    pub metadata_file: PathBuf,
    /// Density (kg/m³) used when a request does not give one.
    pub default_density: f64,
}

impl EngineConfig {
    /// Configuration rooted at `uploads_dir` with default settings.
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        let uploads_dir = uploads_dir.into();
        Self {
            metadata_file: uploads_dir.join(METADATA_FILE_NAME),
            uploads_dir,
            default_density: DEFAULT_DENSITY,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let uploads_dir: PathBuf = std::env::var("TAKEOFF_UPLOADS_DIR")
            .unwrap_or_else(|_| "./uploads".into())
            .into();
        Self {
            metadata_file: std::env::var("TAKEOFF_METADATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| uploads_dir.join(METADATA_FILE_NAME)),
            default_density: std::env::var("TAKEOFF_DEFAULT_DENSITY")
                .ok()
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|density| density.is_finite() && *density > 0.0)
                .unwrap_or(DEFAULT_DENSITY),
            uploads_dir,
        }
    }

    pub fn with_metadata_file(mut self, path: impl AsRef<Path>) -> Self {
        self.metadata_file = path.as_ref().to_path_buf();
        self
    }

    pub fn with_default_density(mut self, density: f64) -> Self {
        self.default_density = density;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
