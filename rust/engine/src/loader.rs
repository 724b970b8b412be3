// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory-mapped model loading

use crate::error::{EngineError, Result};
use ifc_takeoff_core::IfcModel;
use ifc_takeoff_processing::{aggregate, MaterialGroup, SkipSet};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

/// A model file mapped into memory
pub struct ModelFile {
    mmap: Mmap,
}

impl ModelFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::NotFound(path.display().to_string()),
            _ => EngineError::Io(e),
        })?;
        if file.metadata()?.len() == 0 {
            return Err(ifc_takeoff_core::Error::InvalidHeader("empty file".to_string()).into());
        }
        // SAFETY: stored models are written once and never modified in place
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    /// File content; invalid UTF-8 sequences are replaced, valid files are
    /// borrowed without copying.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.mmap)
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// Open a model file and hand the parsed model to `f`.
pub fn with_model<T>(path: &Path, f: impl FnOnce(&IfcModel<'_>) -> T) -> Result<T> {
    let start = std::time::Instant::now();
    let file = ModelFile::open(path)?;
    let text = file.text();
    let model = IfcModel::parse(&text)?;

    let stats = model.stats();
    tracing::info!(
        path = %path.display(),
        size = file.len(),
        schema = model.schema().unwrap_or("unknown"),
        entities = stats.entity_count,
        elements = stats.element_count,
        malformed_relationships = stats.malformed_relationships,
        parse_time_ms = start.elapsed().as_millis(),
        "Model loaded"
    );
    Ok(f(&model))
}

/// Load and aggregate a model file in one go.
pub fn summarize_file(path: &Path, skip_set: &SkipSet, density: f64) -> Result<Vec<MaterialGroup>> {
    with_model(path, |model| aggregate(model, skip_set, density))
}
