// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Takeoff Engine
//!
//! Backend-neutral facade over the takeoff pipeline: stores uploads, keeps
//! the aggregation aligned with the mesh export, and memoizes summaries.
//!
//! ```rust,ignore
//! use ifc_takeoff_engine::{EngineConfig, TakeoffEngine};
//!
//! let engine = TakeoffEngine::new(EngineConfig::from_env())?;
//! let receipt = engine.upload(&bytes, "Haus.ifc")?;
//! let groups = engine.get_summary(&receipt.file_id, None)?;
//! let csv = engine.export_csv(&receipt.file_id, None)?;
//! ```

pub mod alignment;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod store;

pub use alignment::{
    export_meshes, AlignedSkipSet, AlignmentStatus, MeshExportOutcome, MeshExporter,
};
pub use cache::{CacheGeneration, SummaryCache, SummaryKey};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use loader::{summarize_file, with_model, ModelFile};
pub use store::{validate_upload, FileId, FileRecord, FileStore};

pub use ifc_takeoff_processing::{notes, ExpressIdMap, MaterialGroup, SkipSet, DEFAULT_DENSITY};

use ifc_takeoff_processing::{aggregate, csv_file_name, to_csv_string};
use serde::Serialize;
use std::sync::Arc;

/// Answer to a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub filename: String,
    pub size_bytes: u64,
}

/// Rendered CSV export with its download name
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}

/// Material takeoff engine.
///
/// Safe to share between threads; every operation is synchronous.
#[derive(Debug)]
pub struct TakeoffEngine {
    config: EngineConfig,
    store: FileStore,
    cache: SummaryCache,
}

impl TakeoffEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store = FileStore::open(&config.uploads_dir, &config.metadata_file)?;
        Ok(Self {
            config,
            store,
            cache: SummaryCache::new(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Validate and store an uploaded model.
    pub fn upload(&self, content: &[u8], filename: &str) -> Result<UploadReceipt> {
        let file_id = self.store.save_file(content, filename)?;
        Ok(UploadReceipt {
            file_id,
            filename: filename.to_string(),
            size_bytes: content.len() as u64,
        })
    }

    /// Ordered material groups of a file.
    ///
    /// Results are cached per `(file, density)`; `None` uses the configured
    /// default density.
    pub fn get_summary(&self, file_id: &FileId, density: Option<f64>) -> Result<Arc<[MaterialGroup]>> {
        let density = self.resolve_density(density)?;
        let key = SummaryKey::new(file_id.clone(), density);
        if let Some(groups) = self.cache.get(&key) {
            tracing::debug!(file_id = %file_id, density, "Summary cache hit");
            return Ok(groups);
        }

        // Taken before the skip set is read so a concurrent invalidation wins
        let generation = self.cache.generation(file_id);
        let path = self.model_path(file_id)?;
        let skip = self.skip_set(file_id)?;
        if skip.is_stale() {
            tracing::debug!(
                file_id = %file_id,
                "Mesh export has not run; aggregating without alignment"
            );
        }

        let groups: Arc<[MaterialGroup]> =
            with_model(&path, |model| aggregate(model, &skip.ids, density))?.into();
        if !self.cache.put(key, Arc::clone(&groups), generation) {
            tracing::debug!(
                file_id = %file_id,
                "File changed during aggregation; result not cached"
            );
        }
        Ok(groups)
    }

    /// Summary rendered as CSV, named after the original upload.
    pub fn export_csv(&self, file_id: &FileId, density: Option<f64>) -> Result<CsvExport> {
        let groups = self.get_summary(file_id, density)?;
        let original = self.store.original_filename(file_id);
        Ok(CsvExport {
            file_name: csv_file_name(original.as_deref(), file_id.as_str()),
            content: to_csv_string(&groups),
        })
    }

    /// Record the elements the mesh exporter skipped.
    pub fn record_skip_set(&self, file_id: &FileId, ids: impl IntoIterator<Item = u32>) -> Result<()> {
        let skip: SkipSet = ids.into_iter().collect();
        let count = skip.len();
        self.store
            .update(file_id, |record| record.skipped_ids = Some(skip))?;
        self.cache.invalidate(file_id);
        tracing::info!(file_id = %file_id, skipped = count, "Recorded skip set");
        Ok(())
    }

    /// Skip set of a file; stale (and empty) until mesh export has run.
    pub fn skip_set(&self, file_id: &FileId) -> Result<AlignedSkipSet> {
        let record = self
            .store
            .record(file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
        Ok(AlignedSkipSet::from_recorded(record.skipped_ids))
    }

    /// Run mesh export once per file and record its alignment.
    ///
    /// A previous run is reused when its mesh map is recorded and its mesh
    /// file is still on disk; otherwise the exporter runs and its skip set
    /// replaces any recorded one.
    pub fn run_mesh_export<E: MeshExporter>(
        &self,
        file_id: &FileId,
        exporter: &mut E,
    ) -> Result<MeshExportOutcome> {
        let record = self
            .store
            .record(file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
        let destination = self.store.mesh_path(file_id);
        if let (Some(skip_set), Some(mesh_map)) = (&record.skipped_ids, &record.mesh_map) {
            if destination.is_file() {
                return Ok(MeshExportOutcome {
                    skip_set: skip_set.clone(),
                    mesh_map: mesh_map.clone(),
                    reused: true,
                });
            }
        }

        let path = self.model_path(file_id)?;
        let outcome = with_model(&path, |model| export_meshes(model, exporter, &destination))??;

        let skip_set = outcome.skip_set.clone();
        let mesh_map = outcome.mesh_map.clone();
        self.store.update(file_id, |record| {
            record.skipped_ids = Some(skip_set);
            record.mesh_map = Some(mesh_map);
        })?;
        self.cache.invalidate(file_id);
        Ok(outcome)
    }

    /// Mesh index <-> ExpressID table; `None` until mesh export has run.
    pub fn express_id_map(&self, file_id: &FileId) -> Result<Option<ExpressIdMap>> {
        let record = self
            .store
            .record(file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
        Ok(record.mesh_map)
    }

    pub fn list_files(&self) -> Vec<(FileId, FileRecord)> {
        self.store.list()
    }

    pub fn delete_file(&self, file_id: &FileId) -> Result<()> {
        self.store.delete_file(file_id)?;
        self.cache.invalidate(file_id);
        Ok(())
    }

    /// Remove every stored file and cached summary.
    pub fn purge_all(&self) -> Result<usize> {
        let removed = self.store.purge_all()?;
        self.cache.clear();
        Ok(removed)
    }

    fn model_path(&self, file_id: &FileId) -> Result<std::path::PathBuf> {
        self.store
            .file_path(file_id)
            .ok_or_else(|| EngineError::NotFound(file_id.to_string()))
    }

    fn resolve_density(&self, density: Option<f64>) -> Result<f64> {
        let density = density.unwrap_or(self.config.default_density);
        if density.is_finite() && density > 0.0 {
            Ok(density)
        } else {
            Err(EngineError::InvalidDensity(density))
        }
    }
}
