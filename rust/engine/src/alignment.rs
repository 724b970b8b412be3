// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh export driver and skip-set status.
//!
//! Geometry itself is produced by an external [`MeshExporter`]; the engine
//! only records which elements it wrote (and at which mesh index) and which
//! it had to skip, so that aggregation covers exactly the elements shown.

use crate::error::{EngineError, Result};
use ifc_takeoff_core::{Element, IfcModel};
use ifc_takeoff_processing::{ExpressIdMap, SkipSet};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// Converts elements into meshes of a single output artefact.
pub trait MeshExporter {
    type Error: Display;

    fn begin(&mut self, destination: &Path) -> std::result::Result<(), Self::Error>;

    /// Convert one element; an error skips this element only
    fn write_element(
        &mut self,
        model: &IfcModel<'_>,
        element: &Element,
    ) -> std::result::Result<(), Self::Error>;

    fn finish(&mut self) -> std::result::Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlignmentStatus {
    /// Mesh export has run; the skip set is authoritative
    Aligned,
    /// Mesh export never ran; the (empty) skip set is advisory
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSkipSet {
    pub ids: SkipSet,
    pub status: AlignmentStatus,
}

impl AlignedSkipSet {
    pub fn from_recorded(recorded: Option<SkipSet>) -> Self {
        match recorded {
            Some(ids) => Self {
                ids,
                status: AlignmentStatus::Aligned,
            },
            None => Self {
                ids: SkipSet::new(),
                status: AlignmentStatus::Stale,
            },
        }
    }

    pub fn is_stale(&self) -> bool {
        self.status == AlignmentStatus::Stale
    }
}

/// Result of a mesh export run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshExportOutcome {
    pub skip_set: SkipSet,
    pub mesh_map: ExpressIdMap,
    /// True when an earlier run's result was returned without exporting
    pub reused: bool,
}

/// Drive an exporter over every element in model order.
pub fn export_meshes<E: MeshExporter>(
    model: &IfcModel<'_>,
    exporter: &mut E,
    destination: &Path,
) -> Result<MeshExportOutcome> {
    exporter
        .begin(destination)
        .map_err(|e| EngineError::MeshExport(e.to_string()))?;

    let mut skip_set = SkipSet::new();
    let mut mesh_map = ExpressIdMap::new();
    for element in model.elements() {
        match exporter.write_element(model, element) {
            Ok(()) => {
                mesh_map.push(element.id);
            }
            Err(e) => {
                tracing::debug!(
                    element_id = element.id,
                    class = element.class,
                    error = %e,
                    "Mesh export skipped element"
                );
                skip_set.insert(element.id);
            }
        }
    }

    exporter
        .finish()
        .map_err(|e| EngineError::MeshExport(e.to_string()))?;

    tracing::info!(
        meshes = mesh_map.len(),
        skipped = skip_set.len(),
        destination = %destination.display(),
        "Mesh export complete"
    );

    Ok(MeshExportOutcome {
        skip_set,
        mesh_map,
        reused: false,
    })
}
