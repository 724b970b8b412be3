// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the takeoff engine.

use thiserror::Error;

/// Engine error types.
///
/// Only file-level failures surface here; a single element that cannot be
/// resolved is logged and reported through the group's missing flags.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to parse IFC model: {0}")]
    Parse(#[from] ifc_takeoff_core::Error),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Invalid density {0}: must be a positive number of kg/m³")]
    InvalidDensity(f64),

    #[error("Invalid file id: {0:?}")]
    InvalidFileId(String),

    #[error("Mesh export failed: {0}")]
    MeshExport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable machine readable code for callers that map errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Parse(_) => "PARSE_ERROR",
            EngineError::InvalidUpload(_) => "INVALID_UPLOAD",
            EngineError::InvalidDensity(_) => "INVALID_DENSITY",
            EngineError::InvalidFileId(_) => "INVALID_FILE_ID",
            EngineError::MeshExport(_) => "MESH_EXPORT_ERROR",
            EngineError::Io(_) => "IO_ERROR",
            EngineError::Metadata(_) => "METADATA_ERROR",
        }
    }

    /// Whether the caller can fix the request (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound(_)
                | EngineError::Parse(_)
                | EngineError::InvalidUpload(_)
                | EngineError::InvalidDensity(_)
                | EngineError::InvalidFileId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
