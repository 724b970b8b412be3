// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for model loading and introspection
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a STEP/IFC model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Unexpected attribute layout on #{id}: {message}")]
    UnexpectedAttribute { id: u32, message: String },

    #[error("Not an IFC/STEP physical file: {0}")]
    InvalidHeader(String),
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn unexpected(id: u32, message: impl Into<String>) -> Self {
        Error::UnexpectedAttribute {
            id,
            message: message.into(),
        }
    }
}
