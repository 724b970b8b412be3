// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Takeoff Core
//!
//! STEP/IFC model loader built with [nom](https://docs.rs/nom), sized for
//! quantity takeoff rather than geometry.
//!
//! ## Overview
//!
//! - **STEP Tokenization**: zero-copy parsing of entity instances
//! - **Entity Scanning**: [memchr](https://docs.rs/memchr) accelerated entity discovery
//! - **Lazy Decoding**: attributes are decoded on demand through [`EntityDecoder`]
//! - **Model Introspection**: physical elements, property and quantity sets,
//!   and flattened material assignments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_takeoff_core::IfcModel;
//!
//! let model = IfcModel::parse(&content)?;
//! let mut decoder = model.decoder();
//! for element in model.elements() {
//!     let materials = model.materials(&mut decoder, element.id)?;
//!     let quantities = model.quantity_sets(&mut decoder, element.id)?;
//!     println!("#{} {} {:?} {:?}", element.id, element.class, materials, quantities);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for model data

pub mod attributes;
pub mod decoder;
pub mod error;
pub mod materials;
pub mod model;
pub mod parser;
pub mod properties;
pub mod schema;

pub use attributes::{AttributeValue, DecodedEntity};
pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use error::{Error, Result};
pub use materials::Material;
pub use model::{Element, IfcModel, ModelStats, RefList};
pub use parser::{decode_step_string, parse_entity, EntityScanner, ScannedEntity, Token};
pub use properties::{
    PhysicalQuantity, PropertySet, PropertyValue, QuantityKind, QuantitySet,
};
pub use schema::{element_class, IfcType};
