// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opened IFC model: element enumeration and relationship indexes
//!
//! A single scan over the DATA section builds the entity offset index,
//! collects every physical element, and records the three relationships
//! takeoff needs (property definitions, type objects, material associations).
//! Attributes of the related entities are decoded lazily afterwards.

use crate::decoder::{EntityDecoder, EntityIndex};
use crate::error::{Error, Result};
use crate::parser::{decode_step_string, EntityScanner};
use crate::schema::{element_class, IfcType};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Short list of related entity ids; most objects carry one or two
pub type RefList = SmallVec<[u32; 4]>;

/// A physical building element.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Element {
    /// STEP instance id (ExpressID), e.g. 42 for `#42`
    pub id: u32,
    /// IfcRoot.GlobalId
    pub global_id: Option<String>,
    /// Canonical class name, e.g. `IfcWall`
    pub class: &'static str,
    pub name: Option<String>,
}

/// Counters collected while opening the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub entity_count: usize,
    pub element_count: usize,
    /// Relationship entities that could not be decoded and were ignored
    pub malformed_relationships: usize,
}

/// Parsed IFC model borrowing the file content.
pub struct IfcModel<'a> {
    content: &'a str,
    index: Arc<EntityIndex>,
    schema: Option<String>,
    elements: Vec<Element>,
    /// object id -> IfcPropertySetDefinition ids (occurrence-level)
    definitions: FxHashMap<u32, RefList>,
    /// object id -> IfcTypeObject id
    types: FxHashMap<u32, u32>,
    /// object id -> IfcMaterialSelect ids
    materials: FxHashMap<u32, RefList>,
    stats: ModelStats,
}

impl<'a> IfcModel<'a> {
    /// Open a model from STEP content.
    ///
    /// Fails only when the content is not a STEP physical file; malformed
    /// relationship instances are counted in [`ModelStats`] and skipped.
    pub fn parse(content: &'a str) -> Result<Self> {
        let header = content.trim_start_matches('\u{feff}').trim_start();
        if !header.starts_with("ISO-10303-21") {
            return Err(Error::InvalidHeader(
                "missing ISO-10303-21 header".to_string(),
            ));
        }
        let data_start = find_data_section(content)
            .ok_or_else(|| Error::InvalidHeader("missing DATA section".to_string()))?;
        let schema = read_file_schema(&content[..data_start]);

        let mut index = EntityIndex::with_capacity_and_hasher(
            content.len() / 50,
            Default::default(),
        );
        let mut elements = Vec::new();
        let mut relationships = Vec::new();

        let mut scanner = EntityScanner::new(content);
        while let Some(entity) = scanner.next_entity() {
            if entity.start < data_start {
                continue;
            }
            index.insert(entity.id, (entity.start, entity.end));

            if element_class(entity.type_name).is_some() {
                elements.push(entity);
            } else if matches!(
                IfcType::from_name(entity.type_name),
                IfcType::IfcRelDefinesByProperties
                    | IfcType::IfcRelDefinesByType
                    | IfcType::IfcRelAssociatesMaterial
            ) {
                relationships.push(entity);
            }
        }

        let index = Arc::new(index);
        let mut decoder = EntityDecoder::with_arc_index(content, Arc::clone(&index));
        let mut stats = ModelStats {
            entity_count: index.len(),
            ..ModelStats::default()
        };

        let mut definitions: FxHashMap<u32, RefList> = FxHashMap::default();
        let mut types: FxHashMap<u32, u32> = FxHashMap::default();
        let mut materials: FxHashMap<u32, RefList> = FxHashMap::default();

        for scanned in relationships {
            let Ok(rel) = decoder.decode_at(scanned.start, scanned.end) else {
                stats.malformed_relationships += 1;
                continue;
            };

            // IfcRelDefines*/IfcRelAssociates*: [4]=RelatedObjects, [5]=Relating*
            let related = rel.get_refs(4);
            let relating = rel.get_refs(5);
            if related.is_empty() || relating.is_empty() {
                stats.malformed_relationships += 1;
                continue;
            }

            match rel.ifc_type {
                IfcType::IfcRelDefinesByProperties => {
                    for object in related {
                        definitions.entry(object).or_default().extend(relating.iter().copied());
                    }
                }
                IfcType::IfcRelDefinesByType => {
                    for object in related {
                        types.entry(object).or_insert(relating[0]);
                    }
                }
                IfcType::IfcRelAssociatesMaterial => {
                    for object in related {
                        materials.entry(object).or_default().extend(relating.iter().copied());
                    }
                }
                _ => {}
            }
            // Relationship entities are never looked up again
            decoder.clear_cache();
        }

        let elements: Vec<Element> = elements
            .into_iter()
            .filter_map(|scanned| {
                let class = element_class(scanned.type_name)?;
                let (global_id, name) = match decoder.decode_at(scanned.start, scanned.end) {
                    Ok(entity) => (
                        entity.get_string(0).map(str::to_string),
                        entity.get_string(2).map(str::to_string),
                    ),
                    // Keep the element: it still renders and still needs a group
                    Err(_) => (None, None),
                };
                Some(Element {
                    id: scanned.id,
                    global_id,
                    class,
                    name,
                })
            })
            .collect();
        stats.element_count = elements.len();

        Ok(Self {
            content,
            index,
            schema,
            elements,
            definitions,
            types,
            materials,
            stats,
        })
    }

    /// Physical elements in file order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Schema identifier from the FILE_SCHEMA header, e.g. `IFC4`
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn stats(&self) -> ModelStats {
        self.stats
    }

    /// Fresh decoder sharing this model's index; one per worker thread
    pub fn decoder(&self) -> EntityDecoder<'a> {
        EntityDecoder::with_arc_index(self.content, Arc::clone(&self.index))
    }

    /// Property definitions attached directly to an object
    pub fn property_definitions(&self, object_id: u32) -> &[u32] {
        self.definitions.get(&object_id).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Type object (`IfcRelDefinesByType`) of an occurrence
    pub fn type_object(&self, object_id: u32) -> Option<u32> {
        self.types.get(&object_id).copied()
    }

    /// Material selects associated directly with an object
    pub fn material_associations(&self, object_id: u32) -> &[u32] {
        self.materials.get(&object_id).map(|ids| ids.as_slice()).unwrap_or(&[])
    }
}

/// Byte offset just past the `DATA;` keyword
fn find_data_section(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut from = 0;
    while let Some(offset) = memchr::memmem::find(&bytes[from..], b"DATA") {
        let start = from + offset;
        let mut pos = start + 4;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let preceded_ok =
            start == 0 || (!bytes[start - 1].is_ascii_alphanumeric() && bytes[start - 1] != b'_');
        if preceded_ok && bytes.get(pos) == Some(&b';') {
            return Some(pos + 1);
        }
        from = start + 4;
    }
    None
}

/// First schema name of `FILE_SCHEMA(('IFC4'));`
fn read_file_schema(header: &str) -> Option<String> {
    let start = header.find("FILE_SCHEMA")?;
    let rest = &header[start..];
    let open = rest.find('\'')?;
    let close = rest[open + 1..].find('\'')?;
    let raw = &rest[open + 1..open + 1 + close];
    (!raw.is_empty()).then(|| decode_step_string(raw).into_owned())
}
