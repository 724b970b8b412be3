// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode IFC entities from byte offsets. Each worker thread owns its
//! own decoder; the offset index is shared behind an `Arc`.

use crate::attributes::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::{parse_entity, EntityScanner};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Entity id -> (start, end) byte offsets
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content in one scan
pub fn build_entity_index(content: &str) -> EntityIndex {
    // Roughly one entity per 50 bytes
    let mut index =
        FxHashMap::with_capacity_and_hasher(content.len() / 50, Default::default());
    for entity in EntityScanner::new(content) {
        index.insert(entity.id, (entity.start, entity.end));
    }
    index
}

/// Entity decoder for lazy parsing with a per-decoder cache
pub struct EntityDecoder<'a> {
    content: &'a str,
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    entity_index: Arc<EntityIndex>,
}

impl<'a> EntityDecoder<'a> {
    /// Create a decoder, building the index eagerly
    pub fn new(content: &'a str) -> Self {
        Self::with_arc_index(content, Arc::new(build_entity_index(content)))
    }

    /// Create decoder with shared Arc index (for parallel processing)
    pub fn with_arc_index(content: &'a str, index: Arc<EntityIndex>) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: index,
        }
    }

    /// Decode entity at byte offset
    pub fn decode_at(&mut self, start: usize, end: usize) -> Result<Arc<DecodedEntity>> {
        let line = self
            .content
            .get(start..end)
            .ok_or_else(|| Error::parse(start, "Entity offsets out of bounds"))?;

        let (id, ifc_type, tokens) = parse_entity(line).map_err(|e| {
            Error::parse(
                start,
                format!("{}, input: {:?}", e, line.chars().take(100).collect::<String>()),
            )
        })?;

        if let Some(entity) = self.cache.get(&id) {
            return Ok(Arc::clone(entity));
        }

        let attributes = tokens.iter().map(AttributeValue::from_token).collect();
        let entity = Arc::new(DecodedEntity::new(id, ifc_type, attributes));
        self.cache.insert(id, Arc::clone(&entity));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(Arc::clone(entity));
        }

        let (start, end) = self
            .entity_index
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Resolve entity reference (follow #ID); `None` for null/derived values
    pub fn resolve_ref(&mut self, attr: &AttributeValue) -> Result<Option<Arc<DecodedEntity>>> {
        match attr.as_entity_ref() {
            Some(id) => Ok(Some(self.decode_by_id(id)?)),
            None => Ok(None),
        }
    }

    /// Resolve every entity reference held by a ref-or-list attribute
    pub fn resolve_ref_list(&mut self, attr: &AttributeValue) -> Result<Vec<Arc<DecodedEntity>>> {
        attr.entity_refs()
            .into_iter()
            .map(|id| self.decode_by_id(id))
            .collect()
    }

    pub fn contains(&self, entity_id: u32) -> bool {
        self.entity_index.contains_key(&entity_id)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
