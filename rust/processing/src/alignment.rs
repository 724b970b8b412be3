// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh export alignment: elements the mesh exporter skipped, and the mesh
//! index <-> ExpressID table for the elements it wrote.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// ExpressIDs the mesh exporter could not convert.
///
/// Ordered so the persisted form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipSet(BTreeSet<u32>);

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, express_id: u32) -> bool {
        self.0.contains(&express_id)
    }

    pub fn insert(&mut self, express_id: u32) -> bool {
        self.0.insert(express_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for SkipSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mesh index -> ExpressID for every mesh written, in export order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressIdMap(Vec<u32>);

impl ExpressIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next mesh; returns its index
    pub fn push(&mut self, express_id: u32) -> usize {
        self.0.push(express_id);
        self.0.len() - 1
    }

    pub fn express_id(&self, mesh_index: usize) -> Option<u32> {
        self.0.get(mesh_index).copied()
    }

    /// Mesh indices showing the given element
    pub fn mesh_indices(&self, express_id: u32) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == express_id)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mesh_to_express(&self) -> &[u32] {
        &self.0
    }

    /// Inverse table, ExpressID -> mesh indices
    pub fn express_to_mesh(&self) -> BTreeMap<u32, Vec<usize>> {
        let mut inverse: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, id) in self.0.iter().enumerate() {
            inverse.entry(*id).or_default().push(index);
        }
        inverse
    }

    /// Both directions, as served to the viewer
    pub fn lookup(&self) -> ExpressIdLookup<'_> {
        ExpressIdLookup {
            mesh_to_express_id: &self.0,
            express_id_to_mesh: self.express_to_mesh(),
        }
    }
}

impl FromIterator<u32> for ExpressIdMap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressIdLookup<'a> {
    pub mesh_to_express_id: &'a [u32],
    pub express_id_to_mesh: BTreeMap<u32, Vec<usize>>,
}
