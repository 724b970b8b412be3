// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material grouping and aggregation.
//!
//! Elements are resolved in parallel, one decoder per rayon worker, and then
//! folded into groups sequentially in model order so that floating point
//! sums (and therefore the serialized output) are identical between runs.

use crate::alignment::SkipSet;
use crate::materials::{fallback_label, resolve_materials, GroupKey, MaterialLabel};
use crate::quantities::{resolve_quantities, ElementQuantities};
use ifc_takeoff_core::{Element, EntityDecoder, IfcModel};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Density used when the caller gives none (kg/m³, normal concrete)
pub const DEFAULT_DENSITY: f64 = 2400.0;

/// Aggregated takeoff row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialGroup {
    #[serde(rename = "materialGroup")]
    pub group_key: String,
    /// 0 = material-bearing label, 1 = class fallback
    pub has_material: u8,
    /// Class of the first contributing element
    pub element_class: String,
    pub element_count: usize,
    pub total_area: Option<f64>,
    pub total_volume: Option<f64>,
    pub density: f64,
    pub total_weight: Option<f64>,
    pub missing_quantities: bool,
    pub missing_area: bool,
    pub missing_volume: bool,
    /// ExpressIDs in encounter order
    pub element_ids: Vec<u32>,
    /// GlobalIds of `element_ids`, position for position
    pub global_ids: Vec<Option<String>>,
}

impl MaterialGroup {
    pub fn sort_key(&self) -> GroupKey<'_> {
        GroupKey {
            has_material: self.has_material,
            label: &self.group_key,
            element_class: &self.element_class,
        }
    }

    pub fn has_material(&self) -> bool {
        self.has_material == 0
    }
}

/// One element with everything grouping needs
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedElement {
    pub id: u32,
    pub global_id: Option<String>,
    pub class: &'static str,
    pub quantities: ElementQuantities,
    pub labels: Vec<MaterialLabel>,
}

/// Running totals for a single group
#[derive(Debug, Clone)]
pub struct GroupAccumulator {
    label: String,
    has_material: u8,
    element_class: String,
    element_ids: Vec<u32>,
    global_ids: Vec<Option<String>>,
    area: f64,
    volume: f64,
    missing_area: bool,
    missing_volume: bool,
}

impl GroupAccumulator {
    pub fn new(label: &MaterialLabel, element_class: &str) -> Self {
        Self {
            label: label.label.clone(),
            has_material: label.tier(),
            element_class: element_class.to_string(),
            element_ids: Vec::new(),
            global_ids: Vec::new(),
            area: 0.0,
            volume: 0.0,
            missing_area: false,
            missing_volume: false,
        }
    }

    /// Count an element with its full quantities.
    ///
    /// Only strictly positive values are summed; zero or absent sets the
    /// matching missing flag.
    pub fn add(&mut self, element: &ResolvedElement) {
        self.element_ids.push(element.id);
        self.global_ids.push(element.global_id.clone());

        match element.quantities.area {
            Some(area) if area > 0.0 => self.area += area,
            _ => self.missing_area = true,
        }
        match element.quantities.volume {
            Some(volume) if volume > 0.0 => self.volume += volume,
            _ => self.missing_volume = true,
        }
    }

    pub fn finish(self, density: f64) -> MaterialGroup {
        let total_area = (self.area > 0.0).then_some(self.area);
        let total_volume = (self.volume > 0.0).then_some(self.volume);
        MaterialGroup {
            group_key: self.label,
            has_material: self.has_material,
            element_class: self.element_class,
            element_count: self.element_ids.len(),
            total_area,
            total_volume,
            density,
            total_weight: total_volume.map(|volume| volume * density),
            missing_quantities: self.missing_area || self.missing_volume,
            missing_area: self.missing_area,
            missing_volume: self.missing_volume,
            element_ids: self.element_ids,
            global_ids: self.global_ids,
        }
    }
}

/// Folds resolved elements into groups keyed by `(tier, label)`.
#[derive(Debug, Default)]
pub struct MaterialGrouper {
    index: FxHashMap<(u8, String), usize>,
    groups: Vec<GroupAccumulator>,
}

impl MaterialGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element to every group it has a label for
    pub fn add(&mut self, element: &ResolvedElement) {
        for label in &element.labels {
            let key = (label.tier(), label.label.clone());
            let slot = match self.index.get(&key) {
                Some(&slot) => slot,
                None => {
                    self.groups.push(GroupAccumulator::new(label, element.class));
                    self.index.insert(key, self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };
            self.groups[slot].add(element);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finished groups in hierarchical order
    pub fn finish(self, density: f64) -> Vec<MaterialGroup> {
        let mut groups: Vec<MaterialGroup> = self
            .groups
            .into_iter()
            .map(|accumulator| accumulator.finish(density))
            .collect();
        sort_groups(&mut groups);
        groups
    }
}

/// Sort by `(has_material, group_key, element_class)`, ordinal comparison
pub fn sort_groups(groups: &mut [MaterialGroup]) {
    groups.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Resolve quantities and labels of one element.
///
/// Failures are logged and degrade to no quantities and the class fallback
/// label; they never abort the aggregation.
pub fn resolve_element<'a>(
    model: &IfcModel<'a>,
    decoder: &mut EntityDecoder<'a>,
    element: &Element,
) -> ResolvedElement {
    let quantities = resolve_quantities(model, decoder, element).unwrap_or_else(|err| {
        tracing::warn!(
            element_id = element.id,
            class = element.class,
            error = %err,
            "Failed to resolve quantities"
        );
        ElementQuantities::default()
    });

    let labels = resolve_materials(model, decoder, element).unwrap_or_else(|err| {
        tracing::warn!(
            element_id = element.id,
            class = element.class,
            error = %err,
            "Failed to resolve materials"
        );
        vec![fallback_label(element.class)]
    });

    ResolvedElement {
        id: element.id,
        global_id: element.global_id.clone(),
        class: element.class,
        quantities,
        labels,
    }
}

/// Aggregate every element of the model that the mesh export did not skip.
pub fn aggregate(model: &IfcModel<'_>, skip_set: &SkipSet, density: f64) -> Vec<MaterialGroup> {
    let start = std::time::Instant::now();

    let elements: Vec<&Element> = model
        .elements()
        .iter()
        .filter(|element| !skip_set.contains(element.id))
        .collect();
    let skipped = model.elements().len() - elements.len();

    // Indexed parallel map keeps model order in the collected Vec
    let resolved: Vec<ResolvedElement> = elements
        .par_iter()
        .map_init(
            || model.decoder(),
            |decoder, element| resolve_element(model, decoder, element),
        )
        .collect();

    let mut grouper = MaterialGrouper::new();
    for element in &resolved {
        grouper.add(element);
    }
    let groups = grouper.finish(density);

    tracing::info!(
        elements = resolved.len(),
        skipped,
        groups = groups.len(),
        density,
        time_ms = start.elapsed().as_millis(),
        "Material aggregation complete"
    );

    groups
}
