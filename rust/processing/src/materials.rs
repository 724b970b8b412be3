// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material labels: which groups an element belongs to.

use ifc_takeoff_core::{Element, EntityDecoder, IfcModel, Material, Result};
use serde::{Deserialize, Serialize};

/// Label used when neither a material nor a class is known
pub const UNASSIGNED: &str = "Unassigned";

/// Where a group label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelSource {
    /// `IfcMaterial.Name`
    Material,
    /// `IfcMaterial.Category` of an unnamed material
    Category,
    ElementClass,
    Unassigned,
}

impl LabelSource {
    /// Material-bearing labels sort before fallback labels
    pub fn has_material(&self) -> bool {
        matches!(self, LabelSource::Material | LabelSource::Category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialLabel {
    pub label: String,
    pub source: LabelSource,
}

impl MaterialLabel {
    pub fn new(label: impl Into<String>, source: LabelSource) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }

    /// 0 for material-bearing labels, 1 for fallbacks
    pub fn tier(&self) -> u8 {
        if self.source.has_material() {
            0
        } else {
            1
        }
    }
}

/// Hierarchical sort key of a material group.
///
/// Derived ordering compares tier, then label, then class, with ordinal
/// (byte-wise) string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey<'a> {
    pub has_material: u8,
    pub label: &'a str,
    pub element_class: &'a str,
}

/// Label used when nothing could be resolved for an element
pub fn fallback_label(element_class: &str) -> MaterialLabel {
    if element_class.is_empty() {
        MaterialLabel::new(UNASSIGNED, LabelSource::Unassigned)
    } else {
        MaterialLabel::new(element_class, LabelSource::ElementClass)
    }
}

/// Turn resolved materials into group labels.
///
/// Every distinct material name yields one label, in association order. With
/// no named material, the first category stands in; otherwise the element
/// class does. Never returns an empty list.
pub fn labels_for(materials: &[Material], element_class: &str) -> Vec<MaterialLabel> {
    let mut labels: Vec<MaterialLabel> = Vec::new();
    for name in materials.iter().filter_map(|m| m.name.as_deref()) {
        if !name.trim().is_empty() && !labels.iter().any(|l| l.label == name) {
            labels.push(MaterialLabel::new(name, LabelSource::Material));
        }
    }
    if !labels.is_empty() {
        return labels;
    }

    let category = materials
        .iter()
        .filter_map(|m| m.category.as_deref())
        .find(|c| !c.trim().is_empty());
    match category {
        Some(category) => vec![MaterialLabel::new(category, LabelSource::Category)],
        None => vec![fallback_label(element_class)],
    }
}

/// Resolve the group labels of an element.
pub fn resolve_materials<'a>(
    model: &IfcModel<'a>,
    decoder: &mut EntityDecoder<'a>,
    element: &Element,
) -> Result<Vec<MaterialLabel>> {
    let materials = model.materials(decoder, element.id)?;
    Ok(labels_for(&materials, element.class))
}
