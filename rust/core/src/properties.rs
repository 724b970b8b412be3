// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property set and quantity set introspection

use crate::attributes::{AttributeValue, DecodedEntity};
use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::model::IfcModel;
use crate::schema::IfcType;

/// Kind of an `IfcPhysicalSimpleQuantity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuantityKind {
    Length,
    Area,
    Volume,
    Count,
    Weight,
    Time,
}

impl QuantityKind {
    pub fn from_type(ifc_type: IfcType) -> Option<Self> {
        match ifc_type {
            IfcType::IfcQuantityLength => Some(Self::Length),
            IfcType::IfcQuantityArea => Some(Self::Area),
            IfcType::IfcQuantityVolume => Some(Self::Volume),
            IfcType::IfcQuantityCount => Some(Self::Count),
            IfcType::IfcQuantityWeight => Some(Self::Weight),
            IfcType::IfcQuantityTime => Some(Self::Time),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Area => "area",
            Self::Volume => "volume",
            Self::Count => "count",
            Self::Weight => "weight",
            Self::Time => "time",
        }
    }
}

/// Single quantity of an `IfcElementQuantity`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalQuantity {
    pub name: String,
    pub kind: QuantityKind,
    pub value: f64,
}

/// Structured quantity set (`IfcElementQuantity`)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantitySet {
    pub id: u32,
    pub name: String,
    pub quantities: Vec<PhysicalQuantity>,
}

impl QuantitySet {
    /// First quantity of the given kind, in declaration order
    pub fn first_of(&self, kind: QuantityKind) -> Option<&PhysicalQuantity> {
        self.quantities.iter().find(|q| q.kind == kind)
    }
}

/// Property value with IFC measure wrappers removed
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    List(Vec<PropertyValue>),
    Null,
}

impl PropertyValue {
    fn from_attribute(value: &AttributeValue) -> Self {
        match value.untyped() {
            AttributeValue::Float(f) => PropertyValue::Number(*f),
            AttributeValue::Integer(i) => PropertyValue::Number(*i as f64),
            AttributeValue::String(s) => PropertyValue::Text(s.clone()),
            AttributeValue::Enum(e) => match e.as_str() {
                "T" | "TRUE" => PropertyValue::Boolean(true),
                "F" | "FALSE" => PropertyValue::Boolean(false),
                other => PropertyValue::Text(other.to_string()),
            },
            AttributeValue::List(items) => {
                PropertyValue::List(items.iter().map(Self::from_attribute).collect())
            }
            _ => PropertyValue::Null,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Name -> value view of a property set or quantity set
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertySet {
    pub id: u32,
    pub name: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl PropertySet {
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Later values replace earlier ones of the same name
    fn merge(&mut self, other: PropertySet) {
        for (key, value) in other.properties {
            match self.properties.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => self.properties.push((key, value)),
            }
        }
    }
}

impl<'a> IfcModel<'a> {
    /// `IfcElementQuantity` sets defined on the occurrence, in relationship order.
    pub fn quantity_sets(
        &self,
        decoder: &mut EntityDecoder<'a>,
        object_id: u32,
    ) -> Result<Vec<QuantitySet>> {
        let mut sets = Vec::new();
        for &definition_id in self.property_definitions(object_id) {
            let definition = decoder.decode_by_id(definition_id)?;
            if definition.ifc_type == IfcType::IfcElementQuantity {
                sets.push(decode_quantity_set(decoder, &definition)?);
            }
        }
        Ok(sets)
    }

    /// Every property set and quantity set of an element as name -> value maps.
    ///
    /// Sets of the element's type object come first; occurrence sets with the
    /// same name are merged over them property by property.
    pub fn property_sets(
        &self,
        decoder: &mut EntityDecoder<'a>,
        object_id: u32,
    ) -> Result<Vec<PropertySet>> {
        let mut sets: Vec<PropertySet> = Vec::new();

        if let Some(type_id) = self.type_object(object_id) {
            let type_object = decoder.decode_by_id(type_id)?;
            // IfcTypeObject: [5]=HasPropertySets
            for definition_id in type_object.get_refs(5) {
                let definition = decoder.decode_by_id(definition_id)?;
                if let Some(set) = decode_property_view(decoder, &definition)? {
                    sets.push(set);
                }
            }
        }

        for &definition_id in self.property_definitions(object_id) {
            let definition = decoder.decode_by_id(definition_id)?;
            let Some(set) = decode_property_view(decoder, &definition)? else {
                continue;
            };
            match sets.iter_mut().find(|existing| existing.name == set.name) {
                Some(existing) => existing.merge(set),
                None => sets.push(set),
            }
        }

        Ok(sets)
    }
}

/// IfcElementQuantity: [2]=Name, [5]=Quantities
fn decode_quantity_set(
    decoder: &mut EntityDecoder<'_>,
    entity: &DecodedEntity,
) -> Result<QuantitySet> {
    let mut quantities = Vec::new();
    for quantity_id in entity.get_refs(5) {
        let quantity = decoder.decode_by_id(quantity_id)?;
        let Some(kind) = QuantityKind::from_type(quantity.ifc_type) else {
            // IfcPhysicalComplexQuantity and friends
            continue;
        };
        // [0]=Name, [1]=Description, [2]=Unit, [3]=*Value
        let (Some(name), Some(value)) = (quantity.get_string(0), quantity.get_float(3)) else {
            continue;
        };
        quantities.push(PhysicalQuantity {
            name: name.to_string(),
            kind,
            value,
        });
    }

    Ok(QuantitySet {
        id: entity.id,
        name: entity.get_string(2).unwrap_or_default().to_string(),
        quantities,
    })
}

/// Name -> value view of an IfcPropertySet or IfcElementQuantity; other
/// property definitions yield `None`.
fn decode_property_view(
    decoder: &mut EntityDecoder<'_>,
    entity: &DecodedEntity,
) -> Result<Option<PropertySet>> {
    match entity.ifc_type {
        IfcType::IfcElementQuantity => {
            let set = decode_quantity_set(decoder, entity)?;
            Ok(Some(PropertySet {
                id: set.id,
                name: set.name,
                properties: set
                    .quantities
                    .into_iter()
                    .map(|q| (q.name, PropertyValue::Number(q.value)))
                    .collect(),
            }))
        }
        IfcType::IfcPropertySet => {
            // IfcPropertySet: [2]=Name, [4]=HasProperties
            let mut properties = Vec::new();
            for property_id in entity.get_refs(4) {
                let property = decoder.decode_by_id(property_id)?;
                let Some(name) = property.get_string(0) else {
                    continue;
                };
                // Single: [2]=NominalValue, Enumerated: [2]=EnumerationValues
                let value = match property.ifc_type {
                    IfcType::IfcPropertySingleValue | IfcType::IfcPropertyEnumeratedValue => {
                        property
                            .get(2)
                            .map(PropertyValue::from_attribute)
                            .unwrap_or(PropertyValue::Null)
                    }
                    _ => continue,
                };
                properties.push((name.to_string(), value));
            }
            Ok(Some(PropertySet {
                id: entity.id,
                name: entity.get_string(2).unwrap_or_default().to_string(),
                properties,
            }))
        }
        _ => Ok(None),
    }
}
