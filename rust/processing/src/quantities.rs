// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area and volume resolution for a single element.
//!
//! Structured `IfcElementQuantity` sets are consulted first; any value still
//! unset is then probed by name in the element's `Qto_*` sets (including the
//! ones inherited from its type object).

use ifc_takeoff_core::{
    Element, EntityDecoder, IfcModel, PropertySet, QuantityKind, QuantitySet, Result,
};
use serde::{Deserialize, Serialize};

/// Area property names, most preferred first
pub const AREA_PROPERTY_NAMES: &[&str] = &[
    "NetSurfaceArea",
    "GrossSurfaceArea",
    "NetArea",
    "GrossArea",
    "NetSideArea",
    "GrossSideArea",
    "NetFloorArea",
    "GrossFloorArea",
    "Area",
    "OuterSurfaceArea",
];

/// Volume property names, most preferred first
pub const VOLUME_PROPERTY_NAMES: &[&str] = &["NetVolume", "GrossVolume"];

/// Only property sets with this prefix take part in the name-based fallback
pub const QTO_PREFIX: &str = "Qto_";

/// Resolved quantities of one element, in model units (m² / m³)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementQuantities {
    pub area: Option<f64>,
    pub volume: Option<f64>,
}

impl ElementQuantities {
    pub fn is_complete(&self) -> bool {
        self.area.is_some() && self.volume.is_some()
    }
}

/// Resolve area and volume of an element.
pub fn resolve_quantities<'a>(
    model: &IfcModel<'a>,
    decoder: &mut EntityDecoder<'a>,
    element: &Element,
) -> Result<ElementQuantities> {
    let quantity_sets = model.quantity_sets(decoder, element.id)?;
    let mut quantities = from_quantity_sets(&quantity_sets);
    if quantities.is_complete() {
        return Ok(quantities);
    }

    let property_sets = model.property_sets(decoder, element.id)?;
    fill_from_property_sets(&mut quantities, &property_sets);
    Ok(quantities)
}

/// First valid area and first valid volume across quantity sets, in order.
pub fn from_quantity_sets(sets: &[QuantitySet]) -> ElementQuantities {
    let mut quantities = ElementQuantities::default();
    for quantity in sets.iter().flat_map(|set| &set.quantities) {
        if !is_candidate(quantity.value) {
            continue;
        }
        match quantity.kind {
            QuantityKind::Area if quantities.area.is_none() => quantities.area = Some(quantity.value),
            QuantityKind::Volume if quantities.volume.is_none() => {
                quantities.volume = Some(quantity.value)
            }
            _ => {}
        }
        if quantities.is_complete() {
            break;
        }
    }
    quantities
}

/// Fill unset values from `Qto_*` sets by property name.
pub fn fill_from_property_sets(quantities: &mut ElementQuantities, sets: &[PropertySet]) {
    for set in sets.iter().filter(|set| set.name.starts_with(QTO_PREFIX)) {
        if quantities.area.is_none() {
            quantities.area = first_named(set, AREA_PROPERTY_NAMES);
        }
        if quantities.volume.is_none() {
            quantities.volume = first_named(set, VOLUME_PROPERTY_NAMES);
        }
        if quantities.is_complete() {
            break;
        }
    }
}

/// First listed property holding a non-zero numeric value
fn first_named(set: &PropertySet, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .filter_map(|name| set.get(name).and_then(|value| value.as_number()))
        .find(|value| *value != 0.0 && is_candidate(*value))
}

#[inline]
fn is_candidate(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_takeoff_core::{PhysicalQuantity, PropertyValue};

    fn quantity(name: &str, kind: QuantityKind, value: f64) -> PhysicalQuantity {
        PhysicalQuantity {
            name: name.to_string(),
            kind,
            value,
        }
    }

    fn pset(name: &str, properties: &[(&str, f64)]) -> PropertySet {
        PropertySet {
            id: 0,
            name: name.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), PropertyValue::Number(*v)))
                .collect(),
        }
    }

    #[test]
    fn test_first_match_wins_across_sets() {
        let sets = vec![
            QuantitySet {
                id: 1,
                name: "Custom".into(),
                quantities: vec![
                    quantity("Length", QuantityKind::Length, 4.0),
                    quantity("GrossArea", QuantityKind::Area, 7.0),
                    quantity("NetArea", QuantityKind::Area, 6.0),
                ],
            },
            QuantitySet {
                id: 2,
                name: "Qto_SlabBaseQuantities".into(),
                quantities: vec![
                    quantity("Area", QuantityKind::Area, 99.0),
                    quantity("NetVolume", QuantityKind::Volume, 1.5),
                ],
            },
        ];
        let q = from_quantity_sets(&sets);
        assert_eq!(q.area, Some(7.0));
        assert_eq!(q.volume, Some(1.5));
    }

    #[test]
    fn test_primary_path_skips_invalid_values() {
        let sets = vec![QuantitySet {
            id: 1,
            name: "Q".into(),
            quantities: vec![
                quantity("A", QuantityKind::Area, f64::NAN),
                quantity("B", QuantityKind::Area, -3.0),
                quantity("C", QuantityKind::Area, 0.0),
                quantity("D", QuantityKind::Area, 2.0),
            ],
        }];
        // Zero is a valid first match; downstream treats it as missing
        assert_eq!(from_quantity_sets(&sets).area, Some(0.0));
        assert_eq!(from_quantity_sets(&sets).volume, None);
    }

    #[test]
    fn test_fallback_preference_order() {
        let sets = vec![
            pset("Pset_WallCommon", &[("NetSurfaceArea", 1.0)]),
            pset(
                "Qto_WallBaseQuantities",
                &[("GrossSideArea", 12.0), ("NetSideArea", 10.0), ("GrossVolume", 3.0)],
            ),
        ];
        let mut q = ElementQuantities::default();
        fill_from_property_sets(&mut q, &sets);
        assert_eq!(q.area, Some(10.0));
        assert_eq!(q.volume, Some(3.0));
    }

    #[test]
    fn test_fallback_skips_zero_and_keeps_primary_values() {
        let sets = vec![
            pset("Qto_A", &[("NetArea", 0.0), ("NetVolume", 0.0)]),
            pset("Qto_B", &[("Area", 4.0), ("NetVolume", 8.0)]),
        ];
        let mut q = ElementQuantities {
            area: None,
            volume: Some(2.0),
        };
        fill_from_property_sets(&mut q, &sets);
        assert_eq!(q.area, Some(4.0));
        assert_eq!(q.volume, Some(2.0));
    }

    const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCWALLSTANDARDCASE('a',$,$,$,$,$,$,$);
#2=IFCSLAB('b',$,$,$,$,$,$,$,$);
#3=IFCBEAM('c',$,$,$,$,$,$,$);
#10=IFCQUANTITYAREA('NetSideArea',$,$,10.);
#11=IFCELEMENTQUANTITY('q1',$,'BaseQuantities',$,$,(#10));
#12=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#1),#11);
#20=IFCPROPERTYSINGLEVALUE('NetVolume',$,IFCVOLUMEMEASURE(2.5),$);
#21=IFCPROPERTYSET('p',$,'Qto_WallBaseQuantities',$,(#20));
#22=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#1),#21);
#30=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#2),#99);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_resolve_against_model() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut decoder = model.decoder();
        let elements = model.elements();

        let wall = resolve_quantities(&model, &mut decoder, &elements[0]).unwrap();
        assert_eq!(wall.area, Some(10.0));
        assert_eq!(wall.volume, Some(2.5));

        // Dangling property definition
        assert!(resolve_quantities(&model, &mut decoder, &elements[1]).is_err());

        let beam = resolve_quantities(&model, &mut decoder, &elements[2]).unwrap();
        assert_eq!(beam, ElementQuantities::default());
    }
}
