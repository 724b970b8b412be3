// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material takeoff pipeline over an opened [`IfcModel`](ifc_takeoff_core::IfcModel):
//! quantity resolution, material labels, grouping with mesh alignment and
//! CSV export.

pub mod alignment;
pub mod export;
pub mod grouping;
pub mod materials;
pub mod quantities;

pub use alignment::{ExpressIdLookup, ExpressIdMap, SkipSet};
pub use export::{csv_file_name, notes, to_csv_string, write_csv, CsvRecord, CSV_HEADER};
pub use grouping::{
    aggregate, resolve_element, sort_groups, GroupAccumulator, MaterialGroup, MaterialGrouper,
    ResolvedElement, DEFAULT_DENSITY,
};
pub use materials::{
    fallback_label, labels_for, resolve_materials, GroupKey, LabelSource, MaterialLabel, UNASSIGNED,
};
pub use quantities::{
    resolve_quantities, ElementQuantities, AREA_PROPERTY_NAMES, QTO_PREFIX, VOLUME_PROPERTY_NAMES,
};
