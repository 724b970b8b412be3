// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tabular (CSV) export of material groups

use crate::grouping::MaterialGroup;
use std::io::{self, Write};

pub const CSV_HEADER: [&str; 7] = [
    "MaterialGroup",
    "ElementCount",
    "TotalArea_m2",
    "TotalVolume_m3",
    "Density_kg_m3",
    "TotalWeight_kg",
    "Notes",
];

const LINE_TERMINATOR: &str = "\r\n";

/// Flat, already formatted row of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub material_group: String,
    pub element_count: String,
    pub total_area: String,
    pub total_volume: String,
    pub density: String,
    pub total_weight: String,
    pub notes: String,
}

impl CsvRecord {
    fn fields(&self) -> [&str; 7] {
        [
            self.material_group.as_str(),
            self.element_count.as_str(),
            self.total_area.as_str(),
            self.total_volume.as_str(),
            self.density.as_str(),
            self.total_weight.as_str(),
            self.notes.as_str(),
        ]
    }
}

impl From<&MaterialGroup> for CsvRecord {
    fn from(group: &MaterialGroup) -> Self {
        Self {
            material_group: group.group_key.clone(),
            element_count: group.element_count.to_string(),
            total_area: two_decimals(group.total_area),
            total_volume: two_decimals(group.total_volume),
            density: format!("{:.0}", group.density),
            total_weight: two_decimals(group.total_weight),
            notes: notes(group),
        }
    }
}

fn two_decimals(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Human readable note naming the missing quantities, empty when complete
pub fn notes(group: &MaterialGroup) -> String {
    if !group.missing_quantities {
        return String::new();
    }
    let mut parts = Vec::with_capacity(2);
    if group.missing_area {
        parts.push("missing area");
    }
    if group.missing_volume {
        parts.push("missing volume");
    }
    if parts.is_empty() {
        return String::new();
    }
    format!("Missing quantities: {}", parts.join(", "))
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\r' | '\n')) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

fn write_row<W: Write>(writer: &mut W, fields: &[&str]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        writer.write_all(escape_field(field).as_bytes())?;
    }
    writer.write_all(LINE_TERMINATOR.as_bytes())
}

/// Write header and one row per group, in the given order
pub fn write_csv<W: Write>(mut writer: W, groups: &[MaterialGroup]) -> io::Result<()> {
    write_row(&mut writer, &CSV_HEADER)?;
    for group in groups {
        let record = CsvRecord::from(group);
        write_row(&mut writer, &record.fields())?;
    }
    writer.flush()
}

pub fn to_csv_string(groups: &[MaterialGroup]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_csv(&mut buffer, groups);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Download name: `materials_<original name without .ifc>.csv`
pub fn csv_file_name(original_filename: Option<&str>, file_id: &str) -> String {
    let base = original_filename
        .map(strip_ifc_extension)
        .filter(|base| !base.is_empty())
        .unwrap_or(file_id);
    format!("materials_{base}.csv")
}

fn strip_ifc_extension(name: &str) -> &str {
    let split = name.len().saturating_sub(4);
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".ifc") => stem,
        _ => name,
    }
}
