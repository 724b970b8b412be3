// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Terminal rendering of summaries and file listings.

use anyhow::Result;
use ifc_takeoff_engine::{notes, FileId, FileRecord, MaterialGroup};

pub fn print_groups(groups: &[MaterialGroup], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No elements found");
        return Ok(());
    }

    let width = groups
        .iter()
        .map(|group| group.group_key.chars().count())
        .max()
        .unwrap_or(0)
        .max("Material".len());

    println!(
        "{:<width$}  {:>6}  {:>12}  {:>12}  {:>8}  {:>14}  Notes",
        "Material", "Count", "Area m²", "Volume m³", "kg/m³", "Weight kg",
    );
    for group in groups {
        println!(
            "{:<width$}  {:>6}  {:>12}  {:>12}  {:>8.0}  {:>14}  {}",
            group.group_key,
            group.element_count,
            fixed(group.total_area),
            fixed(group.total_volume),
            group.density,
            fixed(group.total_weight),
            notes(group),
        );
    }

    let elements: usize = groups.iter().map(|group| group.element_count).sum();
    let weight: f64 = groups.iter().filter_map(|group| group.total_weight).sum();
    tracing::debug!(groups = groups.len(), elements, "Printed summary");
    println!("{} groups, {} elements, {:.2} kg", groups.len(), elements, weight);
    Ok(())
}

pub fn print_files(files: &[(FileId, FileRecord)]) {
    if files.is_empty() {
        println!("No files uploaded");
        return;
    }
    for (file_id, record) in files {
        let aligned = if record.skipped_ids.is_some() {
            "aligned"
        } else {
            "stale"
        };
        println!(
            "{}  {:>10}  {:>12}  {:<8}  {}",
            file_id, record.size_bytes, record.upload_time, aligned, record.original_filename
        );
    }
}

fn fixed(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into())
}
