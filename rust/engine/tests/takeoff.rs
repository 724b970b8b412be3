// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the engine facade against a temporary uploads dir.

use approx::assert_relative_eq;
use ifc_takeoff_core::{Element, IfcModel};
use ifc_takeoff_engine::{
    AlignmentStatus, EngineConfig, EngineError, FileId, MeshExporter, TakeoffEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Wall A and B carry "Wood", wall C has no material; slab D has no data.
const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('haus.ifc','2024-05-01T10:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'Haus',$,$,$,$,$,$);
#101=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',$,'A',$,$,$,$,$,$);
#102=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOI',$,'B',$,$,$,$,$,$);
#103=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOJ',$,'C',$,$,$,$,$,$);
#104=IFCSLAB('2O2Fr$t4X7Zf8NOew3FLOK',$,'D',$,$,$,$,$,$);
#200=IFCMATERIAL('Wood',$,$);
#201=IFCRELASSOCIATESMATERIAL('m',$,$,$,(#101,#102),#200);
#300=IFCQUANTITYAREA('NetSideArea',$,$,5.,$);
#301=IFCQUANTITYVOLUME('NetVolume',$,$,1.,$);
#302=IFCELEMENTQUANTITY('q',$,'Qto_WallBaseQuantities',$,$,(#300,#301));
#303=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#101),#302);
#310=IFCPROPERTYSINGLEVALUE('NetSideArea',$,IFCAREAMEASURE(3.),$);
#311=IFCPROPERTYSET('p',$,'Qto_WallBaseQuantities',$,(#310));
#312=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#102),#311);
#320=IFCQUANTITYVOLUME('NetVolume',$,$,2.,$);
#321=IFCELEMENTQUANTITY('q',$,'Qto_WallBaseQuantities',$,$,(#320));
#322=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#103),#321);
ENDSEC;
END-ISO-10303-21;
"#;

const EXPECTED_CSV: &str = "MaterialGroup,ElementCount,TotalArea_m2,TotalVolume_m3,Density_kg_m3,TotalWeight_kg,Notes\r\n\
Wood,2,8.00,1.00,2400,2400.00,Missing quantities: missing volume\r\n\
IfcSlab,1,,,2400,,\"Missing quantities: missing area, missing volume\"\r\n\
IfcWall,1,,2.00,2400,4800.00,Missing quantities: missing area\r\n";

fn engine(dir: &Path) -> TakeoffEngine {
    TakeoffEngine::new(EngineConfig::new(dir)).unwrap()
}

/// Exporter that fails for a fixed set of ExpressIDs
#[derive(Default)]
struct FakeExporter {
    fail_on: Vec<u32>,
    destination: Option<PathBuf>,
    written: Vec<u32>,
    runs: usize,
}

impl MeshExporter for FakeExporter {
    type Error = String;

    fn begin(&mut self, destination: &Path) -> Result<(), String> {
        self.runs += 1;
        self.destination = Some(destination.to_path_buf());
        Ok(())
    }

    fn write_element(&mut self, _model: &IfcModel<'_>, element: &Element) -> Result<(), String> {
        if self.fail_on.contains(&element.id) {
            return Err(format!("no representation for #{}", element.id));
        }
        self.written.push(element.id);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), String> {
        let destination = self.destination.as_ref().ok_or("begin was not called")?;
        std::fs::write(destination, b"glTF").map_err(|e| e.to_string())
    }
}

struct BrokenExporter;

impl MeshExporter for BrokenExporter {
    type Error = &'static str;

    fn begin(&mut self, _destination: &Path) -> Result<(), &'static str> {
        Err("disk full")
    }

    fn write_element(&mut self, _: &IfcModel<'_>, _: &Element) -> Result<(), &'static str> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), &'static str> {
        Ok(())
    }
}

#[test]
fn wood_and_wall_summary() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let receipt = engine.upload(MODEL.as_bytes(), "Haus.ifc").unwrap();
    assert_eq!(receipt.size_bytes, MODEL.len() as u64);

    let groups = engine.get_summary(&receipt.file_id, None).unwrap();
    let keys: Vec<_> = groups.iter().map(|g| g.group_key.as_str()).collect();
    assert_eq!(keys, vec!["Wood", "IfcSlab", "IfcWall"]);

    let wood = &groups[0];
    assert_eq!(wood.element_count, 2);
    assert_eq!(wood.total_area, Some(8.0));
    assert_eq!(wood.total_volume, Some(1.0));
    assert_eq!(wood.total_weight, Some(2400.0));
    assert!(wood.missing_quantities);
    assert_eq!(wood.element_ids, vec![101, 102]);

    let wall = &groups[2];
    assert_eq!(wall.has_material, 1);
    assert_eq!(wall.total_area, None);
    assert_eq!(wall.total_volume, Some(2.0));
    assert_eq!(wall.total_weight, Some(4800.0));
    assert!(wall.missing_quantities);
}

#[test]
fn csv_export_matches_summary() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let receipt = engine.upload(MODEL.as_bytes(), "Haus.IFC").unwrap();

    let export = engine.export_csv(&receipt.file_id, None).unwrap();
    assert_eq!(export.file_name, "materials_Haus.csv");
    assert_eq!(export.content, EXPECTED_CSV);
}

#[test]
fn summary_is_cached_per_density() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let first = engine.get_summary(&id, None).unwrap();
    let again = engine.get_summary(&id, Some(2400.0)).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let steel = engine.get_summary(&id, Some(7850.0)).unwrap();
    assert!(!Arc::ptr_eq(&first, &steel));
    assert_relative_eq!(steel[0].total_weight.unwrap(), 7850.0);
    assert_eq!(steel[0].density, 7850.0);

    // Output is identical across cache misses
    let json_a = serde_json::to_string(&*first).unwrap();
    engine.record_skip_set(&id, Vec::new()).unwrap();
    let json_b = serde_json::to_string(&*engine.get_summary(&id, None).unwrap()).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn invalid_density_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    for density in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = engine.get_summary(&id, Some(density)).unwrap_err();
        assert_eq!(err.code(), "INVALID_DENSITY");
    }
}

#[test]
fn skip_set_is_stale_until_mesh_export() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let skip = engine.skip_set(&id).unwrap();
    assert_eq!(skip.status, AlignmentStatus::Stale);
    assert!(skip.ids.is_empty());
    assert!(engine.express_id_map(&id).unwrap().is_none());

    let mut exporter = FakeExporter {
        fail_on: vec![102, 104],
        ..FakeExporter::default()
    };
    let outcome = engine.run_mesh_export(&id, &mut exporter).unwrap();
    assert!(!outcome.reused);
    assert_eq!(outcome.skip_set.iter().collect::<Vec<_>>(), vec![102, 104]);
    assert_eq!(outcome.mesh_map.mesh_to_express(), &[101, 103]);
    assert_eq!(exporter.destination, Some(dir.path().join(format!("{id}.glb"))));

    let skip = engine.skip_set(&id).unwrap();
    assert_eq!(skip.status, AlignmentStatus::Aligned);
    assert!(skip.ids.contains(102));

    let map = engine.express_id_map(&id).unwrap().unwrap();
    assert_eq!(map.express_id(1), Some(103));
    assert_eq!(map.mesh_indices(101), vec![0]);
}

#[test]
fn mesh_export_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let mut exporter = FakeExporter {
        fail_on: vec![101],
        ..FakeExporter::default()
    };
    let first = engine.run_mesh_export(&id, &mut exporter).unwrap();
    let second = engine.run_mesh_export(&id, &mut exporter).unwrap();
    assert_eq!(exporter.runs, 1);
    assert!(second.reused);
    assert_eq!(first.skip_set, second.skip_set);
    assert_eq!(first.mesh_map, second.mesh_map);
}

#[test]
fn recorded_skip_set_does_not_replace_mesh_export() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;
    engine.record_skip_set(&id, [102]).unwrap();

    let mut exporter = FakeExporter {
        fail_on: vec![104],
        ..FakeExporter::default()
    };
    let outcome = engine.run_mesh_export(&id, &mut exporter).unwrap();
    assert_eq!(exporter.runs, 1);
    assert!(!outcome.reused);
    assert_eq!(outcome.mesh_map.mesh_to_express(), &[101, 102, 103]);
    assert!(dir.path().join(format!("{id}.glb")).is_file());

    let skip = engine.skip_set(&id).unwrap();
    assert_eq!(skip.ids.iter().collect::<Vec<_>>(), vec![104]);
    assert_eq!(engine.express_id_map(&id).unwrap().unwrap().len(), 3);
}

#[test]
fn missing_mesh_file_is_exported_again() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let mut exporter = FakeExporter::default();
    engine.run_mesh_export(&id, &mut exporter).unwrap();
    std::fs::remove_file(dir.path().join(format!("{id}.glb"))).unwrap();

    let again = engine.run_mesh_export(&id, &mut exporter).unwrap();
    assert_eq!(exporter.runs, 2);
    assert!(!again.reused);
    assert!(dir.path().join(format!("{id}.glb")).is_file());
}

#[test]
fn failed_metadata_write_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let meta = dir.path().join("meta");
    std::fs::create_dir_all(&meta).unwrap();
    let engine = TakeoffEngine::new(
        EngineConfig::new(dir.path()).with_metadata_file(meta.join("metadata.json")),
    )
    .unwrap();
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;
    let before = engine.get_summary(&id, None).unwrap();
    std::fs::remove_dir_all(&meta).unwrap();

    let err = engine.upload(MODEL.as_bytes(), "other.ifc").unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
    assert_eq!(engine.list_files().len(), 1);

    let err = engine.record_skip_set(&id, [101]).unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
    assert!(engine.skip_set(&id).unwrap().is_stale());
    let after = engine.get_summary(&id, None).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after[0].element_ids, vec![101, 102]);
}

#[test]
fn skipped_elements_leave_the_summary() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let before = engine.get_summary(&id, None).unwrap();
    assert_eq!(before[0].element_count, 2);

    let mut exporter = FakeExporter {
        fail_on: vec![101, 104],
        ..FakeExporter::default()
    };
    engine.run_mesh_export(&id, &mut exporter).unwrap();

    let after = engine.get_summary(&id, None).unwrap();
    for group in after.iter() {
        assert!(!group.element_ids.contains(&101));
        assert!(!group.element_ids.contains(&104));
    }
    let wood = after.iter().find(|g| g.group_key == "Wood").unwrap();
    assert_eq!(wood.element_count, 1);
    assert_eq!(wood.total_area, Some(3.0));
    assert_eq!(wood.total_volume, None);
    assert_eq!(wood.total_weight, None);
    assert!(after.iter().all(|g| g.group_key != "IfcSlab"));
}

#[test]
fn failed_mesh_export_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;

    let err = engine.run_mesh_export(&id, &mut BrokenExporter).unwrap_err();
    assert!(matches!(err, EngineError::MeshExport(_)));
    assert!(engine.skip_set(&id).unwrap().is_stale());
}

#[test]
fn alignment_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let engine = engine(dir.path());
        let id = engine.upload(MODEL.as_bytes(), "haus.ifc").unwrap().file_id;
        engine.record_skip_set(&id, [103]).unwrap();
        id
    };

    let engine = engine(dir.path());
    let skip = engine.skip_set(&id).unwrap();
    assert_eq!(skip.status, AlignmentStatus::Aligned);
    assert!(skip.ids.contains(103));

    let groups = engine.get_summary(&id, None).unwrap();
    assert!(groups.iter().all(|g| g.group_key != "IfcWall"));
}

#[test]
fn unknown_and_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let unknown = FileId::generate();

    assert_eq!(engine.get_summary(&unknown, None).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(engine.skip_set(&unknown).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(engine.record_skip_set(&unknown, [1]).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(engine.delete_file(&unknown).unwrap_err().code(), "NOT_FOUND");

    assert_eq!(
        engine.upload(b"", "empty.ifc").unwrap_err().code(),
        "INVALID_UPLOAD"
    );
    assert_eq!(
        engine.upload(b"data", "model.txt").unwrap_err().code(),
        "INVALID_UPLOAD"
    );

    let id = engine.upload(b"not a step file", "junk.ifc").unwrap().file_id;
    assert_eq!(engine.get_summary(&id, None).unwrap_err().code(), "PARSE_ERROR");
}

#[test]
fn delete_and_purge() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let a = engine.upload(MODEL.as_bytes(), "a.ifc").unwrap().file_id;
    let b = engine.upload(MODEL.as_bytes(), "b.ifc").unwrap().file_id;
    engine.get_summary(&a, None).unwrap();

    engine.delete_file(&a).unwrap();
    assert_eq!(engine.get_summary(&a, None).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(engine.list_files().len(), 1);

    engine.purge_all().unwrap();
    assert!(engine.list_files().is_empty());
    assert_eq!(engine.get_summary(&b, None).unwrap_err().code(), "NOT_FOUND");
    assert!(!dir.path().join(format!("{b}.ifc")).exists());
}
