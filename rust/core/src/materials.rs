// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material association traversal
//!
//! Flattens whatever `IfcMaterialSelect` an object is associated with
//! (plain materials, lists, layer sets, constituent sets, profile sets and
//! their usages) into the `IfcMaterial` entities it ultimately names.

use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::model::IfcModel;
use crate::schema::IfcType;
use rustc_hash::FxHashSet;

/// Material sets nest at most usage -> set -> item -> material
const MAX_DEPTH: usize = 4;

/// An `IfcMaterial` reachable from an element
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub id: u32,
    pub name: Option<String>,
    /// IFC4 `Category`
    pub category: Option<String>,
}

impl<'a> IfcModel<'a> {
    /// Materials of an element in association order, deduplicated by entity id.
    ///
    /// Occurrence associations win; the type object's associations are used
    /// only when the occurrence has none.
    pub fn materials(
        &self,
        decoder: &mut EntityDecoder<'a>,
        object_id: u32,
    ) -> Result<Vec<Material>> {
        let mut selects = self.material_associations(object_id);
        if selects.is_empty() {
            if let Some(type_id) = self.type_object(object_id) {
                selects = self.material_associations(type_id);
            }
        }

        let mut seen = FxHashSet::default();
        let mut materials = Vec::new();
        for &select in selects {
            collect_materials(decoder, select, 0, &mut seen, &mut materials)?;
        }
        Ok(materials)
    }
}

fn collect_materials(
    decoder: &mut EntityDecoder<'_>,
    id: u32,
    depth: usize,
    seen: &mut FxHashSet<u32>,
    out: &mut Vec<Material>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }
    let entity = match decoder.decode_by_id(id) {
        Ok(entity) => entity,
        // A broken member of a set must not hide its siblings
        Err(err) if depth > 0 => {
            tracing::warn!(material_id = id, error = %err, "Skipping unresolvable material reference");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    // Child attribute holding the next level down
    let children = match entity.ifc_type {
        IfcType::IfcMaterial => {
            if seen.insert(entity.id) {
                // IfcMaterial: [0]=Name, [1]=Description, [2]=Category
                out.push(Material {
                    id: entity.id,
                    name: entity.get_string(0).map(str::to_string),
                    category: entity.get_string(2).map(str::to_string),
                });
            }
            return Ok(());
        }
        // [0]=ForLayerSet / ForProfileSet
        IfcType::IfcMaterialLayerSetUsage | IfcType::IfcMaterialProfileSetUsage => entity.get_refs(0),
        // [0]=MaterialLayers / Materials
        IfcType::IfcMaterialLayerSet | IfcType::IfcMaterialList => entity.get_refs(0),
        // [0]=Material
        IfcType::IfcMaterialLayer => entity.get_refs(0),
        // [2]=MaterialConstituents / MaterialProfiles
        IfcType::IfcMaterialConstituentSet | IfcType::IfcMaterialProfileSet => entity.get_refs(2),
        // [2]=Material
        IfcType::IfcMaterialConstituent | IfcType::IfcMaterialProfile => entity.get_refs(2),
        _ => return Ok(()),
    };

    for child in children {
        collect_materials(decoder, child, depth + 1, seen, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCMATERIAL('Concrete',$,'Structural');
#2=IFCMATERIAL('Insulation',$,$);
#3=IFCMATERIAL($,$,'Masonry');
#4=IFCMATERIALLAYER(#1,0.2,$,$,$,$,$);
#5=IFCMATERIALLAYER(#2,0.1,$,$,$,$,$);
#6=IFCMATERIALLAYER(#1,0.05,$,$,$,$,$);
#7=IFCMATERIALLAYERSET((#4,#5,#6),'Ext',$);
#8=IFCMATERIALLAYERSETUSAGE(#7,.AXIS2.,.POSITIVE.,0.,$);
#9=IFCMATERIALCONSTITUENT('Frame',$,#2,$,$);
#10=IFCMATERIALCONSTITUENTSET('Window',$,(#9));
#11=IFCMATERIALPROFILE($,$,#1,$,$,$);
#12=IFCMATERIALPROFILESET($,$,(#11),$);
#13=IFCMATERIALPROFILESETUSAGE(#12,$,$);
#20=IFCWALL('w',$,$,$,$,$,$,$,$);
#21=IFCWINDOW('win',$,$,$,$,$,$,$,$,$,$,$,$);
#22=IFCBEAM('b',$,$,$,$,$,$,$,$);
#23=IFCSLAB('s',$,$,$,$,$,$,$,$);
#24=IFCCOLUMN('c',$,$,$,$,$,$,$,$);
#25=IFCCOLUMNTYPE('ct',$,$,$,$,$,$,$,$,.COLUMN.);
#26=IFCMEMBER('m',$,$,$,$,$,$,$,$);
#27=IFCWALL('w2',$,$,$,$,$,$,$,$);
#28=IFCMATERIALLIST((#1,#99));
#30=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#20),#8);
#31=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#21),#10);
#32=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#22),#13);
#33=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#23),#3);
#34=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#25),#2);
#35=IFCRELDEFINESBYTYPE('t',$,$,$,(#24),#25);
#36=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#27),#28);
ENDSEC;
END-ISO-10303-21;
"#;

    fn names(model: &IfcModel, id: u32) -> Vec<Option<String>> {
        let mut decoder = model.decoder();
        model
            .materials(&mut decoder, id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect()
    }

    #[test]
    fn test_layer_set_usage_is_flattened_and_deduplicated() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(
            names(&model, 20),
            vec![Some("Concrete".to_string()), Some("Insulation".to_string())]
        );
    }

    #[test]
    fn test_constituent_and_profile_sets() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(names(&model, 21), vec![Some("Insulation".to_string())]);
        assert_eq!(names(&model, 22), vec![Some("Concrete".to_string())]);
    }

    #[test]
    fn test_category_without_name() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut decoder = model.decoder();
        let materials = model.materials(&mut decoder, 23).unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, None);
        assert_eq!(materials[0].category.as_deref(), Some("Masonry"));
    }

    #[test]
    fn test_type_object_fallback() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(names(&model, 24), vec![Some("Insulation".to_string())]);
        assert!(names(&model, 26).is_empty());
    }

    #[test]
    fn test_dangling_list_member_is_skipped() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(names(&model, 27), vec![Some("Concrete".to_string())]);
    }
}
