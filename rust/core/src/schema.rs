// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking for the relationship, property and material entities
//! that quantity takeoff decodes, plus the table of physical element classes.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::OnceLock;

/// IFC entity types decoded during takeoff.
///
/// Everything else (geometry, placements, owner history, ...) is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Relationships
    IfcRelDefinesByProperties,
    IfcRelDefinesByType,
    IfcRelAssociatesMaterial,

    // Property definitions
    IfcPropertySet,
    IfcElementQuantity,
    IfcPropertySingleValue,
    IfcPropertyEnumeratedValue,

    // Quantities
    IfcQuantityLength,
    IfcQuantityArea,
    IfcQuantityVolume,
    IfcQuantityCount,
    IfcQuantityWeight,
    IfcQuantityTime,

    // Materials
    IfcMaterial,
    IfcMaterialList,
    IfcMaterialLayer,
    IfcMaterialLayerSet,
    IfcMaterialLayerSetUsage,
    IfcMaterialConstituent,
    IfcMaterialConstituentSet,
    IfcMaterialProfile,
    IfcMaterialProfileSet,
    IfcMaterialProfileSetUsage,

    Unknown,
}

impl IfcType {
    /// Parse from a STEP type name (any case)
    pub fn from_name(name: &str) -> Self {
        let mut upper = [0u8; 40];
        if name.len() > upper.len() {
            return Self::Unknown;
        }
        for (dst, src) in upper.iter_mut().zip(name.bytes()) {
            *dst = src.to_ascii_uppercase();
        }

        match &upper[..name.len()] {
            b"IFCRELDEFINESBYPROPERTIES" => Self::IfcRelDefinesByProperties,
            b"IFCRELDEFINESBYTYPE" => Self::IfcRelDefinesByType,
            b"IFCRELASSOCIATESMATERIAL" => Self::IfcRelAssociatesMaterial,

            b"IFCPROPERTYSET" => Self::IfcPropertySet,
            b"IFCELEMENTQUANTITY" => Self::IfcElementQuantity,
            b"IFCPROPERTYSINGLEVALUE" => Self::IfcPropertySingleValue,
            b"IFCPROPERTYENUMERATEDVALUE" => Self::IfcPropertyEnumeratedValue,

            b"IFCQUANTITYLENGTH" => Self::IfcQuantityLength,
            b"IFCQUANTITYAREA" => Self::IfcQuantityArea,
            b"IFCQUANTITYVOLUME" => Self::IfcQuantityVolume,
            b"IFCQUANTITYCOUNT" => Self::IfcQuantityCount,
            b"IFCQUANTITYWEIGHT" => Self::IfcQuantityWeight,
            b"IFCQUANTITYTIME" => Self::IfcQuantityTime,

            b"IFCMATERIAL" => Self::IfcMaterial,
            b"IFCMATERIALLIST" => Self::IfcMaterialList,
            b"IFCMATERIALLAYER" => Self::IfcMaterialLayer,
            b"IFCMATERIALLAYERSET" => Self::IfcMaterialLayerSet,
            b"IFCMATERIALLAYERSETUSAGE" => Self::IfcMaterialLayerSetUsage,
            b"IFCMATERIALCONSTITUENT" => Self::IfcMaterialConstituent,
            b"IFCMATERIALCONSTITUENTSET" => Self::IfcMaterialConstituentSet,
            b"IFCMATERIALPROFILE" => Self::IfcMaterialProfile,
            b"IFCMATERIALPROFILESET" => Self::IfcMaterialProfileSet,
            b"IFCMATERIALPROFILESETUSAGE" => Self::IfcMaterialProfileSetUsage,

            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IfcRelDefinesByProperties => "IfcRelDefinesByProperties",
            Self::IfcRelDefinesByType => "IfcRelDefinesByType",
            Self::IfcRelAssociatesMaterial => "IfcRelAssociatesMaterial",
            Self::IfcPropertySet => "IfcPropertySet",
            Self::IfcElementQuantity => "IfcElementQuantity",
            Self::IfcPropertySingleValue => "IfcPropertySingleValue",
            Self::IfcPropertyEnumeratedValue => "IfcPropertyEnumeratedValue",
            Self::IfcQuantityLength => "IfcQuantityLength",
            Self::IfcQuantityArea => "IfcQuantityArea",
            Self::IfcQuantityVolume => "IfcQuantityVolume",
            Self::IfcQuantityCount => "IfcQuantityCount",
            Self::IfcQuantityWeight => "IfcQuantityWeight",
            Self::IfcQuantityTime => "IfcQuantityTime",
            Self::IfcMaterial => "IfcMaterial",
            Self::IfcMaterialList => "IfcMaterialList",
            Self::IfcMaterialLayer => "IfcMaterialLayer",
            Self::IfcMaterialLayerSet => "IfcMaterialLayerSet",
            Self::IfcMaterialLayerSetUsage => "IfcMaterialLayerSetUsage",
            Self::IfcMaterialConstituent => "IfcMaterialConstituent",
            Self::IfcMaterialConstituentSet => "IfcMaterialConstituentSet",
            Self::IfcMaterialProfile => "IfcMaterialProfile",
            Self::IfcMaterialProfileSet => "IfcMaterialProfileSet",
            Self::IfcMaterialProfileSetUsage => "IfcMaterialProfileSetUsage",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is one of the `IfcPhysicalSimpleQuantity` subtypes
    pub fn is_quantity(&self) -> bool {
        matches!(
            self,
            Self::IfcQuantityLength
                | Self::IfcQuantityArea
                | Self::IfcQuantityVolume
                | Self::IfcQuantityCount
                | Self::IfcQuantityWeight
                | Self::IfcQuantityTime
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical element classes: every `IfcElement` subtype across IFC2X3, IFC4
/// and IFC4X3 except feature elements (openings, projections, surface
/// features) and `IfcVirtualElement`, which have no buildable material.
const ELEMENT_CLASSES: &[&str] = &[
    // Building elements
    "IfcBeam",
    "IfcBeamStandardCase",
    "IfcBearing",
    "IfcBuildingElementPart",
    "IfcBuildingElementProxy",
    "IfcBuiltElement",
    "IfcChimney",
    "IfcColumn",
    "IfcColumnStandardCase",
    "IfcCourse",
    "IfcCovering",
    "IfcCurtainWall",
    "IfcDeepFoundation",
    "IfcDoor",
    "IfcDoorStandardCase",
    "IfcEarthworksElement",
    "IfcEarthworksFill",
    "IfcFooting",
    "IfcKerb",
    "IfcMember",
    "IfcMemberStandardCase",
    "IfcMooringDevice",
    "IfcNavigationElement",
    "IfcPavement",
    "IfcPile",
    "IfcPlate",
    "IfcPlateStandardCase",
    "IfcRail",
    "IfcRailing",
    "IfcRamp",
    "IfcRampFlight",
    "IfcReinforcedSoil",
    "IfcRoof",
    "IfcShadingDevice",
    "IfcSlab",
    "IfcSlabElementedCase",
    "IfcSlabStandardCase",
    "IfcStair",
    "IfcStairFlight",
    "IfcTrackElement",
    "IfcWall",
    "IfcWallElementedCase",
    "IfcWallStandardCase",
    "IfcWindow",
    "IfcWindowStandardCase",
    // Element components
    "IfcDiscreteAccessory",
    "IfcElementComponent",
    "IfcFastener",
    "IfcImpactProtectionDevice",
    "IfcMechanicalFastener",
    "IfcReinforcingBar",
    "IfcReinforcingMesh",
    "IfcSign",
    "IfcTendon",
    "IfcTendonAnchor",
    "IfcTendonConduit",
    "IfcVibrationDamper",
    "IfcVibrationIsolator",
    // Assemblies, furnishing, geographic, transport
    "IfcCivilElement",
    "IfcElementAssembly",
    "IfcFurnishingElement",
    "IfcFurniture",
    "IfcGeographicElement",
    "IfcSystemFurnitureElement",
    "IfcTransportElement",
    "IfcTransportationDevice",
    "IfcVehicle",
    // Distribution elements
    "IfcActuator",
    "IfcAirTerminal",
    "IfcAirTerminalBox",
    "IfcAirToAirHeatRecovery",
    "IfcAlarm",
    "IfcAudioVisualAppliance",
    "IfcBoiler",
    "IfcBurner",
    "IfcCableCarrierFitting",
    "IfcCableCarrierSegment",
    "IfcCableFitting",
    "IfcCableSegment",
    "IfcChiller",
    "IfcCoil",
    "IfcCommunicationsAppliance",
    "IfcCompressor",
    "IfcCondenser",
    "IfcController",
    "IfcCooledBeam",
    "IfcCoolingTower",
    "IfcDamper",
    "IfcDistributionBoard",
    "IfcDistributionChamberElement",
    "IfcDistributionControlElement",
    "IfcDistributionElement",
    "IfcDistributionFlowElement",
    "IfcDuctFitting",
    "IfcDuctSegment",
    "IfcDuctSilencer",
    "IfcElectricAppliance",
    "IfcElectricDistributionBoard",
    "IfcElectricFlowStorageDevice",
    "IfcElectricGenerator",
    "IfcElectricMotor",
    "IfcElectricTimeControl",
    "IfcEnergyConversionDevice",
    "IfcEngine",
    "IfcEvaporativeCooler",
    "IfcEvaporator",
    "IfcFan",
    "IfcFilter",
    "IfcFireSuppressionTerminal",
    "IfcFlowController",
    "IfcFlowFitting",
    "IfcFlowInstrument",
    "IfcFlowMeter",
    "IfcFlowMovingDevice",
    "IfcFlowSegment",
    "IfcFlowStorageDevice",
    "IfcFlowTerminal",
    "IfcFlowTreatmentDevice",
    "IfcHeatExchanger",
    "IfcHumidifier",
    "IfcInterceptor",
    "IfcJunctionBox",
    "IfcLamp",
    "IfcLightFixture",
    "IfcMedicalDevice",
    "IfcMotorConnection",
    "IfcOutlet",
    "IfcPipeFitting",
    "IfcPipeSegment",
    "IfcProtectiveDevice",
    "IfcProtectiveDeviceTrippingUnit",
    "IfcPump",
    "IfcSanitaryTerminal",
    "IfcSensor",
    "IfcSolarDevice",
    "IfcSpaceHeater",
    "IfcStackTerminal",
    "IfcSwitchingDevice",
    "IfcTank",
    "IfcTransformer",
    "IfcTubeBundle",
    "IfcUnitaryControlElement",
    "IfcUnitaryEquipment",
    "IfcValve",
    "IfcWasteTerminal",
];

fn element_class_table() -> &'static FxHashMap<String, &'static str> {
    static TABLE: OnceLock<FxHashMap<String, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        ELEMENT_CLASSES
            .iter()
            .map(|class| (class.to_ascii_uppercase(), *class))
            .collect()
    })
}

/// Canonical class name (`IfcWall`) for a STEP type name (`IFCWALL`) when it
/// denotes a physical element, `None` otherwise.
pub fn element_class(type_name: &str) -> Option<&'static str> {
    if type_name.bytes().any(|b| b.is_ascii_lowercase()) {
        element_class_table()
            .get(&type_name.to_ascii_uppercase())
            .copied()
    } else {
        element_class_table().get(type_name).copied()
    }
}
