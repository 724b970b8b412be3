// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded entity attributes

use crate::parser::{decode_step_string, Token};
use crate::schema::IfcType;

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value with STEP escapes decoded
    String(String),
    Integer(i64),
    Float(f64),
    /// Enum value without the surrounding dots
    Enum(String),
    List(Vec<AttributeValue>),
    /// Typed select value such as `IFCAREAMEASURE(12.5)`
    Typed(String, Vec<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_step_string(s).into_owned()),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => AttributeValue::List(items.iter().map(Self::from_token).collect()),
            Token::TypedValue(type_name, args) => AttributeValue::Typed(
                type_name.to_string(),
                args.iter().map(Self::from_token).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Unwrap a typed select value (`IFCLABEL('x')` -> `'x'`); plain values pass through
    #[inline]
    pub fn untyped(&self) -> &AttributeValue {
        match self {
            AttributeValue::Typed(_, args) if args.len() == 1 => &args[0],
            other => other,
        }
    }

    /// Entity refs held either directly or in a list: `#5` or `(#5,#6)`
    pub fn entity_refs(&self) -> Vec<u32> {
        match self {
            AttributeValue::EntityRef(id) => vec![*id],
            AttributeValue::List(items) => items.iter().filter_map(|v| v.as_entity_ref()).collect(),
            _ => Vec::new(),
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }
}

/// Decoded IFC entity with attributes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub ifc_type: IfcType,
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    pub fn new(id: u32, ifc_type: IfcType, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            ifc_type,
            attributes,
        }
    }

    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// String attribute, unwrapping typed labels; empty strings count as absent
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index)
            .and_then(|v| v.untyped().as_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.untyped().as_float())
    }

    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Entity refs of a reference-or-list attribute
    pub fn get_refs(&self, index: usize) -> Vec<u32> {
        self.get(index).map(|v| v.entity_refs()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_entity;

    fn decode(line: &str) -> DecodedEntity {
        let (id, ifc_type, tokens) = parse_entity(line).unwrap();
        DecodedEntity::new(id, ifc_type, tokens.iter().map(AttributeValue::from_token).collect())
    }

    #[test]
    fn test_typed_values_unwrap() {
        let entity = decode("#3=IFCPROPERTYSINGLEVALUE('NetArea',$,IFCAREAMEASURE(12.5),$);");
        assert_eq!(entity.get_string(0), Some("NetArea"));
        assert_eq!(entity.get_float(2), Some(12.5));
        assert!(entity.get(3).unwrap().is_null());
    }

    #[test]
    fn test_strings_are_unescaped() {
        let entity = decode("#9=IFCMATERIAL('Gips\\X2\\00E4\\X0\\',$,'');");
        assert_eq!(entity.get_string(0), Some("Gipsä"));
        assert_eq!(entity.get_string(2), None);
    }

    #[test]
    fn test_get_refs_accepts_single_or_list() {
        let entity = decode("#4=IFCRELDEFINESBYPROPERTIES('g',$,$,$,(#1,#2),#3);");
        assert_eq!(entity.get_refs(4), vec![1, 2]);
        assert_eq!(entity.get_refs(5), vec![3]);
        assert!(entity.get_refs(2).is_empty());
    }
}
