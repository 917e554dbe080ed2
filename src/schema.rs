//! Document schema definitions and the flat-name ⇄ dot-path maps derived
//! from them.
//!
//! # Example
//! ```
//! use qail_mql::schema::{DocumentSchema, PathMap};
//!
//! let json = r#"{
//!     "collections": [{
//!         "name": "events",
//!         "document": {
//!             "properties": {
//!                 "severity": { "bsonType": "int" },
//!                 "vehicle_details": {
//!                     "bsonType": "object",
//!                     "properties": { "license_plate_number": { "bsonType": "string" } }
//!                 }
//!             }
//!         }
//!     }]
//! }"#;
//!
//! let schema = DocumentSchema::from_json(json).unwrap();
//! let paths = PathMap::from_schema(&schema);
//! assert_eq!(paths.dot_path("license_plate_number"), Some("vehicle_details.license_plate_number"));
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MqlResult;

/// Database schema: one or more collections, the first one is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSchema {
    #[serde(default)]
    pub collections: Vec<CollectionSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentShape>,
    /// Some schemas put properties directly on the collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentShape {
    #[serde(default)]
    pub properties: Properties,
}

/// A single property definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "bsonType", alias = "type", default, skip_serializing_if = "Option::is_none")]
    pub bson_type: Option<TypeTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,
}

/// `"bsonType": "object"` or `"bsonType": ["string", "null"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    One(String),
    Many(Vec<String>),
}

impl TypeTag {
    pub fn is(&self, name: &str) -> bool {
        match self {
            TypeTag::One(t) => t == name,
            TypeTag::Many(ts) => ts.iter().any(|t| t == name),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::One(t) => write!(f, "{}", t),
            TypeTag::Many(ts) => write!(f, "{}", ts.join("|")),
        }
    }
}

impl FieldSchema {
    fn is_type(&self, name: &str) -> bool {
        self.bson_type.as_ref().is_some_and(|t| t.is(name))
    }

    /// Nested properties of an `object` field.
    pub fn object_properties(&self) -> Option<&Properties> {
        if self.is_type("object") {
            self.properties.as_ref()
        } else {
            None
        }
    }

    /// Properties of the object items of an `array` field.
    pub fn item_properties(&self) -> Option<&Properties> {
        if self.is_type("array") {
            self.items.as_ref().and_then(|items| items.object_properties())
        } else {
            None
        }
    }
}

/// Property definitions in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Properties(Vec<(String, FieldSchema)>);

impl Properties {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldSchema)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, FieldSchema)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of property definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Properties, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, FieldSchema>()? {
                    entries.push((k, v));
                }
                Ok(Properties(entries))
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

impl DocumentSchema {
    /// Load schema from JSON string.
    pub fn from_json(json: &str) -> MqlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name of the first collection.
    pub fn collection_name(&self) -> Option<&str> {
        self.collections.first().map(|c| c.name.as_str())
    }

    /// Top-level properties of the first collection.
    pub fn properties(&self) -> Option<&Properties> {
        let collection = self.collections.first()?;
        collection
            .document
            .as_ref()
            .map(|d| &d.properties)
            .or(collection.properties.as_ref())
    }

    /// Render the first collection as one line per property:
    ///
    /// ```text
    /// severity  // Severity from 1 to 10 (int)
    /// vehicle_details  // (object)
    /// license_plate_number  // (string)
    /// ```
    ///
    /// Nested object and array-item properties are listed by their own
    /// name, without the parent prefix.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if let Some(props) = self.properties() {
            describe_properties(props, &mut lines);
        }
        lines.join("\n")
    }
}

fn describe_properties(props: &Properties, lines: &mut Vec<String>) {
    for (name, field) in props.iter() {
        let mut type_fmt = field
            .bson_type
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default();
        if let Some(fmt) = field.format.as_deref().filter(|f| !f.is_empty()) {
            type_fmt = format!("{}, {}", type_fmt, fmt);
        }

        let mut comment = field
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if !type_fmt.is_empty() {
            comment = if comment.is_empty() {
                format!("({})", type_fmt)
            } else {
                format!("{} ({})", comment, type_fmt)
            };
        }

        if comment.is_empty() {
            lines.push(name.to_string());
        } else {
            lines.push(format!("{}  // {}", name, comment));
        }

        if let Some(nested) = field.object_properties() {
            describe_properties(nested, lines);
        } else if let Some(nested) = field.item_properties() {
            describe_properties(nested, lines);
        }
    }
}

/// Flat field name ⇄ dot path, derived from a schema.
///
/// The flat name is the deepest property's own name. When two paths share
/// a leaf name the later one wins, and the earlier path is left unmapped.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMap {
    order: Vec<String>,
    flat_to_path: HashMap<String, String>,
    path_to_flat: HashMap<String, String>,
}

impl PathMap {
    /// Build the maps for the first collection of a schema.
    pub fn from_schema(schema: &DocumentSchema) -> Self {
        match schema.properties() {
            Some(props) => Self::from_properties(props),
            None => Self::default(),
        }
    }

    pub fn from_properties(props: &Properties) -> Self {
        let mut map = PathMap::default();
        map.extend_from(props, "");
        map.path_to_flat = map
            .flat_to_path
            .iter()
            .map(|(flat, path)| (path.clone(), flat.clone()))
            .collect();
        map
    }

    fn extend_from(&mut self, props: &Properties, prefix: &str) {
        for (name, field) in props.iter() {
            let current = format!("{}{}", prefix, name);
            match field.object_properties() {
                Some(nested) => self.extend_from(nested, &format!("{}.", current)),
                None => {
                    if self.flat_to_path.insert(name.to_string(), current).is_none() {
                        self.order.push(name.to_string());
                    }
                }
            }
        }
    }

    /// Dot path for a flat name.
    pub fn dot_path(&self, flat: &str) -> Option<&str> {
        self.flat_to_path.get(flat).map(String::as_str)
    }

    /// Flat name for a dot path.
    pub fn flat_name(&self, path: &str) -> Option<&str> {
        self.path_to_flat.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(flat_name, dot_path)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|flat| self.flat_to_path.get(flat).map(|p| (flat.as_str(), p.as_str())))
    }
}
