use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The storage type of a scalar attribute value.
///
/// The tag is persisted next to the value so that `"3"` stored as an
/// integer loads back as the integer `3`, never as a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Long,
    Double,
}

impl ValueType {
    /// The tag written to disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "integer" | "int" => Ok(Self::Integer),
            "long" => Ok(Self::Long),
            "double" => Ok(Self::Double),
            other => Err(TypeError::UnknownValueType(other.to_string())),
        }
    }
}

/// A scalar attribute value with an explicit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
}

impl AttributeValue {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Integer(_) => ValueType::Integer,
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
        }
    }

    /// Parse the textual form of a value of the given type.
    pub fn parse(value_type: ValueType, text: &str) -> Result<Self, TypeError> {
        let invalid = |reason: String| TypeError::InvalidValue {
            value_type: value_type.as_str(),
            text: text.to_string(),
            reason,
        };
        match value_type {
            ValueType::String => Ok(Self::String(text.to_string())),
            ValueType::Integer => text
                .trim()
                .parse()
                .map(Self::Integer)
                .map_err(|e: std::num::ParseIntError| invalid(e.to_string())),
            ValueType::Long => text
                .trim()
                .parse()
                .map(Self::Long)
                .map_err(|e: std::num::ParseIntError| invalid(e.to_string())),
            ValueType::Double => text
                .trim()
                .parse()
                .map(Self::Double)
                .map_err(|e: std::num::ParseFloatError| invalid(e.to_string())),
        }
    }

    /// The textual form written to disk. `parse(value_type(), to_text())`
    /// yields the same value.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer-valued content widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

/// Child attributes keyed by id.
///
/// Behaves like an insertion-ordered map: inserting a child whose id is
/// already present replaces the previous child in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a child. Returns the replaced child, if any.
    pub fn insert(&mut self, attribute: Attribute) -> Option<Attribute> {
        match self.0.iter_mut().find(|a| a.id == attribute.id) {
            Some(slot) => Some(std::mem::replace(slot, attribute)),
            None => {
                self.0.push(attribute);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Attribute> {
        self.0.iter_mut().find(|a| a.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Attribute> {
        let pos = self.0.iter().position(|a| a.id == id)?;
        Some(self.0.remove(pos))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for attribute in iter {
            attributes.insert(attribute);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Common accessors for any node of an attribute tree.
///
/// Both [`Attribute`] and [`Element`](crate::Element) are nodes: an
/// element is the root of its own tree.
pub trait AttributeNode {
    fn value(&self) -> Option<&AttributeValue>;

    fn set_value(&mut self, value: Option<AttributeValue>);

    fn children(&self) -> &Attributes;

    fn children_mut(&mut self) -> &mut Attributes;

    fn child(&self, id: &str) -> Option<&Attribute> {
        self.children().get(id)
    }

    /// Add a child, replacing any existing child with the same id.
    fn add_child(&mut self, child: Attribute) -> Option<Attribute> {
        self.children_mut().insert(child)
    }

    fn remove_child(&mut self, id: &str) -> Option<Attribute> {
        self.children_mut().remove(id)
    }

    fn clear_children(&mut self) {
        self.children_mut().clear();
    }
}

/// A keyed, optionally valued node of an attribute tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub value: Option<AttributeValue>,
    #[serde(default)]
    pub children: Attributes,
}

impl Attribute {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: None,
            children: Attributes::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<AttributeValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_child(mut self, child: Attribute) -> Self {
        self.children.insert(child);
        self
    }
}

impl AttributeNode for Attribute {
    fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<AttributeValue>) {
        self.value = value;
    }

    fn children(&self) -> &Attributes {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Attributes {
        &mut self.children
    }
}
