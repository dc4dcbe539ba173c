use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeNode, AttributeValue, Attributes};
use crate::names::names_match;
use crate::owner::{Owner, OwnerPermissions};

/// A named category of elements inside a namespace.
///
/// The id names the type's directory on disk. When no id is set the name
/// is used, so renaming a type after creation does not move it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    pub namespace: Option<String>,
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Name of the store this type was loaded from or created in.
    pub meta_store_name: Option<String>,
}

impl ElementType {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The explicit id, or the name when none was set.
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Whether this type is bound to the store named `store_name`.
    pub fn belongs_to(&self, store_name: &str) -> bool {
        self.meta_store_name.as_deref() == Some(store_name)
    }
}

/// A concrete record: the root node of an attribute tree plus security
/// metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: Option<AttributeValue>,
    #[serde(default)]
    pub children: Attributes,
    owner: Option<Owner>,
    #[serde(default)]
    owner_permissions: Vec<OwnerPermissions>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_child(mut self, child: Attribute) -> Self {
        self.children.insert(child);
        self
    }

    /// The explicit id, or the name when none was set.
    pub fn effective_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }

    /// Case-insensitive name comparison, as used by lookups by name.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.as_deref().is_some_and(|n| names_match(n, name))
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Attach an owner. The element keeps its own copy.
    pub fn set_owner(&mut self, owner: Option<Owner>) {
        self.owner = owner;
    }

    pub fn owner_permissions(&self) -> &[OwnerPermissions] {
        &self.owner_permissions
    }

    pub fn set_owner_permissions(&mut self, entries: Vec<OwnerPermissions>) {
        self.owner_permissions = entries;
    }

    pub fn add_owner_permissions(&mut self, entry: OwnerPermissions) {
        self.owner_permissions.push(entry);
    }
}

impl AttributeNode for Element {
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
