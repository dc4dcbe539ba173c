use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of principal an [`Owner`] names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    User,
    Role,
    SystemRole,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Role => "ROLE",
            Self::SystemRole => "SYSTEM_ROLE",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "USER" => Ok(Self::User),
            "ROLE" => Ok(Self::Role),
            "SYSTEM_ROLE" => Ok(Self::SystemRole),
            other => Err(TypeError::UnknownOwnerType(other.to_string())),
        }
    }
}

/// An operation an owner may be granted on an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CREATE" => Ok(Self::Create),
            "READ" => Ok(Self::Read),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(TypeError::UnknownPermission(other.to_string())),
        }
    }
}

/// A named principal: a user, a role, or a system role.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub owner_type: OwnerType,
}

impl Owner {
    pub fn new(name: impl Into<String>, owner_type: OwnerType) -> Self {
        Self {
            name: name.into(),
            owner_type,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, OwnerType::User)
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, OwnerType::Role)
    }
}

/// The permissions granted to one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPermissions {
    pub owner: Owner,
    pub permissions: Vec<Permission>,
}

impl OwnerPermissions {
    pub fn new(owner: Owner, permissions: Vec<Permission>) -> Self {
        Self { owner, permissions }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
