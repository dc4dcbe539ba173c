//! Serde mirror of the on-disk XML layout.
//!
//! Every node is optional so files written by older versions, or edited
//! by hand, decode with gaps instead of failing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "data-type")]
pub(crate) struct ElementTypeXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "element")]
pub(crate) struct ElementXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ChildrenXml {
    #[serde(rename = "child", default)]
    pub child: Vec<AttributeXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct AttributeXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SecurityXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerXml>,
    #[serde(
        rename = "owner-permissions-list",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_permissions_list: Option<OwnerPermissionsListXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct OwnerXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct OwnerPermissionsListXml {
    #[serde(rename = "owner-permissions", default)]
    pub entries: Vec<OwnerPermissionsXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct OwnerPermissionsXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionsXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PermissionsXml {
    #[serde(rename = "permission", default)]
    pub permission: Vec<String>,
}
