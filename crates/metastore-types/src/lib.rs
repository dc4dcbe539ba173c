//! Foundation types for the metastore.
//!
//! The metastore is a typed key/value hierarchy:
//! namespace → element type → element → attribute tree. This crate holds
//! the value types shared by every backend and by the on-disk codec.
//!
//! # Key Types
//!
//! - [`ElementType`] — A named category of elements inside a namespace
//! - [`Element`] — A concrete record; the root of an attribute tree
//! - [`Attribute`] — A keyed node with an optional typed value and children
//! - [`AttributeValue`] — A scalar that remembers its type (string/integer/long/double)
//! - [`Owner`] / [`OwnerPermissions`] — Security metadata attached to elements
//!
//! Ids that end up as path components are checked with [`validate_id`];
//! lookups by name compare with [`names_match`].

pub mod attribute;
pub mod element;
pub mod error;
pub mod names;
pub mod owner;

pub use attribute::{Attribute, AttributeNode, AttributeValue, Attributes, ValueType};
pub use element::{Element, ElementType};
pub use error::TypeError;
pub use names::{names_match, validate_id};
pub use owner::{Owner, OwnerPermissions, OwnerType, Permission};
