use metastore_types::{
    Attribute, AttributeValue, Attributes, Element, ElementType, Owner, OwnerPermissions,
    OwnerType, Permission, ValueType,
};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use crate::error::{CodecError, CodecResult};
use crate::schema::{
    AttributeXml, ChildrenXml, ElementTypeXml, ElementXml, OwnerPermissionsListXml,
    OwnerPermissionsXml, OwnerXml, PermissionsXml, SecurityXml,
};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Codec for the element and element-type files of an on-disk store.
pub struct XmlCodec;

impl XmlCodec {
    /// Encode an element type. Only the name and description are stored;
    /// the id is the name of the directory holding the file.
    pub fn encode_element_type(element_type: &ElementType) -> CodecResult<String> {
        let doc = ElementTypeXml {
            name: Some(element_type.name.clone()),
            description: element_type.description.clone(),
        };
        to_document(&doc)
    }

    /// Decode an element type. Namespace, id and store binding are left
    /// for the caller to fill in from the file's location.
    pub fn decode_element_type(xml: &str) -> CodecResult<ElementType> {
        let xml = protect_leaf_whitespace(xml)?;
        let doc: ElementTypeXml = quick_xml::de::from_str(&xml)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        Ok(ElementType {
            name: doc.name.unwrap_or_default(),
            description: doc.description,
            ..ElementType::default()
        })
    }

    /// Encode an element with its attribute tree and security block.
    pub fn encode_element(element: &Element) -> CodecResult<String> {
        let (value, value_type) = split_value(element.value.as_ref());
        let doc = ElementXml {
            id: element.id.clone(),
            value,
            value_type,
            name: element.name.clone(),
            children: encode_children(&element.children),
            security: encode_security(element),
        };
        to_document(&doc)
    }

    pub fn decode_element(xml: &str) -> CodecResult<Element> {
        let xml = protect_leaf_whitespace(xml)?;
        let doc: ElementXml = quick_xml::de::from_str(&xml)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;

        let mut element = Element::default();
        element.id = doc.id;
        element.name = doc.name;
        element.value = join_value(doc.value, doc.value_type)?;
        element.children = decode_children(doc.children)?;
        if let Some(security) = doc.security {
            element.set_owner(security.owner.and_then(decode_owner));
            let entries = security
                .owner_permissions_list
                .map(|list| list.entries)
                .unwrap_or_default();
            element.set_owner_permissions(decode_owner_permissions(entries)?);
        }
        Ok(element)
    }
}

fn to_document<T: serde::Serialize>(doc: &T) -> CodecResult<String> {
    let body =
        quick_xml::se::to_string(doc).map_err(|e| CodecError::Serialization(e.to_string()))?;
    Ok(format!("{XML_DECLARATION}{body}\n"))
}

fn de_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::Deserialization(e.to_string())
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Rewrite the leading and trailing whitespace of leaf text nodes as
/// character references.
///
/// The serde deserializer trims text before resolving references, so this
/// keeps `<value>  a  </value>` from decoding as `"a"`. Whitespace between
/// elements is left alone.
fn protect_leaf_whitespace(xml: &str) -> CodecResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut after_start = false;
    let mut pending: Option<BytesText<'_>> = None;
    loop {
        let event = reader.read_event().map_err(de_error)?;
        if let Some(text) = pending.take() {
            let text = match &event {
                Event::End(_) => escape_edges(&text)?,
                _ => text,
            };
            writer.write_event(Event::Text(text)).map_err(de_error)?;
        }
        match event {
            Event::Eof => break,
            Event::Text(text) if after_start => {
                pending = Some(text);
                after_start = false;
            }
            event => {
                after_start = matches!(event, Event::Start(_));
                writer.write_event(event).map_err(de_error)?;
            }
        }
    }
    String::from_utf8(writer.into_inner()).map_err(de_error)
}

fn escape_edges(text: &BytesText<'_>) -> CodecResult<BytesText<'static>> {
    let raw = std::str::from_utf8(text).map_err(de_error)?;
    let start = raw.len() - raw.trim_start_matches(is_xml_space).len();
    let body = raw[start..].trim_end_matches(is_xml_space);
    let end = start + body.len();

    let mut escaped = String::with_capacity(raw.len() + 16);
    for c in raw[..start].chars() {
        escaped.push_str(&format!("&#{};", u32::from(c)));
    }
    escaped.push_str(body);
    for c in raw[end..].chars() {
        escaped.push_str(&format!("&#{};", u32::from(c)));
    }
    Ok(BytesText::from_escaped(escaped))
}

fn split_value(value: Option<&AttributeValue>) -> (Option<String>, Option<String>) {
    match value {
        Some(v) => (Some(v.to_text()), Some(v.value_type().as_str().to_string())),
        None => (None, None),
    }
}

/// Rebuild a typed value. Untagged values are strings; a tag without a
/// value is an empty string for the string type and absent otherwise.
fn join_value(
    value: Option<String>,
    value_type: Option<String>,
) -> CodecResult<Option<AttributeValue>> {
    let value_type = value_type
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.trim().parse::<ValueType>())
        .transpose()?;
    match (value, value_type) {
        (None, Some(ValueType::String)) => Ok(Some(AttributeValue::String(String::new()))),
        (None, _) => Ok(None),
        (Some(text), None) => Ok(Some(AttributeValue::String(text))),
        (Some(text), Some(t)) => Ok(Some(AttributeValue::parse(t, &text)?)),
    }
}

fn encode_children(children: &Attributes) -> Option<ChildrenXml> {
    if children.is_empty() {
        return None;
    }
    Some(ChildrenXml {
        child: children.iter().map(encode_attribute).collect(),
    })
}

fn encode_attribute(attribute: &Attribute) -> AttributeXml {
    let (value, value_type) = split_value(attribute.value.as_ref());
    AttributeXml {
        id: Some(attribute.id.clone()),
        value,
        value_type,
        children: encode_children(&attribute.children),
    }
}

fn decode_children(children: Option<ChildrenXml>) -> CodecResult<Attributes> {
    let mut attributes = Attributes::new();
    for child in children.map(|c| c.child).unwrap_or_default() {
        let Some(id) = child.id else {
            warn!("skipping child attribute without an id");
            continue;
        };
        attributes.insert(Attribute {
            id,
            value: join_value(child.value, child.value_type)?,
            children: decode_children(child.children)?,
        });
    }
    Ok(attributes)
}

fn encode_owner(owner: &Owner) -> OwnerXml {
    OwnerXml {
        name: Some(owner.name.clone()),
        owner_type: Some(owner.owner_type.as_str().to_string()),
    }
}

/// An owner missing its name or type is treated as no owner.
fn decode_owner(owner: OwnerXml) -> Option<Owner> {
    let name = owner.name?;
    let owner_type = match owner.owner_type?.parse::<OwnerType>() {
        Ok(t) => t,
        Err(e) => {
            warn!(owner = %name, error = %e, "ignoring owner with unknown type");
            return None;
        }
    };
    Some(Owner::new(name, owner_type))
}

fn encode_security(element: &Element) -> Option<SecurityXml> {
    let entries = element.owner_permissions();
    if element.owner().is_none() && entries.is_empty() {
        return None;
    }
    let owner_permissions_list = (!entries.is_empty()).then(|| OwnerPermissionsListXml {
        entries: entries
            .iter()
            .map(|entry| OwnerPermissionsXml {
                owner: Some(encode_owner(&entry.owner)),
                permissions: Some(PermissionsXml {
                    permission: entry
                        .permissions
                        .iter()
                        .map(|p| p.as_str().to_string())
                        .collect(),
                }),
            })
            .collect(),
    });
    Some(SecurityXml {
        owner: element.owner().map(encode_owner),
        owner_permissions_list,
    })
}

fn decode_owner_permissions(entries: Vec<OwnerPermissionsXml>) -> CodecResult<Vec<OwnerPermissions>> {
    let mut decoded = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(owner) = entry.owner.and_then(decode_owner) else {
            continue;
        };
        let permissions = entry
            .permissions
            .map(|p| p.permission)
            .unwrap_or_default()
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<Result<Vec<_>, _>>()?;
        decoded.push(OwnerPermissions::new(owner, permissions));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metastore_types::AttributeNode;
    use proptest::prelude::*;

    fn customer() -> Element {
        let mut element = Element::new("Customer")
            .with_id("cust")
            .with_child(Attribute::new("physical_table").with_value("DIM_CUSTOMER"))
            .with_child(
                Attribute::new("columns")
                    .with_child(Attribute::new("count").with_value(3i32))
                    .with_child(Attribute::new("rows").with_value(9_000_000_000i64))
                    .with_child(Attribute::new("ratio").with_value(0.25f64)),
            );
        element.set_owner(Some(Owner::user("joe")));
        element.add_owner_permissions(OwnerPermissions::new(
            Owner::role("admin"),
            vec![Permission::Read, Permission::Update, Permission::Delete],
        ));
        element
    }

    #[test]
    fn element_roundtrip_preserves_tree_and_security() {
        let element = customer();
        let xml = XmlCodec::encode_element(&element).unwrap();
        let decoded = XmlCodec::decode_element(&xml).unwrap();
        assert_eq!(decoded, element);
    }

    #[test]
    fn element_layout_uses_expected_tags() {
        let xml = XmlCodec::encode_element(&customer()).unwrap();
        assert!(xml.starts_with("<?xml"));
        for tag in [
            "<element>",
            "<children>",
            "<child>",
            "<security>",
            "<owner-permissions-list>",
            "<type>integer</type>",
            "<type>USER</type>",
        ] {
            assert!(xml.contains(tag), "missing {tag} in {xml}");
        }
    }

    #[test]
    fn string_three_stays_a_string_and_integer_stays_integer() {
        let element = Element::new("e")
            .with_child(Attribute::new("s").with_value("3"))
            .with_child(Attribute::new("i").with_value(3i32));
        let decoded =
            XmlCodec::decode_element(&XmlCodec::encode_element(&element).unwrap()).unwrap();
        assert_eq!(
            decoded.child("s").unwrap().value,
            Some(AttributeValue::String("3".into()))
        );
        assert_eq!(
            decoded.child("i").unwrap().value,
            Some(AttributeValue::Integer(3))
        );
    }

    #[test]
    fn element_type_roundtrip() {
        let t = ElementType::new("pentaho", "Dimension")
            .with_id("dim1")
            .with_description("A dimension & its <levels>");
        let xml = XmlCodec::encode_element_type(&t).unwrap();
        assert!(xml.contains("<data-type>"));
        let decoded = XmlCodec::decode_element_type(&xml).unwrap();
        assert_eq!(decoded.name, "Dimension");
        assert_eq!(decoded.description, t.description);
        assert_eq!(decoded.id, None);
        assert_eq!(decoded.namespace, None);
    }

    #[test]
    fn legacy_element_without_optional_nodes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<element>
  <name>Old</name>
  <children>
    <child><id>plain</id><value>hello</value></child>
    <child><value>orphan</value></child>
  </children>
</element>"#;
        let element = XmlCodec::decode_element(xml).unwrap();
        assert_eq!(element.id, None);
        assert_eq!(element.name.as_deref(), Some("Old"));
        assert!(element.owner().is_none());
        assert!(element.owner_permissions().is_empty());
        assert_eq!(element.children.len(), 1);
        assert_eq!(
            element.child("plain").unwrap().value,
            Some(AttributeValue::String("hello".into()))
        );
    }

    #[test]
    fn surrounding_whitespace_is_kept() {
        let element = Element::new("e")
            .with_child(Attribute::new("pad").with_value("  padded  "))
            .with_child(Attribute::new("blank").with_value("   "))
            .with_child(Attribute::new("tabs").with_value("\tleft\nright\t"))
            .with_child(Attribute::new("empty").with_value(""));
        let xml = XmlCodec::encode_element(&element).unwrap();
        let decoded = XmlCodec::decode_element(&xml).unwrap();
        assert_eq!(
            decoded.child("pad").unwrap().value,
            Some(AttributeValue::String("  padded  ".into()))
        );
        assert_eq!(
            decoded.child("blank").unwrap().value,
            Some(AttributeValue::String("   ".into()))
        );
        assert_eq!(decoded, element);
    }

    #[test]
    fn indentation_between_elements_is_ignored() {
        let xml = "<element>\n  <name> Spaced </name>\n  <children>\n    <child>\n      <id>k</id>\n      <value>v</value>\n    </child>\n  </children>\n</element>\n";
        let element = XmlCodec::decode_element(xml).unwrap();
        assert_eq!(element.name.as_deref(), Some(" Spaced "));
        assert_eq!(
            element.child("k").unwrap().value,
            Some(AttributeValue::String("v".into()))
        );
    }

    #[test]
    fn legacy_element_type_without_description() {
        let t = XmlCodec::decode_element_type("<data-type><name>T</name></data-type>").unwrap();
        assert_eq!(t.name, "T");
        assert!(t.description.is_none());
    }

    #[test]
    fn incomplete_owner_is_dropped() {
        let xml = "<element><name>e</name><security><owner><name>joe</name></owner></security></element>";
        let element = XmlCodec::decode_element(xml).unwrap();
        assert!(element.owner().is_none());
    }

    #[test]
    fn bad_numeric_value_is_an_error() {
        let xml = "<element><name>e</name><children><child><id>n</id><value>x</value><type>integer</type></child></children></element>";
        assert!(matches!(
            XmlCodec::decode_element(xml),
            Err(CodecError::InvalidContent(_))
        ));
    }

    #[test]
    fn garbage_is_a_deserialization_error() {
        assert!(matches!(
            XmlCodec::decode_element("<element><name>unterminated"),
            Err(CodecError::Deserialization(_))
        ));
    }

    fn value_strategy() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            "[ \t\n]{0,3}[a-zA-Z0-9_&< ]{0,12}[ \t\n]{0,3}".prop_map(AttributeValue::String),
            any::<i32>().prop_map(AttributeValue::Integer),
            any::<i64>().prop_map(AttributeValue::Long),
            (-1.0e12f64..1.0e12f64).prop_map(AttributeValue::Double),
        ]
    }

    proptest! {
        #[test]
        fn typed_values_survive_encoding(values in prop::collection::vec(value_strategy(), 1..8)) {
            let mut element = Element::new("p");
            for (i, v) in values.iter().enumerate() {
                element.add_child(Attribute {
                    id: format!("a{i}"),
                    value: Some(v.clone()),
                    children: Attributes::new(),
                });
            }
            let xml = XmlCodec::encode_element(&element).unwrap();
            let decoded = XmlCodec::decode_element(&xml).unwrap();
            prop_assert_eq!(decoded, element);
        }
    }
}
