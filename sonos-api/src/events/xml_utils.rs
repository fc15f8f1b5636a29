//! XML helpers shared by the event decoders.
//!
//! UPnP documents mix default namespaces (`xmlns="..."` on LastChange roots) with
//! prefixed ones (`e:property`, `dc:title`, `upnp:album`). Serde structs in this
//! crate are written against local names only, so every nested document goes
//! through [`strip_namespaces`] before deserialization.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event as XmlEvent};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Parse an XML document into `T` after stripping namespace prefixes.
pub fn parse<T: DeserializeOwned>(xml: &str) -> Result<T> {
    let stripped = strip_namespaces(xml)?;
    quick_xml::de::from_str(&stripped)
        .map_err(|e| ApiError::ParseError(format!("XML deserialization failed: {}", e)))
}

/// Rewrite element and attribute names to their local part and drop `xmlns`
/// declarations. Text and attribute values are copied through unchanged, so
/// escaped nested documents stay escaped.
///
/// Input: `<e:propertyset xmlns:e="urn:x"><e:property>v</e:property></e:propertyset>`
/// Output: `<propertyset><property>v</property></propertyset>`
pub fn strip_namespaces(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let event = reader.read_event().map_err(parse_error)?;
        let rewritten = match event {
            XmlEvent::Start(start) => XmlEvent::Start(local_start(&start)?),
            XmlEvent::Empty(start) => XmlEvent::Empty(local_start(&start)?),
            XmlEvent::End(end) => XmlEvent::End(BytesEnd::new(local_str(end.name())?)),
            XmlEvent::Eof => break,
            other => other,
        };
        writer.write_event(rewritten).map_err(parse_error)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| ApiError::ParseError(format!("Invalid UTF-8 after namespace stripping: {}", e)))
}

fn local_start(start: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let mut local = BytesStart::new(local_str(start.name())?);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ApiError::ParseError(format!("Malformed attribute: {}", e)))?;
        let is_declaration = attr.key.as_ref() == b"xmlns"
            || attr.key.prefix().map_or(false, |p| p.as_ref() == b"xmlns");
        if is_declaration {
            continue;
        }

        local.push_attribute(Attribute {
            key: QName(attr.key.local_name().into_inner()),
            value: attr.value,
        });
    }

    Ok(local)
}

fn local_str(name: QName<'_>) -> Result<String> {
    std::str::from_utf8(name.local_name().into_inner())
        .map(str::to_owned)
        .map_err(|e| ApiError::ParseError(format!("Invalid UTF-8 in element name: {}", e)))
}

pub(crate) fn parse_error(e: quick_xml::Error) -> ApiError {
    ApiError::ParseError(e.to_string())
}

/// Represents an XML element with a `val` attribute.
///
/// LastChange documents encode each state variable as an empty element:
/// ```xml
/// <TransportState val="PLAYING"/>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValueAttribute {
    #[serde(rename = "@val", default)]
    pub val: String,
}

/// A `val` element scoped to an audio channel, e.g. `<Volume channel="Master" val="20"/>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelValue {
    #[serde(rename = "@channel", default)]
    pub channel: String,
    #[serde(rename = "@val", default)]
    pub val: String,
}

/// Borrow the value of an optional `val` element.
pub fn value_of(attr: &Option<ValueAttribute>) -> Option<&str> {
    attr.as_ref().map(|a| a.val.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_namespaces_basic() {
        let input = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property>test</e:property></e:propertyset>"#;
        let expected = r#"<propertyset><property>test</property></propertyset>"#;
        assert_eq!(strip_namespaces(input).unwrap(), expected);
    }

    #[test]
    fn test_strip_namespaces_keeps_attributes() {
        let input = r#"<dc:title id="1" r:meta="x">Song</dc:title>"#;
        let expected = r#"<title id="1" meta="x">Song</title>"#;
        assert_eq!(strip_namespaces(input).unwrap(), expected);
    }

    #[test]
    fn test_strip_namespaces_drops_default_namespace() {
        let input = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"/></Event>"#;
        let expected = r#"<Event><InstanceID val="0"/></Event>"#;
        assert_eq!(strip_namespaces(input).unwrap(), expected);
    }

    #[test]
    fn test_strip_namespaces_preserves_escaped_values() {
        let input = r#"<r:x val="&lt;DIDL-Lite&gt;&amp;"/>"#;
        let expected = r#"<x val="&lt;DIDL-Lite&gt;&amp;"/>"#;
        assert_eq!(strip_namespaces(input).unwrap(), expected);
    }

    #[test]
    fn test_strip_namespaces_rejects_mismatched_tags() {
        assert!(strip_namespaces("<a><b></a>").is_err());
    }

    #[test]
    fn test_value_attribute_deserialize() {
        #[derive(Debug, Deserialize)]
        struct Root {
            #[serde(rename = "TransportState")]
            transport_state: ValueAttribute,
            #[serde(rename = "Missing", default)]
            missing: Option<ValueAttribute>,
        }

        let result: Root = parse(r#"<Root><TransportState val="PLAYING"/></Root>"#).unwrap();
        assert_eq!(result.transport_state.val, "PLAYING");
        assert!(result.missing.is_none());
        assert_eq!(value_of(&result.missing), None);
    }

    #[test]
    fn test_value_attribute_without_val() {
        #[derive(Debug, Deserialize)]
        struct Root {
            #[serde(rename = "TransportState")]
            transport_state: ValueAttribute,
        }

        let result: Root = parse(r#"<Root><TransportState/></Root>"#).unwrap();
        assert_eq!(result.transport_state.val, "");
    }
}
