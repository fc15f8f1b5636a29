//! Raw GENA property sets.
//!
//! A `NOTIFY` body looks like:
//!
//! ```xml
//! <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
//!   <e:property><LastChange>&lt;Event ...&gt;</LastChange></e:property>
//!   <e:property><GroupVolume>20</GroupVolume></e:property>
//! </e:propertyset>
//! ```
//!
//! Each `<e:property>` wraps exactly one state variable. The variable's text is
//! unescaped here; nested documents are decoded later by the dispatcher.

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

use super::xml_utils::parse_error;
use crate::error::{ApiError, Result};
use crate::Service;

/// One state variable reported in a `NOTIFY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Service whose event endpoint received the notification
    pub service: Service,
    /// State variable name, e.g. `LastChange` or `GroupVolume`
    pub name: String,
    /// Unescaped text content
    pub value: String,
}

/// All properties carried by one notification, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    properties: Vec<Property>,
}

// Element depth of the state variable: propertyset > property > variable.
const VARIABLE_DEPTH: usize = 3;

impl PropertySet {
    /// Parse a property-set document received on `service`'s event endpoint.
    pub fn parse(service: Service, body: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(body);
        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut current: Option<(String, String)> = None;
        let mut properties = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).map_err(parse_error)? {
                XmlEvent::Start(start) => {
                    depth += 1;
                    if depth == VARIABLE_DEPTH {
                        current = Some((local_name(start.local_name().as_ref())?, String::new()));
                    }
                }
                XmlEvent::Empty(start) => {
                    if depth + 1 == VARIABLE_DEPTH {
                        properties.push(Property {
                            service,
                            name: local_name(start.local_name().as_ref())?,
                            value: String::new(),
                        });
                    }
                }
                XmlEvent::Text(text) => {
                    if let Some((_, value)) = current.as_mut().filter(|_| depth == VARIABLE_DEPTH) {
                        let unescaped = text.unescape().map_err(parse_error)?;
                        value.push_str(&unescaped);
                    }
                }
                XmlEvent::CData(data) => {
                    if let Some((_, value)) = current.as_mut().filter(|_| depth == VARIABLE_DEPTH) {
                        value.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                XmlEvent::End(_) => {
                    if depth == VARIABLE_DEPTH {
                        if let Some((name, value)) = current.take() {
                            properties.push(Property { service, name, value });
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                XmlEvent::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if depth != 0 {
            return Err(ApiError::ParseError(
                "Property set ended before all elements were closed".to_string(),
            ));
        }

        Ok(Self { properties })
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.properties.iter()
    }
}

impl IntoIterator for PropertySet {
    type Item = Property;
    type IntoIter = std::vec::IntoIter<Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.into_iter()
    }
}

fn local_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| ApiError::ParseError(format!("Invalid UTF-8 in variable name: {}", e)))
}
