//! DIDL-Lite track metadata embedded in AVTransport events.

use serde::{Deserialize, Serialize};

use super::xml_utils;
use crate::error::Result;

/// DIDL-Lite root structure.
///
/// ```xml
/// <DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" ...>
///   <item id="-1" parentID="-1">
///     <dc:title>Song Title</dc:title>
///     <dc:creator>Artist Name</dc:creator>
///     <upnp:album>Album Name</upnp:album>
///     <res duration="0:03:58">uri</res>
///   </item>
/// </DIDL-Lite>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlLite {
    #[serde(rename = "item", default)]
    pub items: Vec<DidlItem>,
}

impl DidlLite {
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml_utils::parse(xml)
    }
}

/// One track in a DIDL-Lite document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DidlItem {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@parentID", default)]
    pub parent_id: String,
    #[serde(rename = "@restricted", default)]
    pub restricted: Option<String>,
    #[serde(rename = "res", default)]
    pub res: Option<DidlResource>,
    #[serde(rename = "albumArtURI", default)]
    pub album_art_uri: Option<String>,
    #[serde(rename = "class", default)]
    pub class: Option<String>,
    #[serde(rename = "title", default)]
    pub title: Option<String>,
    #[serde(rename = "creator", default)]
    pub creator: Option<String>,
    #[serde(rename = "album", default)]
    pub album: Option<String>,
    #[serde(rename = "streamContent", default)]
    pub stream_content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DidlResource {
    /// `H:MM:SS`
    #[serde(rename = "@duration", default)]
    pub duration: Option<String>,
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: Option<String>,
    #[serde(rename = "$text", default)]
    pub uri: Option<String>,
}
