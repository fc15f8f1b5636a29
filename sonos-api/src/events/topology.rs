//! ZoneGroupTopology documents.
//!
//! The same `ZoneGroupState` document arrives two ways: as an evented state
//! variable and as the `ZoneGroupState` output of `GetZoneGroupState`. Newer
//! firmware wraps the groups in `<ZoneGroupState><ZoneGroups>`; older firmware
//! sends a bare `<ZoneGroups>` root. Both shapes decode to [`ZoneGroupState`].

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use super::xml_utils::{self, parse_error};
use crate::error::{ApiError, Result};

/// Group layout of the household
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneGroupState {
    #[serde(rename = "ZoneGroups", default)]
    pub zone_groups: ZoneGroups,
    #[serde(rename = "VanishedDevices", default)]
    pub vanished_devices: VanishedDevices,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneGroups {
    #[serde(rename = "ZoneGroup", default)]
    pub groups: Vec<ZoneGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneGroup {
    /// Bare identifier (`RINCON_...`) of the member that coordinates the group
    #[serde(rename = "@Coordinator", default)]
    pub coordinator: String,
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "ZoneGroupMember", default)]
    pub members: Vec<ZoneGroupMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneGroupMember {
    #[serde(rename = "@UUID", default)]
    pub uuid: String,
    #[serde(rename = "@Location", default)]
    pub location: String,
    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,
    #[serde(rename = "@Icon", default)]
    pub icon: String,
    #[serde(rename = "@Configuration", default)]
    pub configuration: String,
    #[serde(rename = "@SoftwareVersion", default)]
    pub software_version: String,
    #[serde(rename = "@SWGen", default)]
    pub sw_gen: String,
    #[serde(rename = "@MinCompatibleVersion", default)]
    pub min_compatible_version: String,
    #[serde(rename = "@BootSeq", default)]
    pub boot_seq: String,
    #[serde(rename = "@WirelessMode", default)]
    pub wireless_mode: String,
    #[serde(rename = "@ChannelFreq", default)]
    pub channel_freq: String,
    #[serde(rename = "@WifiEnabled", default)]
    pub wifi_enabled: String,
    #[serde(rename = "@EthLink", default)]
    pub eth_link: String,
    #[serde(rename = "@MicEnabled", default)]
    pub mic_enabled: String,
    #[serde(rename = "@AirPlayEnabled", default)]
    pub air_play_enabled: String,
    #[serde(rename = "@IdleState", default)]
    pub idle_state: String,
    #[serde(rename = "@Invisible", default)]
    pub invisible: String,
    /// Bonded surround and sub speakers
    #[serde(rename = "Satellite", default)]
    pub satellites: Vec<ZoneGroupMember>,
}

impl ZoneGroupMember {
    pub fn is_invisible(&self) -> bool {
        self.invisible == "1"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VanishedDevices {
    #[serde(rename = "Device", default)]
    pub devices: Vec<VanishedDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VanishedDevice {
    #[serde(rename = "@UUID", default)]
    pub uuid: String,
    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,
    #[serde(rename = "@Reason", default)]
    pub reason: String,
}

impl ZoneGroupState {
    /// Decode either root shape.
    pub fn from_xml(xml: &str) -> Result<Self> {
        match root_element(xml)?.as_str() {
            "ZoneGroups" => Ok(Self {
                zone_groups: xml_utils::parse(xml)?,
                vanished_devices: VanishedDevices::default(),
            }),
            _ => xml_utils::parse(xml),
        }
    }

    pub fn groups(&self) -> &[ZoneGroup] {
        &self.zone_groups.groups
    }

    /// Coordinator member of every group.
    pub fn coordinators(&self) -> impl Iterator<Item = &ZoneGroupMember> {
        self.groups().iter().filter_map(ZoneGroup::coordinator_member)
    }

    /// True when the device with `udn` (`uuid:RINCON_...`) coordinates a group.
    pub fn is_coordinator(&self, udn: &str) -> bool {
        self.groups().iter().any(|group| {
            udn.strip_prefix("uuid:")
                .map_or(false, |id| !id.is_empty() && id == group.coordinator)
        })
    }
}

impl ZoneGroup {
    pub fn coordinator_member(&self) -> Option<&ZoneGroupMember> {
        self.members.iter().find(|m| m.uuid == self.coordinator)
    }
}

/// Software update announcement from ZoneGroupTopology
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AvailableSoftwareUpdate {
    #[serde(rename = "@Type", default)]
    pub update_type: String,
    #[serde(rename = "@Version", default)]
    pub version: String,
    #[serde(rename = "@UpdateURL", default)]
    pub update_url: String,
    #[serde(rename = "@DownloadSize", default)]
    pub download_size: String,
    #[serde(rename = "@ManifestURL", default)]
    pub manifest_url: String,
    #[serde(rename = "@Swgen", default)]
    pub swgen: String,
    #[serde(rename = "@LatestSwgen", default)]
    pub latest_swgen: String,
    #[serde(rename = "@ManifestRevision", default)]
    pub manifest_revision: String,
}

impl AvailableSoftwareUpdate {
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml_utils::parse(xml)
    }
}

fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(parse_error)? {
            XmlEvent::Start(start) | XmlEvent::Empty(start) => {
                return std::str::from_utf8(start.local_name().into_inner())
                    .map(str::to_owned)
                    .map_err(|e| ApiError::ParseError(format!("Invalid UTF-8 in root element: {}", e)));
            }
            XmlEvent::Eof => {
                return Err(ApiError::ParseError("Document has no root element".to_string()))
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const WRAPPED: &str = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_000E58CDCA4001400" ID="RINCON_000E58CDCA4001400:1"><ZoneGroupMember UUID="RINCON_000E58CDCA4001400" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Kitchen" SoftwareVersion="57.2-54070"/><ZoneGroupMember UUID="RINCON_000E58CDCA4002400" Location="http://192.168.1.11:1400/xml/device_description.xml" ZoneName="Kitchen" Invisible="1"/></ZoneGroup><ZoneGroup Coordinator="RINCON_B8E93700000001400" ID="RINCON_B8E93700000001400:7"><ZoneGroupMember UUID="RINCON_B8E93700000001400" Location="http://192.168.1.20:1400/xml/device_description.xml" ZoneName="Living Room"><Satellite UUID="RINCON_B8E93700000002400" ZoneName="Living Room" Invisible="1"/></ZoneGroupMember></ZoneGroup></ZoneGroups><VanishedDevices><Device UUID="RINCON_DEAD00000001400" ZoneName="Patio" Reason="powerOff"/></VanishedDevices></ZoneGroupState>"#;

    const BARE: &str = r#"<ZoneGroups><ZoneGroup Coordinator="RINCON_000E58CDCA4001400" ID="RINCON_000E58CDCA4001400:1"><ZoneGroupMember UUID="RINCON_000E58CDCA4001400" ZoneName="Kitchen"/></ZoneGroup></ZoneGroups>"#;

    #[test]
    fn test_wrapped_zone_group_state() {
        let state = ZoneGroupState::from_xml(WRAPPED).unwrap();

        assert_eq!(state.groups().len(), 2);
        let kitchen = &state.groups()[0];
        assert_eq!(kitchen.id, "RINCON_000E58CDCA4001400:1");
        assert_eq!(kitchen.members.len(), 2);
        assert!(kitchen.members[1].is_invisible());
        assert_eq!(kitchen.members[0].software_version, "57.2-54070");

        let living_room = &state.groups()[1];
        assert_eq!(living_room.members[0].satellites.len(), 1);

        assert_eq!(state.vanished_devices.devices.len(), 1);
        assert_eq!(state.vanished_devices.devices[0].reason, "powerOff");
    }

    #[test]
    fn test_bare_zone_groups_root() {
        let state = ZoneGroupState::from_xml(BARE).unwrap();
        assert_eq!(state.groups().len(), 1);
        assert_eq!(state.groups()[0].members[0].zone_name, "Kitchen");
        assert!(state.vanished_devices.devices.is_empty());
    }

    #[test]
    fn test_coordinators() {
        let state = ZoneGroupState::from_xml(WRAPPED).unwrap();
        let names: Vec<_> = state.coordinators().map(|m| m.zone_name.as_str()).collect();
        assert_eq!(names, vec!["Kitchen", "Living Room"]);
    }

    #[rstest]
    #[case("uuid:RINCON_000E58CDCA4001400", true)]
    #[case("uuid:RINCON_B8E93700000001400", true)]
    #[case("uuid:RINCON_000E58CDCA4002400", false)]
    #[case("RINCON_000E58CDCA4001400", false)]
    #[case("uuid:", false)]
    fn test_is_coordinator(#[case] udn: &str, #[case] expected: bool) {
        let state = ZoneGroupState::from_xml(WRAPPED).unwrap();
        assert_eq!(state.is_coordinator(udn), expected);
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(ZoneGroupState::from_xml("").is_err());
    }

    #[test]
    fn test_available_software_update() {
        let xml = r#"<UpdateItem xmlns="urn:schemas-rinconnetworks-com:update-1-0" Type="Software" Version="79.1-52020" UpdateURL="https://update.sonos.com/firmware" DownloadSize="0" ManifestURL="https://update.sonos.com/manifest" Swgen="2" LatestSwgen="2" ManifestRevision="3"/>"#;

        let update = AvailableSoftwareUpdate::from_xml(xml).unwrap();
        assert_eq!(update.update_type, "Software");
        assert_eq!(update.version, "79.1-52020");
        assert_eq!(update.swgen, "2");
        assert_eq!(update.manifest_revision, "3");
    }
}
