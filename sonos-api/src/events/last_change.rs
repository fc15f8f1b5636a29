//! Typed LastChange documents.
//!
//! AVTransport, RenderingControl and Queue batch their state variables into a
//! single `LastChange` property whose value is itself an XML document:
//!
//! ```xml
//! <Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/">
//!   <InstanceID val="0">
//!     <TransportState val="PLAYING"/>
//!     <CurrentTrackURI val="x-sonos-spotify:..."/>
//!   </InstanceID>
//! </Event>
//! ```
//!
//! Only the variables that changed are present, so every field is optional.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::didl::DidlLite;
use super::xml_utils::{self, value_of, ChannelValue, ValueAttribute};
use crate::error::Result;

/// AVTransport `LastChange` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AVTransportLastChange {
    #[serde(rename = "InstanceID", default)]
    pub instance: AVTransportInstance,
}

/// State variables of one AVTransport instance (Sonos only uses instance 0)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AVTransportInstance {
    #[serde(rename = "@val", default)]
    pub id: String,
    #[serde(default)]
    pub transport_state: Option<ValueAttribute>,
    #[serde(default)]
    pub current_play_mode: Option<ValueAttribute>,
    #[serde(default)]
    pub current_crossfade_mode: Option<ValueAttribute>,
    #[serde(default)]
    pub number_of_tracks: Option<ValueAttribute>,
    #[serde(default)]
    pub current_track: Option<ValueAttribute>,
    #[serde(default)]
    pub current_section: Option<ValueAttribute>,
    #[serde(rename = "CurrentTrackURI", default)]
    pub current_track_uri: Option<ValueAttribute>,
    #[serde(default)]
    pub current_track_duration: Option<ValueAttribute>,
    #[serde(default)]
    pub current_track_meta_data: Option<ValueAttribute>,
    #[serde(rename = "NextTrackURI", default)]
    pub next_track_uri: Option<ValueAttribute>,
    #[serde(default)]
    pub next_track_meta_data: Option<ValueAttribute>,
    #[serde(rename = "EnqueuedTransportURI", default)]
    pub enqueued_transport_uri: Option<ValueAttribute>,
    #[serde(rename = "EnqueuedTransportURIMetaData", default)]
    pub enqueued_transport_uri_meta_data: Option<ValueAttribute>,
    #[serde(default)]
    pub playback_storage_medium: Option<ValueAttribute>,
    #[serde(rename = "AVTransportURI", default)]
    pub av_transport_uri: Option<ValueAttribute>,
    #[serde(rename = "AVTransportURIMetaData", default)]
    pub av_transport_uri_meta_data: Option<ValueAttribute>,
    #[serde(rename = "NextAVTransportURI", default)]
    pub next_av_transport_uri: Option<ValueAttribute>,
    #[serde(rename = "NextAVTransportURIMetaData", default)]
    pub next_av_transport_uri_meta_data: Option<ValueAttribute>,
    #[serde(default)]
    pub current_transport_actions: Option<ValueAttribute>,
    #[serde(default)]
    pub current_valid_play_modes: Option<ValueAttribute>,
    #[serde(rename = "DirectControlClientID", default)]
    pub direct_control_client_id: Option<ValueAttribute>,
    #[serde(default)]
    pub direct_control_is_suspended: Option<ValueAttribute>,
    #[serde(rename = "DirectControlAccountID", default)]
    pub direct_control_account_id: Option<ValueAttribute>,
    #[serde(default)]
    pub transport_status: Option<ValueAttribute>,
    #[serde(default)]
    pub sleep_timer_generation: Option<ValueAttribute>,
    #[serde(default)]
    pub alarm_running: Option<ValueAttribute>,
    #[serde(default)]
    pub snooze_running: Option<ValueAttribute>,
    #[serde(default)]
    pub restart_pending: Option<ValueAttribute>,
    #[serde(default)]
    pub transport_play_speed: Option<ValueAttribute>,
    #[serde(default)]
    pub current_media_duration: Option<ValueAttribute>,
    #[serde(default)]
    pub record_storage_medium: Option<ValueAttribute>,
    #[serde(default)]
    pub possible_playback_storage_media: Option<ValueAttribute>,
    #[serde(default)]
    pub possible_record_storage_media: Option<ValueAttribute>,
    #[serde(default)]
    pub record_medium_write_status: Option<ValueAttribute>,
    #[serde(default)]
    pub current_record_quality_mode: Option<ValueAttribute>,
    #[serde(default)]
    pub possible_record_quality_modes: Option<ValueAttribute>,
}

impl AVTransportLastChange {
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml_utils::parse(xml)
    }

    pub fn transport_state(&self) -> Option<&str> {
        value_of(&self.instance.transport_state)
    }

    pub fn current_track_uri(&self) -> Option<&str> {
        value_of(&self.instance.current_track_uri)
    }

    /// DIDL-Lite metadata of the current track, if present and well formed.
    pub fn current_track_metadata(&self) -> Option<DidlLite> {
        metadata(&self.instance.current_track_meta_data)
    }

    /// DIDL-Lite metadata of the next track, if present and well formed.
    pub fn next_track_metadata(&self) -> Option<DidlLite> {
        metadata(&self.instance.next_track_meta_data)
    }
}

fn metadata(attr: &Option<ValueAttribute>) -> Option<DidlLite> {
    value_of(attr)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| DidlLite::from_xml(raw).ok())
}

impl fmt::Display for AVTransportLastChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = &self.instance;
        let show = |attr: &Option<ValueAttribute>| value_of(attr).unwrap_or("").to_string();

        writeln!(f, "TransportState: {}", show(&i.transport_state))?;
        writeln!(f, "CurrentPlayMode: {}", show(&i.current_play_mode))?;
        writeln!(f, "NumberOfTracks: {}", show(&i.number_of_tracks))?;
        writeln!(f, "CurrentTrack: {}", show(&i.current_track))?;
        writeln!(f, "CurrentTrackDuration: {}", show(&i.current_track_duration))?;
        writeln!(f, "CurrentTrackURI: {}", show(&i.current_track_uri))?;
        if let Some(didl) = self.current_track_metadata() {
            write_track(f, "CurrentTrackMetaData", &didl)?;
        }
        writeln!(f, "NextTrackURI: {}", show(&i.next_track_uri))?;
        if let Some(didl) = self.next_track_metadata() {
            write_track(f, "NextTrackMetaData", &didl)?;
        }
        Ok(())
    }
}

fn write_track(f: &mut fmt::Formatter<'_>, label: &str, didl: &DidlLite) -> fmt::Result {
    let Some(item) = didl.items.first() else {
        return Ok(());
    };
    let fields = [
        ("Title", &item.title),
        ("Album", &item.album),
        ("Creator", &item.creator),
        ("AlbumArtURI", &item.album_art_uri),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            writeln!(f, "{}>{}: {}", label, name, value)?;
        }
    }
    Ok(())
}

/// RenderingControl `LastChange` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RenderingControlLastChange {
    #[serde(rename = "InstanceID", default)]
    pub instance: RenderingControlInstance,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderingControlInstance {
    #[serde(rename = "@val", default)]
    pub id: String,
    #[serde(default)]
    pub volume: Vec<ChannelValue>,
    #[serde(default)]
    pub mute: Vec<ChannelValue>,
    #[serde(default)]
    pub loudness: Vec<ChannelValue>,
    #[serde(default)]
    pub bass: Option<ValueAttribute>,
    #[serde(default)]
    pub treble: Option<ValueAttribute>,
    #[serde(default)]
    pub output_fixed: Option<ValueAttribute>,
    #[serde(default)]
    pub speaker_size: Option<ValueAttribute>,
    #[serde(default)]
    pub sub_gain: Option<ValueAttribute>,
    #[serde(default)]
    pub sub_crossover: Option<ValueAttribute>,
    #[serde(default)]
    pub sub_polarity: Option<ValueAttribute>,
    #[serde(default)]
    pub sub_enabled: Option<ValueAttribute>,
    #[serde(default)]
    pub sonar_enabled: Option<ValueAttribute>,
    #[serde(default)]
    pub sonar_calibration_available: Option<ValueAttribute>,
    #[serde(default)]
    pub preset_name_list: Option<ValueAttribute>,
}

impl RenderingControlLastChange {
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml_utils::parse(xml)
    }

    /// Volume reported for `channel` (`Master`, `LF`, `RF`).
    pub fn volume(&self, channel: &str) -> Option<u16> {
        find_channel(&self.instance.volume, channel).and_then(|v| v.parse().ok())
    }

    /// Mute state reported for `channel`.
    pub fn mute(&self, channel: &str) -> Option<bool> {
        find_channel(&self.instance.mute, channel).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

fn find_channel<'a>(values: &'a [ChannelValue], channel: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|v| v.channel == channel)
        .map(|v| v.val.as_str())
}

/// Queue `LastChange` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueueLastChange {
    #[serde(rename = "QueueID", default)]
    pub queues: Vec<QueueInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueueInstance {
    #[serde(rename = "@val", default)]
    pub id: String,
    #[serde(rename = "UpdateID", default)]
    pub update_id: Option<ValueAttribute>,
    #[serde(rename = "Curated", default)]
    pub curated: Option<ValueAttribute>,
    #[serde(rename = "QueueOwnerID", default)]
    pub queue_owner_id: Option<ValueAttribute>,
}

impl QueueLastChange {
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml_utils::parse(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVT_LAST_CHANGE: &str = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/"><InstanceID val="0"><TransportState val="PLAYING"/><CurrentPlayMode val="NORMAL"/><NumberOfTracks val="12"/><CurrentTrack val="3"/><CurrentTrackDuration val="0:03:57"/><CurrentTrackURI val="x-sonos-http:track.mp3"/><CurrentTrackMetaData val="&lt;DIDL-Lite xmlns:dc=&quot;http://purl.org/dc/elements/1.1/&quot; xmlns:upnp=&quot;urn:schemas-upnp-org:metadata-1-0/upnp/&quot;&gt;&lt;item id=&quot;-1&quot; parentID=&quot;-1&quot;&gt;&lt;dc:title&gt;Blue in Green&lt;/dc:title&gt;&lt;dc:creator&gt;Miles Davis&lt;/dc:creator&gt;&lt;upnp:album&gt;Kind of Blue&lt;/upnp:album&gt;&lt;/item&gt;&lt;/DIDL-Lite&gt;"/><r:NextTrackURI val=""/><AVTransportURI val="x-rincon-queue:RINCON_000E58CDCA4001400#0"/></InstanceID></Event>"#;

    #[test]
    fn test_av_transport_last_change() {
        let event = AVTransportLastChange::from_xml(AVT_LAST_CHANGE).unwrap();

        assert_eq!(event.instance.id, "0");
        assert_eq!(event.transport_state(), Some("PLAYING"));
        assert_eq!(event.current_track_uri(), Some("x-sonos-http:track.mp3"));
        assert_eq!(value_of(&event.instance.number_of_tracks), Some("12"));
        assert_eq!(
            value_of(&event.instance.av_transport_uri),
            Some("x-rincon-queue:RINCON_000E58CDCA4001400#0")
        );
        assert_eq!(value_of(&event.instance.next_track_uri), Some(""));
        assert!(event.instance.current_section.is_none());
    }

    #[test]
    fn test_av_transport_track_metadata() {
        let event = AVTransportLastChange::from_xml(AVT_LAST_CHANGE).unwrap();

        let didl = event.current_track_metadata().unwrap();
        let item = &didl.items[0];
        assert_eq!(item.title.as_deref(), Some("Blue in Green"));
        assert_eq!(item.creator.as_deref(), Some("Miles Davis"));
        assert_eq!(item.album.as_deref(), Some("Kind of Blue"));
        assert!(event.next_track_metadata().is_none());
    }

    #[test]
    fn test_av_transport_display() {
        let event = AVTransportLastChange::from_xml(AVT_LAST_CHANGE).unwrap();
        let text = event.to_string();

        assert!(text.contains("TransportState: PLAYING\n"));
        assert!(text.contains("CurrentTrackMetaData>Title: Blue in Green\n"));
        assert!(text.contains("CurrentTrackMetaData>Album: Kind of Blue\n"));
        assert!(!text.contains("NextTrackMetaData>"));
    }

    #[test]
    fn test_rendering_control_last_change() {
        let xml = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/"><InstanceID val="0"><Volume channel="Master" val="24"/><Volume channel="LF" val="100"/><Volume channel="RF" val="100"/><Mute channel="Master" val="0"/><Mute channel="LF" val="0"/><Mute channel="RF" val="0"/><Bass val="2"/><Treble val="-1"/><Loudness channel="Master" val="1"/><OutputFixed val="0"/><SpeakerSize val="3"/><SubEnabled val="1"/><PresetNameList val="FactoryDefaults"/></InstanceID></Event>"#;

        let event = RenderingControlLastChange::from_xml(xml).unwrap();

        assert_eq!(event.volume("Master"), Some(24));
        assert_eq!(event.volume("LF"), Some(100));
        assert_eq!(event.volume("Sub"), None);
        assert_eq!(event.mute("Master"), Some(false));
        assert_eq!(event.instance.volume.len(), 3);
        assert_eq!(value_of(&event.instance.bass), Some("2"));
        assert_eq!(value_of(&event.instance.treble), Some("-1"));
        assert_eq!(event.instance.loudness[0].val, "1");
        assert_eq!(value_of(&event.instance.preset_name_list), Some("FactoryDefaults"));
        assert!(event.instance.sub_gain.is_none());
    }

    #[test]
    fn test_rendering_control_partial_change() {
        let xml = r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/RCS/"><InstanceID val="0"><Mute channel="Master" val="1"/></InstanceID></Event>"#;

        let event = RenderingControlLastChange::from_xml(xml).unwrap();
        assert_eq!(event.mute("Master"), Some(true));
        assert!(event.instance.volume.is_empty());
    }

    #[test]
    fn test_queue_last_change() {
        let xml = r#"<Event xmlns="urn:schemas-sonos-com:metadata-1-0/Queue/"><QueueID val="0"><UpdateID val="41"/><Curated val="0"/></QueueID><QueueID val="1"><UpdateID val="7"/><QueueOwnerID val="owner"/></QueueID></Event>"#;

        let event = QueueLastChange::from_xml(xml).unwrap();
        assert_eq!(event.queues.len(), 2);
        assert_eq!(event.queues[0].id, "0");
        assert_eq!(value_of(&event.queues[0].update_id), Some("41"));
        assert_eq!(value_of(&event.queues[1].queue_owner_id), Some("owner"));
        assert!(event.queues[1].curated.is_none());
    }

    #[test]
    fn test_malformed_last_change() {
        assert!(AVTransportLastChange::from_xml("<Event><InstanceID val=\"0\">").is_err());
        assert!(QueueLastChange::from_xml("not xml at all <").is_err());
    }
}
