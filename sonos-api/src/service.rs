use url::Url;

use crate::error::{ApiError, Result};
use crate::events::PropertySet;

/// Represents the different UPnP services exposed by Sonos devices
///
/// Every zone player exposes the same fixed set of services. Each variant knows
/// its control and event paths relative to the device root, see [`Service::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    /// AlarmClock service - alarms, time zone and time server settings
    AlarmClock,

    /// AudioIn service - line-in source state
    AudioIn,

    /// AVTransport service - Controls playback (play, pause, stop, seek, etc.)
    AVTransport,

    /// ConnectionManager service - protocol info of the media server
    ConnectionManager,

    /// ContentDirectory service - library, favorites and saved queues
    ContentDirectory,

    /// DeviceProperties service - zone name, icon, LEDs and hardware flags
    DeviceProperties,

    /// GroupManagement service - Manages speaker group membership operations
    GroupManagement,

    /// GroupRenderingControl service - Controls group-wide audio settings
    GroupRenderingControl,

    /// MusicServices service - list of configured streaming services
    MusicServices,

    /// QPlay service - Tencent QPlay; does not emit events
    QPlay,

    /// Queue service - the playback queue
    Queue,

    /// RenderingControl service - Controls audio rendering (volume, mute, etc.)
    RenderingControl,

    /// SystemProperties service - household-wide key/value store
    SystemProperties,

    /// VirtualLineIn service - streamed line-in sources
    VirtualLineIn,

    /// ZoneGroupTopology service - Manages speaker grouping and topology
    ZoneGroupTopology,
}

/// Contains the endpoint and service URI information for a UPnP service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Absolute path of the SOAP control endpoint
    pub control_path: &'static str,

    /// The UPnP service URI used in SOAP requests
    pub service_uri: &'static str,

    /// Absolute path of the GENA event endpoint
    pub event_path: &'static str,
}

/// Event path of the one service that accepts SUBSCRIBE but never notifies.
pub const UNSUPPORTED_EVENT_PATH: &str = "/QPlay/Event";

impl Service {
    /// Every service a zone player exposes.
    pub const ALL: [Service; 15] = [
        Service::AlarmClock,
        Service::AudioIn,
        Service::AVTransport,
        Service::ConnectionManager,
        Service::ContentDirectory,
        Service::DeviceProperties,
        Service::GroupManagement,
        Service::GroupRenderingControl,
        Service::MusicServices,
        Service::QPlay,
        Service::Queue,
        Service::RenderingControl,
        Service::SystemProperties,
        Service::VirtualLineIn,
        Service::ZoneGroupTopology,
    ];

    /// Get the name of this service as a string
    pub fn name(&self) -> &'static str {
        match self {
            Service::AlarmClock => "AlarmClock",
            Service::AudioIn => "AudioIn",
            Service::AVTransport => "AVTransport",
            Service::ConnectionManager => "ConnectionManager",
            Service::ContentDirectory => "ContentDirectory",
            Service::DeviceProperties => "DeviceProperties",
            Service::GroupManagement => "GroupManagement",
            Service::GroupRenderingControl => "GroupRenderingControl",
            Service::MusicServices => "MusicServices",
            Service::QPlay => "QPlay",
            Service::Queue => "Queue",
            Service::RenderingControl => "RenderingControl",
            Service::SystemProperties => "SystemProperties",
            Service::VirtualLineIn => "VirtualLineIn",
            Service::ZoneGroupTopology => "ZoneGroupTopology",
        }
    }

    /// Get the service information (paths and URI) for this service
    pub fn info(&self) -> ServiceInfo {
        let (control_path, event_path, service_uri) = match self {
            Service::AlarmClock => (
                "/AlarmClock/Control",
                "/AlarmClock/Event",
                "urn:schemas-upnp-org:service:AlarmClock:1",
            ),
            Service::AudioIn => (
                "/AudioIn/Control",
                "/AudioIn/Event",
                "urn:schemas-upnp-org:service:AudioIn:1",
            ),
            Service::AVTransport => (
                "/MediaRenderer/AVTransport/Control",
                "/MediaRenderer/AVTransport/Event",
                "urn:schemas-upnp-org:service:AVTransport:1",
            ),
            Service::ConnectionManager => (
                "/MediaServer/ConnectionManager/Control",
                "/MediaServer/ConnectionManager/Event",
                "urn:schemas-upnp-org:service:ConnectionManager:1",
            ),
            Service::ContentDirectory => (
                "/MediaServer/ContentDirectory/Control",
                "/MediaServer/ContentDirectory/Event",
                "urn:schemas-upnp-org:service:ContentDirectory:1",
            ),
            Service::DeviceProperties => (
                "/DeviceProperties/Control",
                "/DeviceProperties/Event",
                "urn:schemas-upnp-org:service:DeviceProperties:1",
            ),
            Service::GroupManagement => (
                "/GroupManagement/Control",
                "/GroupManagement/Event",
                "urn:schemas-upnp-org:service:GroupManagement:1",
            ),
            Service::GroupRenderingControl => (
                "/MediaRenderer/GroupRenderingControl/Control",
                "/MediaRenderer/GroupRenderingControl/Event",
                "urn:schemas-upnp-org:service:GroupRenderingControl:1",
            ),
            Service::MusicServices => (
                "/MusicServices/Control",
                "/MusicServices/Event",
                "urn:schemas-upnp-org:service:MusicServices:1",
            ),
            Service::QPlay => (
                "/QPlay/Control",
                UNSUPPORTED_EVENT_PATH,
                "urn:schemas-tencent-com:service:QPlay:1",
            ),
            Service::Queue => (
                "/MediaRenderer/Queue/Control",
                "/MediaRenderer/Queue/Event",
                "urn:schemas-sonos-com:service:Queue:1",
            ),
            Service::RenderingControl => (
                "/MediaRenderer/RenderingControl/Control",
                "/MediaRenderer/RenderingControl/Event",
                "urn:schemas-upnp-org:service:RenderingControl:1",
            ),
            Service::SystemProperties => (
                "/SystemProperties/Control",
                "/SystemProperties/Event",
                "urn:schemas-upnp-org:service:SystemProperties:1",
            ),
            Service::VirtualLineIn => (
                "/MediaRenderer/VirtualLineIn/Control",
                "/MediaRenderer/VirtualLineIn/Event",
                "urn:schemas-upnp-org:service:VirtualLineIn:1",
            ),
            Service::ZoneGroupTopology => (
                "/ZoneGroupTopology/Control",
                "/ZoneGroupTopology/Event",
                "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
            ),
        };

        ServiceInfo {
            control_path,
            service_uri,
            event_path,
        }
    }

    /// Whether a GENA subscription to this service produces notifications.
    pub fn supports_events(&self) -> bool {
        self.info().event_path != UNSUPPORTED_EVENT_PATH
    }

    /// Look up the service whose event path matches `path` exactly.
    pub fn from_event_path(path: &str) -> Option<Service> {
        Service::ALL
            .into_iter()
            .find(|service| service.info().event_path == path)
    }

    /// Scalar state variables this service is known to emit.
    ///
    /// Compound variables (`LastChange`, `ZoneGroupState`, `AvailableSoftwareUpdate`)
    /// are not listed here; they have their own decoding rules.
    pub fn evented_variables(&self) -> &'static [&'static str] {
        match self {
            Service::AlarmClock => &[
                "TimeZone",
                "TimeServer",
                "TimeGeneration",
                "AlarmListVersion",
                "DailyIndexRefreshTime",
                "TimeFormat",
                "DateFormat",
            ],
            Service::AudioIn => &[
                "AudioInputName",
                "Icon",
                "LineInConnected",
                "LeftLineInLevel",
                "RightLineInLevel",
                "Playing",
            ],
            Service::ConnectionManager => &[
                "SourceProtocolInfo",
                "SinkProtocolInfo",
                "CurrentConnectionIDs",
            ],
            Service::ContentDirectory => &[
                "SystemUpdateID",
                "ContainerUpdateIDs",
                "ShareIndexInProgress",
                "ShareIndexLastError",
                "UserRadioUpdateID",
                "SavedQueuesUpdateID",
                "ShareListUpdateID",
                "RecentlyPlayedUpdateID",
                "Browseable",
                "RadioFavoritesUpdateID",
                "RadioLocationUpdateID",
                "FavoritesUpdateID",
                "FavoritePresetsUpdateID",
            ],
            Service::DeviceProperties => &[
                "SettingsReplicationState",
                "ZoneName",
                "Icon",
                "Configuration",
                "Invisible",
                "IsZoneBridge",
                "AirPlayEnabled",
                "SupportsAudioIn",
                "SupportsAudioClip",
                "IsIdle",
                "MoreInfo",
                "ChannelMapSet",
                "HTSatChanMapSet",
                "HTBondedZoneCommitState",
                "Orientation",
                "LastChangedPlayState",
                "RoomCalibrationState",
                "AvailableRoomCalibration",
                "TVConfigurationError",
                "HdmiCecAvailable",
                "WirelessMode",
                "WirelessLeafOnly",
                "HasConfiguredSSID",
                "ChannelFreq",
                "BehindWifiExtender",
                "WifiEnabled",
                "EthLink",
                "ConfigMode",
                "SecureRegState",
                "VoiceConfigState",
                "MicEnabled",
            ],
            Service::GroupManagement => &[
                "GroupCoordinatorIsLocal",
                "LocalGroupUUID",
                "VirtualLineInGroupID",
                "ResetVolumeAfter",
                "VolumeAVTransportURI",
            ],
            Service::GroupRenderingControl => {
                &["GroupMute", "GroupVolume", "GroupVolumeChangeable"]
            }
            Service::MusicServices => &["ServiceListVersion"],
            Service::SystemProperties => &[
                "CustomerID",
                "UpdateID",
                "UpdateIDX",
                "VoiceUpdateID",
                "ThirdPartyHash",
            ],
            Service::VirtualLineIn => &["CurrentTrackMetaData"],
            Service::ZoneGroupTopology => &[
                "ThirdPartyMediaServersX",
                "AlarmRunSequence",
                "MuseHouseholdId",
                "ZoneGroupName",
                "ZoneGroupID",
                "ZonePlayerUUIDsInGroup",
                "AreasUpdateID",
                "SourceAreasUpdateID",
                "NetsettingsUpdateID",
            ],
            Service::AVTransport | Service::Queue | Service::RenderingControl | Service::QPlay => &[],
        }
    }

    /// Variables whose value is a nested XML document.
    pub fn compound_variables(&self) -> &'static [&'static str] {
        match self {
            Service::AVTransport | Service::RenderingControl | Service::Queue => &["LastChange"],
            Service::ZoneGroupTopology => &["ZoneGroupState", "AvailableSoftwareUpdate"],
            _ => &[],
        }
    }
}

/// Absolute control and event URLs of one service on one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub control: Url,
    pub event: Url,
}

/// The two capabilities the eventing engine needs from a service.
///
/// Action invocation is not part of this trait.
pub trait UpnpService {
    /// Control and event URLs of this service.
    fn endpoints(&self) -> &Endpoints;

    /// Parse a raw `NOTIFY` body into the properties it carries.
    fn parse_event(&self, body: &[u8]) -> Result<PropertySet>;
}

/// A [`Service`] bound to a concrete device location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    service: Service,
    endpoints: Endpoints,
}

impl ServiceEndpoint {
    /// Resolve the service's paths against the device description URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sonos_api::{Service, ServiceEndpoint, UpnpService};
    /// use url::Url;
    ///
    /// let location = Url::parse("http://10.0.0.5:1400/xml/device_description.xml").unwrap();
    /// let endpoint = ServiceEndpoint::resolve(Service::AVTransport, &location).unwrap();
    /// assert_eq!(
    ///     endpoint.endpoints().event.as_str(),
    ///     "http://10.0.0.5:1400/MediaRenderer/AVTransport/Event"
    /// );
    /// ```
    pub fn resolve(service: Service, location: &Url) -> Result<Self> {
        let info = service.info();
        let join = |path: &str| {
            location.join(path).map_err(|e| ApiError::InvalidEndpoint {
                service,
                message: e.to_string(),
            })
        };

        Ok(Self {
            service,
            endpoints: Endpoints {
                control: join(info.control_path)?,
                event: join(info.event_path)?,
            },
        })
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// Path component of the event URL, as devices echo it back in `NOTIFY`.
    pub fn event_path(&self) -> &str {
        self.endpoints.event.path()
    }
}

impl UpnpService for ServiceEndpoint {
    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn parse_event(&self, body: &[u8]) -> Result<PropertySet> {
        PropertySet::parse(self.service, body)
    }
}
