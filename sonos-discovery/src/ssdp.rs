//! SSDP (Simple Service Discovery Protocol) message codec
//!
//! Builds `M-SEARCH` requests and parses the unicast HTTP-style responses that
//! zone players send back. Socket handling lives in [`crate::discovery`].

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

const SSDP_PORT: u16 = 1900;

/// Standard SSDP multicast group
pub const MULTICAST_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), SSDP_PORT));

/// Limited broadcast fallback for networks that drop multicast
pub const BROADCAST_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, SSDP_PORT));

/// Search target matching Sonos zone players
pub const ZONE_PLAYER_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// SSDP response containing device information
#[derive(Debug, Clone, PartialEq)]
pub struct SsdpResponse {
    /// Device description URL
    pub location: String,
    pub search_target: Option<String>,
    pub usn: Option<String>,
    pub server: Option<String>,
}

/// Build an `M-SEARCH` request for `search_target`.
///
/// `HOST` always names the multicast group, even when the datagram is sent to
/// the broadcast address.
pub fn build_search_request(search_target: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         \r\n",
        mx, search_target
    )
}

/// Parse an SSDP response from HTTP text.
///
/// Returns `None` unless the text starts with an HTTP status line and carries a
/// non-empty `LOCATION` header.
pub fn parse_ssdp_response(response: &str) -> Option<SsdpResponse> {
    let mut lines = response.lines();
    let status_line = lines.next()?.trim();
    if !status_line
        .get(..5)
        .map_or(false, |p| p.eq_ignore_ascii_case("HTTP/"))
    {
        return None;
    }

    let mut location = None;
    let mut search_target = None;
    let mut usn = None;
    let mut server = None;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        if let Some(value) = extract_header_value(line, "LOCATION:") {
            location = Some(value);
        } else if let Some(value) = extract_header_value(line, "ST:") {
            search_target = Some(value);
        } else if let Some(value) = extract_header_value(line, "USN:") {
            usn = Some(value);
        } else if let Some(value) = extract_header_value(line, "SERVER:") {
            server = Some(value);
        }
    }

    location.filter(|l| !l.is_empty()).map(|location| SsdpResponse {
        location,
        search_target,
        usn,
        server,
    })
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len()
        && line.is_char_boundary(header.len())
        && line[..header.len()].eq_ignore_ascii_case(header)
    {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}
