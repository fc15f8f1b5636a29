//! Private SOAP client for UPnP device communication
//!
//! This crate provides a minimal, blocking SOAP client for invoking actions on
//! UPnP devices like Sonos speakers. Async callers should run it on
//! `tokio::task::spawn_blocking`.

mod error;

pub use error::SoapError;

use std::time::Duration;
use tracing::debug;
use xmltree::Element;

/// A minimal SOAP client for UPnP device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
        }
    }

    /// Invoke `action` on the service at `control_url` and return the
    /// `<{action}Response>` element.
    pub fn call(
        &self,
        control_url: &str,
        service_uri: &str,
        action: &str,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let body = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
                <s:Body>
                    <u:{action} xmlns:u="{service_uri}">
                        {payload}
                    </u:{action}>
                </s:Body>
            </s:Envelope>"#,
            action = action,
            service_uri = service_uri,
            payload = payload
        );
        let soap_action = format!("\"{}#{}\"", service_uri, action);

        debug!(url = control_url, action, "Sending SOAP request");

        let response = self
            .agent
            .post(control_url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action)
            .send_string(&body);

        let xml_text = match response {
            Ok(response) => response
                .into_string()
                .map_err(|e| SoapError::Network(e.to_string()))?,
            // UPnP faults arrive as HTTP 500 with a fault envelope
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().unwrap_or_default();
                return Err(Element::parse(text.as_bytes())
                    .ok()
                    .and_then(|xml| self.extract_response(&xml, action).err())
                    .filter(|e| matches!(e, SoapError::Fault { .. }))
                    .unwrap_or_else(|| SoapError::Network(format!("HTTP {}", status))));
            }
            Err(e) => return Err(SoapError::Network(e.to_string())),
        };

        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| SoapError::Parse(e.to_string()))?;

        self.extract_response(&xml, action)
    }

    fn extract_response(&self, xml: &Element, action: &str) -> Result<Element, SoapError> {
        let body = xml
            .get_child("Body")
            .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

        if let Some(fault) = body.get_child("Fault") {
            let upnp_error = fault
                .get_child("detail")
                .and_then(|d| d.get_child("UPnPError").or_else(|| d.get_child("UpnPError")));
            let code = upnp_error
                .and_then(|e| e.get_child("errorCode"))
                .and_then(|c| c.get_text())
                .and_then(|t| t.trim().parse::<u16>().ok())
                .unwrap_or(500);
            let description = upnp_error
                .and_then(|e| e.get_child("errorDescription"))
                .or_else(|| fault.get_child("faultstring"))
                .and_then(|d| d.get_text())
                .map(|t| t.trim().to_string())
                .unwrap_or_default();
            return Err(SoapError::Fault { code, description });
        }

        let response_name = format!("{}Response", action);
        body.get_child(response_name.as_str())
            .cloned()
            .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Text content of a named child of an action response.
pub fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT_ENVELOPE: &str = r#"
        <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
            <s:Body>
                <s:Fault>
                    <faultcode>s:Client</faultcode>
                    <faultstring>UPnPError</faultstring>
                    <detail>
                        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                            <errorCode>401</errorCode>
                            <errorDescription>Invalid Action</errorDescription>
                        </UPnPError>
                    </detail>
                </s:Fault>
            </s:Body>
        </s:Envelope>
    "#;

    const TOPOLOGY_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>&lt;ZoneGroups&gt;&lt;/ZoneGroups&gt;</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#;

    #[test]
    fn test_extract_response_with_valid_response() {
        let client = SoapClient::new();
        let xml = Element::parse(TOPOLOGY_RESPONSE.as_bytes()).unwrap();

        let response = client.extract_response(&xml, "GetZoneGroupState").unwrap();
        assert_eq!(response.name, "GetZoneGroupStateResponse");
        assert_eq!(
            child_text(&response, "ZoneGroupState").as_deref(),
            Some("<ZoneGroups></ZoneGroups>")
        );
    }

    #[test]
    fn test_extract_response_with_soap_fault() {
        let client = SoapClient::new();
        let xml = Element::parse(FAULT_ENVELOPE.as_bytes()).unwrap();

        match client.extract_response(&xml, "Play").unwrap_err() {
            SoapError::Fault { code, description } => {
                assert_eq!(code, 401);
                assert_eq!(description, "Invalid Action");
            }
            other => panic!("Expected SoapError::Fault, got {:?}", other),
        }
    }

    #[test]
    fn test_soap_fault_with_default_error_code() {
        let client = SoapClient::new();
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <s:Fault>
                        <faultcode>s:Server</faultcode>
                        <faultstring>Internal Error</faultstring>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;
        let xml = Element::parse(xml_str.as_bytes()).unwrap();

        match client.extract_response(&xml, "Play").unwrap_err() {
            SoapError::Fault { code, description } => {
                assert_eq!(code, 500);
                assert_eq!(description, "Internal Error");
            }
            other => panic!("Expected SoapError::Fault, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_response_missing_body() {
        let client = SoapClient::new();
        let xml = Element::parse(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"></s:Envelope>"#
                .as_bytes(),
        )
        .unwrap();

        match client.extract_response(&xml, "Play").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing SOAP Body")),
            other => panic!("Expected SoapError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_response_missing_action_response() {
        let client = SoapClient::new();
        let xml = Element::parse(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body></s:Body></s:Envelope>"#
                .as_bytes(),
        )
        .unwrap();

        match client.extract_response(&xml, "Play").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing PlayResponse element")),
            other => panic!("Expected SoapError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_call_against_device() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/ZoneGroupTopology/Control")
            .match_header(
                "soapaction",
                "\"urn:schemas-upnp-org:service:ZoneGroupTopology:1#GetZoneGroupState\"",
            )
            .match_body(mockito::Matcher::Regex("<u:GetZoneGroupState".to_string()))
            .with_status(200)
            .with_header("content-type", "text/xml; charset=\"utf-8\"")
            .with_body(TOPOLOGY_RESPONSE)
            .create();

        let client = SoapClient::new();
        let response = client
            .call(
                &format!("{}/ZoneGroupTopology/Control", server.url()),
                "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
                "GetZoneGroupState",
                "",
            )
            .unwrap();

        assert_eq!(response.name, "GetZoneGroupStateResponse");
        mock.assert();
    }

    #[test]
    fn test_call_maps_http_500_fault() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/MediaRenderer/AVTransport/Control")
            .with_status(500)
            .with_body(FAULT_ENVELOPE)
            .create();

        let err = SoapClient::new()
            .call(
                &format!("{}/MediaRenderer/AVTransport/Control", server.url()),
                "urn:schemas-upnp-org:service:AVTransport:1",
                "Play",
                "<InstanceID>0</InstanceID><Speed>1</Speed>",
            )
            .unwrap_err();

        assert!(matches!(err, SoapError::Fault { code: 401, .. }));
    }

    #[test]
    fn test_call_maps_plain_http_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/ZoneGroupTopology/Control")
            .with_status(404)
            .with_body("not found")
            .create();

        let err = SoapClient::new()
            .call(
                &format!("{}/ZoneGroupTopology/Control", server.url()),
                "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
                "GetZoneGroupState",
                "",
            )
            .unwrap_err();

        match err {
            SoapError::Network(msg) => assert!(msg.contains("404")),
            other => panic!("Expected SoapError::Network, got {:?}", other),
        }
    }
}
