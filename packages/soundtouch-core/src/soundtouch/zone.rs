//! Zone topology payloads for `/setZone` and `/addZoneSlave`.

use serde::Serialize;

use crate::soundtouch::info::NetworkInterface;

/// A master/member zone as sent to the devices.
///
/// Members are kept in registry order and never include the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub master: NetworkInterface,
    pub members: Vec<NetworkInterface>,
}

impl Zone {
    /// Renders the zone document.
    ///
    /// `<zone master="{MAC}" senderIPAddress="{IP}"><member ipaddress="{IP}">{MAC}</member>…</zone>`
    pub fn to_xml(&self) -> String {
        let mut body = format!(
            r#"<zone master="{}" senderIPAddress="{}">"#,
            escape_attr(&self.master.mac),
            escape_attr(&self.master.ip)
        );
        for member in &self.members {
            body.push_str(&format!(
                r#"<member ipaddress="{}">{}</member>"#,
                escape_attr(&member.ip),
                html_escape::encode_text(&member.mac)
            ));
        }
        body.push_str("</zone>");
        body
    }
}

fn escape_attr(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}
