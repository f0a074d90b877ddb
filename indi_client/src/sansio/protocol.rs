//! Pure builders for the outbound INDI elements.
//!
//! This module contains side-effect-free functions producing the XML text the
//! client sends. Inbound text is never parsed as XML; see [`crate::scan`].

use std::borrow::Cow;
use std::fmt::Write;

/// INDI protocol version announced in `getProperties`.
pub const PROTOCOL_VERSION: &str = "1.7";

/// Default indiserver TCP port.
pub const DEFAULT_PORT: u16 = 7624;

/// Standard INDI property names used by the client.
pub mod properties {
    pub const CONNECTION: &str = "CONNECTION";
    pub const EQUATORIAL_EOD_COORD: &str = "EQUATORIAL_EOD_COORD";
    pub const TELESCOPE_ABORT_MOTION: &str = "TELESCOPE_ABORT_MOTION";
}

/// Standard element names inside the properties above.
pub mod elements {
    pub const CONNECT: &str = "CONNECT";
    pub const DISCONNECT: &str = "DISCONNECT";
    pub const RA: &str = "RA";
    pub const DEC: &str = "DEC";
    pub const ABORT: &str = "ABORT";
}

/// Value of a switch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchState::On => "On",
            SwitchState::Off => "Off",
        }
    }
}

/// Escape the five XML special characters.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Serialize a properties query.
///
/// # Example
///
/// ```
/// use indi_client::sansio::protocol::get_properties;
///
/// assert_eq!(get_properties("1.7", None), r#"<getProperties version="1.7"/>"#);
/// ```
pub fn get_properties(version: &str, device: Option<&str>) -> String {
    match device {
        Some(device) => format!(
            "<getProperties version=\"{}\" device=\"{}\"/>",
            escape(version),
            escape(device)
        ),
        None => format!("<getProperties version=\"{}\"/>", escape(version)),
    }
}

/// Serialize a `newNumberVector` setting one or more number elements.
///
/// # Example
///
/// ```
/// use indi_client::sansio::protocol::new_number_vector;
///
/// let msg = new_number_vector("Mount", "EQUATORIAL_EOD_COORD", &[("RA", 5.5), ("DEC", -10.0)]);
/// assert!(msg.contains(r#"<oneNumber name="RA">5.5</oneNumber>"#));
/// assert!(msg.contains(r#"<oneNumber name="DEC">-10</oneNumber>"#));
/// ```
pub fn new_number_vector(device: &str, property: &str, values: &[(&str, f64)]) -> String {
    let mut msg = format!(
        "<newNumberVector device=\"{}\" name=\"{}\">\n",
        escape(device),
        escape(property)
    );
    for (name, value) in values {
        let _ = writeln!(msg, "  <oneNumber name=\"{}\">{}</oneNumber>", escape(name), value);
    }
    msg.push_str("</newNumberVector>");
    msg
}

/// Serialize a `newSwitchVector` setting one or more switch elements.
pub fn new_switch_vector(device: &str, property: &str, values: &[(&str, SwitchState)]) -> String {
    let mut msg = format!(
        "<newSwitchVector device=\"{}\" name=\"{}\">\n",
        escape(device),
        escape(property)
    );
    for (name, state) in values {
        let _ = writeln!(
            msg,
            "  <oneSwitch name=\"{}\">{}</oneSwitch>",
            escape(name),
            state.as_str()
        );
    }
    msg.push_str("</newSwitchVector>");
    msg
}

/// The slew command for the mount's equatorial coordinates.
pub fn slew_command(device: &str, ra_hours: f64, dec_degrees: f64) -> String {
    new_number_vector(
        device,
        properties::EQUATORIAL_EOD_COORD,
        &[(elements::RA, ra_hours), (elements::DEC, dec_degrees)],
    )
}

/// The motion-abort command.
pub fn abort_command(device: &str) -> String {
    new_switch_vector(
        device,
        properties::TELESCOPE_ABORT_MOTION,
        &[(elements::ABORT, SwitchState::On)],
    )
}
