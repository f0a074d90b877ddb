//! Property value and state extraction from drained protocol text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_derive::Serialize;

use crate::scan;

static STATE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"state="(Idle|Ok|Busy|Alert)""#).expect("valid state attribute regex")
});

static STATE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Idle|Ok|Busy|Alert)\b").expect("valid state word regex"));

/// The state a device reports for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyState {
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyState::Idle => "Idle",
            PropertyState::Ok => "Ok",
            PropertyState::Busy => "Busy",
            PropertyState::Alert => "Alert",
        }
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Idle" => Ok(PropertyState::Idle),
            "Ok" => Ok(PropertyState::Ok),
            "Busy" => Ok(PropertyState::Busy),
            "Alert" => Ok(PropertyState::Alert),
            other => Err(format!("unknown property state '{}'", other)),
        }
    }
}

/// Value and state of one property, as seen in one drained buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySnapshot {
    pub device: String,
    pub property: String,
    pub value: Option<String>,
    pub state: Option<PropertyState>,
}

impl PropertySnapshot {
    /// Extract `property` of `device` from `buffer`.
    ///
    /// Only the first occurrence of the property name inside an element of
    /// `device` is inspected. Other drivers' messages are skipped.
    pub fn scan(buffer: &str, device: &str, property: &str) -> Self {
        let scoped = scan::property_scope(buffer, device, property).unwrap_or_default();
        PropertySnapshot {
            device: device.into(),
            property: property.into(),
            value: extract_value(scoped, property),
            state: extract_state(scoped, property),
        }
    }

    /// True if the property was present in the buffer at all.
    pub fn is_present(&self) -> bool {
        self.value.is_some() || self.state.is_some()
    }
}

/// The first bracketed payload within the lookahead window of `property`.
pub fn extract_value(buffer: &str, property: &str) -> Option<String> {
    let window = scan::window(buffer, &scan::name_marker(property))?;
    scan::payloads(window).next().map(String::from)
}

/// The state reported for `property`.
///
/// A `state="..."` attribute within the lookahead window wins over a bare
/// state word.
pub fn extract_state(buffer: &str, property: &str) -> Option<PropertyState> {
    let window = scan::window(buffer, &scan::name_marker(property))?;
    STATE_ATTRIBUTE
        .captures(window)
        .or_else(|| STATE_WORD.captures(window))
        .and_then(|c| c[1].parse().ok())
}

/// Whether switch element `switch` of `device` is `On`.
///
/// `None` if the switch or its payload is not in the buffer.
pub fn switch_is_on(buffer: &str, device: &str, switch: &str) -> Option<bool> {
    let scoped = scan::property_scope(buffer, device, switch)?;
    match extract_value(scoped, switch)?.as_str() {
        "On" => Some(true),
        "Off" => Some(false),
        _ => None,
    }
}
