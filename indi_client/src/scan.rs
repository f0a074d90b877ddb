//! Bounded-window token scanning over drained protocol text.
//!
//! INDI has no framing, so a drained buffer may hold partial elements, several
//! top-level elements or none at all. Instead of parsing it as a document the
//! client searches for a `name="..."` marker and only looks at a fixed number of
//! characters after it. Attributes and the child payloads of an element sit close
//! to its name, while an unbounded scan would happily pick up the value of an
//! unrelated element further down when the wanted one never reported a number.

use std::sync::LazyLock;

use regex::Regex;

use crate::sansio::protocol::escape;

/// Number of characters inspected, counted from the start of a name marker.
pub const LOOKAHEAD_WINDOW: usize = 200;

const DEVICE_ATTRIBUTE: &str = "device=\"";

static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d*)?(?::\d+(?:\.\d*)?){0,2}").expect("valid numeric token regex")
});

/// `name="<name>"`
pub fn name_marker(name: &str) -> String {
    format!("name=\"{}\"", escape(name))
}

/// `device="<device>"`
pub fn device_marker(device: &str) -> String {
    format!("device=\"{}\"", escape(device))
}

/// The bounded window starting at the first occurrence of `marker`.
pub fn window<'a>(buffer: &'a str, marker: &str) -> Option<&'a str> {
    let start = buffer.find(marker)?;
    let mut end = buffer.len().min(start + LOOKAHEAD_WINDOW.max(marker.len()));
    while !buffer.is_char_boundary(end) {
        end -= 1;
    }
    Some(&buffer[start..end])
}

/// The elements of `device` in `buffer`, in stream order.
///
/// Each segment starts at the `<` of a tag carrying `device="<device>"` and
/// runs up to the next tag carrying any `device` attribute. Vector elements name
/// their device while their children do not, so a segment is one vector with
/// its children, and never reaches into another driver's messages.
pub fn device_segments<'a>(buffer: &'a str, device: &str) -> impl Iterator<Item = &'a str> + 'a {
    let marker = device_marker(device);
    let attributes: Vec<usize> = buffer
        .match_indices(DEVICE_ATTRIBUTE)
        .map(|(i, _)| i)
        .collect();
    let starts: Vec<usize> = attributes
        .iter()
        .map(|&i| buffer[..i].rfind('<').unwrap_or(i))
        .collect();

    (0..attributes.len()).filter_map(move |k| {
        if !buffer[attributes[k]..].starts_with(&marker) {
            return None;
        }
        let end = starts[k + 1..]
            .iter()
            .copied()
            .find(|&s| s > starts[k])
            .unwrap_or(buffer.len());
        Some(&buffer[starts[k]..end])
    })
}

/// The first occurrence of `name="<name>"` that belongs to `device`.
///
/// The result starts at the marker and ends with the device segment holding
/// it. `name` may be a vector (`EQUATORIAL_EOD_COORD`) or one of its elements
/// (`RA`).
pub fn property_scope<'a>(buffer: &'a str, device: &str, name: &str) -> Option<&'a str> {
    let marker = name_marker(name);
    device_segments(buffer, device)
        .find_map(|segment| segment.find(&marker).map(|i| &segment[i..]))
}

/// Trimmed, non-empty element payloads (`>text<`) in `window`.
///
/// A payload cut off by the end of the window is returned as far as it goes.
pub fn payloads(window: &str) -> impl Iterator<Item = &str> {
    window.split('>').skip(1).filter_map(|chunk| {
        let text = chunk.split('<').next().unwrap_or_default().trim();
        (!text.is_empty()).then_some(text)
    })
}

/// The first numeric token in `text`, including `:`-separated sexagesimal groups.
pub fn numeric_token(text: &str) -> Option<&str> {
    NUMERIC_TOKEN.find(text).map(|m| m.as_str())
}

/// The first numeric payload within the window after `marker`.
pub fn number_after<'a>(buffer: &'a str, marker: &str) -> Option<&'a str> {
    window(buffer, marker).and_then(|w| payloads(w).find_map(numeric_token))
}
