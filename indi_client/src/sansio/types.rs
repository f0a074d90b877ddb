//! Core types for the sans-io slew tracking.

use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::coordinate::{self, Coordinate};
use crate::property::{PropertySnapshot, PropertyState};
use crate::sansio::protocol::properties;
use crate::scan;

/// Progress of one slew attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlewState {
    /// No outstanding request
    Idle,
    /// Command sent, nothing conclusive seen yet
    Requested,
    /// The mount reported the move in progress
    Busy,
    /// The mount applied the command without ever reporting `Busy`
    Accepted,
    Arrived,
    TimedOut,
    Aborted,
}

impl SlewState {
    /// True while a request is outstanding.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SlewState::Requested | SlewState::Busy | SlewState::Accepted
        )
    }
}

/// Result of waiting for a slew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlewOutcome {
    Arrived,
    TimedOut,
}

/// How close the mount has to get to the target to count as arrived.
///
/// Both bounds are exclusive. The right ascension difference is taken around
/// the 24 hour circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub ra_hours: f64,
    pub dec_degrees: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            ra_hours: 0.01,
            dec_degrees: 0.5,
        }
    }
}

impl Tolerance {
    pub fn contains(&self, target: &Coordinate, current: &Coordinate) -> bool {
        let d_ra = (current.ra_hours - target.ra_hours).abs() % 24.0;
        let d_ra = d_ra.min(24.0 - d_ra);
        let d_dec = (current.dec_degrees - target.dec_degrees).abs();
        d_ra < self.ra_hours && d_dec < self.dec_degrees
    }
}

/// What counts as evidence that a slew finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Position within tolerance of a live mount, or an `Ok` state while polling.
    ///
    /// Some mounts report completion before the final position readback
    /// settles. The `Ok` rule is a heuristic and can also mean the command
    /// was merely accepted.
    #[default]
    Lenient,
    /// Position within tolerance of a live mount only.
    Strict,
}

/// One slew attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewRequest {
    pub target: Coordinate,
    pub deadline: Duration,
    /// Position before the command was sent, if it could be read.
    pub origin: Option<Coordinate>,
}

/// What one drained buffer says about the mount's equatorial coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub position: Option<Coordinate>,
    pub state: Option<PropertyState>,
    /// The coordinate property carried a numeric value.
    pub echoed: bool,
}

impl Observation {
    pub fn from_buffer(buffer: &str, device: &str) -> Self {
        let snapshot = PropertySnapshot::scan(buffer, device, properties::EQUATORIAL_EOD_COORD);
        Observation {
            position: coordinate::read_equatorial(buffer, device),
            state: snapshot.state,
            echoed: snapshot
                .value
                .as_deref()
                .and_then(scan::numeric_token)
                .is_some(),
        }
    }

    /// Nothing about the mount was in the buffer.
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.state.is_none() && !self.echoed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_classification() {
        let tolerance = Tolerance::default();
        let target = Coordinate::new(5.0100, 10.00).unwrap();
        assert!(tolerance.contains(&target, &Coordinate::new(5.0150, 10.30).unwrap()));
        assert!(!tolerance.contains(&target, &Coordinate::new(5.0400, 10.30).unwrap()));
        assert!(!tolerance.contains(&target, &Coordinate::new(5.0150, 10.60).unwrap()));
    }

    #[test]
    fn test_tolerance_wraps_ra() {
        let tolerance = Tolerance::default();
        let target = Coordinate::new(23.998, 0.0).unwrap();
        assert!(tolerance.contains(&target, &Coordinate::new(0.002, 0.0).unwrap()));
    }

    #[test]
    fn test_observation_from_buffer() {
        let buffer = r#"<setNumberVector device="M" name="EQUATORIAL_EOD_COORD" state="Busy">
<oneNumber name="RA">5.5</oneNumber><oneNumber name="DEC">-3.25</oneNumber></setNumberVector>"#;
        let obs = Observation::from_buffer(buffer, "M");
        assert_eq!(obs.state, Some(PropertyState::Busy));
        assert!(obs.echoed);
        assert_eq!(obs.position, Some(Coordinate::new(5.5, -3.25).unwrap()));

        assert!(Observation::from_buffer("", "M").is_empty());
    }

    #[test]
    fn test_observation_ignores_other_devices() {
        let buffer = r#"<defSwitchVector device="M" name="CONNECTION" state="Ok">
<defSwitch name="CONNECT">On</defSwitch></defSwitchVector>
<setNumberVector device="Other" name="EQUATORIAL_EOD_COORD" state="Busy">
<oneNumber name="RA">1.25</oneNumber><oneNumber name="DEC">-40</oneNumber></setNumberVector>"#;
        assert!(Observation::from_buffer(buffer, "M").is_empty());
        assert_eq!(
            Observation::from_buffer(buffer, "Other").state,
            Some(PropertyState::Busy)
        );
    }
}
