//! Slew state machine.
//!
//! This module implements the slew logic without any I/O operations. The
//! [`SlewController`](crate::SlewController) feeds it with [`Observation`]s
//! taken from drained buffers and acts on the resulting state.

use tracing::debug;

use super::types::{CompletionPolicy, Observation, SlewOutcome, SlewRequest, SlewState, Tolerance};
use crate::coordinate::Coordinate;
use crate::property::PropertyState;

/// Positions closer than this are considered unchanged.
const DRIFT_EPSILON: f64 = 1e-6;

/// Sans-IO slew tracker.
///
/// - `start()`: a slew command was sent
/// - `observe_response()`: classify the buffer drained right after the command
/// - `observe_poll()`: classify a later buffer, may conclude the slew
/// - `timeout()` / `abort()`: end the attempt
///
/// A position within tolerance only counts once the mount showed it is live:
/// it reported `Busy` or `Ok` at some point, or its position moved away from
/// the origin. A driver that is not connected to hardware keeps echoing the
/// same numbers and must never be reported as arrived.
#[derive(Debug)]
pub struct SlewTracker {
    state: SlewState,
    request: Option<SlewRequest>,
    tolerance: Tolerance,
    policy: CompletionPolicy,
    busy_seen: bool,
    live: bool,
}

impl SlewTracker {
    pub fn new(tolerance: Tolerance, policy: CompletionPolicy) -> Self {
        Self {
            state: SlewState::Idle,
            request: None,
            tolerance,
            policy,
            busy_seen: false,
            live: false,
        }
    }

    pub fn state(&self) -> SlewState {
        self.state
    }

    pub fn request(&self) -> Option<&SlewRequest> {
        self.request.as_ref()
    }

    /// True once `Busy` was reported for the current attempt.
    pub fn busy_seen(&self) -> bool {
        self.busy_seen
    }

    pub fn start(&mut self, request: SlewRequest) {
        self.request = Some(request);
        self.busy_seen = false;
        self.live = false;
        self.transition(SlewState::Requested);
    }

    /// Classify the buffer drained right after the slew command.
    pub fn observe_response(&mut self, obs: &Observation) -> SlewState {
        if self.state != SlewState::Requested {
            return self.state;
        }
        self.note(obs);

        match obs.state {
            Some(PropertyState::Busy) => self.transition(SlewState::Busy),
            Some(PropertyState::Ok) if !self.busy_seen => self.transition(SlewState::Accepted),
            // sub-threshold moves may only echo the new numbers
            None if obs.echoed && self.echoes_update(obs) => {
                self.transition(SlewState::Accepted)
            }
            _ => {}
        }
        self.state
    }

    /// Classify a polled buffer. Returns `Some(Arrived)` once the slew is done.
    pub fn observe_poll(&mut self, obs: &Observation) -> Option<SlewOutcome> {
        if !self.state.is_active() {
            return None;
        }
        self.note(obs);

        if obs.state == Some(PropertyState::Busy) {
            self.transition(SlewState::Busy);
        }

        let request = self.request.as_mut()?;
        if request.origin.is_none() {
            request.origin = obs.position;
        }
        let target = request.target;
        let origin = request.origin;

        let within = obs
            .position
            .map(|p| self.tolerance.contains(&target, &p))
            .unwrap_or(false);
        let drifted = match (origin, obs.position) {
            (Some(o), Some(p)) => moved(&o, &p),
            _ => false,
        };
        if drifted {
            self.live = true;
        }

        let completed =
            self.policy == CompletionPolicy::Lenient && obs.state == Some(PropertyState::Ok);

        if (within && self.live) || completed {
            self.finish(SlewState::Arrived);
            Some(SlewOutcome::Arrived)
        } else {
            None
        }
    }

    pub fn timeout(&mut self) {
        if self.state.is_active() {
            self.finish(SlewState::TimedOut);
        }
    }

    /// Always ends in `Aborted`, also without an outstanding request.
    pub fn abort(&mut self) {
        self.finish(SlewState::Aborted);
    }

    /// Forget the current attempt, e.g. when its command could not be sent.
    pub fn reset(&mut self) {
        self.finish(SlewState::Idle);
    }

    /// The echoed position differs from the origin or, without a known
    /// origin, already matches the target.
    fn echoes_update(&self, obs: &Observation) -> bool {
        let (Some(request), Some(position)) = (self.request.as_ref(), obs.position) else {
            return false;
        };
        match request.origin {
            Some(origin) => moved(&origin, &position),
            None => self.tolerance.contains(&request.target, &position),
        }
    }

    fn note(&mut self, obs: &Observation) {
        match obs.state {
            Some(PropertyState::Busy) => {
                self.busy_seen = true;
                self.live = true;
            }
            Some(PropertyState::Ok) => self.live = true,
            _ => {}
        }
    }

    fn finish(&mut self, state: SlewState) {
        self.request = None;
        self.transition(state);
    }

    fn transition(&mut self, state: SlewState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "slew state");
            self.state = state;
        }
    }
}

fn moved(a: &Coordinate, b: &Coordinate) -> bool {
    (a.ra_hours - b.ra_hours).abs() > DRIFT_EPSILON
        || (a.dec_degrees - b.dec_degrees).abs() > DRIFT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(ra: f64, dec: f64) -> Option<Coordinate> {
        Some(Coordinate::new(ra, dec).unwrap())
    }

    fn obs(position: Option<Coordinate>, state: Option<PropertyState>) -> Observation {
        Observation {
            position,
            state,
            echoed: position.is_some(),
        }
    }

    fn started(policy: CompletionPolicy, origin: Option<Coordinate>) -> SlewTracker {
        let mut tracker = SlewTracker::new(Tolerance::default(), policy);
        tracker.start(SlewRequest {
            target: Coordinate::new(5.01, 10.0).unwrap(),
            deadline: Duration::from_secs(30),
            origin,
        });
        tracker
    }

    #[test]
    fn test_new_is_idle() {
        let tracker = SlewTracker::new(Tolerance::default(), CompletionPolicy::Lenient);
        assert_eq!(tracker.state(), SlewState::Idle);
        assert!(tracker.request().is_none());
    }

    #[test]
    fn test_response_busy() {
        let mut tracker = started(CompletionPolicy::Lenient, at(5.0, 10.0));
        let state = tracker.observe_response(&obs(at(5.0, 10.0), Some(PropertyState::Busy)));
        assert_eq!(state, SlewState::Busy);
        assert!(tracker.busy_seen());
    }

    #[test]
    fn test_response_ok_is_accepted() {
        let mut tracker = started(CompletionPolicy::Lenient, None);
        let state = tracker.observe_response(&obs(None, Some(PropertyState::Ok)));
        assert_eq!(state, SlewState::Accepted);
    }

    #[test]
    fn test_response_echo_is_accepted() {
        let mut tracker = started(CompletionPolicy::Lenient, None);
        let state = tracker.observe_response(&obs(at(5.01, 10.0), None));
        assert_eq!(state, SlewState::Accepted);
    }

    #[test]
    fn test_response_unchanged_echo_stays_requested() {
        let mut tracker = started(CompletionPolicy::Lenient, at(4.0, 10.0));
        let state = tracker.observe_response(&obs(at(4.0, 10.0), None));
        assert_eq!(state, SlewState::Requested);

        let mut tracker = started(CompletionPolicy::Lenient, at(4.0, 10.0));
        let state = tracker.observe_response(&obs(at(4.2, 10.0), None));
        assert_eq!(state, SlewState::Accepted);
    }

    #[test]
    fn test_response_echo_far_from_target_without_origin() {
        let mut tracker = started(CompletionPolicy::Lenient, None);
        let state = tracker.observe_response(&obs(at(4.0, 10.0), None));
        assert_eq!(state, SlewState::Requested);
    }

    #[test]
    fn test_response_nothing_stays_requested() {
        let mut tracker = started(CompletionPolicy::Lenient, None);
        let state = tracker.observe_response(&obs(None, Some(PropertyState::Alert)));
        assert_eq!(state, SlewState::Requested);
    }

    #[test]
    fn test_arrival_after_drift() {
        let mut tracker = started(CompletionPolicy::Strict, at(4.0, 10.0));
        assert_eq!(tracker.observe_poll(&obs(at(4.5, 10.0), None)), None);
        assert_eq!(
            tracker.observe_poll(&obs(at(5.015, 10.3), None)),
            Some(SlewOutcome::Arrived)
        );
        assert_eq!(tracker.state(), SlewState::Arrived);
        assert!(tracker.request().is_none());
    }

    #[test]
    fn test_out_of_tolerance_is_not_arrival() {
        let mut tracker = started(CompletionPolicy::Strict, at(4.0, 10.0));
        assert_eq!(tracker.observe_poll(&obs(at(5.04, 10.3), None)), None);
        assert_eq!(tracker.state(), SlewState::Requested);
    }

    #[test]
    fn test_unchanged_position_without_state_never_arrives() {
        // target is within tolerance of the origin, but the mount never moves
        let mut tracker = started(CompletionPolicy::Lenient, at(5.009, 10.0));
        for _ in 0..10 {
            assert_eq!(tracker.observe_poll(&obs(at(5.009, 10.0), None)), None);
        }
        tracker.timeout();
        assert_eq!(tracker.state(), SlewState::TimedOut);
    }

    #[test]
    fn test_first_poll_becomes_origin() {
        let mut tracker = started(CompletionPolicy::Strict, None);
        assert_eq!(tracker.observe_poll(&obs(at(5.009, 10.0), None)), None);
        assert_eq!(tracker.request().unwrap().origin, at(5.009, 10.0));
    }

    #[test]
    fn test_ok_completes_under_lenient_policy() {
        let mut tracker = started(CompletionPolicy::Lenient, at(4.0, 10.0));
        tracker.observe_response(&obs(at(4.0, 10.0), Some(PropertyState::Busy)));
        assert_eq!(tracker.observe_poll(&obs(at(4.5, 10.0), Some(PropertyState::Busy))), None);
        assert_eq!(
            tracker.observe_poll(&obs(at(4.9, 10.0), Some(PropertyState::Ok))),
            Some(SlewOutcome::Arrived)
        );
    }

    #[test]
    fn test_ok_alone_does_not_complete_under_strict_policy() {
        let mut tracker = started(CompletionPolicy::Strict, at(4.0, 10.0));
        assert_eq!(tracker.observe_poll(&obs(at(4.9, 10.0), Some(PropertyState::Ok))), None);
        // the Ok made the mount count as live
        assert_eq!(
            tracker.observe_poll(&obs(at(5.01, 10.0), Some(PropertyState::Ok))),
            Some(SlewOutcome::Arrived)
        );
    }

    #[test]
    fn test_abort_from_any_state() {
        let mut tracker = SlewTracker::new(Tolerance::default(), CompletionPolicy::Lenient);
        tracker.abort();
        assert_eq!(tracker.state(), SlewState::Aborted);

        let mut tracker = started(CompletionPolicy::Lenient, None);
        tracker.observe_response(&obs(None, Some(PropertyState::Busy)));
        tracker.abort();
        assert_eq!(tracker.state(), SlewState::Aborted);
        assert!(tracker.request().is_none());
        assert_eq!(tracker.observe_poll(&obs(at(5.01, 10.0), Some(PropertyState::Ok))), None);
    }
}
