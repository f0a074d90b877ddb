//! Drive a slew against a live connection.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::Exchange;
use crate::coordinate::{self, Coordinate};
use crate::error::{Error, Result};
use crate::sansio::protocol::{abort_command, get_properties, slew_command};
use crate::sansio::{Observation, SlewOutcome, SlewRequest, SlewState, SlewTracker};

/// Issues a slew, polls the mount until it arrives or time runs out, and
/// aborts on demand.
///
/// Everything is synchronous. [`abort`](SlewController::abort) is a protocol
/// message to the mount and does not interrupt a poll in progress; wrap the
/// whole operation in an external timeout if hard cancellation is needed.
pub struct SlewController<'a, E: Exchange> {
    transport: &'a mut E,
    config: ClientConfig,
    tracker: SlewTracker,
}

impl<'a, E: Exchange> SlewController<'a, E> {
    pub fn new(transport: &'a mut E, config: &ClientConfig) -> Self {
        SlewController {
            transport,
            config: config.clone(),
            tracker: SlewTracker::new(config.tolerance, config.policy),
        }
    }

    pub fn state(&self) -> SlewState {
        self.tracker.state()
    }

    pub fn request(&self) -> Option<&SlewRequest> {
        self.tracker.request()
    }

    /// Query the mount's position. `None` if it could not be read.
    pub fn current_position(&mut self) -> Option<Coordinate> {
        self.observe().position
    }

    /// Send the slew command and classify the immediate response.
    ///
    /// Returns the state after the response: `Busy`, `Accepted` or, if the
    /// response was inconclusive, `Requested`.
    pub fn request_slew(&mut self, target: Coordinate) -> Result<SlewState> {
        if !target.is_valid() {
            return Err(Error::InvalidCoordinate {
                ra_hours: target.ra_hours,
                dec_degrees: target.dec_degrees,
            });
        }

        let origin = self.current_position();
        self.tracker.start(SlewRequest {
            target,
            deadline: self.config.slew_timeout,
            origin,
        });

        info!(device = %self.config.device, %target, "slew requested");
        let command = slew_command(&self.config.device, target.ra_hours, target.dec_degrees);
        let response = match self.transport.exchange(&command, self.config.drain_wait) {
            Ok(response) => response,
            Err(e) => {
                self.tracker.reset();
                return Err(e);
            }
        };

        let obs = Observation::from_buffer(&response, &self.config.device);
        Ok(self.tracker.observe_response(&obs))
    }

    pub fn poll_until_arrival(
        &mut self,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Result<SlewOutcome> {
        self.poll_until_arrival_with(max_wait, poll_interval, |_| {})
    }

    /// Sleep, query, compare, until the slew completes or `max_wait` elapsed.
    ///
    /// `observer` sees every polled observation. A failed poll counts as an
    /// observation without any evidence.
    pub fn poll_until_arrival_with<F>(
        &mut self,
        max_wait: Duration,
        poll_interval: Duration,
        mut observer: F,
    ) -> Result<SlewOutcome>
    where
        F: FnMut(&Observation),
    {
        if !self.tracker.state().is_active() {
            return Err(Error::NoActiveSlew);
        }

        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= max_wait {
                self.tracker.timeout();
                info!(device = %self.config.device, ?elapsed, "slew timed out");
                return Ok(SlewOutcome::TimedOut);
            }
            thread::sleep(poll_interval.min(max_wait - elapsed));

            let obs = self.observe();
            debug!(position = ?obs.position, state = ?obs.state, "poll");
            observer(&obs);

            if let Some(outcome) = self.tracker.observe_poll(&obs) {
                info!(device = %self.config.device, elapsed = ?start.elapsed(), "slew arrived");
                return Ok(outcome);
            }
        }
    }

    /// Poll with the request's deadline and the configured interval.
    pub fn wait_for_arrival(&mut self) -> Result<SlewOutcome> {
        let deadline = self
            .tracker
            .request()
            .map(|r| r.deadline)
            .ok_or(Error::NoActiveSlew)?;
        self.poll_until_arrival(deadline, self.config.poll_interval)
    }

    /// Send the motion-abort command.
    ///
    /// The command is sent in every state, and the controller ends up
    /// `Aborted` even if sending failed.
    pub fn abort(&mut self) -> Result<()> {
        info!(device = %self.config.device, "abort");
        let command = abort_command(&self.config.device);
        let ret = self.transport.exchange(&command, self.config.drain_wait);
        self.tracker.abort();
        ret.map(|_| ())
    }

    fn observe(&mut self) -> Observation {
        let query = get_properties(&self.config.protocol_version, Some(&self.config.device));
        match self.transport.exchange(&query, self.config.drain_wait) {
            Ok(response) => Observation::from_buffer(&response, &self.config.device),
            Err(e) => {
                warn!(device = %self.config.device, error = %e, "query failed");
                Observation::default()
            }
        }
    }
}

/// Read the mount's position from a properties snapshot.
///
/// Convenience for callers that already hold a drained buffer.
pub fn position_in(buffer: &str, config: &ClientConfig) -> Option<Coordinate> {
    coordinate::read_equatorial(buffer, &config.device)
}
