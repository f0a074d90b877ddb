//! Sans-IO parts of the INDI client.
//!
//! Everything in here is independent of sockets and clocks:
//!
//! - [`protocol`]: builders for the outbound XML elements
//! - [`tracker`]: the slew state machine, fed with [`Observation`]s
//! - [`types`]: states, outcomes, tolerance and policy
//!
//! This keeps the slew logic testable without a mount and lets the
//! [`SlewController`](crate::SlewController) stay a thin loop of
//! exchange, observe and sleep.

pub mod protocol;
pub mod tracker;
pub mod types;

pub use self::protocol::{abort_command, get_properties, slew_command, SwitchState};
pub use self::tracker::SlewTracker;
pub use self::types::{
    CompletionPolicy, Observation, SlewOutcome, SlewRequest, SlewState, Tolerance,
};
