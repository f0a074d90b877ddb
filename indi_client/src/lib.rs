//! Client support for the [INDI protocol](https://indilib.org), limited to
//! what is needed to query one telescope mount and slew it.
//!
//! INDI is an XML dialect spoken over a TCP socket (port 7624 by default)
//! without any message framing. The client therefore works in exchanges: send
//! one element, wait a configurable drain time, take whatever arrived. The
//! drained text is never parsed as a document. Values and states are located by
//! a bounded-window scan after the property's `name="..."` marker.
//!
//! ```rust,no_run
//! use indi_client::{ClientConfig, Connection, Coordinate, SlewController, SlewOutcome};
//!
//! # fn main() -> indi_client::Result<()> {
//! let config = ClientConfig::default();
//! let mut connection = Connection::with_config(&config)?;
//!
//! let snapshot = connection.send_and_drain(
//!     &indi_client::sansio::get_properties(&config.protocol_version, None),
//!     config.drain_wait,
//! )?;
//! if let Some(position) = indi_client::read_equatorial(&snapshot, &config.device) {
//!     println!("{}", position);
//! }
//!
//! let mut slew = SlewController::new(&mut connection, &config);
//! slew.request_slew(Coordinate::new(5.5, -5.4)?)?;
//! if slew.wait_for_arrival()? == SlewOutcome::TimedOut {
//!     slew.abort()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Everything is synchronous and single threaded. Exactly one exchange may be
//! in flight per connection, which `&mut self` on every operation enforces.

#![doc(html_root_url = "https://docs.rs/indi_client/0.1.0")]

pub use crate::config::ClientConfig;
pub use crate::connection::{
    is_error_reply, probe, send_once, Connection, Exchange, ERROR_PREFIX,
};
pub use crate::coordinate::{
    parse, parse_sexagesimal, read_equatorial, to_dm, to_hms, Coordinate, Dm, Hms,
};
pub use crate::error::{Error, Result};
pub use crate::property::{
    extract_state, extract_value, switch_is_on, PropertySnapshot, PropertyState,
};
pub use crate::sansio::{CompletionPolicy, Observation, SlewOutcome, SlewState, Tolerance};
pub use crate::slew::{position_in, SlewController};
pub use crate::stream::Stream;

mod config;
mod connection;
mod coordinate;
mod error;
mod property;
pub mod sansio;
pub mod scan;
mod slew;
mod stream;

#[cfg(test)]
mod test;
