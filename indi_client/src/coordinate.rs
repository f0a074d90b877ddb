//! Equatorial coordinates and their sexagesimal views.

use std::fmt;

use crate::error::{Error, Result};
use crate::sansio::protocol::{elements, properties};
use crate::scan;

/// A right ascension / declination pair.
///
/// Valid values have `ra_hours` in `[0, 24)` and `dec_degrees` in `[-90, 90]`.
/// Use [`Coordinate::new`] for a checked value; the fields are public so that
/// wire readings and offsets can be represented as they are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub ra_hours: f64,
    pub dec_degrees: f64,
}

/// Hours, minutes and seconds of a right ascension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hms {
    pub hours: i32,
    pub minutes: u32,
    pub seconds: u32,
}

/// Degrees and arc minutes of a declination.
///
/// `minutes` is never negative, the sign is carried by `degrees`. For values
/// between -1° and 0° `degrees` is zero and `negative` keeps the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dm {
    pub degrees: i32,
    pub minutes: u32,
    pub negative: bool,
}

impl Coordinate {
    pub fn new(ra_hours: f64, dec_degrees: f64) -> Result<Self> {
        let c = Coordinate {
            ra_hours,
            dec_degrees,
        };
        if c.is_valid() {
            Ok(c)
        } else {
            Err(Error::InvalidCoordinate {
                ra_hours,
                dec_degrees,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..24.0).contains(&self.ra_hours) && (-90.0..=90.0).contains(&self.dec_degrees)
    }

    /// Adds the offsets as they are. The result is not wrapped or clamped.
    pub fn with_offset(self, d_ra_hours: f64, d_dec_degrees: f64) -> Coordinate {
        Coordinate {
            ra_hours: self.ra_hours + d_ra_hours,
            dec_degrees: self.dec_degrees + d_dec_degrees,
        }
    }

    pub fn ra_hms(&self) -> Hms {
        to_hms(self.ra_hours)
    }

    pub fn dec_dm(&self) -> Dm {
        to_dm(self.dec_degrees)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RA {}, Dec {}", self.ra_hms(), self.dec_dm())
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

impl fmt::Display for Dm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative && self.degrees == 0 {
            write!(f, "-0° {}'", self.minutes)
        } else {
            write!(f, "{}° {}'", self.degrees, self.minutes)
        }
    }
}

pub fn to_hms(hours: f64) -> Hms {
    let whole = hours.trunc();
    let minutes = (hours - whole).abs() * 60.0;
    let m = minutes.floor();
    let seconds = ((minutes - m) * 60.0).floor();
    Hms {
        hours: whole as i32,
        minutes: m as u32,
        seconds: seconds as u32,
    }
}

pub fn to_dm(degrees: f64) -> Dm {
    let whole = degrees.trunc();
    let minutes = ((degrees - whole).abs() * 60.0).floor();
    Dm {
        degrees: whole as i32,
        minutes: minutes as u32,
        negative: degrees < 0.0,
    }
}

/// Decode a decimal (`"5.01"`) or sexagesimal (`"5:00:36"`, `"-10:30"`) number.
///
/// The sign applies to the whole value.
pub fn parse_sexagesimal(token: &str) -> Option<f64> {
    let token = token.trim();
    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let mut value = 0.0;
    let mut scale = 1.0;
    for (i, part) in body.split(':').enumerate() {
        if i > 2 {
            return None;
        }
        let part: f64 = part.parse().ok()?;
        value += part / scale;
        scale *= 60.0;
    }

    Some(if negative { -value } else { value })
}

/// The numeric value of element `property` of `device`, as found in `buffer`.
///
/// Returns `None` if the element is not reported by `device` or has no numeric
/// payload within the lookahead window.
pub fn parse(buffer: &str, device: &str, property: &str) -> Option<f64> {
    let scoped = scan::property_scope(buffer, device, property)?;
    scan::number_after(scoped, &scan::name_marker(property)).and_then(parse_sexagesimal)
}

/// The current `EQUATORIAL_EOD_COORD` position of `device`.
pub fn read_equatorial(buffer: &str, device: &str) -> Option<Coordinate> {
    let vector = scan::property_scope(buffer, device, properties::EQUATORIAL_EOD_COORD)?;

    let ra = scan::number_after(vector, &scan::name_marker(elements::RA))
        .and_then(parse_sexagesimal)?;
    let dec = scan::number_after(vector, &scan::name_marker(elements::DEC))
        .and_then(parse_sexagesimal)?;

    Some(Coordinate {
        ra_hours: ra,
        dec_degrees: dec,
    })
}
