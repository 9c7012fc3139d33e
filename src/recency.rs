//! Resolution of relative publication ages ("2h ago") to absolute instants.
//!
//! The trend source reports article ages as short relative strings. They are
//! resolved against a caller-supplied `now` purely for ordering; the derived
//! instant is an approximation and is never stored in place of the raw text.
//!
//! Unknown or missing units resolve with a 1 millisecond multiplier, so an
//! unreadable age lands just before `now` and sorts as the freshest article.

use crate::error::ParseError;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Milliseconds per unit token. Anything else falls back to 1ms.
fn unit_millis(token: &str) -> Option<i64> {
    match token {
        "m" => Some(MINUTE_MS),
        "h" => Some(HOUR_MS),
        "d" => Some(DAY_MS),
        "w" | "week" => Some(WEEK_MS),
        "mo" => Some(30 * DAY_MS),
        "y" => Some(365 * DAY_MS),
        _ => None,
    }
}

/// A parsed relative age: `magnitude` units of `unit_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeAge {
    pub magnitude: i64,
    pub unit_ms: i64,
}

impl RelativeAge {
    pub fn as_duration(&self) -> Duration {
        self.magnitude
            .checked_mul(self.unit_ms)
            .and_then(Duration::try_milliseconds)
            .unwrap_or(Duration::MAX)
    }
}

/// Parse `"<magnitude><unit> ago"`.
///
/// Fails only when there is no leading integer; an unrecognized unit is not
/// an error and yields `unit_ms == 1`.
pub fn parse(relative_age: &str) -> Result<RelativeAge, ParseError> {
    let lowered = relative_age.trim().to_lowercase();
    let body = lowered.strip_suffix("ago").unwrap_or(&lowered).trim();

    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let magnitude = body[..digits_end]
        .parse::<i64>()
        .map_err(|_| ParseError::RelativeAge(relative_age.to_string()))?;
    let unit_ms = unit_millis(body[digits_end..].trim()).unwrap_or(1);

    Ok(RelativeAge { magnitude, unit_ms })
}

/// Resolve a relative age to an instant before `now`.
///
/// Total: input without a magnitude is treated as one unit of 1ms.
pub fn resolve(relative_age: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let age = parse(relative_age).unwrap_or_else(|e| {
        debug!(error = %e, "falling back to freshest-unknown age");
        RelativeAge {
            magnitude: 1,
            unit_ms: 1,
        }
    });

    now.checked_sub_signed(age.as_duration())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
