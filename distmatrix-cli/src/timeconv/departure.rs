//! The user's chosen departure: a wall-clock time in a named zone

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepartureError {
    #[error("Could not read '{0}' as a date and time (expected YYYY-MM-DDTHH:MM[:SS])")]
    Unparsable(String),

    #[error("{time} does not exist in {zone} (skipped by a daylight saving change)")]
    Nonexistent { time: String, zone: String },
}

/// A departure instant together with the zone it was chosen in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureSelection {
    local: DateTime<Tz>,
}

impl DepartureSelection {
    pub fn new(local: DateTime<Tz>) -> Self {
        Self { local }
    }

    /// Current time in `tz`, truncated to the minute like a picker would show
    pub fn now(tz: Tz) -> Self {
        let now = Utc::now().with_timezone(&tz);
        let truncated = now
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(now);
        Self::new(truncated)
    }

    /// Interpret a wall-clock time in `tz`.
    /// Ambiguous times (DST fall-back) resolve to the earlier instant.
    pub fn from_naive(naive: NaiveDateTime, tz: Tz) -> Result<Self, DepartureError> {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(local) => Ok(Self { local }),
            LocalResult::Ambiguous(earliest, _) => {
                log::debug!("{} is ambiguous in {}, using the earlier instant", naive, tz.name());
                Ok(Self { local: earliest })
            }
            LocalResult::None => Err(DepartureError::Nonexistent {
                time: naive.to_string(),
                zone: tz.name().to_string(),
            }),
        }
    }

    /// Parse user input: RFC 3339 (offset respected), or a naive
    /// `YYYY-MM-DD[T ]HH:MM[:SS]` read in `tz`
    pub fn parse(text: &str, tz: Tz) -> Result<Self, DepartureError> {
        let text = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self {
                local: dt.with_timezone(&tz),
            });
        }

        const FORMATS: [&str; 4] = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ];

        let naive = FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .ok_or_else(|| DepartureError::Unparsable(text.to_string()))?;

        Self::from_naive(naive, tz)
    }

    pub fn local(&self) -> &DateTime<Tz> {
        &self.local
    }

    /// IANA name of the zone, e.g. "America/Los_Angeles"
    pub fn zone_name(&self) -> &'static str {
        self.local.timezone().name()
    }

    /// Local wall-clock time as the conversion endpoint expects it
    pub fn wall_clock(&self) -> String {
        self.local.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Display form, e.g. "Mar 25, 2025, 10:30 AM PDT"
    pub fn display(&self) -> String {
        self.local.format("%b %-d, %Y, %I:%M %p %Z").to_string()
    }
}
