use std::{cmp::Ordering, hash::Hash};

use jiff::{SignedDuration, Span, tz::TimeZone};

use crate::{
    datetime::ZonedInstant,
    error::{Error, Result},
    fold,
    span::Duration,
};

/// A span of time with a start and an end, e.g., a single occurrence of an
/// event.
///
/// A period is created either from two instants or from a start and a
/// nominal duration like `P1D`. In the latter case, the end is computed when
/// the period is created, so the end is always available. The duration is
/// remembered so that the period prints the way it was written.
///
/// There is also a degenerate form, created with `Period::instant`, for a
/// bare date or date-time in an RDATE or EXDATE list. Its end is equal to
/// its start and it contains nothing.
#[derive(Clone, Debug)]
pub struct Period {
    start: ZonedInstant,
    end: ZonedInstant,
    nominal: Option<Duration>,
}

impl Period {
    /// Create a period from two instants. The end must come strictly after
    /// the start.
    pub fn new(start: ZonedInstant, end: ZonedInstant) -> Result<Period> {
        if !end.is_after(&start) {
            return Err(Error::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Period { start, end, nominal: None })
    }

    /// Create a period from a start and a strictly positive duration.
    ///
    /// Days and weeks are nominal, so a period of `P1D` starting at 9am
    /// ends at 9am the next day even when that day is 23 or 25 hours long.
    pub fn with_duration(start: ZonedInstant, span: Span) -> Result<Period> {
        let duration = Duration::new(span)?;
        if !duration.is_positive() {
            return Err(Error::InvalidDuration(format!(
                "period duration must be positive, but got `{duration}`",
            )));
        }
        let end = start.add(span)?;
        Ok(Period { start, end, nominal: Some(duration) })
    }

    /// A start-only period.
    pub fn instant(start: ZonedInstant) -> Period {
        Period { end: start.clone(), start, nominal: None }
    }

    /// Parse an RFC 5545 PERIOD value, e.g., `19970101T180000Z/PT5H30M`.
    ///
    /// A value without a `/` is parsed as a bare date or date-time and
    /// gives a start-only period. Values without a `Z` are interpreted in
    /// `tz`.
    pub fn parse(value: &str, tz: &TimeZone) -> Result<Period> {
        let Some((start, rest)) = value.split_once('/') else {
            return Ok(Period::instant(fold::parse_date_time(value, tz)?));
        };
        let start = fold::parse_date_time(start, tz)?;
        if rest.starts_with(['P', 'p', '+', '-']) {
            let duration: Duration = rest.parse()?;
            return Period::with_duration(start, duration.get());
        }
        let end = fold::parse_date_time(rest, tz)?;
        Period::new(start, end)
    }

    pub fn start(&self) -> &ZonedInstant {
        &self.start
    }

    pub fn end(&self) -> &ZonedInstant {
        &self.end
    }

    /// The exact amount of time between the start and the end.
    pub fn duration(&self) -> SignedDuration {
        self.end.since(&self.start)
    }

    /// Returns the duration this period was created with, if any.
    pub fn nominal_duration(&self) -> Option<Span> {
        self.nominal.map(|d| d.get())
    }

    /// Returns true for a start-only period.
    pub fn is_instant(&self) -> bool {
        self.nominal.is_none() && self.start == self.end
    }

    /// Returns true when `start <= instant < end`. A start-only period
    /// contains nothing.
    pub fn contains(&self, instant: &ZonedInstant) -> bool {
        !self.is_instant()
            && !instant.is_before(&self.start)
            && instant.is_before(&self.end)
    }

    /// Returns true when the two periods share at least one instant.
    ///
    /// Periods that merely touch, where one ends exactly when the other
    /// starts, do not overlap.
    pub fn overlaps_with(&self, other: &Period) -> bool {
        self.start.is_before(&other.end) && other.start.is_before(&self.end)
    }

    /// Returns true when either endpoint of `other` falls within this
    /// period.
    ///
    /// Unlike `overlaps_with`, this misses the case where `other` completely
    /// surrounds this period.
    pub fn collides_with(&self, other: &Period) -> bool {
        self.contains(&other.start) || self.contains(&other.end)
    }

    /// Orders periods by their start alone.
    pub fn compare(&self, other: &Period) -> Ordering {
        self.start.compare(&other.start)
    }
}

impl PartialEq for Period {
    fn eq(&self, rhs: &Period) -> bool {
        self.start == rhs.start && self.end == rhs.end
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.start.hash(state);
        self.end.hash(state);
    }
}

/// Prints the RFC 5545 PERIOD value. A start-only period prints its start.
impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&fold::format_date_time(&self.start))?;
        if let Some(duration) = self.nominal {
            write!(f, "/{duration}")
        } else if self.is_instant() {
            Ok(())
        } else {
            write!(f, "/{}", fold::format_date_time(&self.end))
        }
    }
}
