use std::{cmp::Ordering, hash::Hash};

use {
    anyhow::Context,
    jiff::{
        SignedDuration, Span, Timestamp, Zoned,
        civil::{self, Date},
        fmt::temporal,
        tz::TimeZone,
    },
};

use crate::{
    error::{Error, Result},
    parse::{BytesExt, FromBytes},
    timezone::{self, ZoneResolver},
};

static PARSER: temporal::DateTimeParser = temporal::DateTimeParser::new();

/// A point in time anchored to a time zone, or a whole civil day in a zone.
///
/// This is the value type that every date or date-time in a calendar
/// component is turned into. It is a `jiff::Zoned` plus a flag recording
/// whether the original value was a DATE (a whole day) or a DATE-TIME. When it
/// is a date, the zoned datetime points at the first instant of that day in
/// its zone.
///
/// Equality considers both the instant and the flag, so midnight as a date
/// and midnight as a date-time are not equal. Ordering, via `compare`, only
/// considers the instant. Since those two disagree, this type deliberately
/// does not implement `Ord`.
#[derive(Clone, Debug)]
pub struct ZonedInstant {
    zdt: Zoned,
    has_time: bool,
}

impl ZonedInstant {
    /// Anchor a civil datetime in the given zone.
    ///
    /// This never fails because of daylight saving time. A datetime in a gap
    /// is pushed forward by the length of the gap and a datetime in a fold
    /// uses the offset from before the transition.
    ///
    /// When `has_time` is false, the time component of `dt` is ignored and
    /// the result is the first instant of the day.
    pub fn new(
        dt: civil::DateTime,
        tz: TimeZone,
        has_time: bool,
    ) -> Result<ZonedInstant> {
        if !has_time {
            return ZonedInstant::date(dt.date(), tz);
        }
        let zdt = tz.to_ambiguous_zoned(dt).compatible()?;
        Ok(ZonedInstant { zdt, has_time: true })
    }

    /// A whole civil day in the given zone.
    pub fn date(date: Date, tz: TimeZone) -> Result<ZonedInstant> {
        let zdt = date.to_zoned(tz)?;
        Ok(ZonedInstant { zdt, has_time: false })
    }

    /// Like `new`, but the zone is given as an identifier that is resolved
    /// with `resolver`.
    pub fn resolve(
        dt: civil::DateTime,
        id: &str,
        resolver: &dyn ZoneResolver,
        has_time: bool,
    ) -> Result<ZonedInstant> {
        let tz = resolver.resolve(id).map_err(|err| Error::InvalidTimeZone {
            id: id.to_string(),
            source: Box::new(err),
        })?;
        ZonedInstant::new(dt, tz, has_time)
    }

    /// Wraps an existing zoned datetime as a date-time value.
    pub fn from_zoned(zdt: Zoned) -> ZonedInstant {
        ZonedInstant { zdt, has_time: true }
    }

    pub(crate) fn from_parts(zdt: Zoned, has_time: bool) -> ZonedInstant {
        ZonedInstant { zdt, has_time }
    }

    /// Returns true when this is a date-time and false when it's a date.
    pub fn has_time(&self) -> bool {
        self.has_time
    }

    /// Returns the underlying zoned datetime.
    pub fn zoned(&self) -> &Zoned {
        &self.zdt
    }

    pub fn time_zone(&self) -> &TimeZone {
        self.zdt.time_zone()
    }

    pub fn civil_date(&self) -> Date {
        self.zdt.date()
    }

    pub fn datetime(&self) -> civil::DateTime {
        self.zdt.datetime()
    }

    /// Returns true when this value is anchored in UTC.
    pub fn is_utc(&self) -> bool {
        timezone::is_utc(self.time_zone())
    }

    /// Re-anchor this value in another zone without changing the instant.
    pub fn to_time_zone(&self, tz: TimeZone) -> ZonedInstant {
        let zdt = self.zdt.with_time_zone(tz);
        ZonedInstant { zdt, has_time: self.has_time }
    }

    pub fn to_utc_instant(&self) -> Timestamp {
        self.zdt.timestamp()
    }

    /// Drops the time, keeping the civil date in this value's zone.
    pub fn to_date(&self) -> Result<ZonedInstant> {
        ZonedInstant::date(self.zdt.date(), self.time_zone().clone())
    }

    /// Adds a span. Calendar units are added in civil time, which keeps
    /// "1 day" meaning the same wall clock time the next day.
    ///
    /// A date stays a date when only days or weeks are added. Any time unit
    /// turns it into a date-time, since the result no longer starts a day.
    pub fn add(&self, span: Span) -> Result<ZonedInstant> {
        let zdt = self.zdt.checked_add(span)?;
        let has_time = self.has_time || has_time_units(&span);
        Ok(ZonedInstant { zdt, has_time })
    }

    /// Subtracts a span, with the same treatment of dates as `add`.
    pub fn subtract(&self, span: Span) -> Result<ZonedInstant> {
        let zdt = self.zdt.checked_sub(span)?;
        let has_time = self.has_time || has_time_units(&span);
        Ok(ZonedInstant { zdt, has_time })
    }

    /// Returns the exact duration from `earlier` to this value.
    ///
    /// This is negative when `earlier` is actually later.
    pub fn since(&self, earlier: &ZonedInstant) -> SignedDuration {
        self.zdt.timestamp().duration_since(earlier.zdt.timestamp())
    }

    /// Orders by absolute instant. Whether a value has a time plays no part.
    pub fn compare(&self, other: &ZonedInstant) -> Ordering {
        self.zdt.timestamp().cmp(&other.zdt.timestamp())
    }

    pub fn is_before(&self, other: &ZonedInstant) -> bool {
        self.compare(other).is_lt()
    }

    pub fn is_after(&self, other: &ZonedInstant) -> bool {
        self.compare(other).is_gt()
    }
}

impl PartialEq for ZonedInstant {
    fn eq(&self, rhs: &ZonedInstant) -> bool {
        self.has_time == rhs.has_time
            && self.zdt.timestamp() == rhs.zdt.timestamp()
    }
}

impl Eq for ZonedInstant {}

impl Hash for ZonedInstant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.zdt.timestamp().hash(state);
        self.has_time.hash(state);
    }
}

/// Date-times print in RFC 9557 format, e.g.,
/// `2012-10-12T07:00:00-04:00[America/New_York]`. Dates print as the date
/// followed by the zone annotation, e.g., `2016-01-01[America/New_York]`.
impl std::fmt::Display for ZonedInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.has_time {
            return std::fmt::Display::fmt(&self.zdt, f);
        }
        let id = timezone::zone_id(self.time_zone());
        write!(f, "{}[{id}]", self.zdt.date())
    }
}

/// Returns true when `span` has a non-zero unit smaller than a day.
fn has_time_units(span: &Span) -> bool {
    span.get_hours() != 0
        || span.get_minutes() != 0
        || span.get_seconds() != 0
        || span.get_milliseconds() != 0
        || span.get_microseconds() != 0
        || span.get_nanoseconds() != 0
}

impl std::str::FromStr for ZonedInstant {
    type Err = Error;

    fn from_str(s: &str) -> Result<ZonedInstant> {
        Ok(s.as_bytes().parse()?)
    }
}

impl FromBytes for ZonedInstant {
    type Err = anyhow::Error;

    fn from_bytes(s: &[u8]) -> anyhow::Result<ZonedInstant> {
        let Some(open) = s.iter().position(|&b| b == b'[') else {
            anyhow::bail!(
                "`{}` is missing a time zone annotation",
                bstr::BStr::new(s),
            );
        };
        let head = &s[..open];
        if head.contains(&b'T') || head.contains(&b't') {
            let zdt = PARSER.parse_zoned(s).with_context(|| {
                format!("failed to parse `{}`", bstr::BStr::new(s))
            })?;
            return Ok(ZonedInstant::from_zoned(zdt));
        }
        let date = PARSER.parse_date(head).with_context(|| {
            format!("failed to parse date in `{}`", bstr::BStr::new(s))
        })?;
        let Some(annotation) = s[open + 1..].strip_suffix(b"]") else {
            anyhow::bail!(
                "unclosed time zone annotation in `{}`",
                bstr::BStr::new(s),
            );
        };
        let tz = PARSER.parse_time_zone(annotation).with_context(|| {
            format!("invalid time zone in `{}`", bstr::BStr::new(s))
        })?;
        Ok(ZonedInstant::date(date, tz)?)
    }
}

impl serde::Serialize for ZonedInstant {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ZonedInstant {
    #[inline]
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<ZonedInstant, D::Error> {
        use serde::de;

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = ZonedInstant;

            fn expecting(
                &self,
                f: &mut core::fmt::Formatter,
            ) -> core::fmt::Result {
                f.write_str("an RFC 9557 datetime or date with a time zone")
            }

            #[inline]
            fn visit_bytes<E: de::Error>(
                self,
                value: &[u8],
            ) -> std::result::Result<ZonedInstant, E> {
                value.parse().map_err(de::Error::custom)
            }

            #[inline]
            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> std::result::Result<ZonedInstant, E> {
                self.visit_bytes(value.as_bytes())
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
