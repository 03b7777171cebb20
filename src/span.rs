use {
    anyhow::Context,
    bstr::BStr,
    jiff::{
        Span,
        fmt::temporal::{SpanParser, SpanPrinter},
    },
};

use crate::{
    error::{Error, Result},
    parse::{BytesExt, FromBytes},
};

static PARSER: SpanParser = SpanParser::new();
static PRINTER: SpanPrinter = SpanPrinter::new();

/// An RFC 5545 DURATION value, e.g., `PT1H30M`, `P2W` or `-P1DT12H`.
///
/// This is a wrapper around `jiff::Span`, which does most of the heavy
/// lifting for us. The wrapper exists to enforce what RFC 5545 allows in a
/// duration: weeks, days, hours, minutes and seconds. Years and months are
/// rejected since their length depends on where they're applied in a way
/// that RFC 5545 never specifies.
///
/// Days and weeks are nominal. That is, adding `P1D` to a zoned datetime
/// keeps the same wall clock time on the next day, even across DST
/// transitions. Time units are exact.
#[derive(Clone, Copy, Debug)]
pub struct Duration {
    span: Span,
}

impl Duration {
    /// Wrap a span, failing with `Error::InvalidDuration` when it uses
    /// years or months.
    pub fn new(span: Span) -> Result<Duration> {
        if span.get_years() != 0 || span.get_months() != 0 {
            return Err(Error::InvalidDuration(format!(
                "`{span}` uses years or months, \
                 which are not allowed in iCalendar durations",
            )));
        }
        Ok(Duration { span })
    }

    /// Get the underlying Jiff span.
    pub fn get(&self) -> Span {
        self.span
    }

    /// Returns true when this duration is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.span.is_positive()
    }
}

/// Durations print in ISO 8601 format, which is also what RFC 5545 uses.
impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&PRINTER.span_to_string(&self.span))
    }
}

impl std::str::FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Duration> {
        let span = parse_iso(s.as_bytes())?;
        Duration::new(span)
    }
}

impl FromBytes for Duration {
    type Err = anyhow::Error;

    fn from_bytes(s: &[u8]) -> anyhow::Result<Duration> {
        let span = parse_iso(s)?;
        Ok(Duration::new(span)?)
    }
}

impl serde::Serialize for Duration {
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

impl<'de> serde::Deserialize<'de> for Duration {
    #[inline]
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        use serde::de;

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Duration;

            fn expecting(
                &self,
                f: &mut core::fmt::Formatter,
            ) -> core::fmt::Result {
                f.write_str("an iCalendar duration string")
            }

            #[inline]
            fn visit_bytes<E: de::Error>(
                self,
                value: &[u8],
            ) -> std::result::Result<Duration, E> {
                value.parse().map_err(de::Error::custom)
            }

            #[inline]
            fn visit_str<E: de::Error>(
                self,
                value: &str,
            ) -> std::result::Result<Duration, E> {
                self.visit_bytes(value.as_bytes())
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// Parses an ISO 8601 duration into a `Span`.
///
/// This is the only duration format RFC 5545 defines.
fn parse_iso(bytes: &[u8]) -> anyhow::Result<Span> {
    if bytes.is_empty() {
        anyhow::bail!(
            "an empty string is not a valid duration, \
             expected an ISO 8601 duration like `PT1H`",
        );
    }
    PARSER.parse_span(bytes).with_context(|| {
        format!("`{}` is not a valid ISO 8601 duration", BStr::new(bytes))
    })
}
