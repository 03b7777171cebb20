use std::sync::LazyLock;

use {
    jiff::{
        civil::{Date, Time},
        tz::TimeZone,
    },
    regex::Regex,
};

use crate::{
    content::{ContentLine, Parameter},
    datetime::ZonedInstant,
    timezone,
};

/// The most octets a content line may have, not counting its CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// A fold followed by a single space or tab, with or without a CR.
static FOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]").unwrap());

static LINE_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").unwrap());

/// Folds a single logical content line for the wire.
///
/// Trailing whitespace is trimmed first. A line of at most 75 octets is
/// returned as is with a CRLF appended. Anything longer is split into a
/// first line of 74 octets followed by continuation lines, each of which is
/// a single space and at most 73 octets. Every physical line, including the
/// last, ends with a CRLF.
///
/// A split never lands inside a UTF-8 encoded codepoint. When one would, the
/// split moves backwards to the start of that codepoint, which makes that
/// physical line a little shorter.
pub fn fold(line: &str) -> String {
    const FIRST: usize = MAX_LINE_OCTETS - 1;
    const CONTINUATION: usize = MAX_LINE_OCTETS - 2;

    let line = line.trim_end();
    if line.len() <= MAX_LINE_OCTETS {
        return format!("{line}\r\n");
    }
    let mut folded = String::with_capacity(line.len() + line.len() / 24);
    let mut rest = line;
    let mut limit = FIRST;
    while !rest.is_empty() {
        let mut end = limit.min(rest.len());
        // A codepoint is at most 4 bytes, so this never reaches 0.
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if limit == CONTINUATION {
            folded.push(' ');
        }
        folded.push_str(&rest[..end]);
        folded.push_str("\r\n");
        rest = &rest[end..];
        limit = CONTINUATION;
    }
    folded
}

/// Undoes folding.
///
/// Line terminators are normalized to CRLF, every CRLF followed by a single
/// space or tab is removed (along with that space or tab) and the final line
/// terminator, if any, is dropped.
///
/// For any content line `x`, `unfold(&fold(x)) == x.trim_end()`.
pub fn unfold(text: &str) -> String {
    let unfolded = FOLD.replace_all(text, "");
    let mut normalized =
        LINE_TERMINATOR.replace_all(&unfolded, "\r\n").into_owned();
    if normalized.ends_with("\r\n") {
        normalized.truncate(normalized.len() - 2);
    }
    normalized
}

/// Formats the value part of a date or date-time property.
///
/// Dates are `YYYYMMDD`. Date-times are `YYYYMMDDTHHMMSS` as a civil
/// datetime in the value's own zone, with a `Z` appended when that zone is
/// UTC.
pub fn format_date_time(zi: &ZonedInstant) -> String {
    let date = zi.civil_date();
    let mut out = format!(
        "{:04}{:02}{:02}",
        date.year(),
        date.month(),
        date.day(),
    );
    if zi.has_time() {
        let time = zi.datetime().time();
        out.push_str(&format!(
            "T{:02}{:02}{:02}",
            time.hour(),
            time.minute(),
            time.second(),
        ));
        if zi.is_utc() {
            out.push('Z');
        }
    }
    out
}

/// Builds a date or date-time property, e.g., `DTSTART` or `EXDATE`.
///
/// The `VALUE` parameter is always written. A `TZID` parameter is written
/// for every zone other than UTC, which is indicated with a `Z` suffix on
/// date-times instead. Dates never carry a `Z`, so a UTC date has neither.
pub fn date_time_line(name: &str, zi: &ZonedInstant) -> ContentLine {
    let mut line = ContentLine::new(name, format_date_time(zi));
    let value = if zi.has_time() { "DATE-TIME" } else { "DATE" };
    line.param(Parameter::new("VALUE", value));
    if !zi.is_utc() {
        let id = timezone::zone_id(zi.time_zone());
        line.param(Parameter::new("TZID", id));
    }
    line
}

/// Returns the unfolded text of `date_time_line(name, zi)`, e.g.,
/// `DTSTART;VALUE=DATE-TIME;TZID=America/New_York:20121012T070000`.
pub fn serialize_date_time(name: &str, zi: &ZonedInstant) -> String {
    date_time_line(name, zi).to_string()
}

/// Parses the value part of a date or date-time property in the given zone.
///
/// An 8 digit value is a date. A date-time with a `Z` suffix is in UTC
/// regardless of `tz`. Otherwise, the civil datetime is interpreted in `tz`,
/// with gaps and folds resolved the same way as `ZonedInstant::new`.
pub(crate) fn parse_date_time(
    value: &str,
    tz: &TimeZone,
) -> anyhow::Result<ZonedInstant> {
    let value = value.trim();
    if value.len() == 8 {
        let date = parse_date(value)?;
        return Ok(ZonedInstant::date(date, tz.clone())?);
    }
    let (value, tz) = match value.strip_suffix(['Z', 'z']) {
        Some(value) => (value, TimeZone::UTC),
        None => (value, tz.clone()),
    };
    let Some((date, time)) = value.split_once(['T', 't']) else {
        anyhow::bail!(
            "`{value}` is not a valid date (YYYYMMDD) \
             or date-time (YYYYMMDDTHHMMSS)",
        );
    };
    let date = parse_date(date)?;
    anyhow::ensure!(
        time.len() == 6 && time.is_ascii(),
        "invalid time `{time}` in `{value}`, expected HHMMSS",
    );
    let hour = digits(&time[0..2])?;
    let minute = digits(&time[2..4])?;
    // RFC 5545 permits a leap second. Jiff does not, so clamp it like
    // Jiff's own parsers do.
    let second = digits(&time[4..6])?.min(59);
    let time = Time::new(hour as i8, minute as i8, second as i8, 0)?;
    Ok(ZonedInstant::new(date.to_datetime(time), tz, true)?)
}

fn parse_date(value: &str) -> anyhow::Result<Date> {
    anyhow::ensure!(
        value.len() == 8 && value.is_ascii(),
        "invalid date `{value}`, expected YYYYMMDD",
    );
    let year = digits(&value[0..4])?;
    let month = digits(&value[4..6])?;
    let day = digits(&value[6..8])?;
    Ok(Date::new(year as i16, month as i8, day as i8)?)
}

fn digits(s: &str) -> anyhow::Result<u16> {
    anyhow::ensure!(
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()),
        "expected only ASCII digits but got `{s}`",
    );
    Ok(s.parse()?)
}

/// Escapes a TEXT value: backslashes, semicolons, commas and newlines.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            ';' => out.push_str(r"\;"),
            ',' => out.push_str(r"\,"),
            '\n' => out.push_str(r"\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Undoes `escape_text`. `\N` is also accepted as a newline. Unrecognized
/// escapes are kept as is.
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some(&c @ ('\\' | ';' | ',')) => out.push(c),
            Some('n' | 'N') => out.push('\n'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}
