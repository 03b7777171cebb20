use std::sync::LazyLock;

use {
    icu_time::zone::{WindowsParser, iana::IanaParserExtended},
    jiff::{
        fmt::{StdFmtWrite, temporal},
        tz::TimeZone,
    },
};

use crate::error::{Error, Result};

static PARSER: temporal::DateTimeParser = temporal::DateTimeParser::new();
static PRINTER: temporal::DateTimePrinter = temporal::DateTimePrinter::new();

/// Returns a list of available time zones sorted by IANA time zone identifier.
pub fn available() -> &'static [String] {
    static IDS: LazyLock<Vec<String>> = LazyLock::new(|| {
        let mut names: Vec<String> = jiff::tz::db()
            .available()
            .filter_map(|name| {
                let name = name.as_str();
                // These duplicate every "normal" zone. They still resolve by
                // exact match, but they would only add noise to substring
                // searches.
                if name.starts_with("posix/") || name.starts_with("right/") {
                    return None;
                }
                Some(name.to_string())
            })
            .collect();
        names.sort();
        names
    });
    &**IDS
}

/// The same identifiers as `available`, but longest first.
///
/// When looking for a known identifier embedded in a longer string, the
/// longest match is the most specific one.
fn longest_first() -> &'static [String] {
    static IDS: LazyLock<Vec<String>> = LazyLock::new(|| {
        let mut names = available().to_vec();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names
    });
    &**IDS
}

/// Maps ICU's BCP-47 zone codes back to canonical IANA identifiers.
fn canonical_names() -> &'static [(icu_time::TimeZone, String)] {
    static NAMES: LazyLock<Vec<(icu_time::TimeZone, String)>> =
        LazyLock::new(|| {
            IanaParserExtended::new()
                .iter()
                .map(|entry| (entry.time_zone, entry.canonical.to_string()))
                .collect()
        });
    &**NAMES
}

/// Returns the identifier to write in a `TZID` parameter for the given zone.
///
/// This is the IANA identifier when there is one. Otherwise it's whatever
/// Jiff's RFC 9557 printer produces, e.g., `+05:00` or a POSIX TZ string.
pub fn zone_id(tz: &TimeZone) -> String {
    if let Some(name) = tz.iana_name() {
        return name.to_string();
    }
    let mut buf = String::new();
    match PRINTER.print_time_zone(tz, StdFmtWrite(&mut buf)) {
        Ok(()) => buf,
        Err(_) => "Etc/Unknown".to_string(),
    }
}

/// Returns true when the zone is UTC under any of its usual names.
pub fn is_utc(tz: &TimeZone) -> bool {
    if *tz == TimeZone::UTC {
        return true;
    }
    matches!(
        tz.iana_name(),
        Some(
            "UTC"
                | "Etc/UTC"
                | "UCT"
                | "Etc/UCT"
                | "Universal"
                | "Etc/Universal"
                | "Zulu"
                | "Etc/Zulu"
        )
    )
}

/// Maps zone identifier strings to time zones.
///
/// Implementations must be cheap to share between threads. The evaluator and
/// the component layer take a resolver as a parameter instead of reaching
/// for a global one, which lets tests pin the "local" zone.
pub trait ZoneResolver: std::fmt::Debug + Send + Sync {
    /// Resolve the given identifier.
    ///
    /// An empty (or all whitespace) identifier resolves to the local zone.
    fn resolve(&self, id: &str) -> Result<TimeZone>;
}

/// The default resolver, backed by the IANA database bundled with Jiff and
/// the Windows zone mapping shipped with ICU4X.
///
/// Identifiers are tried against each source in turn:
///
/// 1. exact IANA identifiers (case insensitive),
/// 2. Windows zone names such as `Eastern Standard Time`,
/// 3. anything Jiff's RFC 9557 parser understands (`UTC`, `+05:00`,
/// POSIX TZ strings) and IANA aliases known to ICU4X.
///
/// If none of those succeed, the same sources are retried with `-` replaced by
/// `/` (old producers wrote `US-Eastern`), and then with substring searches
/// over the known identifiers.
#[derive(Clone, Debug, Default)]
pub struct TzdbResolver {
    local: Option<TimeZone>,
}

impl TzdbResolver {
    /// A resolver whose local zone is the system zone.
    pub fn new() -> TzdbResolver {
        TzdbResolver { local: None }
    }

    /// A resolver whose local zone is `tz` instead of the system zone.
    pub fn with_local(tz: TimeZone) -> TzdbResolver {
        TzdbResolver { local: Some(tz) }
    }

    /// Returns the zone that empty identifiers resolve to.
    pub fn local(&self) -> TimeZone {
        self.local.clone().unwrap_or_else(TimeZone::system)
    }
}

impl ZoneResolver for TzdbResolver {
    fn resolve(&self, id: &str) -> Result<TimeZone> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(self.local());
        }
        let stripped = strip_vendor_prefix(id);
        if let Some(tz) = lookup(stripped) {
            return Ok(tz);
        }
        let slashed = stripped.replace('-', "/");
        if slashed != stripped {
            if let Some(tz) = lookup(&slashed) {
                log::debug!("resolved zone `{id}` as `{slashed}`");
                return Ok(tz);
            }
        }
        if let Some(tz) = search(stripped) {
            log::warn!(
                "resolved zone `{id}` to `{}` by substring search",
                zone_id(&tz),
            );
            return Ok(tz);
        }
        Err(Error::UnrecognizedTimeZone(id.to_string()))
    }
}

/// Removes prefixes that calendar producers put in front of IANA names.
fn strip_vendor_prefix(id: &str) -> &str {
    let id = id
        .strip_prefix("/mozilla.org/")
        .or_else(|| id.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(id);
    id.strip_prefix('/').unwrap_or(id)
}

/// Tries each zone source for an exact match.
fn lookup(id: &str) -> Option<TimeZone> {
    if let Ok(tz) = jiff::tz::db().get(id) {
        return Some(tz);
    }
    if let Some(tz) = windows(id) {
        log::debug!("resolved Windows zone name `{id}`");
        return Some(tz);
    }
    serialized(id)
}

fn windows(id: &str) -> Option<TimeZone> {
    let bcp47 = WindowsParser::new().parse(id, None)?;
    let (_, canonical) =
        canonical_names().iter().find(|(tz, _)| *tz == bcp47)?;
    jiff::tz::db().get(canonical).ok()
}

fn serialized(id: &str) -> Option<TimeZone> {
    if let Ok(tz) = PARSER.parse_time_zone(id) {
        return Some(tz);
    }
    let parsed = IanaParserExtended::new().parse(id);
    if parsed.time_zone == icu_time::TimeZone::UNKNOWN {
        return None;
    }
    jiff::tz::db().get(parsed.canonical).ok()
}

/// The last resort: look for a known identifier inside `id`, or `id` inside
/// a known identifier.
fn search(id: &str) -> Option<TimeZone> {
    if id.len() < 3 {
        return None;
    }
    // Windows names are only matched as trailing words, which catches
    // display names like `(UTC-05:00) Eastern Standard Time`. This runs first
    // since such names tend to contain short IANA names like `UTC`.
    let by_suffix = id
        .char_indices()
        .filter(|&(_, ch)| ch.is_whitespace())
        .find_map(|(i, _)| windows(id[i..].trim_start()));
    if by_suffix.is_some() {
        return by_suffix;
    }
    // Only names with an area component are searched for inside `id`.
    // Otherwise `EST` or `UTC` would match all sorts of junk.
    let found = longest_first()
        .iter()
        .filter(|name| name.contains('/'))
        .find(|name| id.contains(name.as_str()))
        .or_else(|| available().iter().find(|name| name.contains(id)));
    jiff::tz::db().get(found?).ok()
}
