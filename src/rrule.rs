use std::{
    cmp::Ordering,
    collections::VecDeque,
    sync::{Arc, LazyLock},
};

use {
    anyhow::Context,
    jiff::{
        SignedDuration, Span, Timestamp, ToSpan, Unit, Zoned,
        civil::{Date, DateTime, Time, Weekday},
        tz::TimeZone,
    },
    regex::Regex,
};

use crate::{
    datetime::ZonedInstant,
    error::{Error, Result, ensure_bound},
    fold,
    weekdate::{WeekDate, first_of_week, last_of_week},
};

/// An RFC 5545 recurrence rule, i.e., the value of an RRULE or EXRULE
/// property.
///
/// A rule doesn't have a starting point of its own. It is expanded from a
/// seed with `RecurrenceRule::iter`, which means the same rule can be
/// shared by components with different starts. Cloning a rule is cheap.
///
/// Construction only checks that each part is within its RFC 5545 domain.
/// Combinations of frequency and BY parts that RFC 5545 says "MUST NOT"
/// be used (like BYWEEKNO with FREQ=DAILY) are accepted, and expansion
/// yields whatever the parts produce, which may be nothing.
#[derive(Clone, Debug)]
pub struct RecurrenceRule {
    inner: Arc<RecurrenceRuleInner>,
}

#[derive(Debug)]
struct RecurrenceRuleInner {
    freq: Frequency,
    count: Option<u32>,
    until: Option<ZonedInstant>,
    interval: i32,
    /// `interval` units of `freq`.
    stride: Span,
    by: ByParts,
    week_start: Weekday,
}

/// The BYxxx lists of a rule. Negative values count back from the end of
/// whatever they index into.
#[derive(Clone, Debug, Default)]
struct ByParts {
    second: Vec<i8>,
    minute: Vec<i8>,
    hour: Vec<i8>,
    week_day: Vec<ByWeekday>,
    month_day: Vec<i8>,
    year_day: Vec<i16>,
    week: Vec<i8>,
    month: Vec<i8>,
    set_position: Vec<i32>,
}

impl ByParts {
    /// Returns a copy with every list sorted and without duplicates, so that
    /// expansion doesn't depend on the order values were written in.
    fn normalized(&self) -> ByParts {
        fn norm<T: Clone + Ord>(values: &[T]) -> Vec<T> {
            let mut values = values.to_vec();
            values.sort();
            values.dedup();
            values
        }
        ByParts {
            second: norm(&self.second),
            minute: norm(&self.minute),
            hour: norm(&self.hour),
            week_day: norm(&self.week_day),
            month_day: norm(&self.month_day),
            year_day: norm(&self.year_day),
            week: norm(&self.week),
            month: norm(&self.month),
            set_position: norm(&self.set_position),
        }
    }

    /// Returns true when some part picks the days of a yearly interval.
    fn picks_days(&self) -> bool {
        !(self.month.is_empty()
            && self.week.is_empty()
            && self.year_day.is_empty()
            && self.month_day.is_empty()
            && self.week_day.is_empty())
    }
}

impl RecurrenceRule {
    /// Returns a builder for constructing a `RecurrenceRule`.
    ///
    /// The frequency is the only thing required to create a rule.
    pub fn builder(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder::new(freq)
    }

    /// Parse the value of an RRULE or EXRULE property, e.g.,
    /// `FREQ=WEEKLY;BYDAY=FR;UNTIL=20130430T235959`.
    ///
    /// A leading property name (`RRULE:`) is permitted and ignored. An UNTIL
    /// date-time without a `Z` is interpreted in `tz`, which should be the
    /// zone of the start the rule will be expanded from. Parts starting with
    /// `X-` are ignored.
    pub fn parse(text: &str, tz: &TimeZone) -> Result<RecurrenceRule> {
        parse_builder(text, tz)?.build()
    }

    /// Returns an iterator over every datetime generated by this rule when
    /// it is expanded from `start`.
    ///
    /// Every datetime yielded is in the zone of `start`, and is a date when
    /// `start` is a date. Without COUNT or UNTIL, the iterator only ends at
    /// the limit of Jiff's supported range, so callers should bound it with
    /// `RecurrenceIter::stop_before` or by taking a prefix.
    pub fn iter(&self, start: &ZonedInstant) -> RecurrenceIter {
        let zoned = start.zoned().clone();
        let civil = if start.has_time() {
            zoned.datetime()
        } else {
            zoned.date().to_datetime(Time::midnight())
        };
        let until = self
            .inner
            .until
            .as_ref()
            .map(|until| until_limit(until, zoned.time_zone()));
        let seed = Seed { zoned, civil, has_time: start.has_time(), until };
        RecurrenceIter {
            rule: self.clone(),
            cur: Some((0, seed.civil)),
            seed,
            pending: VecDeque::new(),
            emitted: 0,
            last: None,
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.inner.freq
    }

    pub fn interval(&self) -> i32 {
        self.inner.interval
    }

    pub fn count(&self) -> Option<u32> {
        self.inner.count
    }

    pub fn until(&self) -> Option<&ZonedInstant> {
        self.inner.until.as_ref()
    }

    pub fn week_start(&self) -> Weekday {
        self.inner.week_start
    }

    /// Returns true when this rule has neither COUNT nor UNTIL.
    pub fn is_unbounded(&self) -> bool {
        self.inner.count.is_none() && self.inner.until.is_none()
    }
}

/// Prints the rule in RFC 5545 syntax with its parts in a fixed order.
///
/// An UNTIL date-time is always printed in UTC.
impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fn list<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter,
            name: &str,
            values: &[T],
        ) -> std::fmt::Result {
            if values.is_empty() {
                return Ok(());
            }
            write!(f, ";{name}=")?;
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{value}")?;
            }
            Ok(())
        }

        let r = &self.inner;
        write!(f, "FREQ={}", r.freq)?;
        if let Some(ref until) = r.until {
            let until = if until.has_time() {
                fold::format_date_time(&until.to_time_zone(TimeZone::UTC))
            } else {
                fold::format_date_time(until)
            };
            write!(f, ";UNTIL={until}")?;
        }
        if let Some(count) = r.count {
            write!(f, ";COUNT={count}")?;
        }
        if r.interval != 1 {
            write!(f, ";INTERVAL={}", r.interval)?;
        }
        list(f, "BYSECOND", &r.by.second)?;
        list(f, "BYMINUTE", &r.by.minute)?;
        list(f, "BYHOUR", &r.by.hour)?;
        list(f, "BYDAY", &r.by.week_day)?;
        list(f, "BYMONTHDAY", &r.by.month_day)?;
        list(f, "BYYEARDAY", &r.by.year_day)?;
        list(f, "BYWEEKNO", &r.by.week)?;
        list(f, "BYMONTH", &r.by.month)?;
        list(f, "BYSETPOS", &r.by.set_position)?;
        if r.week_start != Weekday::Monday {
            write!(f, ";WKST={}", weekday_token(r.week_start))?;
        }
        Ok(())
    }
}

/// Returns the last instant covered by an UNTIL value.
///
/// A date-time is used as is. A date covers its entire day in `tz`.
fn until_limit(until: &ZonedInstant, tz: &TimeZone) -> Timestamp {
    if until.has_time() {
        return until.to_utc_instant();
    }
    until
        .civil_date()
        .tomorrow()
        .and_then(|tomorrow| tomorrow.to_zoned(tz.clone()))
        .and_then(|zdt| {
            zdt.timestamp().checked_sub(SignedDuration::from_nanos(1))
        })
        .unwrap_or_else(|_| until.to_utc_instant())
}

fn parse_builder(
    text: &str,
    tz: &TimeZone,
) -> anyhow::Result<RecurrenceRuleBuilder> {
    fn numbers<T>(name: &str, value: &str) -> anyhow::Result<Vec<T>>
    where
        T: std::str::FromStr<Err = std::num::ParseIntError>,
    {
        value
            .split(',')
            .map(str::trim)
            .map(|v| {
                v.parse()
                    .with_context(|| format!("invalid {name} value `{v}`"))
            })
            .collect()
    }

    // Drop a property name and its parameters, e.g., `RRULE:`.
    let text = text.trim();
    let text = text.rsplit_once(':').map_or(text, |(_, value)| value);
    let mut parts: Vec<(String, &str)> = vec![];
    for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((name, value)) = part.split_once('=') else {
            anyhow::bail!("recurrence rule part `{part}` is missing a `=`");
        };
        let name = name.trim().to_ascii_uppercase();
        anyhow::ensure!(
            parts.iter().all(|(seen, _)| *seen != name),
            "recurrence rule part `{name}` is given more than once",
        );
        parts.push((name, value.trim()));
    }
    let Some(&(_, freq)) = parts.iter().find(|(name, _)| name == "FREQ")
    else {
        anyhow::bail!("recurrence rule `{text}` is missing FREQ");
    };

    let mut builder = RecurrenceRule::builder(freq.parse()?);
    for &(ref name, value) in parts.iter() {
        let name = name.as_str();
        match name {
            "FREQ" => {}
            "UNTIL" => {
                let until = fold::parse_date_time(value, tz)
                    .with_context(|| {
                        format!("invalid UNTIL value `{value}`")
                    })?;
                builder.until(until);
            }
            "COUNT" => {
                let count = value.parse().with_context(|| {
                    format!("invalid COUNT value `{value}`")
                })?;
                builder.count(count);
            }
            "INTERVAL" => {
                let interval = value.parse().with_context(|| {
                    format!("invalid INTERVAL value `{value}`")
                })?;
                builder.interval(interval);
            }
            "BYSECOND" => {
                builder.by_second(numbers::<i8>(name, value)?);
            }
            "BYMINUTE" => {
                builder.by_minute(numbers::<i8>(name, value)?);
            }
            "BYHOUR" => {
                builder.by_hour(numbers::<i8>(name, value)?);
            }
            "BYMONTHDAY" => {
                builder.by_month_day(numbers::<i8>(name, value)?);
            }
            "BYYEARDAY" => {
                builder.by_year_day(numbers::<i16>(name, value)?);
            }
            "BYWEEKNO" => {
                builder.by_week(numbers::<i8>(name, value)?);
            }
            "BYMONTH" => {
                builder.by_month(numbers::<i8>(name, value)?);
            }
            "BYSETPOS" => {
                builder.by_set_position(numbers::<i32>(name, value)?);
            }
            "BYDAY" => {
                let days = value
                    .split(',')
                    .map(|v| v.trim().parse::<ByWeekday>())
                    .collect::<anyhow::Result<Vec<ByWeekday>>>()?;
                builder.by_week_day(days);
            }
            "WKST" => {
                let Some(weekday) = weekday_from_token(value) else {
                    anyhow::bail!("invalid WKST value `{value}`");
                };
                builder.week_start(weekday);
            }
            _ if name.starts_with("X-") => {
                log::debug!("ignoring recurrence rule part `{name}`");
            }
            _ => anyhow::bail!("unrecognized recurrence rule part `{name}`"),
        }
    }
    Ok(builder)
}

/// The starting point of one expansion of a rule.
#[derive(Clone, Debug)]
struct Seed {
    zoned: Zoned,
    /// The civil datetime of `zoned`, or midnight for dates.
    civil: DateTime,
    has_time: bool,
    /// The last instant that may be emitted, derived from UNTIL.
    until: Option<Timestamp>,
}

/// One BY part, as a step in the expansion of an interval.
#[derive(Clone, Copy, Debug)]
enum By {
    Month,
    Week,
    YearDay,
    MonthDay,
    /// BYDAY, along with the span that numbered weekdays count within.
    Day(Within),
    Hour,
    Minute,
    Second,
}

#[derive(Clone, Copy, Debug)]
enum Within {
    Year,
    Month,
    Week,
}

/// The parts that only look at the date. At DAILY frequency and finer,
/// they all act as limits.
const DATE_PARTS: [By; 5] = [
    By::Month,
    By::Week,
    By::YearDay,
    By::MonthDay,
    By::Day(Within::Week),
];

/// Expands the interval of a rule that begins at `cur`.
#[derive(Clone, Debug)]
struct Expander<'a> {
    rule: &'a RecurrenceRuleInner,
    seed: &'a Seed,
    cur: DateTime,
}

impl<'a> Expander<'a> {
    /// Returns the instants of this interval in chronological order, after
    /// BYSETPOS has been applied.
    ///
    /// Instants before the seed or after UNTIL are included, since BYSETPOS
    /// positions count them.
    fn instants(&self) -> VecDeque<Zoned> {
        let mut zoned = vec![];
        for dt in self.civil() {
            resolve(self.seed, dt, &mut zoned);
        }
        zoned.sort_by_key(Zoned::timestamp);
        zoned.dedup_by_key(|zdt| zdt.timestamp());
        if self.rule.by.set_position.is_empty() {
            return zoned.into();
        }
        let len = zoned.len();
        zoned
            .into_iter()
            .enumerate()
            .filter(|(i, _)| self.at_set_position(*i, len))
            .map(|(_, zdt)| zdt)
            .collect()
    }

    /// Returns the civil datetimes of this interval, in no particular order.
    fn civil(&self) -> Vec<DateTime> {
        let mut set = vec![];
        let time_parts: &[By] = match self.rule.freq {
            Frequency::Yearly => {
                set.push(self.cur);
                self.yearly(&mut set);
                &[By::Hour, By::Minute, By::Second]
            }
            Frequency::Monthly => {
                if self.accepts(By::Month, self.cur) {
                    set.push(self.cur);
                    self.monthly(&mut set);
                }
                &[By::Hour, By::Minute, By::Second]
            }
            Frequency::Weekly => {
                set.push(self.cur);
                self.weekly(&mut set);
                &[By::Hour, By::Minute, By::Second]
            }
            Frequency::Daily => {
                self.push_if_accepted(&[], &mut set);
                &[By::Hour, By::Minute, By::Second]
            }
            Frequency::Hourly => {
                self.push_if_accepted(&[By::Hour], &mut set);
                &[By::Minute, By::Second]
            }
            Frequency::Minutely => {
                self.push_if_accepted(&[By::Hour, By::Minute], &mut set);
                &[By::Second]
            }
            Frequency::Secondly => {
                let times = [By::Hour, By::Minute, By::Second];
                self.push_if_accepted(&times, &mut set);
                &[]
            }
        };
        for &by in time_parts.iter() {
            self.expand(by, &mut set);
        }
        set
    }

    fn yearly(&self, set: &mut Vec<DateTime>) {
        if self.present(By::Day(Within::Year)) {
            if self.present(By::Week) {
                self.expand(By::Week, set);
                self.expand(By::Day(Within::Week), set);
                self.limit(By::Month, set);
            } else if self.present(By::Month) {
                self.expand(By::Month, set);
                self.expand(By::Day(Within::Month), set);
            } else {
                self.expand(By::Day(Within::Year), set);
            }
            self.limit(By::YearDay, set);
            self.limit(By::MonthDay, set);
        } else if self.present(By::Week) {
            self.expand(By::Week, set);
            // Without BYDAY, a week number selects all seven of its days,
            // unlike BYMONTH, which keeps the day of the seed.
            *set = set
                .iter()
                .flat_map(|&dt| {
                    (0..7).filter_map(move |n| dt.checked_add(n.days()).ok())
                })
                .collect();
            self.limit(By::Month, set);
            self.limit(By::YearDay, set);
            self.limit(By::MonthDay, set);
        } else if self.present(By::Month) {
            if self.present(By::YearDay) && !self.present(By::MonthDay) {
                self.expand(By::YearDay, set);
                self.limit(By::Month, set);
            } else {
                self.expand(By::Month, set);
                self.expand(By::MonthDay, set);
                self.limit(By::YearDay, set);
            }
        } else if self.present(By::MonthDay) {
            *set = set
                .iter()
                .flat_map(|&dt| {
                    (1..=12).filter_map(move |m| {
                        dt.with().day(1).month(m).build().ok()
                    })
                })
                .collect();
            self.expand(By::MonthDay, set);
            self.limit(By::YearDay, set);
        } else {
            self.expand(By::YearDay, set);
        }
    }

    fn monthly(&self, set: &mut Vec<DateTime>) {
        if self.present(By::Day(Within::Month)) {
            self.expand(By::Day(Within::Month), set);
            self.limit(By::MonthDay, set);
        } else {
            self.expand(By::MonthDay, set);
        }
        // RFC 5545 doesn't allow these at MONTHLY frequency.
        self.limit(By::YearDay, set);
        self.limit(By::Week, set);
    }

    fn weekly(&self, set: &mut Vec<DateTime>) {
        self.expand(By::Day(Within::Week), set);
        // Applied per day, since a week can straddle two months.
        self.limit(By::Month, set);
        self.limit(By::MonthDay, set);
        self.limit(By::YearDay, set);
        self.limit(By::Week, set);
    }

    /// Pushes the start of the interval when it passes every date part and
    /// the given time parts.
    fn push_if_accepted(&self, times: &[By], set: &mut Vec<DateTime>) {
        let mut parts = DATE_PARTS.iter().chain(times);
        if parts.all(|&by| self.accepts(by, self.cur)) {
            set.push(self.cur);
        }
    }

    /// Replaces each datetime in `set` with the values `by` derives from
    /// it. Nothing happens when the rule doesn't use `by`.
    fn expand(&self, by: By, set: &mut Vec<DateTime>) {
        if self.present(by) {
            *set = set.iter().flat_map(|&dt| self.values(by, dt)).collect();
        }
    }

    /// Removes every datetime in `set` that `by` rejects.
    fn limit(&self, by: By, set: &mut Vec<DateTime>) {
        set.retain(|&dt| self.accepts(by, dt));
    }

    fn present(&self, by: By) -> bool {
        let b = &self.rule.by;
        match by {
            By::Month => !b.month.is_empty(),
            By::Week => !b.week.is_empty(),
            By::YearDay => !b.year_day.is_empty(),
            By::MonthDay => !b.month_day.is_empty(),
            By::Day(_) => !b.week_day.is_empty(),
            By::Hour => !b.hour.is_empty(),
            By::Minute => !b.minute.is_empty(),
            By::Second => !b.second.is_empty(),
        }
    }

    /// Returns true when `dt` satisfies `by`. This is always true when the
    /// rule doesn't use `by`.
    ///
    /// Numbered weekdays match any week.
    fn accepts(&self, by: By, dt: DateTime) -> bool {
        if !self.present(by) {
            return true;
        }
        let b = &self.rule.by;
        match by {
            By::Month => b.month.contains(&dt.month()),
            By::Week => WeekDate::from_date(self.rule.week_start, dt.date())
                .is_ok_and(|wd| {
                    matches_signed(&b.week, wd.week(), wd.weeks_in_year())
                }),
            By::YearDay => {
                let (n, len) = (dt.day_of_year(), dt.days_in_year());
                matches_signed(&b.year_day, n, len)
            }
            By::MonthDay => {
                matches_signed(&b.month_day, dt.day(), dt.days_in_month())
            }
            By::Day(_) => {
                b.week_day.iter().any(|wd| wd.weekday() == dt.weekday())
            }
            By::Hour => b.hour.contains(&dt.hour()),
            By::Minute => b.minute.contains(&dt.minute()),
            By::Second => b.second.contains(&dt.second()),
        }
    }

    /// Returns the datetimes derived from `dt` for each value of `by`.
    /// Values that don't exist for `dt`, like day 31 in April, are skipped.
    fn values(&self, by: By, dt: DateTime) -> Vec<DateTime> {
        let b = &self.rule.by;
        match by {
            By::Month => {
                // The seed's day, not `dt`'s, since `dt` may have been
                // clamped from Feb 29 to Feb 28. When a later step picks
                // the day, any day that exists in every month will do.
                let day = if self.present(By::MonthDay)
                    || self.present(By::Day(Within::Month))
                {
                    1
                } else {
                    self.seed.civil.day()
                };
                b.month
                    .iter()
                    .filter_map(|&m| dt.with().day(day).month(m).build().ok())
                    .collect()
            }
            By::Week => self.week_starts(dt),
            By::YearDay => {
                let len = dt.days_in_year();
                b.year_day
                    .iter()
                    .filter_map(|&n| {
                        dt.with().day_of_year(count_back(n, len)?).build().ok()
                    })
                    .collect()
            }
            By::MonthDay => {
                let len = dt.days_in_month();
                b.month_day
                    .iter()
                    .filter_map(|&n| {
                        dt.with().day(count_back(n, len)?).build().ok()
                    })
                    .collect()
            }
            By::Day(within) => {
                let mut days = vec![];
                if let Some((first, last)) = self.bounds(within, dt) {
                    for wd in b.week_day.iter() {
                        wd.select(within, first, last, &mut days);
                    }
                }
                days
            }
            By::Hour => b
                .hour
                .iter()
                .filter_map(|&h| dt.with().hour(h).build().ok())
                .collect(),
            By::Minute => b
                .minute
                .iter()
                .filter_map(|&m| dt.with().minute(m).build().ok())
                .collect(),
            By::Second => b
                .second
                .iter()
                .filter_map(|&s| dt.with().second(s).build().ok())
                .collect(),
        }
    }

    /// Returns the first day of each BYWEEKNO week in the calendar year of
    /// `dt`, with the time of `dt`.
    fn week_starts(&self, dt: DateTime) -> Vec<DateTime> {
        let start = self.rule.week_start;
        let year = dt.year();
        let Ok(first) = WeekDate::new(start, year, 1, start) else {
            return vec![];
        };
        let weeks = first.weeks_in_year();
        self.rule
            .by
            .week
            .iter()
            .filter_map(|&week| {
                let week = count_back(week, weeks)?;
                let wd = WeekDate::new(start, year, week, start).ok()?;
                Some(wd.date().ok()?.to_datetime(dt.time()))
            })
            .collect()
    }

    /// Returns the first and last day of the year, month or week (according
    /// to WKST) containing `dt`.
    fn bounds(
        &self,
        within: Within,
        dt: DateTime,
    ) -> Option<(DateTime, DateTime)> {
        match within {
            Within::Year => Some((dt.first_of_year(), dt.last_of_year())),
            Within::Month => Some((dt.first_of_month(), dt.last_of_month())),
            Within::Week => {
                let start = self.rule.week_start;
                let first = first_of_week(start, dt.date()).ok()?;
                let last = last_of_week(start, dt.date()).ok()?;
                let time = dt.time();
                Some((first.to_datetime(time), last.to_datetime(time)))
            }
        }
    }

    /// Returns true when the 0-based `index` into a set of `len` instants
    /// is selected by BYSETPOS.
    fn at_set_position(&self, index: usize, len: usize) -> bool {
        let (Ok(n), Ok(len)) = (i32::try_from(index + 1), i32::try_from(len))
        else {
            return false;
        };
        matches_signed(&self.rule.by.set_position, n, len)
    }
}

/// Returns true when the 1-based position `n` among `len` is in `values`,
/// either as is or counted back from the end, where `-1` is `len`.
fn matches_signed<T: Copy + Into<i32>>(
    values: &[T],
    n: impl Into<i32>,
    len: impl Into<i32>,
) -> bool {
    let (n, len) = (n.into(), len.into());
    let from_end = n - len - 1;
    values.iter().any(|&v| {
        let v = v.into();
        v == n || v == from_end
    })
}

/// Turns a negative 1-based position into a positive one, given the length
/// of what it indexes into.
///
/// The result may be zero or negative when `n` reaches back further than
/// `len`, and building a datetime with it then fails.
fn count_back<T>(n: T, len: T) -> Option<T>
where
    T: Copy + Into<i32> + TryFrom<i32>,
{
    let (n, len): (i32, i32) = (n.into(), len.into());
    T::try_from(if n < 0 { len + n + 1 } else { n }).ok()
}

/// Anchors a civil candidate in the seed's zone.
///
/// This resolves daylight saving time the same way `ZonedInstant::new`
/// does. A local time in a gap moves forward by the length of the gap, and
/// a repeated local time takes its first offset. The seed's own civil time
/// always resolves to the seed.
fn resolve(seed: &Seed, dt: DateTime, out: &mut Vec<Zoned>) {
    let tz = seed.zoned.time_zone();
    if !seed.has_time {
        out.extend(dt.date().to_zoned(tz.clone()).ok());
    } else if dt == seed.civil {
        out.push(seed.zoned.clone());
    } else {
        out.extend(tz.to_ambiguous_zoned(dt).compatible().ok());
    }
}

/// A lazy iterator over the datetimes generated by a recurrence rule from a
/// particular start.
///
/// This is created by `RecurrenceRule::iter`.
#[derive(Clone, Debug)]
pub struct RecurrenceIter {
    rule: RecurrenceRule,
    seed: Seed,
    /// Instants of the current interval that haven't been looked at yet,
    /// earliest first.
    pending: VecDeque<Zoned>,
    /// The index of the next interval to expand and the datetime it begins
    /// at, or `None` when there are no more intervals.
    ///
    /// The datetime is always `seed + index * stride`. Adding the stride to
    /// the previous datetime instead would drift after clamping, e.g.,
    /// 2025-03-31, 2025-04-30, 2025-05-30.
    cur: Option<(i64, DateTime)>,
    /// How many datetimes have been yielded, for COUNT.
    emitted: u64,
    /// The last instant yielded for a date seed. Several civil datetimes
    /// can collapse into the same date, but each date is yielded once.
    last: Option<Timestamp>,
}

impl RecurrenceIter {
    /// Skips ahead so that iteration resumes no more than a couple of
    /// intervals before `target`.
    ///
    /// Every datetime at or after `target` that would have been yielded
    /// without skipping is still yielded. Some datetimes before `target` may
    /// be yielded too, so callers should still filter.
    ///
    /// This does nothing for rules with COUNT, since counting requires
    /// visiting every datetime from the start.
    pub fn fast_forward(&mut self, target: &ZonedInstant) {
        let r = &self.rule.inner;
        if r.count.is_some() {
            return;
        }
        let Some((index, _)) = self.cur else { return };
        let target = target
            .zoned()
            .with_time_zone(self.seed.zoned.time_zone().clone())
            .datetime();
        let (unit, per_stride) = match r.freq {
            Frequency::Yearly => (Unit::Year, 1),
            Frequency::Monthly => (Unit::Month, 1),
            Frequency::Weekly => (Unit::Day, 7),
            Frequency::Daily => (Unit::Day, 1),
            Frequency::Hourly => (Unit::Hour, 1),
            Frequency::Minutely => (Unit::Minute, 1),
            Frequency::Secondly => (Unit::Second, 1),
        };
        let Ok(span) = self.seed.civil.until((unit, target)) else { return };
        let elapsed = match unit {
            Unit::Year => i64::from(span.get_years()),
            Unit::Month => i64::from(span.get_months()),
            Unit::Day => i64::from(span.get_days()),
            Unit::Hour => i64::from(span.get_hours()),
            Unit::Minute => span.get_minutes(),
            _ => span.get_seconds(),
        };
        // Stop one interval short, since some expansions (like BYWEEKNO)
        // reach a little past the interval they belong to.
        let to = elapsed / per_stride / i64::from(r.interval) - 1;
        if to <= index.saturating_add(1) {
            return;
        }
        log::trace!(
            "skipping {freq} rule ahead from interval {index} to {to}",
            freq = r.freq,
        );
        self.pending.clear();
        self.cur = Some((to - 1, self.seed.civil));
        self.cur = self.increment();
    }

    /// Stops iteration before `end`.
    ///
    /// This only tightens the UNTIL bound, so everything before `end` is
    /// yielded exactly as before (and COUNT still counts from the start).
    /// Unlike a `take_while` on the outside, this also stops the search for
    /// candidates when a rule produces nothing at all.
    pub fn stop_before(&mut self, end: &ZonedInstant) {
        let Ok(limit) = end
            .to_utc_instant()
            .checked_sub(SignedDuration::from_nanos(1))
        else {
            return;
        };
        self.seed.until =
            Some(self.seed.until.map_or(limit, |until| until.min(limit)));
    }

    /// Returns the next interval, or `None` when no later interval can
    /// yield anything at or before UNTIL.
    fn increment(&self) -> Option<(i64, DateTime)> {
        let (mut index, _) = self.cur?;
        let r = &self.rule.inner;
        let start = self.seed.civil;
        loop {
            index = index.checked_add(1)?;
            let offset = r.stride.checked_mul(index).ok()?;
            let next = start.checked_add(offset).ok()?;
            if self.is_past_until(next) {
                return None;
            }
            // Jiff clamps 2024-02-29 plus one year to 2025-02-28, but
            // RFC 5545 treats that as the nonexistent 2025-02-29. Such an
            // interval is skipped unless a BY part picks the day anyway.
            let clamped = next.day() != start.day();
            let skip = match r.freq {
                Frequency::Yearly => clamped && !r.by.picks_days(),
                Frequency::Monthly => {
                    clamped
                        && r.by.week_day.is_empty()
                        && r.by.month_day.is_empty()
                }
                _ => false,
            };
            if !skip {
                return Some((index, next));
            }
        }
    }

    /// Returns true when everything the interval beginning at `dt` can
    /// produce comes after UNTIL.
    ///
    /// UNTIL is also checked for each instant yielded, but a rule whose
    /// intervals are always empty would otherwise never stop.
    fn is_past_until(&self, dt: DateTime) -> bool {
        let Some(until) = self.seed.until else { return false };
        self.seed
            .zoned
            .time_zone()
            .to_ambiguous_zoned(self.earliest_in_interval(dt))
            .earlier()
            .is_ok_and(|zdt| zdt.timestamp() > until)
    }

    /// Returns the earliest civil datetime that expanding `dt` can produce.
    /// Expansion can move backwards from `dt`, e.g., with BYMONTHDAY=1.
    fn earliest_in_interval(&self, dt: DateTime) -> DateTime {
        let midnight = |date: Date| date.to_datetime(Time::midnight());
        match self.rule.inner.freq {
            Frequency::Yearly => {
                // Week 1 of a year can begin in the year before.
                let first = dt.date().first_of_year();
                midnight(first.checked_sub(1.week()).unwrap_or(first))
            }
            Frequency::Monthly => midnight(dt.date().first_of_month()),
            Frequency::Weekly => {
                let date = dt.date();
                midnight(date.checked_sub(6.days()).unwrap_or(date))
            }
            Frequency::Daily => midnight(dt.date()),
            Frequency::Hourly => dt
                .with()
                .minute(0)
                .second(0)
                .subsec_nanosecond(0)
                .build()
                .unwrap_or(dt),
            Frequency::Minutely => {
                dt.with().second(0).subsec_nanosecond(0).build().unwrap_or(dt)
            }
            Frequency::Secondly => dt,
        }
    }
}

impl Iterator for RecurrenceIter {
    type Item = ZonedInstant;

    fn next(&mut self) -> Option<ZonedInstant> {
        let limit = self.rule.inner.count.map(u64::from);
        if limit.is_some_and(|limit| self.emitted >= limit) {
            self.cur = None;
            self.pending.clear();
            return None;
        }
        loop {
            while let Some(zdt) = self.pending.pop_front() {
                let ts = zdt.timestamp();
                if ts < self.seed.zoned.timestamp() {
                    continue;
                }
                if self.seed.until.is_some_and(|until| ts > until) {
                    self.pending.clear();
                    break;
                }
                if !self.seed.has_time {
                    if self.last == Some(ts) {
                        continue;
                    }
                    self.last = Some(ts);
                }
                self.emitted += 1;
                return Some(ZonedInstant::from_parts(zdt, self.seed.has_time));
            }
            let (_, cur) = self.cur?;
            self.pending =
                Expander { rule: &self.rule.inner, seed: &self.seed, cur }
                    .instants();
            self.cur = self.increment();
        }
    }
}

impl std::iter::FusedIterator for RecurrenceIter {}

/// Defines a builder method that appends values to one of the BY lists.
macro_rules! by_part {
    ($(#[$attr:meta])* $method:ident, $field:ident, $ty:ty) => {
        $(#[$attr])*
        pub fn $method(
            &mut self,
            values: impl IntoIterator<Item = $ty>,
        ) -> &mut RecurrenceRuleBuilder {
            self.by.$field.extend(values);
            self
        }
    };
}

/// A builder for constructing a valid recurrence rule.
#[derive(Clone, Debug)]
pub struct RecurrenceRuleBuilder {
    freq: Frequency,
    count: Option<u32>,
    until: Option<ZonedInstant>,
    interval: i32,
    by: ByParts,
    week_start: Weekday,
}

impl RecurrenceRuleBuilder {
    fn new(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder {
            freq,
            count: None,
            until: None,
            interval: 1,
            by: ByParts::default(),
            week_start: Weekday::Monday,
        }
    }

    /// Validate and build the rule.
    ///
    /// This fails with `Error::InvalidRecurrenceBound` when both COUNT and
    /// UNTIL are set, or when any value is outside of its RFC 5545 domain.
    pub fn build(&self) -> Result<RecurrenceRule> {
        ensure_bound!(
            self.count.is_none() || self.until.is_none(),
            "COUNT and UNTIL cannot both be set",
        );
        ensure_bound!(
            self.interval >= 1,
            "INTERVAL value `{}` must be at least 1",
            self.interval,
        );
        let by = &self.by;
        // RFC 5545 permits a BYSECOND of 60 for leap seconds, which Jiff
        // can't represent.
        check_domain("BYSECOND", &by.second, Domain::Plain(0, 59))?;
        check_domain("BYMINUTE", &by.minute, Domain::Plain(0, 59))?;
        check_domain("BYHOUR", &by.hour, Domain::Plain(0, 23))?;
        check_domain("BYMONTHDAY", &by.month_day, Domain::Signed(31))?;
        check_domain("BYYEARDAY", &by.year_day, Domain::Signed(366))?;
        check_domain("BYWEEKNO", &by.week, Domain::Signed(53))?;
        check_domain("BYMONTH", &by.month, Domain::Plain(1, 12))?;
        check_domain("BYSETPOS", &by.set_position, Domain::Signed(366))?;
        // Numbered weekdays count within the year, unless BYMONTH or the
        // frequency narrows them to a month.
        let nth = if self.freq == Frequency::Yearly && by.month.is_empty() {
            Domain::Signed(53)
        } else {
            Domain::Signed(5)
        };
        for &v in by.week_day.iter() {
            let ByWeekday::Numbered { nth: n, .. } = v else { continue };
            ensure_bound!(
                nth.contains(n.into()),
                "BYDAY value `{v}` is out of range \
                 (its number must be in {nth})",
            );
        }

        let stride = self.freq.to_span(self.interval).map_err(|err| {
            Error::InvalidRecurrenceBound(format!(
                "INTERVAL value `{}` is too big for {} frequency: {err}",
                self.interval, self.freq,
            ))
        })?;
        let inner = Arc::new(RecurrenceRuleInner {
            freq: self.freq,
            count: self.count,
            until: self.until.clone(),
            interval: self.interval,
            stride,
            by: by.normalized(),
            week_start: self.week_start,
        });
        Ok(RecurrenceRule { inner })
    }

    /// Stop after this many datetimes have been yielded.
    pub fn count(&mut self, count: u32) -> &mut RecurrenceRuleBuilder {
        self.count = Some(count);
        self
    }

    /// Stop after this point in time. A date covers its entire day.
    pub fn until(
        &mut self,
        until: ZonedInstant,
    ) -> &mut RecurrenceRuleBuilder {
        self.until = Some(until);
        self
    }

    pub fn interval(&mut self, interval: i32) -> &mut RecurrenceRuleBuilder {
        self.interval = interval;
        self
    }

    by_part!(by_second, second, i8);
    by_part!(by_minute, minute, i8);
    by_part!(by_hour, hour, i8);
    by_part!(by_month_day, month_day, i8);
    by_part!(by_year_day, year_day, i16);
    by_part!(
        /// Add BYWEEKNO values, numbered according to the week start.
        by_week, week, i8
    );
    by_part!(by_month, month, i8);
    by_part!(by_set_position, set_position, i32);

    /// Add BYDAY values. Anything convertible to a `ByWeekday` works, e.g.,
    /// `[Weekday::Tuesday, Weekday::Thursday]` or `[(-1, Weekday::Friday)]`.
    pub fn by_week_day(
        &mut self,
        week_days: impl IntoIterator<Item = impl Into<ByWeekday>>,
    ) -> &mut RecurrenceRuleBuilder {
        self.by.week_day.extend(week_days.into_iter().map(Into::into));
        self
    }

    pub fn week_start(
        &mut self,
        weekday: Weekday,
    ) -> &mut RecurrenceRuleBuilder {
        self.week_start = weekday;
        self
    }
}

/// The values a numeric rule part accepts.
#[derive(Clone, Copy, Debug)]
enum Domain {
    /// `lo..=hi`.
    Plain(i32, i32),
    /// `1..=n` or `-n..=-1`.
    Signed(i32),
}

impl Domain {
    fn contains(self, v: i32) -> bool {
        match self {
            Domain::Plain(lo, hi) => (lo..=hi).contains(&v),
            Domain::Signed(n) => {
                (1..=n).contains(&v) || (-n..=-1).contains(&v)
            }
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Domain::Plain(lo, hi) => write!(f, "{lo}..={hi}"),
            Domain::Signed(n) => write!(f, "1..={n} or -{n}..=-1"),
        }
    }
}

fn check_domain<T>(name: &str, values: &[T], domain: Domain) -> Result<()>
where
    T: Copy + Into<i32> + std::fmt::Display,
{
    for &v in values.iter() {
        ensure_bound!(
            domain.contains(v.into()),
            "{name} value `{v}` is out of range (expected {domain})",
        );
    }
    Ok(())
}

/// The FREQ part of a recurrence rule.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    const ALL: [Frequency; 7] = [
        Frequency::Yearly,
        Frequency::Monthly,
        Frequency::Weekly,
        Frequency::Daily,
        Frequency::Hourly,
        Frequency::Minutely,
        Frequency::Secondly,
    ];

    /// Returns `interval` units of this frequency.
    fn to_span(
        &self,
        interval: i32,
    ) -> std::result::Result<Span, jiff::Error> {
        let unit = match *self {
            Frequency::Yearly => 1.year(),
            Frequency::Monthly => 1.month(),
            Frequency::Weekly => 1.week(),
            Frequency::Daily => 1.day(),
            Frequency::Hourly => 1.hour(),
            Frequency::Minutely => 1.minute(),
            Frequency::Secondly => 1.second(),
        };
        unit.checked_mul(i64::from(interval))
    }

    fn as_str(&self) -> &'static str {
        match *self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a FREQ value. Case is ignored.
impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Frequency> {
        let name = s.trim();
        Frequency::ALL
            .into_iter()
            .find(|freq| freq.as_str().eq_ignore_ascii_case(name))
            .with_context(|| format!("unrecognized frequency `{name}`"))
    }
}

/// A BYDAY value: either any occurrence of a weekday (`MO`) or a numbered
/// one (`-1FR`, the last Friday).
///
/// A numbered weekday counts within the month at MONTHLY frequency (or at
/// YEARLY frequency with BYMONTH), and within the year at YEARLY frequency.
/// Anywhere else the number is ignored.
///
/// The `Ord` impl exists for sorting and de-duplicating lists of values.
/// It puts Monday first regardless of any rule's week start.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByWeekday {
    Any(Weekday),
    Numbered { nth: i8, weekday: Weekday },
}

impl ByWeekday {
    /// Returns the weekday, ignoring any number.
    pub fn weekday(&self) -> Weekday {
        match *self {
            ByWeekday::Any(weekday) => weekday,
            ByWeekday::Numbered { weekday, .. } => weekday,
        }
    }

    /// Pushes the days from `first` to `last` (inclusive) that this value
    /// selects.
    ///
    /// Within a year or a month, a numbered weekday selects at most one day,
    /// counting forward from `first` or, when negative, back from `last`.
    /// Otherwise, every day with a matching weekday is selected.
    fn select(
        &self,
        within: Within,
        first: DateTime,
        last: DateTime,
        out: &mut Vec<DateTime>,
    ) {
        if let ByWeekday::Numbered { nth, weekday } = *self {
            if !matches!(within, Within::Week) {
                out.extend(nth_between(nth, weekday, first, last));
                return;
            }
        }
        let weekday = self.weekday();
        let ahead = i64::from(weekday.since(first.weekday()));
        let mut day = first.checked_add(ahead.days()).ok();
        while let Some(dt) = day.filter(|dt| *dt <= last) {
            out.push(dt);
            day = dt.checked_add(1.week()).ok();
        }
    }

    /// A sort key where plain weekdays come before numbered ones.
    fn key(&self) -> (bool, i8, i8) {
        match *self {
            ByWeekday::Any(weekday) => {
                (false, 0, weekday.to_monday_one_offset())
            }
            ByWeekday::Numbered { nth, weekday } => {
                (true, nth, weekday.to_monday_one_offset())
            }
        }
    }
}

/// Returns the `nth` `weekday` from `first`, or from `last` when `nth` is
/// negative, as long as it doesn't go past the other end.
fn nth_between(
    nth: i8,
    weekday: Weekday,
    first: DateTime,
    last: DateTime,
) -> Option<DateTime> {
    let weeks = i64::from(nth.unsigned_abs()) - 1;
    let dt = if nth > 0 {
        let ahead = i64::from(weekday.since(first.weekday()));
        first.checked_add((ahead + 7 * weeks).days()).ok()?
    } else {
        let back = i64::from(last.weekday().since(weekday));
        last.checked_sub((back + 7 * weeks).days()).ok()?
    };
    (first <= dt && dt <= last).then_some(dt)
}

impl From<Weekday> for ByWeekday {
    fn from(weekday: Weekday) -> ByWeekday {
        ByWeekday::Any(weekday)
    }
}

impl From<(i8, Weekday)> for ByWeekday {
    fn from((nth, weekday): (i8, Weekday)) -> ByWeekday {
        ByWeekday::Numbered { nth, weekday }
    }
}

impl Ord for ByWeekday {
    fn cmp(&self, rhs: &ByWeekday) -> Ordering {
        self.key().cmp(&rhs.key())
    }
}

impl PartialOrd for ByWeekday {
    fn partial_cmp(&self, rhs: &ByWeekday) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl std::str::FromStr for ByWeekday {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<ByWeekday> {
        static BYDAY: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)^([+-]?[0-9]{1,2})?([A-Z]{2})$").unwrap()
        });

        let Some(caps) = BYDAY.captures(s) else {
            anyhow::bail!("invalid BYDAY value `{s}`");
        };
        let Some(weekday) = weekday_from_token(&caps[2]) else {
            anyhow::bail!("invalid BYDAY value `{s}`");
        };
        let Some(nth) = caps.get(1) else {
            return Ok(ByWeekday::Any(weekday));
        };
        let nth = nth.as_str().parse().with_context(|| {
            format!("invalid weekday number in BYDAY value `{s}`")
        })?;
        Ok(ByWeekday::Numbered { nth, weekday })
    }
}

impl std::fmt::Display for ByWeekday {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let ByWeekday::Numbered { nth, .. } = *self {
            write!(f, "{nth}")?;
        }
        f.write_str(weekday_token(self.weekday()))
    }
}

/// Two letter weekday names, Monday first.
const WEEKDAY_TOKENS: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

fn weekday_token(weekday: Weekday) -> &'static str {
    let i = weekday.to_monday_zero_offset().unsigned_abs();
    WEEKDAY_TOKENS[usize::from(i)]
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    let token = token.trim();
    let i = WEEKDAY_TOKENS.iter().position(|t| t.eq_ignore_ascii_case(token))?;
    Weekday::from_monday_zero_offset(i8::try_from(i).ok()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Most of these are the RRULE examples from RFC 5545, section 3.8.5.3,
    // in the order they appear there. Rules without COUNT or UNTIL don't
    // end, so only a prefix of them is checked.

    fn zoned(s: &str) -> ZonedInstant {
        s.parse().unwrap()
    }

    fn rule(start: &ZonedInstant, text: &str) -> RecurrenceRule {
        RecurrenceRule::parse(text, start.time_zone()).unwrap()
    }

    /// Prints an instant compactly. The zone is left out, since every test
    /// uses a single one.
    fn show(zi: &ZonedInstant) -> String {
        let format =
            if zi.has_time() { "%Y-%m-%d %H:%M %:z" } else { "%Y-%m-%d" };
        zi.zoned().strftime(format).to_string()
    }

    fn listing(it: impl IntoIterator<Item = ZonedInstant>) -> String {
        it.into_iter().map(|zi| show(&zi)).collect::<Vec<_>>().join("\n")
    }

    /// Expands `text` from `start` and lists at most `limit` datetimes.
    fn expand(start: &str, text: &str, limit: usize) -> String {
        let start = zoned(start);
        listing(rule(&start, text).iter(&start).take(limit))
    }

    fn parse_err(text: &str) -> String {
        let tz = jiff::tz::db().get("America/New_York").unwrap();
        RecurrenceRule::parse(text, &tz).unwrap_err().to_string()
    }

    const NY: &str = "1997-09-02T09:00:00[America/New_York]";

    #[test]
    fn rfc_daily() {
        insta::assert_snapshot!(
            expand(NY, "FREQ=DAILY;COUNT=10", 100),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-03 09:00 -04:00
        1997-09-04 09:00 -04:00
        1997-09-05 09:00 -04:00
        1997-09-06 09:00 -04:00
        1997-09-07 09:00 -04:00
        1997-09-08 09:00 -04:00
        1997-09-09 09:00 -04:00
        1997-09-10 09:00 -04:00
        1997-09-11 09:00 -04:00
        ",
        );

        let start = zoned(NY);
        let all: Vec<ZonedInstant> =
            rule(&start, "FREQ=DAILY;UNTIL=19971224T000000Z")
                .iter(&start)
                .collect();
        assert_eq!(all.len(), 113);
        insta::assert_snapshot!(show(&all[112]), @"1997-12-23 09:00 -05:00");

        insta::assert_snapshot!(
            expand(NY, "FREQ=DAILY;INTERVAL=2", 4),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-04 09:00 -04:00
        1997-09-06 09:00 -04:00
        1997-09-08 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(NY, "FREQ=DAILY;INTERVAL=10;COUNT=5", 100),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-12 09:00 -04:00
        1997-09-22 09:00 -04:00
        1997-10-02 09:00 -04:00
        1997-10-12 09:00 -04:00
        ",
        );
    }

    /// Every day in January for three years, written two different ways.
    #[test]
    fn rfc_january_days() {
        let start = zoned("1998-01-01T09:00:00[America/New_York]");
        let yearly = rule(
            &start,
            "FREQ=YEARLY;UNTIL=20000131T140000Z;\
             BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
        );
        let daily =
            rule(&start, "FREQ=DAILY;UNTIL=20000131T140000Z;BYMONTH=1");
        let yearly: Vec<ZonedInstant> = yearly.iter(&start).collect();
        let daily: Vec<ZonedInstant> = daily.iter(&start).collect();
        assert_eq!(yearly, daily);
        assert_eq!(daily.len(), 93);
        insta::assert_snapshot!(
            listing([30, 31, 92].map(|i| daily[i].clone())),
            @r"
        1998-01-31 09:00 -05:00
        1999-01-01 09:00 -05:00
        2000-01-31 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_weekly() {
        insta::assert_snapshot!(
            expand(NY, "FREQ=WEEKLY;COUNT=10", 100),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-09 09:00 -04:00
        1997-09-16 09:00 -04:00
        1997-09-23 09:00 -04:00
        1997-09-30 09:00 -04:00
        1997-10-07 09:00 -04:00
        1997-10-14 09:00 -04:00
        1997-10-21 09:00 -04:00
        1997-10-28 09:00 -05:00
        1997-11-04 09:00 -05:00
        ",
        );

        let until = expand(NY, "FREQ=WEEKLY;UNTIL=19971224T000000Z", 100);
        assert_eq!(until.lines().count(), 17);
        assert_eq!(until.lines().last(), Some("1997-12-23 09:00 -05:00"));
    }

    #[test]
    fn rfc_weekly_tuesday_thursday() {
        let until = expand(
            NY,
            "FREQ=WEEKLY;UNTIL=19971007T000000Z;WKST=SU;BYDAY=TU,TH",
            100,
        );
        let count =
            expand(NY, "FREQ=WEEKLY;COUNT=10;WKST=SU;BYDAY=TU,TH", 100);
        assert_eq!(until, count);
        insta::assert_snapshot!(
            count,
            @r"
        1997-09-02 09:00 -04:00
        1997-09-04 09:00 -04:00
        1997-09-09 09:00 -04:00
        1997-09-11 09:00 -04:00
        1997-09-16 09:00 -04:00
        1997-09-18 09:00 -04:00
        1997-09-23 09:00 -04:00
        1997-09-25 09:00 -04:00
        1997-09-30 09:00 -04:00
        1997-10-02 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                NY,
                "FREQ=WEEKLY;INTERVAL=2;COUNT=8;WKST=SU;BYDAY=TU,TH",
                100,
            ),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-04 09:00 -04:00
        1997-09-16 09:00 -04:00
        1997-09-18 09:00 -04:00
        1997-09-30 09:00 -04:00
        1997-10-02 09:00 -04:00
        1997-10-14 09:00 -04:00
        1997-10-16 09:00 -04:00
        ",
        );
    }

    /// The same rule gives different days when only WKST changes.
    #[test]
    fn rfc_week_start_matters() {
        let start = "1997-08-05T09:00:00[America/New_York]";
        let monday = "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO";
        let sunday = "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU";
        insta::assert_snapshot!(
            expand(start, monday, 100),
            @r"
        1997-08-05 09:00 -04:00
        1997-08-10 09:00 -04:00
        1997-08-19 09:00 -04:00
        1997-08-24 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(start, sunday, 100),
            @r"
        1997-08-05 09:00 -04:00
        1997-08-17 09:00 -04:00
        1997-08-19 09:00 -04:00
        1997-08-31 09:00 -04:00
        ",
        );
    }

    /// BYMONTH limits the days picked by BYDAY, not the week they are in.
    #[test]
    fn weekly_month_limit_applies_per_day() {
        insta::assert_snapshot!(
            expand(
                "1997-09-29T09:00:00[America/New_York]",
                "FREQ=WEEKLY;BYDAY=MO,FR;BYMONTH=10",
                3,
            ),
            @r"
        1997-10-03 09:00 -04:00
        1997-10-06 09:00 -04:00
        1997-10-10 09:00 -04:00
        ",
        );
    }

    #[test]
    fn rfc_monthly_numbered_weekdays() {
        let start = "1997-09-05T09:00:00[America/New_York]";
        let count = expand(start, "FREQ=MONTHLY;COUNT=10;BYDAY=1FR", 100);
        insta::assert_snapshot!(
            count,
            @r"
        1997-09-05 09:00 -04:00
        1997-10-03 09:00 -04:00
        1997-11-07 09:00 -05:00
        1997-12-05 09:00 -05:00
        1998-01-02 09:00 -05:00
        1998-02-06 09:00 -05:00
        1998-03-06 09:00 -05:00
        1998-04-03 09:00 -05:00
        1998-05-01 09:00 -04:00
        1998-06-05 09:00 -04:00
        ",
        );
        let until = expand(
            start,
            "FREQ=MONTHLY;UNTIL=19971224T000000Z;BYDAY=1FR",
            100,
        );
        let first_four: Vec<&str> = count.lines().take(4).collect();
        assert_eq!(until.lines().collect::<Vec<&str>>(), first_four);

        insta::assert_snapshot!(
            expand(
                "1997-09-07T09:00:00[America/New_York]",
                "FREQ=MONTHLY;INTERVAL=2;COUNT=6;BYDAY=1SU,-1SU",
                100,
            ),
            @r"
        1997-09-07 09:00 -04:00
        1997-09-28 09:00 -04:00
        1997-11-02 09:00 -05:00
        1997-11-30 09:00 -05:00
        1998-01-04 09:00 -05:00
        1998-01-25 09:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-09-22T09:00:00[America/New_York]",
                "FREQ=MONTHLY;COUNT=6;BYDAY=-2MO",
                100,
            ),
            @r"
        1997-09-22 09:00 -04:00
        1997-10-20 09:00 -04:00
        1997-11-17 09:00 -05:00
        1997-12-22 09:00 -05:00
        1998-01-19 09:00 -05:00
        1998-02-16 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_monthly_days_of_month() {
        insta::assert_snapshot!(
            expand(
                "1997-09-28T09:00:00[America/New_York]",
                "FREQ=MONTHLY;BYMONTHDAY=-3",
                6,
            ),
            @r"
        1997-09-28 09:00 -04:00
        1997-10-29 09:00 -05:00
        1997-11-28 09:00 -05:00
        1997-12-29 09:00 -05:00
        1998-01-29 09:00 -05:00
        1998-02-26 09:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-09-30T09:00:00[America/New_York]",
                "FREQ=MONTHLY;COUNT=6;BYMONTHDAY=1,-1",
                100,
            ),
            @r"
        1997-09-30 09:00 -04:00
        1997-10-01 09:00 -04:00
        1997-10-31 09:00 -05:00
        1997-11-01 09:00 -05:00
        1997-11-30 09:00 -05:00
        1997-12-01 09:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-09-10T09:00:00[America/New_York]",
                "FREQ=MONTHLY;INTERVAL=18;COUNT=8;\
                 BYMONTHDAY=10,11,12,13,14,15",
                100,
            ),
            @r"
        1997-09-10 09:00 -04:00
        1997-09-11 09:00 -04:00
        1997-09-12 09:00 -04:00
        1997-09-13 09:00 -04:00
        1997-09-14 09:00 -04:00
        1997-09-15 09:00 -04:00
        1999-03-10 09:00 -05:00
        1999-03-11 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_friday_the_thirteenth() {
        insta::assert_snapshot!(
            expand(NY, "FREQ=MONTHLY;BYDAY=FR;BYMONTHDAY=13", 5),
            @r"
        1998-02-13 09:00 -05:00
        1998-03-13 09:00 -05:00
        1998-11-13 09:00 -05:00
        1999-08-13 09:00 -04:00
        2000-10-13 09:00 -04:00
        ",
        );
    }

    #[test]
    fn rfc_set_positions() {
        insta::assert_snapshot!(
            expand(
                "1997-09-04T09:00:00[America/New_York]",
                "FREQ=MONTHLY;COUNT=3;BYDAY=TU,WE,TH;BYSETPOS=3",
                100,
            ),
            @r"
        1997-09-04 09:00 -04:00
        1997-10-07 09:00 -04:00
        1997-11-06 09:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-09-29T09:00:00[America/New_York]",
                "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2",
                4,
            ),
            @r"
        1997-09-29 09:00 -04:00
        1997-10-30 09:00 -05:00
        1997-11-27 09:00 -05:00
        1997-12-30 09:00 -05:00
        ",
        );
    }

    /// Both ends of BYSETPOS count hours of the same day here.
    #[test]
    fn set_positions_over_hours() {
        let start = "2025-05-01T00:00:00[America/New_York]";
        let hours = "FREQ=YEARLY;UNTIL=20250531T235959;\
                     BYHOUR=9,10,11,12,13,14,15,16,17,18,19,20,21,22,23";
        insta::assert_snapshot!(
            expand(start, &format!("{hours};BYSETPOS=1,2"), 100),
            @r"
        2025-05-01 09:00 -04:00
        2025-05-01 10:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(start, &format!("{hours};BYSETPOS=-1,-15,16"), 100),
            @r"
        2025-05-01 09:00 -04:00
        2025-05-01 23:00 -04:00
        ",
        );
    }

    #[test]
    fn nonexistent_days_are_skipped() {
        insta::assert_snapshot!(
            expand(
                "2007-01-15T09:00:00[America/New_York]",
                "FREQ=MONTHLY;BYMONTHDAY=15,30;COUNT=5",
                100,
            ),
            @r"
        2007-01-15 09:00 -05:00
        2007-01-30 09:00 -05:00
        2007-02-15 09:00 -05:00
        2007-03-15 09:00 -04:00
        2007-03-30 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "2024-02-29T12:00:00[America/New_York]",
                "FREQ=YEARLY;COUNT=2",
                100,
            ),
            @r"
        2024-02-29 12:00 -05:00
        2028-02-29 12:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "2025-01-31T12:00:00[America/New_York]",
                "FREQ=MONTHLY;COUNT=3",
                100,
            ),
            @r"
        2025-01-31 12:00 -05:00
        2025-03-31 12:00 -04:00
        2025-05-31 12:00 -04:00
        ",
        );
    }

    #[test]
    fn rfc_yearly() {
        insta::assert_snapshot!(
            expand(
                "1997-03-10T09:00:00[America/New_York]",
                "FREQ=YEARLY;INTERVAL=2;COUNT=7;BYMONTH=1,2,3",
                100,
            ),
            @r"
        1997-03-10 09:00 -05:00
        1999-01-10 09:00 -05:00
        1999-02-10 09:00 -05:00
        1999-03-10 09:00 -05:00
        2001-01-10 09:00 -05:00
        2001-02-10 09:00 -05:00
        2001-03-10 09:00 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-01-01T09:00:00[America/New_York]",
                "FREQ=YEARLY;INTERVAL=3;COUNT=6;BYYEARDAY=1,100,200",
                100,
            ),
            @r"
        1997-01-01 09:00 -05:00
        1997-04-10 09:00 -04:00
        1997-07-19 09:00 -04:00
        2000-01-01 09:00 -05:00
        2000-04-09 09:00 -04:00
        2000-07-18 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-03-13T09:00:00[America/New_York]",
                "FREQ=YEARLY;BYMONTH=3;BYDAY=TH",
                5,
            ),
            @r"
        1997-03-13 09:00 -05:00
        1997-03-20 09:00 -05:00
        1997-03-27 09:00 -05:00
        1998-03-05 09:00 -05:00
        1998-03-12 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_yearly_numbered_weeks_and_weekdays() {
        insta::assert_snapshot!(
            expand(
                "1997-05-19T09:00:00[America/New_York]",
                "FREQ=YEARLY;BYDAY=20MO",
                4,
            ),
            @r"
        1997-05-19 09:00 -04:00
        1998-05-18 09:00 -04:00
        1999-05-17 09:00 -04:00
        2000-05-15 09:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "1997-05-12T09:00:00[America/New_York]",
                "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO",
                4,
            ),
            @r"
        1997-05-12 09:00 -04:00
        1998-05-11 09:00 -04:00
        1999-05-17 09:00 -04:00
        2000-05-15 09:00 -04:00
        ",
        );
    }

    /// 2026 has 53 ISO weeks and 2027 has 52, so the last week of 2027 must
    /// be counted from 2027 even though January 1 belongs to week 53 of
    /// 2026.
    #[test]
    fn last_week_of_year() {
        insta::assert_snapshot!(
            expand(
                "2027-01-01T09:00:00[America/New_York]",
                "FREQ=YEARLY;BYWEEKNO=-1;BYDAY=MO;COUNT=2",
                100,
            ),
            @r"
        2027-12-27 09:00 -05:00
        2028-12-25 09:00 -05:00
        ",
        );
    }

    /// The seed is on the 31st, which February doesn't have, but BYMONTHDAY
    /// picks the day.
    #[test]
    fn month_expansion_from_late_seed() {
        insta::assert_snapshot!(
            expand(
                "1997-01-31T09:00:00[America/New_York]",
                "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=1;COUNT=2",
                100,
            ),
            @r"
        1997-02-01 09:00 -05:00
        1998-02-01 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_election_day() {
        insta::assert_snapshot!(
            expand(
                "1996-11-05T09:00:00[America/New_York]",
                "FREQ=YEARLY;INTERVAL=4;BYMONTH=11;BYDAY=TU;\
                 BYMONTHDAY=2,3,4,5,6,7,8",
                4,
            ),
            @r"
        1996-11-05 09:00 -05:00
        2000-11-07 09:00 -05:00
        2004-11-02 09:00 -05:00
        2008-11-04 09:00 -05:00
        ",
        );
    }

    #[test]
    fn rfc_sub_daily() {
        insta::assert_snapshot!(
            expand(NY, "FREQ=HOURLY;INTERVAL=3;UNTIL=19970902T170000", 100),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-02 12:00 -04:00
        1997-09-02 15:00 -04:00
        ",
        );
        insta::assert_snapshot!(
            expand(NY, "FREQ=MINUTELY;INTERVAL=90;COUNT=4", 100),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-02 10:30 -04:00
        1997-09-02 12:00 -04:00
        1997-09-02 13:30 -04:00
        ",
        );

        let daily = expand(
            NY,
            "FREQ=DAILY;BYHOUR=9,10,11,12,13,14,15,16;BYMINUTE=0,20,40",
            100,
        );
        let minutely = expand(
            NY,
            "FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10,11,12,13,14,15,16",
            100,
        );
        assert_eq!(daily, minutely);
        let lines: Vec<&str> = daily.lines().collect();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[23], "1997-09-02 16:40 -04:00");
        assert_eq!(lines[24], "1997-09-03 09:00 -04:00");
        assert_eq!(lines[99], "1997-09-06 10:00 -04:00");
    }

    /// RFC 5545 doesn't allow BYWEEKNO at DAILY frequency. It is applied as
    /// a limit.
    #[test]
    fn daily_week_number_is_a_limit() {
        insta::assert_snapshot!(
            expand(NY, "FREQ=DAILY;BYWEEKNO=1;COUNT=3", 100),
            @r"
        1997-12-29 09:00 -05:00
        1997-12-30 09:00 -05:00
        1997-12-31 09:00 -05:00
        ",
        );
    }

    #[test]
    fn gaps_move_forward() {
        insta::assert_snapshot!(
            expand("2025-03-07T02:30:00[America/New_York]", "FREQ=DAILY", 4),
            @r"
        2025-03-07 02:30 -05:00
        2025-03-08 02:30 -05:00
        2025-03-09 03:30 -04:00
        2025-03-10 02:30 -04:00
        ",
        );
        // 2:00 moves onto 3:00, which is only yielded once.
        insta::assert_snapshot!(
            expand(
                "2025-03-08T00:00:00[America/New_York]",
                "FREQ=DAILY;BYHOUR=2,3;COUNT=5",
                100,
            ),
            @r"
        2025-03-08 02:00 -05:00
        2025-03-08 03:00 -05:00
        2025-03-09 03:00 -04:00
        2025-03-10 02:00 -04:00
        2025-03-10 03:00 -04:00
        ",
        );
    }

    #[test]
    fn folds_use_first_offset() {
        insta::assert_snapshot!(
            expand(
                "2025-11-01T01:30:00[America/New_York]",
                "FREQ=DAILY;COUNT=4",
                100,
            ),
            @r"
        2025-11-01 01:30 -04:00
        2025-11-02 01:30 -04:00
        2025-11-03 01:30 -05:00
        2025-11-04 01:30 -05:00
        ",
        );
        insta::assert_snapshot!(
            expand(
                "2025-11-02T00:00:00[America/New_York]",
                "FREQ=DAILY;BYHOUR=1;BYMINUTE=15,45;COUNT=4",
                100,
            ),
            @r"
        2025-11-02 01:15 -04:00
        2025-11-02 01:45 -04:00
        2025-11-03 01:15 -05:00
        2025-11-03 01:45 -05:00
        ",
        );
        // A start at the second offset keeps it.
        insta::assert_snapshot!(
            expand(
                "2025-11-02T01:30:00-05[America/New_York]",
                "FREQ=DAILY",
                2,
            ),
            @r"
        2025-11-02 01:30 -05:00
        2025-11-03 01:30 -05:00
        ",
        );
    }

    /// The only candidate of the first interval is before the start, and
    /// every later one is after UNTIL.
    #[test]
    fn nothing_between_start_and_until() {
        insta::assert_snapshot!(
            expand(
                "2025-05-13T00:00:00[America/New_York]",
                "FREQ=YEARLY;UNTIL=20250514T000000;BYMONTHDAY=10",
                100,
            ),
            @"",
        );
    }

    #[test]
    fn date_seeds() {
        let start = "2016-01-01[Europe/Berlin]";
        insta::assert_snapshot!(
            expand(start, "FREQ=DAILY;COUNT=3", 100),
            @r"
        2016-01-01
        2016-01-02
        2016-01-03
        ",
        );
        // A date UNTIL covers its whole day.
        assert_eq!(
            expand(start, "FREQ=DAILY;UNTIL=20160103", 100),
            expand(start, "FREQ=DAILY;COUNT=3", 100),
        );
        assert_eq!(
            expand(
                "2016-01-01T10:00:00[Europe/Berlin]",
                "FREQ=DAILY;UNTIL=20160103",
                100,
            )
            .lines()
            .count(),
            3,
        );
        // Many hours collapse into one date.
        insta::assert_snapshot!(
            expand(start, "FREQ=HOURLY;COUNT=2", 100),
            @r"
        2016-01-01
        2016-01-02
        ",
        );
    }

    #[test]
    fn count_zero_yields_nothing() {
        insta::assert_snapshot!(expand(NY, "FREQ=DAILY;COUNT=0", 100), @"");
    }

    #[test]
    fn fast_forward() {
        let start = zoned(NY);
        let target = zoned("2020-01-01T00:00:00[America/New_York]");
        let mut it = rule(&start, "FREQ=DAILY").iter(&start);
        it.fast_forward(&target);
        insta::assert_snapshot!(
            listing(it.take(3)),
            @r"
        2019-12-30 09:00 -05:00
        2019-12-31 09:00 -05:00
        2020-01-01 09:00 -05:00
        ",
        );

        // Counting needs every datetime from the start.
        let mut it = rule(&start, "FREQ=DAILY;COUNT=2").iter(&start);
        it.fast_forward(&target);
        assert_eq!(it.count(), 2);
    }

    #[test]
    fn fast_forward_matches_plain_iteration() {
        let start = zoned("1997-09-22T09:00:00[America/New_York]");
        let target = zoned("2005-06-01T00:00:00[America/New_York]");
        for text in [
            "FREQ=MONTHLY;BYDAY=-2MO",
            "FREQ=YEARLY;BYWEEKNO=1;BYDAY=MO",
            "FREQ=WEEKLY;INTERVAL=3;BYDAY=TU,SU;WKST=SU",
            "FREQ=HOURLY;INTERVAL=7",
        ] {
            let rrule = rule(&start, text);
            let plain: Vec<ZonedInstant> = rrule
                .iter(&start)
                .filter(|zi| !zi.is_before(&target))
                .take(5)
                .collect();
            let mut it = rrule.iter(&start);
            it.fast_forward(&target);
            let skipped: Vec<ZonedInstant> =
                it.filter(|zi| !zi.is_before(&target)).take(5).collect();
            assert_eq!(plain, skipped, "rule: {text}");
        }
    }

    #[test]
    fn stop_before() {
        // February never has a 30th, so without a ceiling this would search
        // all the way to the end of time.
        let start = zoned(NY);
        let mut it =
            rule(&start, "FREQ=MONTHLY;BYMONTH=2;BYMONTHDAY=30").iter(&start);
        it.stop_before(&zoned("2010-01-01T00:00:00[America/New_York]"));
        assert_eq!(it.next(), None);

        let mut it = rule(&start, "FREQ=DAILY;COUNT=5").iter(&start);
        it.stop_before(&zoned("1997-09-04T09:00:00[America/New_York]"));
        insta::assert_snapshot!(
            listing(it),
            @r"
        1997-09-02 09:00 -04:00
        1997-09-03 09:00 -04:00
        ",
        );
    }

    #[test]
    fn display_is_canonical() {
        let tz = jiff::tz::db().get("America/New_York").unwrap();
        let print = |text: &str| {
            RecurrenceRule::parse(text, &tz).unwrap().to_string()
        };
        insta::assert_snapshot!(
            print("RRULE:WKST=SU;BYDAY=WE,MO;INTERVAL=2;COUNT=4;FREQ=WEEKLY"),
            @"FREQ=WEEKLY;COUNT=4;INTERVAL=2;BYDAY=MO,WE;WKST=SU",
        );
        insta::assert_snapshot!(
            print("freq=monthly;byday=-1fr,1mo,su;bymonthday=1,-1,1"),
            @"FREQ=MONTHLY;BYDAY=SU,-1FR,1MO;BYMONTHDAY=-1,1",
        );
        insta::assert_snapshot!(
            print("FREQ=DAILY;UNTIL=19971224T000000"),
            @"FREQ=DAILY;UNTIL=19971224T050000Z",
        );
        insta::assert_snapshot!(
            print("FREQ=YEARLY;UNTIL=20000131;INTERVAL=1"),
            @"FREQ=YEARLY;UNTIL=20000131",
        );
        insta::assert_snapshot!(
            print("FREQ=DAILY;X-NAME=foo;COUNT=2"),
            @"FREQ=DAILY;COUNT=2",
        );
    }

    #[test]
    fn builder() {
        let rrule = RecurrenceRule::builder(Frequency::Monthly)
            .interval(2)
            .by_week_day([(1, Weekday::Sunday), (-1, Weekday::Sunday)])
            .count(10)
            .build()
            .unwrap();
        insta::assert_snapshot!(
            rrule,
            @"FREQ=MONTHLY;COUNT=10;INTERVAL=2;BYDAY=-1SU,1SU",
        );
        assert_eq!(rrule.frequency(), Frequency::Monthly);
        assert_eq!(rrule.interval(), 2);
        assert_eq!(rrule.count(), Some(10));
        assert_eq!(rrule.week_start(), Weekday::Monday);
        assert!(rrule.until().is_none());
        assert!(!rrule.is_unbounded());

        let hours = RecurrenceRule::builder(Frequency::Daily)
            .by_hour([17, 9, 9])
            .by_minute([30])
            .build()
            .unwrap();
        insta::assert_snapshot!(
            hours,
            @"FREQ=DAILY;BYMINUTE=30;BYHOUR=9,17",
        );
        assert!(hours.is_unbounded());
    }

    #[test]
    fn parse_errors() {
        insta::assert_snapshot!(
            parse_err("COUNT=2"),
            @"recurrence rule `COUNT=2` is missing FREQ",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=FORTNIGHTLY"),
            @"unrecognized frequency `FORTNIGHTLY`",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;FOO=1"),
            @"unrecognized recurrence rule part `FOO`",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;COUNT=1;count=2"),
            @"recurrence rule part `COUNT` is given more than once",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;COUNT"),
            @"recurrence rule part `COUNT` is missing a `=`",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;BYHOUR=9,x"),
            @"invalid BYHOUR value `x`",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;BYDAY=MO,XX"),
            @"invalid BYDAY value `XX`",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;WKST=XX"),
            @"invalid WKST value `XX`",
        );
    }

    #[test]
    fn bound_errors() {
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;COUNT=2;UNTIL=20000101"),
            @"invalid recurrence rule: COUNT and UNTIL cannot both be set",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;INTERVAL=0"),
            @"invalid recurrence rule: INTERVAL value `0` must be at least 1",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=YEARLY;BYMONTH=13"),
            @"invalid recurrence rule: BYMONTH value `13` is out of range (expected 1..=12)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=YEARLY;BYWEEKNO=0"),
            @"invalid recurrence rule: BYWEEKNO value `0` is out of range (expected 1..=53 or -53..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=YEARLY;BYYEARDAY=-367"),
            @"invalid recurrence rule: BYYEARDAY value `-367` is out of range (expected 1..=366 or -366..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=MONTHLY;BYMONTHDAY=32"),
            @"invalid recurrence rule: BYMONTHDAY value `32` is out of range (expected 1..=31 or -31..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;BYHOUR=24"),
            @"invalid recurrence rule: BYHOUR value `24` is out of range (expected 0..=23)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=DAILY;BYSECOND=60"),
            @"invalid recurrence rule: BYSECOND value `60` is out of range (expected 0..=59)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=MONTHLY;BYDAY=MO;BYSETPOS=0"),
            @"invalid recurrence rule: BYSETPOS value `0` is out of range (expected 1..=366 or -366..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=MONTHLY;BYDAY=6MO"),
            @"invalid recurrence rule: BYDAY value `6MO` is out of range (its number must be in 1..=5 or -5..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=YEARLY;BYDAY=-54MO"),
            @"invalid recurrence rule: BYDAY value `-54MO` is out of range (its number must be in 1..=53 or -53..=-1)",
        );
        insta::assert_snapshot!(
            parse_err("FREQ=YEARLY;BYMONTH=5;BYDAY=0MO"),
            @"invalid recurrence rule: BYDAY value `0MO` is out of range (its number must be in 1..=5 or -5..=-1)",
        );

        // Combinations that RFC 5545 forbids are still accepted.
        let tz = jiff::tz::db().get("America/New_York").unwrap();
        assert!(RecurrenceRule::parse("FREQ=DAILY;BYWEEKNO=1", &tz).is_ok());
        assert!(
            RecurrenceRule::parse("FREQ=WEEKLY;BYMONTHDAY=1", &tz).is_ok()
        );
    }

    #[test]
    fn weekday_tokens() {
        for token in ["MO", "TU", "WE", "TH", "FR", "SA", "SU"] {
            let weekday = weekday_from_token(token).unwrap();
            assert_eq!(weekday_token(weekday), token);
        }
        assert_eq!(weekday_from_token("su"), Some(Weekday::Sunday));
        let v: ByWeekday = "+2we".parse().unwrap();
        assert_eq!(v, ByWeekday::from((2, Weekday::Wednesday)));
        assert_eq!(v.to_string(), "2WE");
    }
}
