use {
    anyhow::Context,
    jiff::{
        ToSpan,
        civil::{Date, Weekday},
    },
};

/// A date written as a week number in a week-numbering year, for weeks that
/// begin on the rule's week start (WKST).
///
/// RFC 5545 defines week 1 as the first week with at least four days in the
/// calendar year, so January 4 is always in week 1. With weeks starting on
/// Monday this is the same as ISO 8601, which is all
/// `jiff::civil::ISOWeekDate` supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WeekDate {
    start: Weekday,
    year: i16,
    week: i8,
    weekday: Weekday,
}

impl WeekDate {
    /// Create a week date, failing if `week` doesn't exist in `year` or if
    /// the date falls outside of Jiff's supported range.
    pub fn new(
        start: Weekday,
        year: i16,
        week: i8,
        weekday: Weekday,
    ) -> anyhow::Result<WeekDate> {
        let weeks = weeks_in(start, year)?;
        anyhow::ensure!(
            (1..=weeks).contains(&week),
            "week `{week}` does not exist in week-numbering year `{year}` \
             (it has {weeks} weeks starting on {start:?})",
        );
        let wd = WeekDate { start, year, week, weekday };
        wd.date().with_context(|| {
            format!(
                "week date `{year:04}-W{week:02}` on {weekday:?} \
                 is out of range",
            )
        })?;
        Ok(wd)
    }

    /// Returns the week date of `date` for weeks beginning on `start`.
    pub fn from_date(start: Weekday, date: Date) -> anyhow::Result<WeekDate> {
        let mut year = date.year();
        let mut first = first_week_start(start, year)?;
        if date < first {
            year -= 1;
            first = first_week_start(start, year)?;
        } else if let Ok(next) = first_week_start(start, year + 1) {
            // Fails only past Jiff's last year, which `date` can't reach.
            if date >= next {
                year += 1;
                first = next;
            }
        }
        let days = first.until(date)?.get_days();
        let week = i8::try_from(days / 7 + 1)?;
        Ok(WeekDate { start, year, week, weekday: date.weekday() })
    }

    /// Returns the Gregorian date of this week date.
    pub fn date(self) -> anyhow::Result<Date> {
        let first = first_week_start(self.start, self.year)?;
        let offset = (i32::from(self.week) - 1) * 7
            + i32::from(self.weekday.since(self.start));
        Ok(first.checked_add(offset.days())?)
    }

    /// Returns the week number, in the range `1..=53`.
    pub fn week(self) -> i8 {
        self.week
    }

    /// Returns 52 or 53.
    pub fn weeks_in_year(self) -> i8 {
        weeks_in(self.start, self.year).unwrap_or(52)
    }
}

/// Returns the first day of the week containing `date`.
pub fn first_of_week(start: Weekday, date: Date) -> anyhow::Result<Date> {
    let back = date.weekday().since(start);
    date.checked_sub(back.days()).with_context(|| {
        format!("week containing {date} begins before the supported range")
    })
}

/// Returns the last day of the week containing `date`.
pub fn last_of_week(start: Weekday, date: Date) -> anyhow::Result<Date> {
    let ahead = 6 - date.weekday().since(start);
    date.checked_add(ahead.days()).with_context(|| {
        format!("week containing {date} ends after the supported range")
    })
}

/// The first day of week 1 of `year`, i.e., the `start` weekday on or
/// before January 4.
fn first_week_start(start: Weekday, year: i16) -> anyhow::Result<Date> {
    let jan4 = Date::new(year, 1, 4)
        .with_context(|| format!("year `{year}` is out of range"))?;
    first_of_week(start, jan4)
}

/// Returns the number of weeks in a week-numbering year.
///
/// A year has 53 weeks when it begins on the fourth day of the week, or, in
/// a leap year, on the third.
fn weeks_in(start: Weekday, year: i16) -> anyhow::Result<i8> {
    let jan1 = Date::new(year, 1, 1)
        .with_context(|| format!("year `{year}` is out of range"))?;
    let day_of_week = jan1.weekday().since(start);
    let long = day_of_week == 3 || (jan1.in_leap_year() && day_of_week == 2);
    Ok(if long { 53 } else { 52 })
}
