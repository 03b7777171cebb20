use jiff::{Span, ToSpan, tz::TimeZone};

use crate::{
    content::{ContentLine, Parameter},
    datetime::ZonedInstant,
    error::{Error, Result},
    fold,
    period::Period,
    rrule::RecurrenceRule,
    span::Duration,
    timezone::{self, ZoneResolver},
};

/// The kinds of calendar components that can recur.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ComponentKind {
    Event,
    Todo,
    Journal,
}

impl ComponentKind {
    fn as_str(&self) -> &'static str {
        match *self {
            ComponentKind::Event => "VEVENT",
            ComponentKind::Todo => "VTODO",
            ComponentKind::Journal => "VJOURNAL",
        }
    }

    /// The property that ends a component of this kind, if any.
    fn end_property(&self) -> Option<&'static str> {
        match *self {
            ComponentKind::Event => Some("DTEND"),
            ComponentKind::Todo => Some("DUE"),
            ComponentKind::Journal => None,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<ComponentKind> {
        let kind = match &*s.trim().to_ascii_uppercase() {
            "VEVENT" => ComponentKind::Event,
            "VTODO" => ComponentKind::Todo,
            "VJOURNAL" => ComponentKind::Journal,
            _ => {
                return Err(anyhow::anyhow!(
                    "unrecognized component kind `{s}`"
                )
                .into());
            }
        };
        Ok(kind)
    }
}

/// The parts of a calendar component that decide when it occurs.
///
/// Everything else about a component (its summary, attendees, alarms and so
/// on) is of no interest here and isn't kept.
#[derive(Clone, Debug)]
pub struct Component {
    kind: ComponentKind,
    start: ZonedInstant,
    end: Option<ZonedInstant>,
    duration: Option<Duration>,
    recurrence_rules: Vec<RecurrenceRule>,
    exception_rules: Vec<RecurrenceRule>,
    recurrence_dates: Vec<Period>,
    exception_dates: Vec<Period>,
}

impl Component {
    /// A component with only a start. It occurs once.
    pub fn new(kind: ComponentKind, start: ZonedInstant) -> Component {
        Component {
            kind,
            start,
            end: None,
            duration: None,
            recurrence_rules: vec![],
            exception_rules: vec![],
            recurrence_dates: vec![],
            exception_dates: vec![],
        }
    }

    /// Build a component from its properties.
    ///
    /// This understands `DTSTART`, `DTEND` (or `DUE` for to-dos),
    /// `DURATION`, `RRULE`, `EXRULE`, `RDATE` and `EXDATE`, along with their
    /// `TZID` and `VALUE` parameters. Everything else, including the
    /// `BEGIN` and `END` lines, is ignored.
    ///
    /// Zone identifiers are looked up with `resolver`. A `DTSTART` without
    /// a `TZID` and without a `Z` is floating and is anchored in the
    /// resolver's local zone. Every other floating value, including an
    /// UNTIL in a rule, is read in the zone of `DTSTART`, so that it lines
    /// up with the occurrences it ends or excludes.
    pub fn from_properties(
        kind: ComponentKind,
        lines: &[ContentLine],
        resolver: &dyn ZoneResolver,
    ) -> Result<Component> {
        let Some(start) = lines.iter().find(|line| line.name() == "DTSTART")
        else {
            return Err(anyhow::anyhow!("{kind} is missing DTSTART").into());
        };
        let start = date_time_value(start, resolver, None)?;
        let tz = start.time_zone().clone();
        let mut end = None;
        let mut duration = None;
        let mut rules = vec![];
        let mut exrules = vec![];
        let mut rdates = vec![];
        let mut exdates = vec![];
        for line in lines.iter() {
            match line.name() {
                "DTSTART" => {}
                "DURATION" => duration = Some(line.value().parse()?),
                "RRULE" => rules.push(line),
                "EXRULE" => exrules.push(line),
                "RDATE" => {
                    rdates.extend(period_values(line, resolver, Some(&tz))?);
                }
                "EXDATE" => {
                    exdates.extend(period_values(line, resolver, Some(&tz))?);
                }
                name if Some(name) == kind.end_property() => {
                    end = Some(date_time_value(line, resolver, Some(&tz))?);
                }
                name => log::trace!("ignoring {kind} property `{name}`"),
            }
        }
        let mut component = Component::new(kind, start);
        component.end = end;
        component.duration = duration;
        for line in rules {
            let rule = RecurrenceRule::parse(line.value(), &tz)?;
            component.recurrence_rules.push(rule);
        }
        for line in exrules {
            let rule = RecurrenceRule::parse(line.value(), &tz)?;
            component.exception_rules.push(rule);
        }
        component.recurrence_dates = rdates;
        component.exception_dates = exdates;
        Ok(component)
    }

    /// Write this component's properties back out, without `BEGIN` and
    /// `END`.
    pub fn to_content_lines(&self) -> Vec<ContentLine> {
        let mut lines = vec![fold::date_time_line("DTSTART", &self.start)];
        if let (Some(end), Some(name)) = (&self.end, self.kind.end_property())
        {
            lines.push(fold::date_time_line(name, end));
        }
        if let Some(duration) = self.duration {
            lines.push(ContentLine::new("DURATION", duration.to_string()));
        }
        for rule in self.recurrence_rules.iter() {
            lines.push(ContentLine::new("RRULE", rule.to_string()));
        }
        for rule in self.exception_rules.iter() {
            lines.push(ContentLine::new("EXRULE", rule.to_string()));
        }
        for period in self.recurrence_dates.iter() {
            lines.push(period_line("RDATE", period));
        }
        for period in self.exception_dates.iter() {
            lines.push(period_line("EXDATE", period));
        }
        lines
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn start(&self) -> &ZonedInstant {
        &self.start
    }

    pub fn end(&self) -> Option<&ZonedInstant> {
        self.end.as_ref()
    }

    pub fn duration(&self) -> Option<Span> {
        self.duration.map(|d| d.get())
    }

    pub fn recurrence_rules(&self) -> &[RecurrenceRule] {
        &self.recurrence_rules
    }

    pub fn exception_rules(&self) -> &[RecurrenceRule] {
        &self.exception_rules
    }

    pub fn recurrence_dates(&self) -> &[Period] {
        &self.recurrence_dates
    }

    pub fn exception_dates(&self) -> &[Period] {
        &self.exception_dates
    }

    /// Returns true when the component starts on a date rather than a
    /// date-time.
    pub fn is_all_day(&self) -> bool {
        !self.start.has_time()
    }

    /// Returns true when the component occurs more than once, or might.
    pub fn is_recurring(&self) -> bool {
        !self.recurrence_rules.is_empty() || !self.recurrence_dates.is_empty()
    }

    /// Set the end. This replaces any duration.
    pub fn set_end(&mut self, end: ZonedInstant) -> &mut Component {
        self.end = Some(end);
        self.duration = None;
        self
    }

    /// Set the duration. This replaces any end.
    pub fn set_duration(&mut self, duration: Span) -> Result<&mut Component> {
        self.duration = Some(Duration::new(duration)?);
        self.end = None;
        Ok(self)
    }

    pub fn add_recurrence_rule(
        &mut self,
        rule: RecurrenceRule,
    ) -> &mut Component {
        self.recurrence_rules.push(rule);
        self
    }

    pub fn add_exception_rule(
        &mut self,
        rule: RecurrenceRule,
    ) -> &mut Component {
        self.exception_rules.push(rule);
        self
    }

    pub fn add_recurrence_date(&mut self, period: Period) -> &mut Component {
        self.recurrence_dates.push(period);
        self
    }

    pub fn add_exception_date(
        &mut self,
        start: ZonedInstant,
    ) -> &mut Component {
        self.exception_dates.push(Period::instant(start));
        self
    }

    /// Returns the period of an occurrence of this component that starts at
    /// `start`.
    ///
    /// An explicit duration is applied as given, so days are nominal. An end
    /// gives an exact duration for date-times and a number of whole days for
    /// dates. Without either, a date lasts one day and a date-time has no
    /// extent at all.
    pub fn period_at(&self, start: ZonedInstant) -> Result<Period> {
        if let Some(duration) = self.duration {
            if duration.get().is_zero() {
                return Ok(Period::instant(start));
            }
            return Period::with_duration(start, duration.get());
        }
        let Some(ref end) = self.end else {
            if self.start.has_time() {
                return Ok(Period::instant(start));
            }
            return Period::with_duration(start, 1.day());
        };
        if self.start.has_time() {
            let exact = end.since(&self.start);
            if exact.is_zero() {
                return Ok(Period::instant(start));
            }
            let end = start.add(Span::try_from(exact)?)?;
            return Period::new(start, end);
        }
        let days = self.start.civil_date().until(end.civil_date())?.get_days();
        if days == 0 {
            return Ok(Period::instant(start));
        }
        Period::with_duration(start, days.days())
    }
}

/// Resolves the zone of a property value from its `TZID` parameter.
///
/// Without one, the value is floating and gets the `floating` zone, or the
/// resolver's local zone when that is `None`.
fn value_zone(
    line: &ContentLine,
    resolver: &dyn ZoneResolver,
    floating: Option<&TimeZone>,
) -> Result<TimeZone> {
    let id = match (line.get_param("TZID"), floating) {
        (Some(param), _) => param.value(),
        (None, Some(tz)) => return Ok(tz.clone()),
        (None, None) => "",
    };
    resolver.resolve(id).map_err(|err| Error::InvalidTimeZone {
        id: id.to_string(),
        source: Box::new(err),
    })
}

/// Reads a single DATE or DATE-TIME value.
fn date_time_value(
    line: &ContentLine,
    resolver: &dyn ZoneResolver,
    floating: Option<&TimeZone>,
) -> Result<ZonedInstant> {
    let tz = value_zone(line, resolver, floating)?;
    let zi = fold::parse_date_time(line.value(), &tz)?;
    if let Some(param) = line.get_param("VALUE") {
        let want_time = !param.value().eq_ignore_ascii_case("DATE");
        if want_time != zi.has_time() {
            return Err(anyhow::anyhow!(
                "{} value `{}` does not match VALUE={}",
                line.name(),
                line.value(),
                param.value(),
            )
            .into());
        }
    }
    Ok(zi)
}

/// Reads a comma separated list of DATE, DATE-TIME or PERIOD values.
fn period_values(
    line: &ContentLine,
    resolver: &dyn ZoneResolver,
    floating: Option<&TimeZone>,
) -> Result<Vec<Period>> {
    let tz = value_zone(line, resolver, floating)?;
    line.value()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Period::parse(v, &tz))
        .collect()
}

/// Writes an RDATE or EXDATE line for a single period.
fn period_line(name: &str, period: &Period) -> ContentLine {
    if period.is_instant() {
        return fold::date_time_line(name, period.start());
    }
    let mut line = ContentLine::new(name, period.to_string());
    line.param(Parameter::new("VALUE", "PERIOD"));
    if !period.start().is_utc() {
        let id = timezone::zone_id(period.start().time_zone());
        line.param(Parameter::new("TZID", id));
    }
    line
}
