use std::{
    cmp::Ordering,
    collections::{HashSet, VecDeque},
    iter::Peekable,
    sync::Arc,
};

use jiff::{SignedDuration, Span, ToSpan, civil::Date};

use crate::{
    component::Component,
    datetime::ZonedInstant,
    error::Result,
    period::Period,
    rrule::RecurrenceIter,
    timezone::{TzdbResolver, ZoneResolver},
};

/// Computes the occurrences of components within a window of time.
///
/// An evaluator holds configuration only. It is cheap to clone and can be
/// shared between threads.
#[derive(Clone, Debug)]
pub struct Evaluator {
    include_start: bool,
    resolver: Arc<dyn ZoneResolver>,
}

impl Default for Evaluator {
    fn default() -> Evaluator {
        Evaluator {
            include_start: true,
            resolver: Arc::new(TzdbResolver::new()),
        }
    }
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator::default()
    }

    /// Whether the component's own start is an occurrence even when no
    /// recurrence rule produces it. This is enabled by default.
    pub fn include_start(&mut self, yes: bool) -> &mut Evaluator {
        self.include_start = yes;
        self
    }

    /// The resolver whose local zone gives the bounds of a day in date-only
    /// queries like `occurs_on`.
    pub fn resolver(
        &mut self,
        resolver: Arc<dyn ZoneResolver>,
    ) -> &mut Evaluator {
        self.resolver = resolver;
        self
    }

    /// Returns every occurrence of `component` that starts in `[from, to)`,
    /// in ascending order of start.
    pub fn evaluate(
        &self,
        component: &Component,
        from: &ZonedInstant,
        to: &ZonedInstant,
    ) -> Result<Vec<Occurrence>> {
        self.iter(component, from, to).collect()
    }

    /// Returns a lazy iterator over the occurrences of `component` that
    /// start in `[from, to)`.
    ///
    /// Occurrences come out in ascending order of start. Occurrences with
    /// the same start come out in ascending order of end, and identical
    /// occurrences are reported once.
    ///
    /// Once the iterator yields an error, it yields nothing else.
    pub fn iter<'a>(
        &self,
        component: &'a Component,
        from: &ZonedInstant,
        to: &ZonedInstant,
    ) -> OccurrenceIter<'a> {
        log::debug!(
            "evaluating {kind} starting at {start} \
             ({rules} rules, {rdates} dates, {exrules} exception rules, \
             {exdates} exception dates) from {from} to {to}",
            kind = component.kind(),
            start = component.start(),
            rules = component.recurrence_rules().len(),
            rdates = component.recurrence_dates().len(),
            exrules = component.exception_rules().len(),
            exdates = component.exception_dates().len(),
        );
        let bounded = |mut it: RecurrenceIter| {
            it.fast_forward(from);
            it.stop_before(to);
            it
        };
        let mut sources: Vec<Source<'a>> = vec![];
        for rule in component.recurrence_rules().iter() {
            let it = bounded(rule.iter(component.start()));
            let it: Box<dyn Iterator<Item = Candidate> + 'a> =
                Box::new(it.map(Candidate::Start));
            sources.push(it.peekable());
        }
        if self.include_start {
            let start = Candidate::Start(component.start().clone());
            let it: Box<dyn Iterator<Item = Candidate> + 'a> =
                Box::new(std::iter::once(start));
            sources.push(it.peekable());
        }
        if !component.recurrence_dates().is_empty() {
            let mut rdates = component.recurrence_dates().to_vec();
            rdates.sort_by(|p1, p2| p1.compare(p2));
            let it: Box<dyn Iterator<Item = Candidate> + 'a> =
                Box::new(rdates.into_iter().map(|p| {
                    if p.is_instant() {
                        Candidate::Start(p.start().clone())
                    } else {
                        Candidate::Period(p)
                    }
                }));
            sources.push(it.peekable());
        }
        let exception_rules = component
            .exception_rules()
            .iter()
            .map(|rule| bounded(rule.iter(component.start())).peekable())
            .collect();
        let exception_dates = component
            .exception_dates()
            .iter()
            .map(|p| p.start().clone())
            .collect();
        OccurrenceIter {
            component,
            from: from.clone(),
            to: to.clone(),
            sources,
            exception_rules,
            exception_dates,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Returns every occurrence of `component` that starts on `date`.
    ///
    /// The day is taken in the local zone of this evaluator's resolver.
    pub fn evaluate_on(
        &self,
        component: &Component,
        date: Date,
    ) -> Result<Vec<Occurrence>> {
        let day = self.day(date)?;
        self.evaluate(component, day.start(), day.end())
    }

    /// Returns true when any occurrence of `component` starts on `date` or
    /// is still going on at some point of that day.
    ///
    /// The day is taken in the local zone of this evaluator's resolver.
    pub fn occurs_on(
        &self,
        component: &Component,
        date: Date,
    ) -> Result<bool> {
        let day = self.day(date)?;
        let from = day.start().subtract(lookback(component)?)?;
        for result in self.iter(component, &from, day.end()) {
            let occurrence = result?;
            if day.contains(occurrence.start())
                || occurrence.period().overlaps_with(&day)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns true when an occurrence of `component` starts at `instant` or
    /// is going on at `instant`.
    pub fn occurs_at(
        &self,
        component: &Component,
        instant: &ZonedInstant,
    ) -> Result<bool> {
        let from = instant.subtract(lookback(component)?)?;
        let to = instant.add(1.nanosecond())?;
        for result in self.iter(component, &from, &to) {
            let occurrence = result?;
            if occurrence.period().contains(instant)
                || occurrence.start().compare(instant) == Ordering::Equal
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the given day in the resolver's local zone.
    fn day(&self, date: Date) -> Result<Period> {
        let tz = self.resolver.resolve("")?;
        let start = ZonedInstant::date(date, tz.clone())?;
        let end = ZonedInstant::date(date.tomorrow()?, tz)?;
        Period::new(start, end)
    }
}

/// How far before a point in time an occurrence may start and still cover
/// that point.
///
/// Nominal days can be an hour longer than usual across a DST change and
/// zones disagree about where a day begins, so this adds a day and an hour
/// of slack to the longest extent.
fn lookback(component: &Component) -> Result<Span> {
    let base = component.period_at(component.start().clone())?;
    let mut longest = base.duration();
    for period in component.recurrence_dates().iter() {
        longest = longest.max(period.duration());
    }
    let longest = longest
        .checked_add(SignedDuration::from_hours(25))
        .unwrap_or(SignedDuration::MAX);
    Ok(Span::try_from(longest)?)
}

/// A single occurrence of a component.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Occurrence {
    period: Period,
}

impl Occurrence {
    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn start(&self) -> &ZonedInstant {
        self.period.start()
    }

    /// The end of this occurrence. For an occurrence without extent, this is
    /// its start.
    pub fn end(&self) -> &ZonedInstant {
        self.period.end()
    }
}

impl std::fmt::Display for Occurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.period.is_instant() {
            write!(f, "{}", self.start())
        } else {
            write!(f, "{} / {}", self.start(), self.end())
        }
    }
}

/// A possible occurrence, before exclusions are applied.
#[derive(Debug)]
enum Candidate {
    /// A start whose extent comes from the component.
    Start(ZonedInstant),
    /// An RDATE period with its own extent.
    Period(Period),
}

impl Candidate {
    fn start(&self) -> &ZonedInstant {
        match *self {
            Candidate::Start(ref start) => start,
            Candidate::Period(ref period) => period.start(),
        }
    }
}

type Source<'a> = Peekable<Box<dyn Iterator<Item = Candidate> + 'a>>;

/// An iterator over the occurrences of a component in a window.
///
/// This is created by `Evaluator::iter`. It merges the candidates from every
/// source in order of start, one group of equal starts at a time, and
/// removes the excluded ones.
pub struct OccurrenceIter<'a> {
    component: &'a Component,
    from: ZonedInstant,
    to: ZonedInstant,
    sources: Vec<Source<'a>>,
    exception_rules: Vec<Peekable<RecurrenceIter>>,
    exception_dates: HashSet<ZonedInstant>,
    pending: VecDeque<Occurrence>,
    done: bool,
}

impl<'a> OccurrenceIter<'a> {
    /// Removes and returns every candidate with the earliest start, or
    /// `None` when there are no candidates starting before the end of the
    /// window.
    fn next_group(&mut self) -> Option<Vec<Candidate>> {
        let earliest = self
            .sources
            .iter_mut()
            .filter_map(|source| source.peek().map(|c| c.start().clone()))
            .min_by(|a, b| a.compare(b))?;
        if !earliest.is_before(&self.to) {
            return None;
        }
        let mut group = vec![];
        for source in self.sources.iter_mut() {
            while let Some(candidate) = source.next_if(|c| {
                c.start().compare(&earliest) == Ordering::Equal
            }) {
                group.push(candidate);
            }
        }
        Some(group)
    }

    fn is_excluded(&mut self, start: &ZonedInstant) -> bool {
        if self.exception_dates.contains(start) {
            return true;
        }
        let mut excluded = false;
        for rule in self.exception_rules.iter_mut() {
            while rule.next_if(|ex| ex.is_before(start)).is_some() {}
            excluded = excluded || rule.peek().is_some_and(|ex| ex == start);
        }
        excluded
    }

    fn period(&self, candidate: Candidate) -> Result<Period> {
        match candidate {
            Candidate::Start(start) => self.component.period_at(start),
            Candidate::Period(period) => Ok(period),
        }
    }
}

impl<'a> Iterator for OccurrenceIter<'a> {
    type Item = Result<Occurrence>;

    fn next(&mut self) -> Option<Result<Occurrence>> {
        loop {
            if let Some(occurrence) = self.pending.pop_front() {
                return Some(Ok(occurrence));
            }
            if self.done {
                return None;
            }
            let Some(group) = self.next_group() else {
                self.done = true;
                return None;
            };
            let mut batch: Vec<Occurrence> = vec![];
            for candidate in group {
                if candidate.start().is_before(&self.from) {
                    continue;
                }
                if self.is_excluded(candidate.start()) {
                    log::trace!("excluding {}", candidate.start());
                    continue;
                }
                let period = match self.period(candidate) {
                    Ok(period) => period,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                };
                let occurrence = Occurrence { period };
                if !batch.contains(&occurrence) {
                    batch.push(occurrence);
                }
            }
            batch.sort_by(|o1, o2| o1.end().compare(o2.end()));
            self.pending.extend(batch);
        }
    }
}

impl<'a> std::iter::FusedIterator for OccurrenceIter<'a> {}

impl<'a> std::fmt::Debug for OccurrenceIter<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("OccurrenceIter")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("sources", &self.sources.len())
            .field("pending", &self.pending)
            .field("done", &self.done)
            .finish()
    }
}

/// A collection of components queried together.
#[derive(Clone, Debug, Default)]
pub struct Calendar {
    components: Vec<Component>,
}

impl Calendar {
    pub fn new() -> Calendar {
        Calendar::default()
    }

    pub fn push(&mut self, component: Component) -> &mut Calendar {
        self.components.push(component);
        self
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Returns the occurrences of every component that start in
    /// `[from, to)`, in ascending order of start. Occurrences with the same
    /// start are in the order of their components.
    pub fn occurrences<'a>(
        &'a self,
        evaluator: &Evaluator,
        from: &ZonedInstant,
        to: &ZonedInstant,
    ) -> Result<Vec<(&'a Component, Occurrence)>> {
        let mut all = vec![];
        for component in self.components.iter() {
            for result in evaluator.iter(component, from, to) {
                all.push((component, result?));
            }
        }
        all.sort_by(|(_, o1), (_, o2)| o1.start().compare(o2.start()));
        Ok(all)
    }
}

impl FromIterator<Component> for Calendar {
    fn from_iter<I: IntoIterator<Item = Component>>(it: I) -> Calendar {
        Calendar { components: it.into_iter().collect() }
    }
}
