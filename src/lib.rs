/*!
An RFC 5545 (iCalendar) recurrence engine.

The main entry point is [`Evaluator`], which computes the concrete
occurrences of a [`Component`] within a window of time. A component is
usually built from its properties with [`Component::from_properties`], but
it can also be assembled by hand from [`ZonedInstant`], [`Period`] and
[`RecurrenceRule`] values.

```
use ical_recur::{
    Component, ComponentKind, Evaluator, TzdbResolver, ZonedInstant,
    content::parse_content_lines,
};

let lines = parse_content_lines(
    "DTSTART;TZID=America/New_York:20240101T090000\r\n\
     RRULE:FREQ=WEEKLY;BYDAY=MO,WE;COUNT=4\r\n",
)?;
let resolver = TzdbResolver::new();
let event =
    Component::from_properties(ComponentKind::Event, &lines, &resolver)?;

let from: ZonedInstant = "2024-01-01[America/New_York]".parse()?;
let to: ZonedInstant = "2024-02-01[America/New_York]".parse()?;
let starts: Vec<String> = Evaluator::new()
    .evaluate(&event, &from, &to)?
    .iter()
    .map(|o| o.start().to_string())
    .collect();
assert_eq!(starts, vec![
    "2024-01-01T09:00:00-05:00[America/New_York]",
    "2024-01-03T09:00:00-05:00[America/New_York]",
    "2024-01-08T09:00:00-05:00[America/New_York]",
    "2024-01-10T09:00:00-05:00[America/New_York]",
]);

# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub use crate::{
    component::{Component, ComponentKind},
    datetime::ZonedInstant,
    error::{Error, Result},
    evaluate::{Calendar, Evaluator, Occurrence, OccurrenceIter},
    fold::{fold, serialize_date_time, unfold},
    period::Period,
    rrule::{
        ByWeekday, Frequency, RecurrenceIter, RecurrenceRule,
        RecurrenceRuleBuilder,
    },
    span::Duration,
    timezone::{TzdbResolver, ZoneResolver},
};

mod component;
pub mod content;
mod datetime;
mod error;
mod evaluate;
pub mod fold;
mod parse;
mod period;
mod rrule;
mod span;
pub mod timezone;
mod weekdate;
