//! Immutable-after-build tree produced by the parser (component C4).
//!
//! Nothing in this module knows how to parse, normalize or evaluate itself;
//! those behaviors live in [`crate::parser`], [`crate::normalize`] and
//! [`crate::eval`] respectively. A selector chain is modeled as a flat,
//! ordered `Vec` of ranges owned by its parent selector rather than as a
//! linked list of heap nodes with optional tails -- there is no "next
//! selector" relationship to preserve, only a cursor over an owned sequence.

use time::{Month, Weekday};

/// A sun-relative event usable as a [`Time`] anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Sunrise,
    Sunset,
    Dawn,
    Dusk,
}

/// A point in the day: either wall-clock (hours may run past 24 to express
/// wrapping into the next calendar day, up to 48:00) or a variable event
/// with an optional signed minute offset, e.g. `(sunset+30)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Time {
    Clock { hour: u8, minute: u8 },
    Variable { event: Event, offset_minutes: i16 },
}

impl Time {
    pub const MIDNIGHT: Time = Time::Clock { hour: 0, minute: 0 };
    pub const END_OF_DAY: Time = Time::Clock { hour: 24, minute: 0 };

    pub(crate) fn clock_minutes(hour: u8, minute: u8) -> u16 {
        hour as u16 * 60 + minute as u16
    }
}

/// One `Timespan` production: `Time`, `Time '+'`, or `Time '-' Time ['/' Period]`.
///
/// `open_end` is the `HH:MM+` form; rejected by the validator as
/// `UnsupportedFeature` (see [`crate::capability`]). `period` is a repeat
/// interval in minutes (`/90` or `/01:30`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    pub begin: Time,
    pub end: Option<Time>,
    pub open_end: bool,
    pub period_minutes: Option<u16>,
    /// Whether the period was written `HH:MM` (`/1:30`) rather than plain
    /// minutes (`/90`). A clock-form period on a bounded range is only
    /// valid under the points-in-time mode this engine does not implement
    /// (see [`crate::capability`]).
    pub period_clock_form: bool,
}

/// `TimeSel := Timespan (',' Timespan)*`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSelector {
    pub spans: Vec<Timespan>,
}

/// A signed occurrence count within a month: `1` = first, `-1` = last.
pub type NthOccurrence = i8;

/// `WD ['-' WD] ['[' NthList ']'] [DayOffset]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayRange {
    pub begin: Weekday,
    pub end: Weekday,
    /// `end < begin` (in Mo..Su order) denotes wrap through Sunday, e.g. `Fr-Mo`.
    pub nth: Vec<NthOccurrence>,
    pub day_offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayKind {
    Public,
    School,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidaySelector {
    pub kind: HolidayKind,
    pub day_offset: i64,
}

/// Two parallel sub-sequences: ordinary weekday ranges and holiday tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekdaySelector {
    pub weekdays: Vec<WeekdayRange>,
    pub holidays: Vec<HolidaySelector>,
}

/// `INT ['-' INT ['/' INT]]`, ISO-8601 week numbers 1..=53.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub begin: u8,
    pub end: u8,
    pub interval: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekSelector {
    pub ranges: Vec<WeekRange>,
}

/// `INT | INT '-' INT ['/' INT] | INT '+'`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearRange {
    Single(i32),
    Closed(i32, i32),
    OpenEnded(i32),
    Periodic(i32, i32, u16),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearSelector {
    pub ranges: Vec<YearRange>,
}

/// An anchor for a [`MonthdayRange`] endpoint: a calendar month/day or a
/// variable date relative to Easter Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// `day == None` means the whole month.
    Calendar { month: Month, day: Option<u8> },
    Easter { offset_days: i32 },
}

/// `[Year] (Month | Month INT | VariableDate) [DateOffset] ['-' DateTo]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthdayRange {
    pub year: Option<i32>,
    pub from: DateBound,
    pub from_offset: i64,
    pub to: Option<DateBound>,
    pub to_offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthdaySelector {
    pub ranges: Vec<MonthdayRange>,
}

/// Open/closed/unknown, defaulting to `Open` when a rule carries a
/// selector but no explicit state token.
///
/// `Closed` and `Off` are the same evaluated state (see [`RuleState::is_closed`]);
/// kept as distinct variants only because the grammar has two spellings
/// (`closed` and `off`) and the normalizer round-trips whichever was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleState {
    #[default]
    Open,
    Closed,
    Off,
    Unknown,
}

impl RuleState {
    pub fn is_closed(self) -> bool {
        matches!(self, RuleState::Closed | RuleState::Off)
    }
}

/// The three composition modes, corresponding to the `;`, `,` and `||`
/// separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleKind {
    #[default]
    Normal,
    Additional,
    Fallback,
}

/// `[selectors] [state] [comment]`, or `24/7 [state] [comment]`.
///
/// A rule with every selector `None` and `state == Open` represents `24/7`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub year: Option<YearSelector>,
    pub monthday: Option<MonthdaySelector>,
    pub week: Option<WeekSelector>,
    pub weekday: Option<WeekdaySelector>,
    pub time: Option<TimeSelector>,
    pub state: RuleState,
    pub kind: RuleKind,
    pub comment: Option<String>,
}

impl Rule {
    pub fn has_any_selector(&self) -> bool {
        self.year.is_some()
            || self.monthday.is_some()
            || self.week.is_some()
            || self.weekday.is_some()
            || self.time.is_some()
    }
}

/// The whole ruleset, in source order. Rule order matters for evaluation
/// and is preserved by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    pub rules: Vec<Rule>,
}
