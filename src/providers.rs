//! Collaborator interfaces (component C8).
//!
//! The engine is pure with respect to these: every call must be
//! synchronous and non-blocking (cached by the caller if needed). None of
//! these traits are object-unsized beyond the usual `dyn`-safety rules, so
//! a single [`EvalContext`] can borrow trait objects for the lifetime of
//! one evaluation call.

use time::{Date, PrimitiveDateTime};

use crate::ast::Event;

/// `public_holidays(region, year) -> sorted list of dates`. Absence of a
/// provider surfaces `MissingRegion` at validation time, not here.
pub trait HolidayProvider {
    fn public_holidays(&self, region: &str, year: i32) -> Vec<Date>;
}

/// `school_holidays(region, year) -> list of (begin, end)`. Wired in for
/// completeness; an expression that needs it is rejected with
/// `UnsupportedFeature` before evaluation is ever attempted.
pub trait SchoolHolidayProvider {
    fn school_holidays(&self, region: &str, year: i32) -> Vec<(Date, Date)>;
}

/// `sun_event(kind, date, lat, lon) -> wall-clock time of day`. Absence of
/// a provider surfaces `MissingLocation` at validation time.
pub trait SunEventProvider {
    fn sun_event(&self, kind: Event, date: Date, lat: f64, lon: f64) -> time::Time;
}

/// Supplies "now" for callers that want the current state rather than a
/// specific instant. The engine performs no time-zone conversion; the
/// clock is expected to already report local wall-clock time.
pub trait Clock {
    fn now(&self) -> PrimitiveDateTime;
}

/// Bundles the optional collaborators an evaluation call may need.
/// Borrowed for the duration of one [`crate::Expression::interval_at`] or
/// similar call; nothing here is retained across calls.
#[derive(Default, Clone, Copy)]
pub struct EvalContext<'a> {
    pub region: Option<&'a str>,
    pub location: Option<(f64, f64)>,
    pub holidays: Option<&'a dyn HolidayProvider>,
    pub school_holidays: Option<&'a dyn SchoolHolidayProvider>,
    pub sun_events: Option<&'a dyn SunEventProvider>,
    pub clock: Option<&'a dyn Clock>,
}

impl<'a> EvalContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: &'a str) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some((lat, lon));
        self
    }

    pub fn with_holidays(mut self, provider: &'a dyn HolidayProvider) -> Self {
        self.holidays = Some(provider);
        self
    }

    pub fn with_school_holidays(mut self, provider: &'a dyn SchoolHolidayProvider) -> Self {
        self.school_holidays = Some(provider);
        self
    }

    pub fn with_sun_events(mut self, provider: &'a dyn SunEventProvider) -> Self {
        self.sun_events = Some(provider);
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn has_region(&self) -> bool {
        self.region.is_some() && self.holidays.is_some()
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some() && self.sun_events.is_some()
    }
}
