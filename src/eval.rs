//! Evaluator (component C7): intersects rule selectors against a wall-clock
//! calendar and emits `Interval`s.
//!
//! The day is the unit of computation: for a queried instant we materialize
//! the calendar day's candidate intervals rule-by-rule, in source order, then
//! stitch in whatever spills over from the previous day's overnight wrap.
//! Nothing here attempts a closed-form interval algebra over the whole
//! ruleset.

mod calendar;

use time::{Duration, Month, PrimitiveDateTime};

use crate::ast::*;
use crate::error::Error;
use crate::providers::EvalContext;

/// A calendar day, in minutes-since-midnight, may run up to 48:00 to
/// express a rule whose own time selector wraps past midnight (hours may
/// exceed 24 to express wrapping, e.g. `22:00-26:00`).
const DAY_MINUTES: u32 = 24 * 60;
const MAX_MINUTES: u32 = 2 * DAY_MINUTES;

/// The evaluated state of an [`Interval`]. Distinct from [`RuleState`]:
/// `Closed` and `Off` are different spellings of the same grammar token
/// but collapse to one evaluated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    Open,
    Closed,
    Unknown,
}

impl From<RuleState> for EvalState {
    fn from(s: RuleState) -> Self {
        match s {
            RuleState::Open => EvalState::Open,
            RuleState::Closed | RuleState::Off => EvalState::Closed,
            RuleState::Unknown => EvalState::Unknown,
        }
    }
}

/// A half-open span of time carrying one evaluated state and an optional
/// comment. `begin`/`end` of `None` denote an unbounded side, produced
/// only by the `is_24_7` fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub state: EvalState,
    pub begin: Option<PrimitiveDateTime>,
    pub end: Option<PrimitiveDateTime>,
    pub comment: Option<String>,
}

impl Interval {
    pub fn contains(&self, instant: PrimitiveDateTime) -> bool {
        self.begin.map_or(true, |b| instant >= b) && self.end.map_or(true, |e| instant < e)
    }

    pub fn intersects(&self, other: &Interval) -> bool {
        let begins_before_other_ends = match (self.begin, other.end) {
            (Some(b), Some(oe)) => b < oe,
            _ => true,
        };
        let ends_after_other_begins = match (self.end, other.begin) {
            (Some(e), Some(ob)) => e > ob,
            _ => true,
        };
        begins_before_other_ends && ends_after_other_begins
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by `begin`; an open (unbounded) begin sorts before every bounded one.
impl Ord for Interval {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.begin, other.begin) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

/// Which kind of rule last wrote a [`Segment`], governing whether a later
/// rule is allowed to overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetBy {
    /// Untouched seed state: `Closed`, no comment.
    Base,
    Normal,
    Additional,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    begin: u32,
    end: u32,
    state: EvalState,
    comment: Option<String>,
    set_by: SetBy,
}

/// Upper bound on how many calendar days `interval_at`/`next_interval` will
/// walk while stitching adjacent identical days or scanning for the next
/// state change. Open-ended year ranges (`2020+`) have no natural horizon,
/// so this is a generous backstop rather than a correctness guarantee.
const MAX_WALK_DAYS: i64 = 366 * 5;

/// `Expression::is_24_7` fast path: true for a single rule with no
/// selectors at all, the structural shape both a literal `24/7` and a
/// stand-alone comment parse down to.
pub fn is_24_7(ruleset: &Ruleset) -> bool {
    matches!(ruleset.rules.as_slice(), [rule] if !rule.has_any_selector())
}

pub fn interval_at(
    ruleset: &Ruleset,
    ctx: &EvalContext<'_>,
    instant: PrimitiveDateTime,
) -> Result<Interval, Error> {
    if let [rule] = ruleset.rules.as_slice() {
        if !rule.has_any_selector() {
            return Ok(Interval {
                state: rule.state.into(),
                begin: None,
                end: None,
                comment: rule.comment.clone(),
            });
        }
    }

    let date = instant.date();
    let minute_of_day = instant.time().hour() as u32 * 60 + instant.time().minute() as u32;
    let segs = resolved_day(ruleset, date, ctx)?;
    let seg = segs
        .iter()
        .find(|s| s.begin <= minute_of_day && minute_of_day < s.end)
        .expect("resolved_day tiles [0, DAY_MINUTES) without gaps");

    let mut begin_dt = day_instant(date, seg.begin);
    let mut end_dt = day_instant(date, seg.end);

    let mut cur_date = date;
    let mut cur_begin = seg.begin;
    let (mut cur_state, mut cur_comment) = (seg.state, seg.comment.clone());
    for _ in 0..MAX_WALK_DAYS {
        if cur_begin != 0 {
            break;
        }
        let prev_date = cur_date - Duration::days(1);
        let prev_segs = resolved_day(ruleset, prev_date, ctx)?;
        let last = prev_segs.last().expect("resolved_day is never empty");
        if last.state != cur_state || last.comment != cur_comment {
            break;
        }
        begin_dt = day_instant(prev_date, last.begin);
        cur_date = prev_date;
        cur_begin = last.begin;
    }

    let mut cur_date = date;
    let mut cur_end = seg.end;
    let (cur_state, cur_comment) = (seg.state, seg.comment.clone());
    for _ in 0..MAX_WALK_DAYS {
        if cur_end != DAY_MINUTES {
            break;
        }
        let next_date = cur_date + Duration::days(1);
        let next_segs = resolved_day(ruleset, next_date, ctx)?;
        let first = next_segs.first().expect("resolved_day is never empty");
        if first.state != cur_state || first.comment != cur_comment {
            break;
        }
        end_dt = day_instant(next_date, first.end);
        cur_date = next_date;
        cur_end = first.end;
    }

    Ok(Interval { state: seg.state, begin: Some(begin_dt), end: Some(end_dt), comment: seg.comment.clone() })
}

pub fn next_interval(
    ruleset: &Ruleset,
    ctx: &EvalContext<'_>,
    after: PrimitiveDateTime,
) -> Result<Option<Interval>, Error> {
    let mut cur = interval_at(ruleset, ctx, after)?;
    for _ in 0..(MAX_WALK_DAYS * 2) {
        let Some(end) = cur.end else { return Ok(None) };
        let candidate = interval_at(ruleset, ctx, end)?;
        if candidate.state != cur.state {
            return Ok(Some(candidate));
        }
        cur = candidate;
    }
    Ok(None)
}

fn day_instant(date: time::Date, minute_of_day: u32) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, time::Time::MIDNIGHT) + Duration::minutes(minute_of_day as i64)
}

/// The real-calendar-day timeline: today's own `[0, DAY_MINUTES)` slice,
/// with whatever portion of yesterday's rule-driven wrap spills across
/// midnight overlaid on top of it. A spillover segment only exists when a
/// rule actually produced it (`set_by != Base`); a day that nobody's
/// selector wraps into leaves today's own computation untouched.
fn resolved_day(ruleset: &Ruleset, date: time::Date, ctx: &EvalContext<'_>) -> Result<Vec<Segment>, Error> {
    let today = day_timeline(ruleset, date, ctx)?;
    let yesterday = day_timeline(ruleset, date - Duration::days(1), ctx)?;

    let spill: Vec<Segment> = yesterday
        .into_iter()
        .filter(|s| s.end > DAY_MINUTES && s.set_by != SetBy::Base)
        .map(|mut s| {
            s.begin = s.begin.saturating_sub(DAY_MINUTES);
            s.end -= DAY_MINUTES;
            s
        })
        .collect();

    let mut today_slice: Vec<Segment> = today
        .into_iter()
        .filter(|s| s.begin < DAY_MINUTES)
        .map(|mut s| {
            s.end = s.end.min(DAY_MINUTES);
            s
        })
        .collect();

    for s in spill {
        apply_segment(&mut today_slice, s.begin, s.end, s.state, s.comment.as_deref(), RuleKind::Normal);
    }
    Ok(coalesce(today_slice))
}

/// One calendar day's candidate intervals, rule-by-rule in source order,
/// over the `[0, MAX_MINUTES)` domain. The extra half beyond
/// `DAY_MINUTES` exists only to hold a rule's own overnight wrap;
/// [`resolved_day`] is what stitches that back onto the real following
/// day.
fn day_timeline(ruleset: &Ruleset, date: time::Date, ctx: &EvalContext<'_>) -> Result<Vec<Segment>, Error> {
    let mut segs = vec![Segment {
        begin: 0,
        end: MAX_MINUTES,
        state: EvalState::Closed,
        comment: None,
        set_by: SetBy::Base,
    }];
    for rule in &ruleset.rules {
        if !matches_day(rule, date, ctx) {
            continue;
        }
        let state: EvalState = rule.state.into();
        for (lo, hi) in rule_time_ranges(rule, date, ctx)? {
            apply_segment(&mut segs, lo, hi, state, rule.comment.as_deref(), rule.kind);
        }
    }
    Ok(coalesce(segs))
}

/// Inserts `[lo, hi)` into `segs` according to the three composition modes:
/// - `Normal` always overwrites (`;`): it replaces the rule-set's running
///   answer for that time range outright.
/// - `Additional` (`,`) only fills cells still at `Base` or `Fallback` --
///   i.e. cells no prior `Normal` rule claimed. Two overlapping
///   `Additional` rules still combine: the later one's state wins and
///   distinct comments are joined with `" / "`.
/// - `Fallback` (`||`) only fills cells still at `Base` -- no prior rule,
///   of any kind, matched there.
fn apply_segment(segs: &mut Vec<Segment>, lo: u32, hi: u32, state: EvalState, comment: Option<&str>, kind: RuleKind) {
    if lo >= hi {
        return;
    }
    split_at(segs, lo);
    split_at(segs, hi);
    for seg in segs.iter_mut() {
        if seg.begin < lo || seg.end > hi {
            continue;
        }
        match kind {
            RuleKind::Normal => {
                seg.state = state;
                seg.comment = comment.map(str::to_string);
                seg.set_by = SetBy::Normal;
            }
            RuleKind::Additional => match seg.set_by {
                SetBy::Normal => {}
                SetBy::Base | SetBy::Fallback => {
                    seg.state = state;
                    seg.comment = comment.map(str::to_string);
                    seg.set_by = SetBy::Additional;
                }
                SetBy::Additional => {
                    seg.comment = concat_comment(seg.comment.as_deref(), comment);
                    seg.state = state;
                }
            },
            RuleKind::Fallback => {
                if seg.set_by == SetBy::Base {
                    seg.state = state;
                    seg.comment = comment.map(str::to_string);
                    seg.set_by = SetBy::Fallback;
                }
            }
        }
    }
}

/// Comments concatenate with `" / "` only when distinct.
fn concat_comment(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Some(a.to_string()),
        (Some(a), Some(b)) => Some(format!("{a} / {b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

fn split_at(segs: &mut Vec<Segment>, pos: u32) {
    if let Some(idx) = segs.iter().position(|s| s.begin < pos && pos < s.end) {
        let mut tail = segs[idx].clone();
        segs[idx].end = pos;
        tail.begin = pos;
        segs.insert(idx + 1, tail);
    }
}

fn coalesce(segs: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segs.len());
    for seg in segs {
        if let Some(last) = out.last_mut() {
            if last.end == seg.begin && last.state == seg.state && last.comment == seg.comment {
                last.end = seg.end;
                continue;
            }
        }
        out.push(seg);
    }
    out
}

fn matches_day(rule: &Rule, date: time::Date, ctx: &EvalContext<'_>) -> bool {
    if let Some(y) = &rule.year {
        if !year_matches(y, date.year()) {
            return false;
        }
    }
    if let Some(md) = &rule.monthday {
        if !monthday_matches(md, date) {
            return false;
        }
    }
    if let Some(w) = &rule.week {
        if !week_matches(w, date) {
            return false;
        }
    }
    if let Some(wd) = &rule.weekday {
        if !weekday_matches(wd, date, ctx) {
            return false;
        }
    }
    true
}

fn year_matches(sel: &YearSelector, year: i32) -> bool {
    sel.ranges.iter().any(|r| match *r {
        YearRange::Single(y) => y == year,
        YearRange::Closed(a, b) => (a..=b).contains(&year),
        YearRange::OpenEnded(a) => year >= a,
        YearRange::Periodic(a, b, p) => (a..=b).contains(&year) && p > 0 && (year - a) % (p as i32) == 0,
    })
}

fn week_matches(sel: &WeekSelector, date: time::Date) -> bool {
    let (_, week, _) = date.to_iso_week_date();
    sel.ranges.iter().any(|r| {
        if r.begin <= r.end {
            (r.begin..=r.end).contains(&week) && r.interval.map_or(true, |iv| iv > 0 && (week - r.begin) % iv == 0)
        } else {
            week >= r.begin || week <= r.end
        }
    })
}

fn weekday_matches(sel: &WeekdaySelector, date: time::Date, ctx: &EvalContext<'_>) -> bool {
    for h in &sel.holidays {
        let dates = holiday_dates(ctx, h.kind, date.year());
        if dates.iter().any(|d| *d + Duration::days(h.day_offset) == date) {
            return true;
        }
    }
    for wr in &sel.weekdays {
        let shifted = date - Duration::days(wr.day_offset);
        if calendar::weekday_in_range(shifted.weekday(), wr.begin, wr.end) && calendar::nth_weekday_matches(shifted, &wr.nth) {
            return true;
        }
    }
    false
}

/// Public holidays near a year boundary can shift into the adjacent
/// calendar year once a `day_offset` is applied, so all three years
/// around `year` are queried. School holidays always come back empty:
/// the capability validator rejects any expression that reaches here
/// with `UnsupportedFeature` before evaluation begins.
fn holiday_dates(ctx: &EvalContext<'_>, kind: HolidayKind, year: i32) -> Vec<time::Date> {
    let (HolidayKind::Public, Some(region), Some(provider)) = (kind, ctx.region, ctx.holidays) else {
        return Vec::new();
    };
    [year - 1, year, year + 1].into_iter().flat_map(|y| provider.public_holidays(region, y)).collect()
}

fn monthday_matches(sel: &MonthdaySelector, date: time::Date) -> bool {
    sel.ranges.iter().any(|r| monthday_range_matches(r, date))
}

/// A range with no explicit year is also checked anchored a year earlier,
/// so a wrap like `Dec 24-Jan 3` still matches its January tail (e.g.
/// `2021-01-02` falls inside the range anchored at 2020).
fn monthday_range_matches(r: &MonthdayRange, date: time::Date) -> bool {
    if let Some(y) = r.year {
        let (from, to) = monthday_bounds(r, y);
        return date >= from && date <= to;
    }
    [date.year(), date.year() - 1].into_iter().any(|year| {
        let (from, to) = monthday_bounds(r, year);
        date >= from && date <= to
    })
}

fn monthday_bounds(r: &MonthdayRange, year: i32) -> (time::Date, time::Date) {
    let from = resolve_bound(&r.from, year) + Duration::days(r.from_offset);
    let to = match &r.to {
        None => match r.from {
            DateBound::Calendar { month, day: None } => last_day_of_month(year, month),
            _ => from,
        },
        Some(to_bound) => {
            let mut to_year = year;
            let mut resolved = resolve_bound(to_bound, to_year);
            if resolved < from {
                to_year += 1;
                resolved = resolve_bound(to_bound, to_year);
            }
            let resolved = match to_bound {
                DateBound::Calendar { month, day: None } => last_day_of_month(to_year, *month),
                _ => resolved,
            };
            resolved + Duration::days(r.to_offset)
        }
    };
    (from, to)
}

fn resolve_bound(b: &DateBound, year: i32) -> time::Date {
    match *b {
        DateBound::Calendar { month, day } => {
            time::Date::from_calendar_date(year, month, day.unwrap_or(1)).expect("validated by the parser")
        }
        DateBound::Easter { offset_days } => calendar::easter_date(year) + Duration::days(offset_days as i64),
    }
}

fn last_day_of_month(year: i32, month: Month) -> time::Date {
    let days = time::util::days_in_year_month(year, month);
    time::Date::from_calendar_date(year, month, days).expect("valid calendar month")
}

fn rule_time_ranges(rule: &Rule, date: time::Date, ctx: &EvalContext<'_>) -> Result<Vec<(u32, u32)>, Error> {
    let Some(sel) = &rule.time else { return Ok(vec![(0, DAY_MINUTES)]) };
    let mut out = Vec::with_capacity(sel.spans.len());
    for span in &sel.spans {
        let lo = resolve_time(&span.begin, date, ctx)?;
        let mut hi = if let Some(end) = &span.end {
            resolve_time(end, date, ctx)?
        } else if span.open_end {
            MAX_MINUTES as i32
        } else {
            lo
        };
        if hi <= lo {
            hi += DAY_MINUTES as i32;
        }
        let lo = lo.clamp(0, MAX_MINUTES as i32) as u32;
        let hi = hi.clamp(0, MAX_MINUTES as i32) as u32;
        if hi > lo {
            out.push((lo, hi));
        }
    }
    Ok(out)
}

fn resolve_time(t: &Time, date: time::Date, ctx: &EvalContext<'_>) -> Result<i32, Error> {
    match *t {
        Time::Clock { hour, minute } => Ok(hour as i32 * 60 + minute as i32),
        Time::Variable { event, offset_minutes } => {
            let provider = ctx.sun_events.ok_or(Error::MissingLocation)?;
            let (lat, lon) = ctx.location.ok_or(Error::MissingLocation)?;
            let at = provider.sun_event(event, date, lat, lon);
            Ok(at.hour() as i32 * 60 + at.minute() as i32 + offset_minutes as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_ruleset;
    use crate::providers::HolidayProvider;

    fn parse(input: &str) -> Ruleset {
        parse_ruleset(&tokenize(input)).expect("should parse")
    }

    struct FixedHolidays(Vec<time::Date>);
    impl HolidayProvider for FixedHolidays {
        fn public_holidays(&self, _region: &str, _year: i32) -> Vec<time::Date> {
            self.0.clone()
        }
    }

    #[test]
    fn weekday_time_rule_open_inside_window() {
        let rs = parse("Mo-Fr 10:00-20:00");
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 14:00)).unwrap(); // a Tuesday
        assert_eq!(i.state, EvalState::Open);
    }

    #[test]
    fn always_closed_with_comment() {
        let rs = parse(r#"24/7 closed "always closed""#);
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 14:00)).unwrap();
        assert_eq!(i.state, EvalState::Closed);
        assert_eq!(i.comment.as_deref(), Some("always closed"));
        assert_eq!(i.begin, None);
        assert_eq!(i.end, None);
    }

    #[test]
    fn public_holiday_overrides_weekday_rule() {
        let rs = parse("Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off");
        let holidays = FixedHolidays(vec![date!(2024 - 07 - 22)]); // a Monday
        let ctx = EvalContext::new().with_region("xx").with_holidays(&holidays);
        let i = interval_at(&rs, &ctx, datetime!(2024-07-22 10:00)).unwrap();
        assert_eq!(i.state, EvalState::Closed);
    }

    #[test]
    fn year_monthday_range_closed() {
        let rs = parse("2020 Dec 24-26 off");
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2020-12-25 12:00)).unwrap();
        assert_eq!(i.state, EvalState::Closed);
    }

    #[test]
    fn monthday_range_wraps_across_new_year() {
        let rs = parse("Dec 24-Jan 03 off");
        let ctx = EvalContext::new();
        let tail = interval_at(&rs, &ctx, datetime!(2021-01-02 12:00)).unwrap();
        assert_eq!(tail.state, EvalState::Closed);
        let head = interval_at(&rs, &ctx, datetime!(2020-12-25 12:00)).unwrap();
        assert_eq!(head.state, EvalState::Closed);
        let outside = interval_at(&rs, &ctx, datetime!(2021-02-01 12:00)).unwrap();
        assert_eq!(outside.state, EvalState::Open);
    }

    #[test]
    fn weekday_override_closes_single_day() {
        let rs = parse("Mo-Sa 10:00-20:00; Tu off");
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 15:00)).unwrap(); // a Tuesday
        assert_eq!(i.state, EvalState::Closed);
    }

    #[test]
    fn fallback_applies_only_where_nothing_else_matched() {
        let rs = parse("PH off || open");
        let holidays = FixedHolidays(vec![date!(2024 - 07 - 22)]);
        let ctx = EvalContext::new().with_region("xx").with_holidays(&holidays);
        let on_holiday = interval_at(&rs, &ctx, datetime!(2024-07-22 10:00)).unwrap();
        assert_eq!(on_holiday.state, EvalState::Closed);
        let other_day = interval_at(&rs, &ctx, datetime!(2024-07-23 10:00)).unwrap();
        assert_eq!(other_day.state, EvalState::Open);
    }

    #[test]
    fn fallback_rule_is_still_restricted_by_its_own_selectors() {
        // The fallback's `Fr` weekday selector must gate it just like any
        // other rule; a Monday evening must not be filled by a Friday-only
        // fallback just because nothing else matched.
        let rs = parse("Mo 10:00-12:00 || Fr 20:00-22:00");
        let ctx = EvalContext::new();
        let monday_evening = interval_at(&rs, &ctx, datetime!(2024-07-22 21:00)).unwrap(); // a Monday
        assert_eq!(monday_evening.state, EvalState::Closed);
        let friday_evening = interval_at(&rs, &ctx, datetime!(2024-07-26 21:00)).unwrap(); // a Friday
        assert_eq!(friday_evening.state, EvalState::Open);
    }

    #[test]
    fn gap_between_timespans_is_closed() {
        let rs = parse("09:00-12:00,14:00-17:00");
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 13:00)).unwrap();
        assert_eq!(i.state, EvalState::Closed);
    }

    #[test]
    fn overnight_wrap_crosses_midnight() {
        let rs = parse("22:00-02:00");
        let ctx = EvalContext::new();
        let late_night = interval_at(&rs, &ctx, datetime!(2024-07-23 23:30)).unwrap();
        assert_eq!(late_night.state, EvalState::Open);
        let early_morning = interval_at(&rs, &ctx, datetime!(2024-07-24 01:00)).unwrap();
        assert_eq!(early_morning.state, EvalState::Open);
        let mid_morning = interval_at(&rs, &ctx, datetime!(2024-07-24 10:00)).unwrap();
        assert_eq!(mid_morning.state, EvalState::Closed);
    }

    #[test]
    fn next_interval_finds_the_closing_boundary() {
        let rs = parse("Mo-Fr 10:00-20:00");
        let ctx = EvalContext::new();
        let next = next_interval(&rs, &ctx, datetime!(2024-07-23 14:00)).unwrap().unwrap();
        assert_eq!(next.state, EvalState::Closed);
        assert_eq!(next.begin, Some(datetime!(2024-07-23 20:00)));
    }

    #[test]
    fn next_interval_on_permanent_state_is_none() {
        let rs = parse("24/7");
        let ctx = EvalContext::new();
        assert_eq!(next_interval(&rs, &ctx, datetime!(2024-07-23 14:00)).unwrap(), None);
    }

    #[test]
    fn additional_rules_concatenate_distinct_overlapping_comments() {
        // The first rule is plain `Normal` and stays out of the window under
        // test; the two comma-separated rules after it are both
        // `Additional` and overlap each other at 12:00-14:00.
        let rs = parse(r#"00:00-00:01 off, 10:00-16:00 open "a", 12:00-14:00 open "b""#);
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 13:00)).unwrap();
        assert_eq!(i.comment.as_deref(), Some("a / b"));
    }

    #[test]
    fn additional_rule_does_not_touch_an_already_open_normal_cell() {
        let rs = parse(r#"10:00-16:00 open "a", 12:00-14:00 open "b""#);
        let ctx = EvalContext::new();
        let i = interval_at(&rs, &ctx, datetime!(2024-07-23 13:00)).unwrap();
        assert_eq!(i.comment.as_deref(), Some("a"));
    }
}
