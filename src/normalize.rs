//! Canonical-form serializer (component C5).
//!
//! Consumes the AST read-only and produces the textual identity form used
//! by [`idempotence`](Self) tests: `normalize(normalize(s)) == normalize(s)`.
//! A rule with no selectors at all -- whether it started life as a literal
//! `24/7` or as a stand-alone comment -- normalizes to `24/7`, since both
//! collapse to the same AST shape and there is nothing left to distinguish
//! them by.

use time::{Month, Weekday};

use crate::ast::*;

pub fn normalize(ruleset: &Ruleset) -> String {
    let mut out = String::new();
    for (i, rule) in ruleset.rules.iter().enumerate() {
        if i > 0 {
            out.push_str(match rule.kind {
                RuleKind::Normal => "; ",
                RuleKind::Additional => ", ",
                RuleKind::Fallback => " || ",
            });
        }
        out.push_str(&render_rule(rule));
    }
    out
}

fn render_rule(rule: &Rule) -> String {
    let mut out = if rule.has_any_selector() {
        let wide = render_wide_range(rule);
        let small = render_small_range(rule);
        [wide, small].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
    } else {
        "24/7".to_string()
    };

    match rule.state {
        RuleState::Open => {}
        RuleState::Closed => out.push_str(" closed"),
        RuleState::Off => out.push_str(" off"),
        RuleState::Unknown => out.push_str(" unknown"),
    }

    if let Some(c) = &rule.comment {
        out.push_str(" \"");
        out.push_str(&c.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    }

    out
}

fn render_wide_range(rule: &Rule) -> String {
    let mut parts = Vec::new();
    if let Some(y) = &rule.year {
        parts.push(render_year_selector(y));
    }
    if let Some(md) = &rule.monthday {
        parts.push(render_monthday_selector(md));
    }
    if let Some(w) = &rule.week {
        parts.push(render_week_selector(w));
    }
    parts.join(" ")
}

fn render_small_range(rule: &Rule) -> String {
    let mut parts = Vec::new();
    if let Some(wd) = &rule.weekday {
        parts.push(render_weekday_selector(wd));
    }
    if let Some(t) = &rule.time {
        parts.push(render_time_selector(t));
    }
    parts.join(" ")
}

fn render_day_offset(days: i64) -> String {
    if days == 0 {
        return String::new();
    }
    let sign = if days > 0 { "+" } else { "-" };
    let n = days.abs();
    let word = if n == 1 { "day" } else { "days" };
    format!(" {sign}{n} {word}")
}

fn render_year_range(r: &YearRange) -> String {
    match r {
        YearRange::Single(y) => y.to_string(),
        YearRange::Closed(a, b) => format!("{a}-{b}"),
        YearRange::OpenEnded(a) => format!("{a}+"),
        YearRange::Periodic(a, b, p) => format!("{a}-{b}/{p}"),
    }
}

fn render_year_selector(sel: &YearSelector) -> String {
    sel.ranges.iter().map(render_year_range).collect::<Vec<_>>().join(",")
}

fn month_short(m: Month) -> &'static str {
    match m {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn weekday_short(w: Weekday) -> &'static str {
    match w {
        Weekday::Monday => "Mo",
        Weekday::Tuesday => "Tu",
        Weekday::Wednesday => "We",
        Weekday::Thursday => "Th",
        Weekday::Friday => "Fr",
        Weekday::Saturday => "Sa",
        Weekday::Sunday => "Su",
    }
}

fn render_date_bound(b: &DateBound) -> String {
    match b {
        DateBound::Easter { .. } => "easter".to_string(),
        DateBound::Calendar { month, day: Some(d) } => format!("{} {:02}", month_short(*month), d),
        DateBound::Calendar { month, day: None } => month_short(*month).to_string(),
    }
}

fn render_monthday_range(r: &MonthdayRange) -> String {
    let mut s = render_date_bound(&r.from);
    s.push_str(&render_day_offset(r.from_offset));
    if let Some(to) = &r.to {
        s.push('-');
        let same_month = matches!(
            (&r.from, to),
            (DateBound::Calendar { month: m1, .. }, DateBound::Calendar { month: m2, .. }) if m1 == m2
        );
        if same_month {
            if let DateBound::Calendar { day: Some(d), .. } = to {
                s.push_str(&format!("{d:02}"));
            } else {
                s.push_str(&render_date_bound(to));
            }
        } else {
            s.push_str(&render_date_bound(to));
        }
        s.push_str(&render_day_offset(r.to_offset));
    }
    s
}

fn render_monthday_selector(sel: &MonthdaySelector) -> String {
    sel.ranges.iter().map(render_monthday_range).collect::<Vec<_>>().join(",")
}

fn render_week_range(r: &WeekRange) -> String {
    let mut s = if r.begin == r.end {
        r.begin.to_string()
    } else {
        format!("{}-{}", r.begin, r.end)
    };
    if let Some(i) = r.interval {
        s.push_str(&format!("/{i}"));
    }
    s
}

fn render_week_selector(sel: &WeekSelector) -> String {
    format!("week {}", sel.ranges.iter().map(render_week_range).collect::<Vec<_>>().join(","))
}

fn render_holiday(h: &HolidaySelector) -> String {
    let mut s = match h.kind {
        HolidayKind::Public => "PH",
        HolidayKind::School => "SH",
    }
    .to_string();
    s.push_str(&render_day_offset(h.day_offset));
    s
}

fn render_weekday_range(r: &WeekdayRange) -> String {
    let mut s = weekday_short(r.begin).to_string();
    if r.end != r.begin {
        s.push('-');
        s.push_str(weekday_short(r.end));
    }
    if !r.nth.is_empty() {
        s.push('[');
        s.push_str(&r.nth.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(","));
        s.push(']');
    }
    s.push_str(&render_day_offset(r.day_offset));
    s
}

/// Holidays render before weekday ranges; the AST keeps them as two
/// parallel sequences (see `WeekdaySelector`) so their original interleave
/// position in the source is not recoverable, nor semantically relevant.
fn render_weekday_selector(sel: &WeekdaySelector) -> String {
    let mut parts: Vec<String> = sel.holidays.iter().map(render_holiday).collect();
    parts.extend(sel.weekdays.iter().map(render_weekday_range));
    parts.join(",")
}

fn render_time_point(t: &Time) -> String {
    match t {
        Time::Clock { hour, minute } => format!("{hour:02}:{minute:02}"),
        Time::Variable { event, offset_minutes } => {
            let name = match event {
                Event::Sunrise => "sunrise",
                Event::Sunset => "sunset",
                Event::Dawn => "dawn",
                Event::Dusk => "dusk",
            };
            if *offset_minutes == 0 {
                name.to_string()
            } else {
                let sign = if *offset_minutes > 0 { "+" } else { "-" };
                format!("({name}{sign}{})", offset_minutes.abs())
            }
        }
    }
}

fn render_period(period_minutes: u16) -> String {
    let hour = period_minutes / 60;
    let minute = period_minutes % 60;
    if minute > 0 {
        format!("{hour:02}:{minute:02}")
    } else {
        format!("{hour:02}")
    }
}

fn render_timespan(t: &Timespan) -> String {
    let mut s = render_time_point(&t.begin);
    if t.open_end {
        s.push('+');
    } else if let Some(end) = &t.end {
        s.push('-');
        s.push_str(&render_time_point(end));
        if let Some(p) = t.period_minutes {
            s.push('/');
            s.push_str(&render_period(p));
        }
    }
    s
}

fn render_time_selector(sel: &TimeSelector) -> String {
    sel.spans.iter().map(render_timespan).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_ruleset;

    fn roundtrip(input: &str) -> String {
        let rs = parse_ruleset(&tokenize(input)).expect("should parse");
        normalize(&rs)
    }

    #[test]
    fn normalizes_simple_weekday_rule() {
        assert_eq!(roundtrip("Mo-Fr 10:00-20:00"), "Mo-Fr 10:00-20:00");
    }

    #[test]
    fn normalizes_24_7_with_state_and_comment() {
        assert_eq!(
            roundtrip(r#"24/7 closed "always closed""#),
            r#"24/7 closed "always closed""#
        );
    }

    #[test]
    fn normalizes_multi_rule_expression() {
        assert_eq!(
            roundtrip("Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off"),
            "Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off"
        );
    }

    #[test]
    fn normalizes_monthday_range_same_month() {
        assert_eq!(roundtrip("2020 Dec 24-26 off"), "2020 Dec 24-26 off");
    }

    #[test]
    fn normalizes_monthday_range_different_months() {
        assert_eq!(roundtrip("Dec 24-Jan 03 off"), "Dec 24-Jan 03 off");
    }

    #[test]
    fn normalizes_fallback_separator() {
        assert_eq!(roundtrip("PH off || open"), "PH off || open");
    }

    #[test]
    fn normalizes_period_to_clock_form() {
        assert_eq!(roundtrip("10:00-16:00/90"), "10:00-16:00/01:30");
    }

    #[test]
    fn normalizes_period_without_minutes() {
        assert_eq!(roundtrip("10:00-16:00/60"), "10:00-16:00/01");
    }

    #[test]
    fn idempotent_on_already_canonical_input() {
        let canon = roundtrip("Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off");
        let rs = parse_ruleset(&tokenize(&canon)).unwrap();
        assert_eq!(normalize(&rs), canon);
    }

    #[test]
    fn normalizes_sun_event_with_offset() {
        assert_eq!(roundtrip("(sunset+30)-(sunrise-15)"), "(sunset+30)-(sunrise-15)");
    }

    #[test]
    fn normalizes_nth_weekday_mask() {
        assert_eq!(roundtrip("We[1,-1] 10:00-12:00"), "We[1,-1] 10:00-12:00");
    }

    #[test]
    fn normalizes_holiday_day_offset() {
        assert_eq!(roundtrip("PH +1 day off"), "PH +1 day off");
    }

    #[test]
    fn stand_alone_comment_normalizes_to_24_7() {
        assert_eq!(roundtrip(r#""only after registration""#), r#"24/7 "only after registration""#);
    }
}
