//! Capability bitmask and validator (component C6).
//!
//! Validation is a pure fold over the AST: walk every selector once,
//! accumulate the bits it requires, then map the accumulated set to at
//! most one error code. `NotImplemented` is a single catch-all bit so that
//! the list of rejected-but-grammatical constructs stays data-driven
//! rather than spread across ad-hoc checks.

use bitflags::bitflags;

use crate::ast::*;
use crate::error::Error;

bitflags! {
    /// Capabilities an expression may require from a collaborator, or from
    /// engine features this implementation deliberately does not support.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const PUBLIC_HOLIDAY = 0b0000_0001;
        const SCHOOL_HOLIDAY = 0b0000_0010;
        const LOCATION       = 0b0000_0100;
        const NOT_IMPLEMENTED = 0b0000_1000;
    }
}

/// Folds a ruleset into its required capabilities.
pub fn required_capabilities(ruleset: &Ruleset) -> Capabilities {
    let mut caps = Capabilities::empty();
    for rule in &ruleset.rules {
        caps |= rule_capabilities(rule);
    }
    caps
}

fn rule_capabilities(rule: &Rule) -> Capabilities {
    let mut caps = Capabilities::empty();

    if let Some(year) = &rule.year {
        for r in &year.ranges {
            if matches!(r, YearRange::OpenEnded(_) | YearRange::Periodic(..)) {
                caps |= Capabilities::NOT_IMPLEMENTED;
            }
        }
    }

    if let Some(week) = &rule.week {
        for r in &week.ranges {
            if r.begin > r.end {
                caps |= Capabilities::NOT_IMPLEMENTED;
            }
        }
    }

    if let Some(weekday) = &rule.weekday {
        for h in &weekday.holidays {
            match h.kind {
                HolidayKind::Public => caps |= Capabilities::PUBLIC_HOLIDAY,
                HolidayKind::School => caps |= Capabilities::SCHOOL_HOLIDAY,
            }
        }
    }

    if let Some(time) = &rule.time {
        for span in &time.spans {
            if uses_location(&span.begin) || span.end.as_ref().is_some_and(uses_location) {
                caps |= Capabilities::LOCATION;
            }
        }
    }

    caps
}

fn uses_location(t: &Time) -> bool {
    matches!(t, Time::Variable { .. })
}

/// A bounded range (`begin-end`) whose period was written `HH:MM` rather
/// than plain minutes, e.g. `10:00-16:00/1:30`.
fn is_clock_form_period(span: &Timespan) -> bool {
    span.end.is_some() && span.period_clock_form
}

/// Runs the full validator, returning the first error the ruleset
/// triggers, preferring the most specific diagnosis.
///
/// `has_region` / `has_location` reflect whether collaborator providers
/// were configured for the expression (see [`crate::providers`]).
pub fn validate(ruleset: &Ruleset, has_region: bool, has_location: bool) -> Option<Error> {
    let caps = required_capabilities(ruleset);

    if caps.contains(Capabilities::SCHOOL_HOLIDAY) {
        return Some(Error::UnsupportedFeature);
    }
    if caps.contains(Capabilities::NOT_IMPLEMENTED) {
        return Some(Error::UnsupportedFeature);
    }
    if caps.contains(Capabilities::PUBLIC_HOLIDAY) && !has_region {
        return Some(Error::MissingRegion);
    }
    if caps.contains(Capabilities::LOCATION) && !has_location {
        return Some(Error::MissingLocation);
    }
    for rule in &ruleset.rules {
        if let Some(time) = &rule.time {
            for span in &time.spans {
                if span.end.is_none() && !span.open_end {
                    return Some(Error::IncompatibleMode);
                }
                if span.open_end {
                    return Some(Error::UnsupportedFeature);
                }
                if is_clock_form_period(span) {
                    return Some(Error::IncompatibleMode);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_ruleset;

    fn caps_for(input: &str) -> Capabilities {
        let rs = parse_ruleset(&tokenize(input)).unwrap();
        required_capabilities(&rs)
    }

    #[test]
    fn plain_rule_needs_nothing() {
        assert_eq!(caps_for("Mo-Fr 10:00-20:00"), Capabilities::empty());
    }

    #[test]
    fn public_holiday_requires_region() {
        assert_eq!(caps_for("PH off"), Capabilities::PUBLIC_HOLIDAY);
        let rs = parse_ruleset(&tokenize("PH off")).unwrap();
        assert_eq!(validate(&rs, false, false), Some(Error::MissingRegion));
        assert_eq!(validate(&rs, true, false), None);
    }

    #[test]
    fn school_holiday_is_unsupported() {
        let rs = parse_ruleset(&tokenize("SH off")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::UnsupportedFeature));
    }

    #[test]
    fn sun_event_requires_location() {
        let rs = parse_ruleset(&tokenize("sunrise-sunset")).unwrap();
        assert!(required_capabilities(&rs).contains(Capabilities::LOCATION));
        assert_eq!(validate(&rs, true, false), Some(Error::MissingLocation));
        assert_eq!(validate(&rs, true, true), None);
    }

    #[test]
    fn bare_time_point_is_incompatible_mode() {
        let rs = parse_ruleset(&tokenize("10:00")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::IncompatibleMode));
    }

    #[test]
    fn clock_form_period_is_incompatible_mode() {
        let rs = parse_ruleset(&tokenize("10:00-16:00/1:30")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::IncompatibleMode));
        let rs = parse_ruleset(&tokenize("10:00-16:00/90")).unwrap();
        assert_eq!(validate(&rs, true, true), None);
    }

    #[test]
    fn open_end_bare_time_is_unsupported() {
        let rs = parse_ruleset(&tokenize("10:00+")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::UnsupportedFeature));
    }

    #[test]
    fn wrapping_week_range_is_unsupported() {
        let rs = parse_ruleset(&tokenize("week 50-10 off")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::UnsupportedFeature));
    }

    #[test]
    fn open_ended_periodic_year_is_unsupported() {
        let rs = parse_ruleset(&tokenize("2020-2030/2 Dec 24 off")).unwrap();
        assert_eq!(validate(&rs, true, true), Some(Error::UnsupportedFeature));
    }
}
