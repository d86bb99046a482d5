//! Pure calendar arithmetic used by the evaluator: Easter, ISO weeks,
//! nth-weekday-of-month, and weekday range membership. Nothing here
//! touches collaborator interfaces or the AST directly.

use time::{Date, Month, Weekday};

/// Gregorian Easter Sunday via the Anonymous algorithm (Meeus/Jones/Butcher).
pub fn easter_date(year: i32) -> Date {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    Date::from_calendar_date(year, Month::try_from(month as u8).expect("1..=12"), day as u8)
        .expect("valid Easter date")
}

pub fn weekday_index(w: Weekday) -> u8 {
    w.number_days_from_monday()
}

/// `begin..=end` inclusive, wrapping through Sunday when `end < begin`
/// (e.g. `Fr-Mo`).
pub fn weekday_in_range(w: Weekday, begin: Weekday, end: Weekday) -> bool {
    let (w, b, e) = (weekday_index(w), weekday_index(begin), weekday_index(end));
    if b <= e {
        (b..=e).contains(&w)
    } else {
        w >= b || w <= e
    }
}

fn days_in_month(year: i32, month: Month) -> u8 {
    time::util::days_in_year_month(year, month)
}

/// 1-indexed occurrence of `date`'s weekday within its month, counting
/// from the start (`We[1]` = first Wednesday).
fn nth_from_start(date: Date) -> i8 {
    (((date.day() - 1) / 7) + 1) as i8
}

/// Negative occurrence counting from the end of the month (`Su[-1]` =
/// last Sunday).
fn nth_from_end(date: Date) -> i8 {
    let last = days_in_month(date.year(), date.month());
    -((((last - date.day()) / 7) + 1) as i8)
}

/// Empty `nth` means "every occurrence"; otherwise matches if any listed
/// position (from start or from end) hits.
pub fn nth_weekday_matches(date: Date, nth: &[i8]) -> bool {
    if nth.is_empty() {
        return true;
    }
    let from_start = nth_from_start(date);
    let from_end = nth_from_end(date);
    nth.iter().any(|&n| n == from_start || n == from_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn easter_known_years() {
        assert_eq!(easter_date(2024), date!(2024 - 03 - 31));
        assert_eq!(easter_date(2025), date!(2025 - 04 - 20));
        assert_eq!(easter_date(2000), date!(2000 - 04 - 23));
    }

    #[test]
    fn weekday_range_wraps_through_sunday() {
        assert!(weekday_in_range(Weekday::Friday, Weekday::Friday, Weekday::Monday));
        assert!(weekday_in_range(Weekday::Sunday, Weekday::Friday, Weekday::Monday));
        assert!(weekday_in_range(Weekday::Monday, Weekday::Friday, Weekday::Monday));
        assert!(!weekday_in_range(Weekday::Wednesday, Weekday::Friday, Weekday::Monday));
    }

    #[test]
    fn nth_weekday_first_and_last() {
        // July 2024: Wednesdays fall on 3, 10, 17, 24, 31.
        assert!(nth_weekday_matches(date!(2024 - 07 - 03), &[1]));
        assert!(!nth_weekday_matches(date!(2024 - 07 - 10), &[1]));
        assert!(nth_weekday_matches(date!(2024 - 07 - 31), &[-1]));
        assert!(nth_weekday_matches(date!(2024 - 07 - 03), &[1, -1]));
    }

    #[test]
    fn empty_nth_matches_every_occurrence() {
        assert!(nth_weekday_matches(date!(2024 - 07 - 10), &[]));
    }
}
