//! Recursive-descent parser (component C3).
//!
//! Recovery is folded in as alternative productions (the stand-alone
//! comment rule, the `"label":` wide-range prefix) rather than bolted on
//! as ad-hoc retries, so every accepted input still has exactly one parse.
//! Tokens arrive already cleaned by [`crate::precondition`] and
//! [`crate::lexer`]; this module only ever sees the narrow ASCII grammar
//! the lexer emits.

use time::Month;

use crate::ast::*;
use crate::error::Error;
use crate::lexer::{Spanned, Token};

pub fn parse_ruleset(tokens: &[Spanned]) -> Result<Ruleset, Error> {
    let mut p = Parser { tokens, pos: 0 };
    let ruleset = p.parse_ruleset()?;
    if !p.at_end() {
        return Err(Error::SyntaxError);
    }
    Ok(ruleset)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|s| &s.token);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn save(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_int(&mut self) -> Result<u32, Error> {
        match self.advance() {
            Some(Token::Int(v)) => Ok(*v),
            _ => Err(Error::SyntaxError),
        }
    }

    fn parse_ruleset(&mut self) -> Result<Ruleset, Error> {
        let mut rules = Vec::new();
        let mut pending_kind = RuleKind::Normal;
        if self.at_end() {
            return Err(Error::SyntaxError);
        }
        loop {
            if self.at_end() {
                break;
            }
            let mut rule = self.parse_rule()?;
            rule.kind = pending_kind;
            rules.push(rule);
            match self.peek() {
                Some(Token::Semicolon) => {
                    self.advance();
                    pending_kind = RuleKind::Normal;
                }
                Some(Token::Comma) => {
                    self.advance();
                    pending_kind = RuleKind::Additional;
                }
                Some(Token::Or) => {
                    self.advance();
                    pending_kind = RuleKind::Fallback;
                }
                _ => break,
            }
        }
        Ok(Ruleset { rules })
    }

    fn parse_rule(&mut self) -> Result<Rule, Error> {
        if self.is_24_7() {
            self.advance();
            self.advance();
            self.advance();
            let mut rule = Rule::default();
            if let Some(Token::Comment(c)) = self.peek().cloned() {
                self.advance();
                rule.comment = Some(c);
            }
            self.parse_state_into(&mut rule);
            if let Some(Token::Comment(c)) = self.peek().cloned() {
                self.advance();
                rule.comment = Some(c);
            }
            return Ok(rule);
        }

        // Stand-alone comment: not followed by a label colon, and nothing
        // else of substance follows -- the whole rule is just the remark.
        if let Some(Token::Comment(c)) = self.peek().cloned() {
            if self.peek_at(1) != Some(&Token::Colon) {
                self.advance();
                let mut rule = Rule { comment: Some(c), ..Rule::default() };
                self.parse_state_into(&mut rule);
                if let Some(Token::Comment(c2)) = self.peek().cloned() {
                    self.advance();
                    rule.comment = Some(c2);
                }
                return Ok(rule);
            }
        }

        let mut rule = Rule::default();

        // `"label":` prefix -- an alternative WideRange production.
        if let Some(Token::Comment(c)) = self.peek().cloned() {
            if self.peek_at(1) == Some(&Token::Colon) {
                self.advance();
                self.advance();
                rule.comment = Some(c);
            }
        }

        rule.year = self.parse_year_selector()?;
        rule.monthday = self.parse_monthday_selector()?;
        rule.week = self.parse_week_selector()?;
        rule.weekday = self.parse_weekday_selector()?;
        rule.time = self.parse_time_selector()?;

        let had_state = self.parse_state_into(&mut rule);

        if !rule.has_any_selector() && rule.comment.is_none() && !had_state {
            return Err(Error::SyntaxError);
        }

        if let Some(Token::Comment(c)) = self.peek().cloned() {
            self.advance();
            rule.comment = Some(c);
        }

        Ok(rule)
    }

    fn is_24_7(&self) -> bool {
        matches!(
            (self.peek(), self.peek_at(1), self.peek_at(2)),
            (Some(Token::Int(24)), Some(Token::Slash), Some(Token::Int(7)))
        )
    }

    fn parse_state_into(&mut self, rule: &mut Rule) -> bool {
        let state = match self.peek() {
            Some(Token::Open) => Some(RuleState::Open),
            Some(Token::Closed) => Some(RuleState::Closed),
            Some(Token::Off) => Some(RuleState::Off),
            Some(Token::Unknown) => Some(RuleState::Unknown),
            _ => None,
        };
        if let Some(state) = state {
            self.advance();
            rule.state = state;
            true
        } else {
            false
        }
    }

    /// `('+' | '-') INT ('day' | 'days')`, only consumed when the full
    /// shape is present; otherwise the parser backtracks and reports no
    /// offset so the sign can be reinterpreted by the caller (e.g. as a
    /// timespan range dash).
    fn parse_date_offset_opt(&mut self) -> i64 {
        let mark = self.save();
        let sign = match self.peek() {
            Some(Token::Plus) => 1i64,
            Some(Token::Minus) => -1i64,
            _ => return 0,
        };
        self.advance();
        let n = match self.peek() {
            Some(Token::Int(v)) => *v as i64,
            _ => {
                self.restore(mark);
                return 0;
            }
        };
        self.advance();
        match self.peek() {
            Some(Token::Day) | Some(Token::Days) => {
                self.advance();
                sign * n
            }
            _ => {
                self.restore(mark);
                0
            }
        }
    }

    fn parse_year_selector(&mut self) -> Result<Option<YearSelector>, Error> {
        if !matches!(self.peek(), Some(Token::Int(_))) {
            return Ok(None);
        }
        let mut ranges = vec![self.parse_year_range()?];
        loop {
            let mark = self.save();
            if self.eat(&Token::Comma) {
                if matches!(self.peek(), Some(Token::Int(_))) {
                    ranges.push(self.parse_year_range()?);
                    continue;
                }
                self.restore(mark);
            }
            break;
        }
        Ok(Some(YearSelector { ranges }))
    }

    fn parse_year_range(&mut self) -> Result<YearRange, Error> {
        let y1 = self.expect_int()? as i32;
        if self.eat(&Token::Plus) {
            return Ok(YearRange::OpenEnded(y1));
        }
        if self.eat(&Token::Minus) {
            let y2 = self.expect_int()? as i32;
            if y1 > y2 {
                return Err(Error::SyntaxError);
            }
            if self.eat(&Token::Slash) {
                let period = self.expect_int()? as u16;
                return Ok(YearRange::Periodic(y1, y2, period));
            }
            return Ok(YearRange::Closed(y1, y2));
        }
        Ok(YearRange::Single(y1))
    }

    fn starts_monthday(&self) -> bool {
        matches!(self.peek(), Some(Token::Month(_)) | Some(Token::Easter))
    }

    fn parse_monthday_selector(&mut self) -> Result<Option<MonthdaySelector>, Error> {
        if !self.starts_monthday() {
            return Ok(None);
        }
        let mut ranges = vec![self.parse_monthday_range()?];
        loop {
            let mark = self.save();
            if self.eat(&Token::Comma) {
                if self.starts_monthday() {
                    ranges.push(self.parse_monthday_range()?);
                    continue;
                }
                self.restore(mark);
            }
            break;
        }
        Ok(Some(MonthdaySelector { ranges }))
    }

    fn parse_date_bound(&mut self, same_month_as: Option<Month>) -> Result<DateBound, Error> {
        match self.peek().cloned() {
            Some(Token::Easter) => {
                self.advance();
                Ok(DateBound::Easter { offset_days: 0 })
            }
            Some(Token::Month(m)) => {
                self.advance();
                let day = if let Some(Token::Int(d)) = self.peek() {
                    let d = *d;
                    if !(1..=31).contains(&d) {
                        return Err(Error::SyntaxError);
                    }
                    self.advance();
                    Some(d as u8)
                } else {
                    None
                };
                Ok(DateBound::Calendar { month: m, day })
            }
            Some(Token::Int(d)) if same_month_as.is_some() => {
                if !(1..=31).contains(&d) {
                    return Err(Error::SyntaxError);
                }
                self.advance();
                Ok(DateBound::Calendar { month: same_month_as.unwrap(), day: Some(d as u8) })
            }
            _ => Err(Error::SyntaxError),
        }
    }

    fn parse_monthday_range(&mut self) -> Result<MonthdayRange, Error> {
        let from = self.parse_date_bound(None)?;
        let from_offset = self.parse_date_offset_opt();
        let from_month = match from {
            DateBound::Calendar { month, .. } => Some(month),
            DateBound::Easter { .. } => None,
        };
        let mut to = None;
        let mut to_offset = 0;
        if self.eat(&Token::Minus) {
            to = Some(self.parse_date_bound(from_month)?);
            to_offset = self.parse_date_offset_opt();
        }
        Ok(MonthdayRange { year: None, from, from_offset, to, to_offset })
    }

    fn parse_week_selector(&mut self) -> Result<Option<WeekSelector>, Error> {
        if !self.eat(&Token::Week) {
            return Ok(None);
        }
        let mut ranges = vec![self.parse_week_range()?];
        loop {
            let mark = self.save();
            if self.eat(&Token::Comma) {
                if matches!(self.peek(), Some(Token::Int(_))) {
                    ranges.push(self.parse_week_range()?);
                    continue;
                }
                self.restore(mark);
            }
            break;
        }
        Ok(Some(WeekSelector { ranges }))
    }

    /// `begin > end` (a wrapping week range) is grammatically accepted
    /// here and flagged `UnsupportedFeature` by the validator instead of a
    /// parse error.
    fn parse_week_range(&mut self) -> Result<WeekRange, Error> {
        let begin = self.expect_int()? as u8;
        if self.eat(&Token::Minus) {
            let end = self.expect_int()? as u8;
            if !(1..=53).contains(&begin) || !(1..=53).contains(&end) {
                return Err(Error::SyntaxError);
            }
            let interval = if self.eat(&Token::Slash) {
                Some(self.expect_int()? as u8)
            } else {
                None
            };
            return Ok(WeekRange { begin, end, interval });
        }
        if !(1..=53).contains(&begin) {
            return Err(Error::SyntaxError);
        }
        Ok(WeekRange { begin, end: begin, interval: None })
    }

    fn starts_weekday_item(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::PublicHoliday) | Some(Token::SchoolHoliday) | Some(Token::Weekday(_))
        )
    }

    fn parse_weekday_selector(&mut self) -> Result<Option<WeekdaySelector>, Error> {
        if !self.starts_weekday_item() {
            return Ok(None);
        }
        let mut sel = WeekdaySelector::default();
        self.parse_weekday_item(&mut sel)?;
        loop {
            let mark = self.save();
            if self.eat(&Token::Comma) {
                if self.starts_weekday_item() {
                    self.parse_weekday_item(&mut sel)?;
                    continue;
                }
                self.restore(mark);
            }
            break;
        }
        Ok(Some(sel))
    }

    fn parse_weekday_item(&mut self, sel: &mut WeekdaySelector) -> Result<(), Error> {
        match self.peek().cloned() {
            Some(Token::PublicHoliday) | Some(Token::SchoolHoliday) => {
                let kind = if matches!(self.peek(), Some(Token::PublicHoliday)) {
                    HolidayKind::Public
                } else {
                    HolidayKind::School
                };
                self.advance();
                let offset = self.parse_date_offset_opt();
                sel.holidays.push(HolidaySelector { kind, day_offset: offset });
                Ok(())
            }
            Some(Token::Weekday(w)) => {
                self.advance();
                let mut end = w;
                if self.peek() == Some(&Token::Minus) && matches!(self.peek_at(1), Some(Token::Weekday(_))) {
                    self.advance();
                    if let Some(Token::Weekday(w2)) = self.peek().cloned() {
                        self.advance();
                        end = w2;
                    }
                }
                let mut nth = Vec::new();
                if self.eat(&Token::LBracket) {
                    nth.push(self.parse_nth()?);
                    while self.eat(&Token::Comma) {
                        nth.push(self.parse_nth()?);
                    }
                    if !self.eat(&Token::RBracket) {
                        return Err(Error::SyntaxError);
                    }
                }
                let offset = self.parse_date_offset_opt();
                sel.weekdays.push(WeekdayRange { begin: w, end, nth, day_offset: offset });
                Ok(())
            }
            _ => Err(Error::SyntaxError),
        }
    }

    fn parse_nth(&mut self) -> Result<NthOccurrence, Error> {
        let negative = self.eat(&Token::Minus);
        let v = self.expect_int()?;
        if !(1..=5).contains(&v) {
            return Err(Error::SyntaxError);
        }
        let v = v as i8;
        Ok(if negative { -v } else { v })
    }

    fn starts_time_item(&self) -> bool {
        matches!(self.peek(), Some(Token::Time(_, _)) | Some(Token::Event(_)) | Some(Token::LParen))
    }

    fn parse_time_selector(&mut self) -> Result<Option<TimeSelector>, Error> {
        if !self.starts_time_item() {
            return Ok(None);
        }
        let mut spans = vec![self.parse_timespan()?];
        loop {
            let mark = self.save();
            if self.eat(&Token::Comma) {
                if self.starts_time_item() {
                    spans.push(self.parse_timespan()?);
                    continue;
                }
                self.restore(mark);
            }
            break;
        }
        Ok(Some(TimeSelector { spans }))
    }

    fn parse_time_point(&mut self) -> Result<Time, Error> {
        match self.peek().cloned() {
            Some(Token::Time(h, m)) => {
                self.advance();
                if h > 48 {
                    return Err(Error::SyntaxError);
                }
                Ok(Time::Clock { hour: h, minute: m })
            }
            Some(Token::Event(e)) => {
                self.advance();
                Ok(Time::Variable { event: e, offset_minutes: 0 })
            }
            Some(Token::LParen) => {
                self.advance();
                let event = match self.peek().cloned() {
                    Some(Token::Event(e)) => {
                        self.advance();
                        e
                    }
                    _ => return Err(Error::SyntaxError),
                };
                let sign = match self.peek() {
                    Some(Token::Plus) => 1i16,
                    Some(Token::Minus) => -1i16,
                    _ => return Err(Error::SyntaxError),
                };
                self.advance();
                let n = self.expect_int()? as i16;
                if !self.eat(&Token::RParen) {
                    return Err(Error::SyntaxError);
                }
                Ok(Time::Variable { event, offset_minutes: sign * n })
            }
            _ => Err(Error::SyntaxError),
        }
    }

    fn parse_timespan(&mut self) -> Result<Timespan, Error> {
        let begin = self.parse_time_point()?;
        if self.eat(&Token::Plus) {
            return Ok(Timespan {
                begin,
                end: None,
                open_end: true,
                period_minutes: None,
                period_clock_form: false,
            });
        }
        if self.eat(&Token::Minus) {
            let end = self.parse_time_point()?;
            let (period, clock_form) = if self.eat(&Token::Slash) {
                let (p, c) = self.parse_period()?;
                (Some(p), c)
            } else {
                (None, false)
            };
            return Ok(Timespan {
                begin,
                end: Some(end),
                open_end: false,
                period_minutes: period,
                period_clock_form: clock_form,
            });
        }
        Ok(Timespan {
            begin,
            end: None,
            open_end: false,
            period_minutes: None,
            period_clock_form: false,
        })
    }

    /// Returns the period in minutes and whether it was written `HH:MM`.
    fn parse_period(&mut self) -> Result<(u16, bool), Error> {
        match self.peek().cloned() {
            Some(Token::Time(h, m)) => {
                self.advance();
                Ok((h as u16 * 60 + m as u16, true))
            }
            Some(Token::Int(v)) => {
                self.advance();
                Ok((v as u16, false))
            }
            _ => Err(Error::SyntaxError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(input: &str) -> Result<Ruleset, Error> {
        parse_ruleset(&tokenize(input))
    }

    #[test]
    fn parses_simple_weekday_time_rule() {
        let rs = parse("Mo-Fr 10:00-20:00").unwrap();
        assert_eq!(rs.rules.len(), 1);
        let rule = &rs.rules[0];
        assert_eq!(rule.state, RuleState::Open);
        assert!(rule.weekday.is_some());
        assert!(rule.time.is_some());
    }

    #[test]
    fn parses_24_7_with_state_and_comment() {
        let rs = parse(r#"24/7 closed "always closed""#).unwrap();
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.rules[0].state, RuleState::Closed);
        assert_eq!(rs.rules[0].comment.as_deref(), Some("always closed"));
        assert!(!rs.rules[0].has_any_selector());
    }

    #[test]
    fn parses_multiple_rules_with_separators() {
        let rs = parse("Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off").unwrap();
        assert_eq!(rs.rules.len(), 3);
        assert_eq!(rs.rules[0].kind, RuleKind::Normal);
        assert_eq!(rs.rules[1].kind, RuleKind::Normal);
        assert_eq!(rs.rules[2].kind, RuleKind::Normal);
        assert_eq!(rs.rules[2].state, RuleState::Off);
        assert_eq!(rs.rules[0].time.as_ref().unwrap().spans.len(), 2);
    }

    #[test]
    fn parses_additional_and_fallback_separators() {
        let rs = parse("Mo-Sa 10:00-20:00; Tu off").unwrap();
        assert_eq!(rs.rules[1].kind, RuleKind::Normal);

        let rs = parse("PH off || open").unwrap();
        assert_eq!(rs.rules.len(), 2);
        assert_eq!(rs.rules[1].kind, RuleKind::Fallback);
    }

    #[test]
    fn parses_year_monthday_week() {
        let rs = parse("2020 Dec 24-26 off").unwrap();
        let rule = &rs.rules[0];
        assert_eq!(rule.year.as_ref().unwrap().ranges, vec![YearRange::Single(2020)]);
        assert!(rule.monthday.is_some());
        assert_eq!(rule.state, RuleState::Off);
    }

    #[test]
    fn rejects_bad_year_range() {
        assert_eq!(parse("2020-2000 Jan 01-02").unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn rejects_invalid_nth_weekday() {
        assert_eq!(parse("Su[0] 10:00-12:00").unwrap_err(), Error::SyntaxError);
        assert_eq!(parse("Mo[6] 10:00-12:00").unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn rejects_23_7() {
        assert_eq!(parse("23/7").unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn rejects_out_of_range_hour() {
        assert_eq!(parse("Mo 49:00-12:00").unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn accepts_school_holiday_syntactically() {
        let rs = parse("SH off").unwrap();
        assert_eq!(rs.rules[0].weekday.as_ref().unwrap().holidays[0].kind, HolidayKind::School);
    }

    #[test]
    fn stand_alone_comment_is_an_open_rule() {
        let rs = parse(r#""only after registration""#).unwrap();
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.rules[0].state, RuleState::Open);
        assert!(!rs.rules[0].has_any_selector());
    }
}
