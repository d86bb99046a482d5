//! Lexer (component C2).
//!
//! Consumes the text already cleaned up by [`crate::precondition`] and
//! produces a flat token stream with source positions. The grammar is
//! case-sensitive and ASCII-only at this stage -- all tolerance lives
//! upstream in the preconditioner.

use time::{Month, Weekday};

use crate::ast::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `HH:MM`, hour may run `0..=48` to express wrap into the next day.
    Time(u8, u8),
    Int(u32),
    Weekday(Weekday),
    Month(Month),
    Week,
    Day,
    Days,
    Easter,
    Event(Event),
    PublicHoliday,
    SchoolHoliday,
    Open,
    Closed,
    Off,
    Unknown,
    Comment(String),
    Plus,
    Minus,
    Slash,
    Colon,
    Comma,
    Semicolon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Or,
    /// A byte that does not belong to any production; forces `SyntaxError`.
    Invalid(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("Mo", Weekday::Monday),
    ("Tu", Weekday::Tuesday),
    ("We", Weekday::Wednesday),
    ("Th", Weekday::Thursday),
    ("Fr", Weekday::Friday),
    ("Sa", Weekday::Saturday),
    ("Su", Weekday::Sunday),
];

const MONTHS: &[(&str, Month)] = &[
    ("Jan", Month::January),
    ("Feb", Month::February),
    ("Mar", Month::March),
    ("Apr", Month::April),
    ("May", Month::May),
    ("Jun", Month::June),
    ("Jul", Month::July),
    ("Aug", Month::August),
    ("Sep", Month::September),
    ("Oct", Month::October),
    ("Nov", Month::November),
    ("Dec", Month::December),
];

const KEYWORDS: &[(&str, Token)] = &[
    ("week", Token::Week),
    ("days", Token::Days),
    ("day", Token::Day),
    ("easter", Token::Easter),
    ("sunrise", Token::Event(Event::Sunrise)),
    ("sunset", Token::Event(Event::Sunset)),
    ("dawn", Token::Event(Event::Dawn)),
    ("dusk", Token::Event(Event::Dusk)),
    ("PH", Token::PublicHoliday),
    ("SH", Token::SchoolHoliday),
    ("open", Token::Open),
    ("closed", Token::Closed),
    ("off", Token::Off),
    ("unknown", Token::Unknown),
];

pub fn tokenize(input: &str) -> Vec<Spanned> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == ' ' {
            i += 1;
            continue;
        }
        if c == '"' {
            let (tok, consumed) = lex_comment(&input[i..]);
            tokens.push(Spanned { token: tok, pos: i });
            i += consumed;
            continue;
        }
        if c.is_ascii_digit() {
            let (tok, consumed) = lex_number(&input[i..]);
            tokens.push(Spanned { token: tok, pos: i });
            i += consumed;
            continue;
        }
        if c.is_ascii_alphabetic() {
            let (tok, consumed) = lex_word(&input[i..]);
            tokens.push(Spanned { token: tok, pos: i });
            i += consumed;
            continue;
        }
        let (tok, consumed) = lex_punctuation(&input[i..]);
        tokens.push(Spanned { token: tok, pos: i });
        i += consumed;
    }
    tokens
}

fn lex_comment(rest: &str) -> (Token, usize) {
    let bytes = rest.as_bytes();
    debug_assert_eq!(bytes[0], b'"');
    let mut out = String::new();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                out.push(bytes[i + 1] as char);
                i += 2;
            }
            b'"' => {
                i += 1;
                return (Token::Comment(out), i);
            }
            _ => {
                let ch = rest[i..].chars().next().unwrap();
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    // Unterminated comment: consume the rest of the input as-is.
    (Token::Comment(out), i)
}

fn lex_number(rest: &str) -> (Token, usize) {
    let bytes = rest.as_bytes();
    let mut n = 0;
    while n < bytes.len() && bytes[n].is_ascii_digit() {
        n += 1;
    }
    if bytes.get(n) == Some(&b':') {
        let mut m = n + 1;
        let min_start = m;
        while m < bytes.len() && bytes[m].is_ascii_digit() && m - min_start < 2 {
            m += 1;
        }
        if m > min_start {
            if let (Ok(hour), Ok(minute)) = (rest[..n].parse::<u16>(), rest[min_start..m].parse::<u8>()) {
                if hour <= 48 && minute <= 59 {
                    return (Token::Time(hour as u8, minute), m);
                }
            }
        }
    }
    let value: u32 = rest[..n].parse().unwrap_or(u32::MAX);
    (Token::Int(value), n)
}

fn lex_word(rest: &str) -> (Token, usize) {
    let len = rest
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_alphabetic())
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);
    let word = &rest[..len];
    for (name, weekday) in WEEKDAYS {
        if *name == word {
            return (Token::Weekday(*weekday), len);
        }
    }
    for (name, month) in MONTHS {
        if *name == word {
            return (Token::Month(*month), len);
        }
    }
    for (name, tok) in KEYWORDS {
        if *name == word {
            return (tok.clone(), len);
        }
    }
    let c = rest.chars().next().unwrap();
    (Token::Invalid(c), c.len_utf8())
}

fn lex_punctuation(rest: &str) -> (Token, usize) {
    if let Some(r) = rest.strip_prefix("||") {
        return (Token::Or, rest.len() - r.len());
    }
    let c = rest.chars().next().unwrap();
    let tok = match c {
        '+' => Token::Plus,
        '-' => Token::Minus,
        '/' => Token::Slash,
        ':' => Token::Colon,
        ',' => Token::Comma,
        ';' => Token::Semicolon,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '(' => Token::LParen,
        ')' => Token::RParen,
        other => Token::Invalid(other),
    };
    (tok, c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<Token> {
        tokenize(input).into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn lexes_simple_rule() {
        assert_eq!(
            toks("Mo-Fr 10:00-20:00"),
            vec![
                Token::Weekday(Weekday::Monday),
                Token::Minus,
                Token::Weekday(Weekday::Friday),
                Token::Time(10, 0),
                Token::Minus,
                Token::Time(20, 0),
            ]
        );
    }

    #[test]
    fn lexes_24_7_as_ints() {
        assert_eq!(toks("24/7"), vec![Token::Int(24), Token::Slash, Token::Int(7)]);
    }

    #[test]
    fn lexes_comment_with_escapes() {
        assert_eq!(
            toks(r#""a \"b\" c""#),
            vec![Token::Comment("a \"b\" c".to_string())]
        );
    }

    #[test]
    fn lexes_public_holiday_and_state() {
        assert_eq!(toks("PH off"), vec![Token::PublicHoliday, Token::Off]);
    }

    #[test]
    fn invalid_byte_yields_invalid_token() {
        assert_eq!(toks("Mo @"), vec![Token::Weekday(Weekday::Monday), Token::Invalid('@')]);
    }

    #[test]
    fn wrap_hour_up_to_48_lexes_as_time() {
        assert_eq!(toks("22:00-27:30"), vec![Token::Time(22, 0), Token::Minus, Token::Time(27, 30)]);
    }
}
