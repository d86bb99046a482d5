//! Input preconditioner (component C1).
//!
//! Applies a deterministic sequence of rewrites before lexing so that the
//! parser only ever sees a narrow, ASCII-only grammar. All tolerance --
//! translation tables, punctuation folding, am/pm -- lives here; keeping
//! it out of the parser is what keeps the parser recoverable and the
//! test matrix tractable.

/// Output of preconditioning: the cleaned text plus whether any rewrite
/// beyond whitespace collapsing fired. Downstream stages use the flag to
/// suppress strict-mode diagnostics for inputs that needed tolerant
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preconditioned {
    pub text: String,
    pub corrections_applied: bool,
}

const DASH_LIKE: &[char] = &['\u{2013}', '\u{2014}', '\u{2212}', '\u{30fc}', '\u{301c}'];
const NBSP: char = '\u{a0}';

struct WeekdayToken {
    canonical: &'static str,
    forms: &'static [&'static str],
}
struct MonthToken {
    canonical: &'static str,
    forms: &'static [&'static str],
}

// Longest-match-first within each entry's `forms` is guaranteed by sorting
// the literal arrays by descending length; see `longest_prefix_fold`.
const WEEKDAYS: &[WeekdayToken] = &[
    WeekdayToken { canonical: "Mo", forms: &["monday", "lundi", "lunes", "segunda-feira", "segunda", "mo", "mon"] },
    WeekdayToken { canonical: "Tu", forms: &["tuesday", "mardi", "martes", "terca-feira", "terca", "tu", "tue"] },
    WeekdayToken { canonical: "We", forms: &["wednesday", "mercredi", "miercoles", "quarta-feira", "quarta", "we", "wed"] },
    WeekdayToken { canonical: "Th", forms: &["thursday", "jeudi", "jueves", "quinta-feira", "quinta", "th", "thu"] },
    WeekdayToken { canonical: "Fr", forms: &["friday", "vendredi", "viernes", "sexta-feira", "sexta", "fr", "fri"] },
    WeekdayToken { canonical: "Sa", forms: &["saturday", "samedi", "sabado", "sabado-feira", "sa", "sat"] },
    WeekdayToken { canonical: "Su", forms: &["sunday", "dimanche", "domingo", "su", "sun"] },
];

const MONTHS: &[MonthToken] = &[
    MonthToken { canonical: "Jan", forms: &["january", "janvier", "enero", "janeiro", "jan"] },
    MonthToken { canonical: "Feb", forms: &["february", "fevrier", "febrero", "fevereiro", "feb"] },
    MonthToken { canonical: "Mar", forms: &["march", "mars", "marzo", "marco", "mar"] },
    MonthToken { canonical: "Apr", forms: &["april", "avril", "abril", "apr"] },
    MonthToken { canonical: "May", forms: &["may", "mai", "mayo", "maio"] },
    MonthToken { canonical: "Jun", forms: &["june", "juin", "junio", "junho", "jun"] },
    MonthToken { canonical: "Jul", forms: &["july", "juillet", "julio", "julho", "jul"] },
    MonthToken { canonical: "Aug", forms: &["august", "aout", "agosto", "aug"] },
    MonthToken { canonical: "Sep", forms: &["september", "septembre", "septiembre", "setembro", "sep", "sept"] },
    MonthToken { canonical: "Oct", forms: &["october", "octobre", "octubre", "outubro", "oct"] },
    MonthToken { canonical: "Nov", forms: &["november", "novembre", "noviembre", "novembro", "nov"] },
    MonthToken { canonical: "Dec", forms: &["december", "decembre", "diciembre", "dezembro", "dec"] },
];

/// Japanese kanji weekday/month markers, translated by substring match
/// since they carry no word boundaries in the source script.
const KANJI_WEEKDAYS: &[(&str, &str)] = &[
    ("月曜日", "Mo"), ("月曜", "Mo"), ("月", "Mo"),
    ("火曜日", "Tu"), ("火曜", "Tu"), ("火", "Tu"),
    ("水曜日", "We"), ("水曜", "We"), ("水", "We"),
    ("木曜日", "Th"), ("木曜", "Th"), ("木", "Th"),
    ("金曜日", "Fr"), ("金曜", "Fr"), ("金", "Fr"),
    ("土曜日", "Sa"), ("土曜", "Sa"), ("土", "Sa"),
    ("日曜日", "Su"), ("日曜", "Su"),
];

/// Runs all of C1's rewrites and returns the cleaned text.
pub fn precondition(input: &str) -> Preconditioned {
    let mut corrected = false;
    let mut s = fold_unicode_punctuation(input, &mut corrected);
    s = collapse_whitespace_outside_quotes(&s);
    s = normalize_hour_markers(&s, &mut corrected);
    s = translate_kanji_tokens(&s, &mut corrected);
    s = translate_word_tokens(&s, &mut corrected);
    s = normalize_range_words(&s, &mut corrected);
    s = recover_stray_separators(&s, &mut corrected);
    s = strip_trailing_separators(&s, &mut corrected);
    cfg_if::cfg_if! {
        if #[cfg(feature = "log")] {
            if corrected {
                log::debug!("preconditioner rewrote {input:?} -> {s:?}");
            }
        }
    }
    Preconditioned { text: s, corrections_applied: corrected }
}

fn fold_unicode_punctuation(input: &str, corrected: &mut bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            c if DASH_LIKE.contains(&c) => {
                out.push('-');
                *corrected = true;
            }
            '\u{ff1a}' => { out.push(':'); *corrected = true; }
            '\u{ff0c}' | '\u{3001}' => { out.push(','); *corrected = true; }
            '\u{ff1b}' => { out.push(';'); *corrected = true; }
            NBSP => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

fn collapse_whitespace_outside_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_quotes = false;
    let mut last_was_space = false;
    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            last_was_space = false;
            out.push(c);
            continue;
        }
        if !in_quotes && c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        out.push(c);
    }
    out.trim().to_string()
}

/// `(\d{1,2})h(\d{2})?` and 12-hour am/pm markers, rewritten to `HH:MM`.
fn normalize_hour_markers(input: &str, corrected: &mut bool) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some((hh, mm, consumed)) = try_parse_h_marker(&chars[i..]) {
            out.push_str(&format!("{hh:02}:{mm:02}"));
            i += consumed;
            *corrected = true;
            continue;
        }
        if let Some((hh, mm, consumed)) = try_parse_ampm_marker(&chars[i..]) {
            out.push_str(&format!("{hh:02}:{mm:02}"));
            i += consumed;
            *corrected = true;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn take_digits(chars: &[char], max: usize) -> (u32, usize) {
    let mut value = 0u32;
    let mut n = 0;
    while n < max && n < chars.len() && chars[n].is_ascii_digit() {
        value = value * 10 + chars[n].to_digit(10).unwrap();
        n += 1;
    }
    (value, n)
}

/// Matches `9h`, `9h00` at the current position.
fn try_parse_h_marker(chars: &[char]) -> Option<(u32, u32, usize)> {
    let (hour, hour_len) = take_digits(chars, 2);
    if hour_len == 0 || chars.get(hour_len) != Some(&'h') {
        return None;
    }
    if hour > 48 {
        return None;
    }
    let mut pos = hour_len + 1;
    let (minute, min_len) = take_digits(&chars[pos..], 2);
    if min_len == 2 {
        pos += 2;
        Some((hour, minute, pos))
    } else {
        Some((hour, 0, pos))
    }
}

/// Matches `10am`, `10:30pm`, `10.30 a.m.`, `12 am`, ... at the current position.
fn try_parse_ampm_marker(chars: &[char]) -> Option<(u32, u32, usize)> {
    let (hour, hour_len) = take_digits(chars, 2);
    if hour_len == 0 || hour == 0 || hour > 12 {
        return None;
    }
    let mut pos = hour_len;
    let mut minute = 0u32;
    if chars.get(pos) == Some(&':') || chars.get(pos) == Some(&'.') {
        let (m, m_len) = take_digits(&chars[pos + 1..], 2);
        if m_len == 2 {
            minute = m;
            pos += 1 + m_len;
        }
    }
    while chars.get(pos) == Some(&' ') {
        pos += 1;
    }
    let rest: String = chars[pos..].iter().take(4).collect::<String>().to_ascii_lowercase();
    let (is_pm, marker_len) = if rest.starts_with("a.m.") || rest.starts_with("am") {
        (false, if rest.starts_with("a.m.") { 4 } else { 2 })
    } else if rest.starts_with("p.m.") || rest.starts_with("pm") {
        (true, if rest.starts_with("p.m.") { 4 } else { 2 })
    } else {
        return None;
    };
    pos += marker_len;
    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Some((hour24, minute, pos))
}

fn longest_match_ci<'a>(haystack: &str, candidates: impl Iterator<Item = &'a str>) -> Option<(&'a str, usize)> {
    let lower = haystack.to_ascii_lowercase();
    candidates
        .filter(|form| lower.starts_with(*form))
        .map(|form| (form, form.len()))
        .max_by_key(|(_, len)| *len)
}

fn translate_word_tokens(input: &str, corrected: &mut bool) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    'outer: while i < bytes.len() {
        let rest = &input[i..];
        if rest.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
            for wd in WEEKDAYS {
                if let Some((_, len)) = longest_match_ci(rest, wd.forms.iter().copied()) {
                    let boundary = rest.as_bytes().get(len).map(|b| !b.is_ascii_alphabetic()).unwrap_or(true);
                    if boundary {
                        out.push_str(wd.canonical);
                        if len != wd.canonical.len() || wd.canonical.to_ascii_lowercase() != rest[..len].to_ascii_lowercase() {
                            *corrected = true;
                        }
                        i += len;
                        continue 'outer;
                    }
                }
            }
            for mo in MONTHS {
                if let Some((_, len)) = longest_match_ci(rest, mo.forms.iter().copied()) {
                    let boundary = rest.as_bytes().get(len).map(|b| !b.is_ascii_alphabetic()).unwrap_or(true);
                    if boundary {
                        out.push_str(mo.canonical);
                        if len != mo.canonical.len() || mo.canonical.to_ascii_lowercase() != rest[..len].to_ascii_lowercase() {
                            *corrected = true;
                        }
                        i += len;
                        continue 'outer;
                    }
                }
            }
        }
        let c = rest.chars().next().unwrap();
        out.push(c);
        i += c.len_utf8();
    }
    out
}

fn translate_kanji_tokens(input: &str, corrected: &mut bool) -> String {
    let mut s = input.to_string();
    for (form, canonical) in KANJI_WEEKDAYS {
        if s.contains(form) {
            s = s.replace(form, canonical);
            *corrected = true;
        }
    }
    s
}

/// Range-word normalization: `to`, `and`, `et`, `a`, `〜`, `～` between
/// numeric time tokens become `-` or `,`.
fn normalize_range_words(input: &str, corrected: &mut bool) -> String {
    let mut s = input.to_string();
    for (word, replacement) in [
        (" to ", "-"),
        (" and ", ","),
        (" et ", ","),
        (" a ", "-"),
        ("\u{301c}", "-"),
        ("\u{ff5e}", "-"),
    ] {
        if s.contains(word) {
            s = s.replace(word, replacement);
            *corrected = true;
        }
    }
    s
}

/// A stray comma between two otherwise-complete rules is rewritten to an
/// additional-rule separator only when both halves parse standalone; a run
/// of spaces between two rule-shaped chunks gains an inferred `;`. This is
/// deliberately conservative: it only fires on the unambiguous case of a
/// weekday token immediately following the stray separator.
fn recover_stray_separators(input: &str, corrected: &mut bool) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if (c == ',' || c == ' ') && i + 1 < bytes.len() {
            let rest: String = bytes[i + 1..].iter().take(3).collect();
            let looks_like_new_rule = WEEKDAYS.iter().any(|wd| rest.eq_ignore_ascii_case(&wd.canonical[..rest.len().min(wd.canonical.len())]))
                && rest.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false);
            if c == ' ' && looks_like_new_rule && !out.ends_with(';') && !out.ends_with(',') {
                out.push(';');
                out.push(' ');
                *corrected = true;
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn strip_trailing_separators(input: &str, corrected: &mut bool) -> String {
    let trimmed = input.trim_end_matches([';', ',', '\n', '\r', ' ']);
    if trimmed.len() != input.len() {
        *corrected = true;
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_unicode_dashes_and_punctuation() {
        let p = precondition("Mo\u{2013}Fr 09:00\u{ff1a}00-12:00");
        assert!(p.text.contains("Mo-Fr"));
        assert!(p.corrections_applied);
    }

    #[test]
    fn normalizes_h_markers() {
        let p = precondition("9h00-12h00,14:00-17:00");
        assert_eq!(p.text, "09:00-12:00,14:00-17:00");
    }

    #[test]
    fn normalizes_ampm_markers() {
        assert_eq!(precondition("10am-6pm").text, "10:00-18:00");
        assert_eq!(precondition("12am-12pm").text, "00:00-12:00");
    }

    #[test]
    fn translates_weekday_words() {
        let p = precondition("monday-friday 10:00-20:00");
        assert_eq!(p.text, "Mo-Fr 10:00-20:00");
    }

    #[test]
    fn strips_trailing_separators() {
        let p = precondition("Mo-Fr 10:00-20:00;");
        assert_eq!(p.text, "Mo-Fr 10:00-20:00");
        assert!(p.corrections_applied);
    }

    #[test]
    fn collapses_whitespace_but_not_inside_comments() {
        let p = precondition("Mo   10:00-12:00 \"a   b\"");
        assert_eq!(p.text, "Mo 10:00-12:00 \"a   b\"");
    }
}
