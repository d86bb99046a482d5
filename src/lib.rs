//! A tolerant lexer/parser, normalizer, validator and evaluator for the
//! OpenStreetMap `opening_hours` grammar -- compact strings such as
//! `Mo-Fr 08:00-12:00,13:00-17:30; Sa 08:00-12:00; PH off` -- answering two
//! questions about a wall-clock instant: what state (open/closed/unknown,
//! with an optional comment) holds, and when does it next change.
//!
//! The crate is organized one module per pipeline stage, joined by this
//! file:
//!
//! - [`precondition`] -- Unicode/encoding tolerance ahead of the lexer.
//! - [`lexer`] -- tokenizes the cleaned text.
//! - [`parser`] -- builds the [`ast`] from the token stream.
//! - [`normalize`] -- serializes an [`ast::Ruleset`] back to canonical text.
//! - [`capability`] -- the bitmask/validator deciding which [`error::Error`]
//!   (if any) an expression carries.
//! - [`eval`] -- intersects the AST against a wall-clock calendar.
//! - [`providers`] -- the collaborator traits (holidays, sun events, clock)
//!   the evaluator queries.
//!
//! Region/school-holiday resolution, sunrise/sunset astronomy, and any
//! GUI/CLI/logging setup are out of scope; callers supply those through
//! [`providers::EvalContext`].

pub mod ast;
mod capability;
pub mod error;
mod eval;
mod lexer;
mod normalize;
mod parser;
mod precondition;
pub mod providers;

use time::PrimitiveDateTime;

pub use capability::Capabilities;
pub use error::Error;
pub use eval::{EvalState, Interval};
pub use providers::{Clock, EvalContext, HolidayProvider, SchoolHolidayProvider, SunEventProvider};

/// A parsed `opening_hours` expression.
///
/// Construction never fails: a malformed input produces an `Expression`
/// carrying [`Error::SyntaxError`] and an empty rule list rather than a
/// `Result::Err` -- the error lives on the `Expression`, not in a
/// top-level `Result`.
#[derive(Debug, Clone)]
pub struct Expression {
    ruleset: ast::Ruleset,
    error: Option<Error>,
}

impl Expression {
    /// Runs the full C1-C3 pipeline (precondition, lex, parse). The
    /// resulting `Expression` is always returned; check [`Expression::error`]
    /// before relying on [`Expression::interval_at`] or [`Expression::next_interval`].
    pub fn parse(text: &str) -> Self {
        let cleaned = precondition::precondition(text);
        let tokens = lexer::tokenize(&cleaned.text);
        match parser::parse_ruleset(&tokens) {
            Ok(ruleset) => Expression { ruleset, error: None },
            Err(e) => Expression { ruleset: ast::Ruleset::default(), error: Some(e) },
        }
    }

    /// The first-wins terminal error, or `None` if the expression parsed
    /// and is structurally evaluable (capability errors are only raised
    /// once an [`EvalContext`] is supplied, see [`Expression::interval_at`]).
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Canonical textual form (component C5). Idempotent:
    /// `Expression::parse(&e.normalized()).normalized() == e.normalized()`.
    pub fn normalized(&self) -> String {
        normalize::normalize(&self.ruleset)
    }

    /// The capabilities this expression requires from a collaborator,
    /// independent of whether one was actually configured -- lets a caller
    /// decide whether configuring a holiday provider is worth the trouble
    /// before ever evaluating.
    pub fn required_capabilities(&self) -> Capabilities {
        capability::required_capabilities(&self.ruleset)
    }

    /// Fast-path check for the common "always open/closed, never changes"
    /// shape: a single rule with no selectors at all (a literal `24/7` or a
    /// stand-alone comment). `interval_at`/`next_interval` special-case
    /// this internally too; exposed here so callers can skip calendar
    /// plumbing entirely for such expressions.
    pub fn is_24_7(&self) -> bool {
        eval::is_24_7(&self.ruleset)
    }

    /// Runs the C6 validator against the capabilities an `EvalContext`
    /// actually supplies, without evaluating anything.
    pub fn validate(&self, ctx: &EvalContext<'_>) -> Result<(), Error> {
        if let Some(e) = self.error {
            return Err(e);
        }
        match capability::validate(&self.ruleset, ctx.has_region(), ctx.has_location()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The [`Interval`] covering `instant`: its evaluated state, half-open
    /// begin/end, and comment.
    pub fn interval_at(&self, ctx: &EvalContext<'_>, instant: PrimitiveDateTime) -> Result<Interval, Error> {
        self.validate(ctx)?;
        eval::interval_at(&self.ruleset, ctx, instant)
    }

    /// The earliest [`Interval`] strictly after `instant` whose state
    /// differs from the interval containing `instant`, or `None` if no
    /// distinct change is found within the walk bound (see `eval` module
    /// docs -- open-ended year ranges have no natural horizon).
    pub fn next_interval(&self, ctx: &EvalContext<'_>, instant: PrimitiveDateTime) -> Result<Option<Interval>, Error> {
        self.validate(ctx)?;
        eval::next_interval(&self.ruleset, ctx, instant)
    }

    /// Convenience wrapper over [`Expression::interval_at`] using
    /// [`EvalContext::clock`] for "now". Surfaces [`Error::MissingLocalTime`]
    /// if no clock was configured.
    pub fn state_now(&self, ctx: &EvalContext<'_>) -> Result<Interval, Error> {
        let clock = ctx.clock.ok_or(Error::MissingLocalTime)?;
        self.interval_at(ctx, clock.now())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parse_never_fails_and_records_syntax_error() {
        let e = Expression::parse("23/7");
        assert_eq!(e.error(), Some(Error::SyntaxError));
        assert!(!e.is_ok());
    }

    #[test]
    fn normalized_round_trips_a_clean_expression() {
        let e = Expression::parse("mo-fr 10:00-20:00");
        assert_eq!(e.normalized(), "Mo-Fr 10:00-20:00");
        let reparsed = Expression::parse(&e.normalized());
        assert_eq!(reparsed.normalized(), e.normalized());
    }

    #[test]
    fn missing_location_surfaces_on_validate_and_interval_at() {
        let e = Expression::parse("sunrise-sunset");
        assert!(e.is_ok());
        let ctx = EvalContext::new();
        assert_eq!(e.validate(&ctx), Err(Error::MissingLocation));
        assert_eq!(e.interval_at(&ctx, datetime!(2024-07-23 10:00)).unwrap_err(), Error::MissingLocation);
    }

    #[test]
    fn is_24_7_fast_path() {
        assert!(Expression::parse("24/7").is_24_7());
        assert!(!Expression::parse("Mo-Fr 10:00-20:00").is_24_7());
    }

    #[test]
    fn school_holiday_is_unsupported_feature() {
        let e = Expression::parse("SH off");
        let ctx = EvalContext::new();
        assert_eq!(e.validate(&ctx), Err(Error::UnsupportedFeature));
    }
}
