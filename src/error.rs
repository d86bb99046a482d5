use thiserror::Error;

/// The single terminal error an [`Expression`](crate::Expression) can carry.
///
/// First-wins across pipeline stages: once a rule sets an error it is never
/// overwritten by a later, less specific one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The input is not in the tolerant grammar. The expression's rule list
    /// is empty or partial and must not be evaluated.
    #[error("syntax error")]
    SyntaxError,
    /// A selector references sun events but no geographic provider was
    /// configured.
    #[error("expression requires a location but none was configured")]
    MissingLocation,
    /// A selector references public or school holidays but no region was
    /// configured.
    #[error("expression requires a region but none was configured")]
    MissingRegion,
    /// Evaluation was attempted without a wall-clock reference.
    #[error("evaluation requires a local time reference")]
    MissingLocalTime,
    /// A construct is recognized by the grammar but deliberately not
    /// implemented (school holidays, wrapping week ranges, periodic
    /// open-ended year ranges, ...).
    #[error("unsupported feature")]
    UnsupportedFeature,
    /// A construct is only valid in the "points-in-time" mode, which this
    /// engine does not implement.
    #[error("construct is only valid in points-in-time mode")]
    IncompatibleMode,
}

pub type Result<T> = std::result::Result<T, Error>;
