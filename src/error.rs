/// The error type for every fallible operation in this crate.
///
/// The first five variants correspond to invariants of the value types. Text
/// that fails to parse is reported through `Parse`, which carries an
/// `anyhow::Error` with whatever context was accumulated along the way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value's zone identifier could not be resolved. The source is the
    /// resolver's own error.
    #[error("invalid time zone `{id}`")]
    InvalidTimeZone {
        id: String,
        #[source]
        source: Box<Error>,
    },
    /// No zone source recognized the identifier, even after every fallback.
    #[error("unrecognized time zone identifier `{0}`")]
    UnrecognizedTimeZone(String),
    /// A period's end did not come strictly after its start.
    #[error("invalid period: end `{end}` is not after start `{start}`")]
    InvalidPeriod { start: String, end: String },
    /// A duration that must be positive was zero or negative, or used units
    /// that RFC 5545 durations do not allow.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    /// A recurrence rule had both COUNT and UNTIL, or a BY-filter value
    /// outside of its RFC 5545 domain.
    #[error("invalid recurrence rule: {0}")]
    InvalidRecurrenceBound(String),
    #[error(transparent)]
    Parse(#[from] anyhow::Error),
    #[error(transparent)]
    Jiff(#[from] jiff::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Like `anyhow::ensure!`, but produces `Error::InvalidRecurrenceBound`.
macro_rules! ensure_bound {
    ($cond:expr, $($fmt:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::InvalidRecurrenceBound(
                format!($($fmt)+),
            ));
        }
    };
}

pub(crate) use ensure_bound;
