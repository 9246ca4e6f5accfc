use thiserror::Error;

/// The error type for `fibre_functional` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
  /// A value or a metadata parameter was requested with `get` but is absent.
  /// The `find` family of accessors never produces this error.
  #[error("not found: {0}")]
  NotFound(String),

  /// An operation was invoked with a parameter combination it cannot honour,
  /// such as a traversal with an empty stream mode. This is a programming
  /// error rather than something a caller can recover from.
  #[error("illegal state: {0}")]
  IllegalState(String),

  /// The map was configured with invalid settings.
  #[error("invalid configuration: {0}")]
  Config(String),
}

/// A specialized `Result` type for `fibre_functional` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
