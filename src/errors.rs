use thiserror::Error;
use time::Date;
use uuid::Uuid;

/// Enumerates high-level errors returned by this subsystem.
///
/// All of these are recoverable: they are surfaced to the caller with a
/// human-readable message and never bring the process down.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a reference to an action that does not exist.
    #[error("action {0} does not exist")]
    UnknownAction(Uuid),

    /// Represents a reference to an enrollment that does not exist.
    #[error("enrollment {0} does not exist")]
    UnknownEnrollment(Uuid),

    /// Represents a date on which the action has no enrollable occurrence
    /// (off-pattern, masked, in the past, or beyond the caller's horizon).
    #[error("action {action} has no enrollable occurrence on {date}")]
    UnknownOccurrence { action: Uuid, date: Date },

    /// Represents an occurrence whose capacity is exhausted.
    #[error("no places left for this occurrence")]
    Full,

    /// Represents a second enrollment for the same occurrence.
    #[error("volunteer is already enrolled for this occurrence")]
    AlreadyEnrolled,

    /// Represents an actor without the rights for the attempted operation.
    #[error("operation not permitted for this actor")]
    Forbidden,

    /// Represents a responsible-person reference that cannot be resolved
    /// to a volunteer.
    #[error("could not resolve responsible person {0}")]
    UnknownResponsible(String),

    /// Represents an unrecognized repeat kind, or an operation that the
    /// action's repeat kind does not support.
    #[error("unsupported repeat kind {0}")]
    InvalidRepeatKind(String),

    /// Represents a masking request for an occurrence that still has
    /// active enrollments.
    #[error("occurrence still has {count} active enrollment(s)")]
    OccurrenceHasEnrollments { count: i64 },

    /// Represents an unrecognized enrollment status.
    #[error("unrecognized enrollment status {0}")]
    InvalidStatus(String),

    /// Represents an ID that could not be parsed.
    #[error("{0} is not a valid ID")]
    InvalidId(String),

    /// Represents a date that could not be parsed.
    #[error("{0} is not a valid date")]
    InvalidDate(String),

    /// Represents an error with the request.
    #[error("bad request")]
    BadRequest,

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },
}
