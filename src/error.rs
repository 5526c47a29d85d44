use crate::data::{Minutes, SessionId, StudentId};

/// Failures raised by the time-of-day conversions.
///
/// These are fatal to a single slot only; the normalizer turns them into
/// diagnostics and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("malformed time string {0:?}, expected HH:MM")]
    Format(String),

    #[error("minute offset {0} is outside a day")]
    Range(Minutes),
}

/// Failures raised by the in-memory session store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("student {student} is not enrolled in session {session}")]
    StudentNotEnrolled {
        session: SessionId,
        student: StudentId,
    },
}
