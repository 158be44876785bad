// Path: crates/vmcore-types/src/error.rs
//! The block-wide error taxonomy (spec.md §7): `BlockError` aborts the
//! whole block and rolls back the page cache, `ApplicationError` unwinds to
//! the nearest call context and becomes an HTTP-shaped response,
//! `InternalError` is recorded as a request's status without failing the
//! block. Grounded on the `ErrorCode` + per-domain `thiserror` enum pattern
//! used throughout the teacher's `ioi_types::error` module.

use crate::http::StatusCode;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// The proposed block is invalid; validation aborts and the page cache is
/// rolled back over the writable page set (spec.md §7).
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("missing edge: requests {a} and {b} collide on chunk {chunk} but the proposer's DAG has no path between them")]
    MissingEdge { a: u32, b: u32, chunk: String },
    #[error("missing size bound for resizable chunk {0}")]
    MissingSizeBounds(String),
    #[error("proposed size bounds for chunk {chunk} are invalid: new size must fall within [{lower}, {upper}]")]
    InvalidSizeBounds { chunk: String, lower: u64, upper: u64 },
    #[error("fee payment failed: attached request {0} completed with an error status")]
    FailedFeePayment(u32),
    #[error("missing proof of non-existence for chunk {0}")]
    MissingProofOfNonExistence(String),
    #[error("chunk migration into a page whose native chunk already has migrants")]
    MigrationIntoPageWithMigrants,
    #[error("execution graph is not a dag")]
    NotADag,
    #[error("applying delta to chunk {0} failed digest verification")]
    InvalidDelta(String),
    #[error("the source set of the execution graph is empty while {0} requests were proposed")]
    EmptySourceSet(u32),
    #[error("the source set of the execution graph must contain request 0")]
    SourceSetMissingRequestZero,
    #[error("block validation failed: {0}")]
    Invalid(String),
}

impl ErrorCode for BlockError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingEdge { .. } => "BLOCK_MISSING_EDGE",
            Self::MissingSizeBounds(_) => "BLOCK_MISSING_SIZE_BOUNDS",
            Self::InvalidSizeBounds { .. } => "BLOCK_INVALID_SIZE_BOUNDS",
            Self::FailedFeePayment(_) => "BLOCK_FAILED_FEE_PAYMENT",
            Self::MissingProofOfNonExistence(_) => "BLOCK_MISSING_PROOF_OF_NONEXISTENCE",
            Self::MigrationIntoPageWithMigrants => "BLOCK_MIGRATION_INTO_PAGE_WITH_MIGRANTS",
            Self::NotADag => "BLOCK_NOT_A_DAG",
            Self::InvalidDelta(_) => "BLOCK_INVALID_DELTA",
            Self::EmptySourceSet(_) => "BLOCK_EMPTY_SOURCE_SET",
            Self::SourceSetMissingRequestZero => "BLOCK_SOURCE_SET_MISSING_REQUEST_ZERO",
            Self::Invalid(_) => "BLOCK_INVALID",
        }
    }
}

/// A recoverable failure inside a call context; becomes an HTTP-shaped
/// error response without terminating sibling invocations (spec.md §7).
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    #[error("{0}")]
    Reverted(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),
    #[error("reentrancy is not allowed")]
    ReentrancyAttempt,
    #[error("memory fault: {0}")]
    MemoryFault(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("declared limits violated: {0}")]
    LimitViolated(String),
    #[error("execution timed out")]
    ExecutionTimeout,
}

impl ApplicationError {
    /// The HTTP-shaped status this application error materializes as
    /// (spec.md §6.7).
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Reverted(_) => StatusCode::BadRequest,
            Self::LimitExceeded(_) => StatusCode::LimitExceeded,
            Self::InvalidOperation(_) => StatusCode::InvalidOperation,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::ArithmeticError(_) => StatusCode::ArithmeticError,
            Self::ReentrancyAttempt => StatusCode::ReentrancyAttempt,
            Self::MemoryFault(_) => StatusCode::MemoryFault,
            Self::OutOfRange(_) => StatusCode::OutOfRange,
            Self::LimitViolated(_) => StatusCode::DeclaredLimitsViolated,
            Self::ExecutionTimeout => StatusCode::ExecutionTimeout,
        }
    }
}

impl ErrorCode for ApplicationError {
    fn code(&self) -> &'static str {
        match self {
            Self::Reverted(_) => "APP_REVERTED",
            Self::LimitExceeded(_) => "APP_LIMIT_EXCEEDED",
            Self::InvalidOperation(_) => "APP_INVALID_OPERATION",
            Self::NotFound(_) => "APP_NOT_FOUND",
            Self::ArithmeticError(_) => "APP_ARITHMETIC_ERROR",
            Self::ReentrancyAttempt => "APP_REENTRANCY_ATTEMPT",
            Self::MemoryFault(_) => "APP_MEMORY_FAULT",
            Self::OutOfRange(_) => "APP_OUT_OF_RANGE",
            Self::LimitViolated(_) => "APP_LIMIT_VIOLATED",
            Self::ExecutionTimeout => "APP_EXECUTION_TIMEOUT",
        }
    }
}

/// Unrecoverable at the whole-request level; recorded as the request's
/// status (500) without failing the block (spec.md §7).
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("internal error: {0}")]
    Other(String),
}

impl ErrorCode for InternalError {
    fn code(&self) -> &'static str {
        "INTERNAL_ERROR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_status_mapping_matches_spec_table() {
        assert_eq!(ApplicationError::ReentrancyAttempt.status().code(), 523);
        assert_eq!(ApplicationError::ExecutionTimeout.status().code(), 421);
        assert_eq!(ApplicationError::MemoryFault("x".into()).status().code(), 524);
        assert_eq!(ApplicationError::LimitViolated("x".into()).status().code(), 420);
    }

    #[test]
    fn error_codes_are_stable_strings() {
        assert_eq!(BlockError::NotADag.code(), "BLOCK_NOT_A_DAG");
    }
}
