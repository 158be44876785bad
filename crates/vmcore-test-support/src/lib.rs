// Path: crates/vmcore-test-support/src/lib.rs
//! # vmcore-test-support
//!
//! Shared test tooling (SPEC_FULL.md §4 ambient stack), grounded in the
//! teacher's `test_utils::assertions` module: `assert_ok!`/`assert_err!`
//! unwrap-with-context macros, plus (trimmed of the teacher's zk/agentic
//! fixture generators, out of scope here) a no-op mock `PageLoader` for
//! tests that exercise the block validator against a page cache that is
//! already at the right version.

pub mod fixtures;

/// Unwraps a `Result`, panicking with the error's `Debug` rendering on
/// `Err` (teacher: `test_utils::assertions::assert_ok!`).
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("expected Ok, got Err: {:?}", err),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("expected Ok, got Err: {:?} ({})", err, format!($($arg)+)),
        }
    };
}

/// Unwraps a `Result`'s error, panicking with the `Ok` value's `Debug`
/// rendering on `Ok` (teacher: `test_utils::assertions::assert_err!`).
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => panic!("expected Err, got Ok: {:?} ({})", val, format!($($arg)+)),
            Err(err) => err,
        }
    };
}
