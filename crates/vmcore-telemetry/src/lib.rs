// Path: crates/vmcore-telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # vmcore-telemetry
//!
//! Structured logging for the execution core (SPEC_FULL.md §4 ambient
//! stack), grounded in the teacher's `ioi-telemetry` crate. The teacher's
//! crate also bundles a Prometheus `/metrics` endpoint over `axum`/`tower`
//! for a long-running node process; that outer-surface machinery is
//! dropped here (see DESIGN.md) since the execution core is an embeddable
//! library, not a service with its own HTTP port. What's kept is the
//! ambient concern itself: JSON-formatted, env-filtered `tracing` init, and
//! a small RAII scope timer.

pub mod init;
pub mod scope_timer;

pub use init::init_tracing;
pub use scope_timer::ScopeTimer;
