// Path: crates/vmcore-scheduler/src/lib.rs
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

//! # vmcore-scheduler
//!
//! The request scheduler and collision-clique DAG verifier (spec.md §4.6):
//! loads proposed requests into a `DagNode` graph, verifies the proposer's
//! adjacency against the collisions implied by declared memory accesses, and
//! schedules ready requests to a worker pool through a blocking queue.

mod collision;
mod merge;
mod queue;
mod request;
mod scheduler;

pub use merge::sort_access_blocks;
pub use request::AppRequestInfo;
pub use scheduler::{RequestScheduler, SchedulerError};
