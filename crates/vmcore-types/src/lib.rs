// Path: crates/vmcore-types/src/lib.rs
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

//! # vmcore-types
//!
//! Core identifiers, the prefix-trie codec, the digest type, the HTTP-shaped
//! status/response model, and the block-wide error taxonomy shared by every
//! other crate in the execution core.

pub mod access;
pub mod digest;
pub mod error;
pub mod http;
pub mod ident;
pub mod prefix_trie;

pub use access::{AccessType, DeclaredAccess};
pub use digest::Digest;
pub use error::{ApplicationError, BlockError, ErrorCode, InternalError};
pub use http::{HttpRequest, HttpResponse, StatusCode};
pub use ident::{FullID, LongID, LongLongID, VarLenFullID};
