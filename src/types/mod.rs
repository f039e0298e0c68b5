//! Common types used across the WhiteBIT client library.

pub mod common;
pub mod serde_helpers;

pub use common::*;
