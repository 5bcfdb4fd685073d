//! # liftsync Testkit
//!
//! Test utilities for liftsync.
//!
//! This crate provides:
//! - Record fixtures with deterministic timestamps
//! - A temporary file-backed queue helper
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use liftsync_testkit::prelude::*;
//!
//! let mut clock = RecordClock::new();
//! let create = clock.stamp(workout("local-1", "Leg day"));
//! let set = clock.stamp(workout_set("local-2", "local-1", 5, 100.0));
//! assert!(create.created_at < set.created_at);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
