//! Common test infrastructure shared across integration tests.
//!
//! - `stubs`: scripted [`DecisionProcedure`](opaque_pell::DecisionProcedure)
//!   implementations that stand in for a real solver
//!
//! # Usage
//!
//! ```ignore
//! #[path = "common/mod.rs"]
//! mod common;
//! use common::stubs::{Scripted, Step};
//! ```

pub mod stubs;

use std::time::Duration;

/// Budget used by stub-driven runs. Short enough that a full `complete` run
/// of sleeping stubs stays well under a second.
#[allow(dead_code)]
pub const STUB_LIMIT: Duration = Duration::from_millis(5);
