//! # Skirmish Common
//!
//! Common types shared by the Skirmish crates:
//! - Entity ids and generational handles
//! - Ground-plane (XZ) geometry helpers
//! - Config error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
