//! # Skirmish Gameplay
//!
//! Entity behavior and combat resolution for Skirmish.
//!
//! This crate provides the whole simulation core:
//! - Generic state machine and the enemy/player state sets
//! - Attack gating with cancellable attack tokens
//! - Damage resolution (evasion, crits, defense absorption)
//! - Health with multi-subscriber notifications
//! - Stat profiles, runtime stats, upgrades and wave overlays
//! - Death, decay and deferred removal
//! - A world driver with a fixed tick order and an event bus
//! - Wave spawning and kill streak tracking

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod body;
pub mod combat;
pub mod cues;
pub mod damage;
pub mod entity;
pub mod events;
pub mod health;
pub mod intent;
pub mod lifecycle;
pub mod overlay;
pub mod profile;
pub mod state_machine;
pub mod states;
pub mod stats;
pub mod streak;
pub mod wave;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::body::*;
    pub use crate::combat::*;
    pub use crate::cues::*;
    pub use crate::damage::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::intent::*;
    pub use crate::lifecycle::*;
    pub use crate::overlay::*;
    pub use crate::profile::*;
    pub use crate::state_machine::*;
    pub use crate::states::*;
    pub use crate::stats::*;
    pub use crate::streak::*;
    pub use crate::wave::*;
    pub use crate::world::*;
}

pub use prelude::*;
