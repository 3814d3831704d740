//! Death-to-removal lifecycle.
//!
//! A dead entity stops acting at once, lingers for its decay time, then
//! signals removal exactly once.

use serde::{Deserialize, Serialize};
use skirmish_common::{ArchetypeId, EntityHandle, EntityId};
use tracing::debug;

use crate::entity::Faction;

/// Where an entity is between spawn and removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Alive and acting.
    Active,
    /// Dead, waiting for removal.
    Decaying {
        /// Seconds left before removal
        remaining: f32,
    },
    /// Removal has been signalled.
    Removed,
}

/// Decay timer of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifecycle {
    phase: LifecyclePhase,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Active lifecycle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: LifecyclePhase::Active,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Whether the entity still acts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == LifecyclePhase::Active
    }

    /// Whether removal has been signalled.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.phase == LifecyclePhase::Removed
    }

    /// Starts the decay timer. Returns false if already decaying or removed.
    pub fn begin_decay(&mut self, seconds: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.phase = LifecyclePhase::Decaying {
            remaining: seconds.max(0.0),
        };
        true
    }

    /// Advances the decay timer. Returns true on the one tick removal is due.
    pub fn tick(&mut self, dt: f32) -> bool {
        match &mut self.phase {
            LifecyclePhase::Decaying { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.phase = LifecyclePhase::Removed;
                    true
                } else {
                    false
                }
            },
            LifecyclePhase::Active | LifecyclePhase::Removed => false,
        }
    }
}

/// Sent to the world and wave tracking when an entity is due for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalNotice {
    /// Entity id.
    pub id: EntityId,
    /// Arena handle.
    pub handle: EntityHandle,
    /// Side the entity fought on.
    pub faction: Faction,
    /// Archetype, when the entity had a profile.
    pub archetype: Option<ArchetypeId>,
}

/// Receives removal notices.
pub trait RemovalSink {
    /// Called once per removed entity.
    fn on_removed(&mut self, notice: &RemovalNotice);
}

impl RemovalSink for () {
    fn on_removed(&mut self, _notice: &RemovalNotice) {}
}

impl RemovalSink for Vec<RemovalNotice> {
    fn on_removed(&mut self, notice: &RemovalNotice) {
        debug!("Entity {} removed", notice.id);
        self.push(*notice);
    }
}

impl<S: RemovalSink + ?Sized> RemovalSink for &mut S {
    fn on_removed(&mut self, notice: &RemovalNotice) {
        (**self).on_removed(notice);
    }
}
