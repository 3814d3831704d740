//! Fixed-delay attack cues.
//!
//! Stands in for animation keyframes: every attack that does not time itself
//! gets an effect cue and an end cue a fixed time after it began. Cues for a
//! cancelled attack still fire; the stale token makes them no-ops.

use serde::{Deserialize, Serialize};
use skirmish_common::EntityHandle;

use crate::combat::AttackToken;

/// Delays between attack start and its cues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueTiming {
    /// Seconds from attack start to the effect instant.
    pub effect_delay: f32,
    /// Seconds from attack start to attack end.
    pub end_delay: f32,
}

impl Default for CueTiming {
    fn default() -> Self {
        Self {
            effect_delay: 0.3,
            end_delay: 0.6,
        }
    }
}

/// What a due cue asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    /// Deal damage now.
    Effect,
    /// End the attack.
    End,
}

/// A cue that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Attacker.
    pub entity: EntityHandle,
    /// Attack the cue belongs to.
    pub token: AttackToken,
    /// What to do.
    pub kind: CueKind,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    cue: Cue,
    remaining: f32,
}

/// Timer queue of pending cues.
#[derive(Debug, Clone, Default)]
pub struct FixedDelayCues {
    timing: CueTiming,
    pending: Vec<Pending>,
}

impl FixedDelayCues {
    /// Empty queue with the given delays.
    #[must_use]
    pub fn new(timing: CueTiming) -> Self {
        Self {
            timing,
            pending: Vec::new(),
        }
    }

    /// Configured delays.
    #[must_use]
    pub fn timing(&self) -> CueTiming {
        self.timing
    }

    /// Number of cues still waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Queues the effect and end cues for an attack that just began.
    pub fn schedule(&mut self, entity: EntityHandle, token: AttackToken) {
        let end_delay = self.timing.end_delay.max(self.timing.effect_delay);
        for (kind, remaining) in [
            (CueKind::Effect, self.timing.effect_delay),
            (CueKind::End, end_delay),
        ] {
            self.pending.push(Pending {
                cue: Cue {
                    entity,
                    token,
                    kind,
                },
                remaining,
            });
        }
    }

    /// Drops every cue of `entity`.
    pub fn forget(&mut self, entity: EntityHandle) {
        self.pending.retain(|p| p.cue.entity != entity);
    }

    /// Advances the timers and returns the cues that came due, effect cues
    /// before end cues of the same attack.
    pub fn advance(&mut self, dt: f32) -> Vec<Cue> {
        let mut due = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining -= dt;
            if p.remaining <= 0.0 {
                due.push(p.cue);
                false
            } else {
                true
            }
        });
        due
    }
}
