//! Wave spawning and wave-clear tracking.
//!
//! The director builds a stat overlay per wave, spawns the wave with the
//! player injected as target, and listens for removals to report the wave
//! cleared exactly once.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Sender;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityHandle;
use tracing::{info, warn};

use crate::entity::Faction;
use crate::events::CombatEvent;
use crate::lifecycle::{RemovalNotice, RemovalSink};
use crate::overlay::StatModifierOverlay;
use crate::profile::StatProfile;
use crate::world::World;

/// Lowest cooldown multiplier wave scaling can reach.
pub const MIN_COOLDOWN_MULTIPLIER: f32 = 0.25;

/// Per-wave scaling knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Members of the first wave.
    pub base_size: usize,
    /// Extra members per later wave.
    pub size_step: usize,
    /// Distance from the wave center members spawn at.
    pub spawn_radius: f32,
    /// Damage added per wave after the first.
    pub damage_bonus_per_wave: f32,
    /// Max health added per wave after the first.
    pub health_bonus_per_wave: f32,
    /// Move-speed multiplier added per wave after the first.
    pub speed_step: f32,
    /// Cooldown multiplier removed per wave after the first.
    pub cooldown_step: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_size: 3,
            size_step: 1,
            spawn_radius: 10.0,
            damage_bonus_per_wave: 2.0,
            health_bonus_per_wave: 10.0,
            speed_step: 0.05,
            cooldown_step: 0.1,
        }
    }
}

impl WaveConfig {
    /// Overlay for wave `wave` (1-based). Wave 1 is the identity.
    #[must_use]
    pub fn overlay_for(&self, wave: u32) -> StatModifierOverlay {
        let n = wave.saturating_sub(1) as f32;
        StatModifierOverlay::default()
            .with_damage_bonus(self.damage_bonus_per_wave * n)
            .with_health_bonus(self.health_bonus_per_wave * n)
            .with_move_speed_multiplier(1.0 + self.speed_step * n)
            .with_cooldown_multiplier((1.0 - self.cooldown_step * n).max(MIN_COOLDOWN_MULTIPLIER))
    }

    /// Member count of wave `wave` (1-based).
    #[must_use]
    pub fn size_of(&self, wave: u32) -> usize {
        self.base_size + self.size_step * wave.saturating_sub(1) as usize
    }
}

/// Spawns waves and tracks their members until removal.
#[derive(Debug, Default)]
pub struct WaveDirector {
    config: WaveConfig,
    wave: u32,
    members: HashSet<EntityHandle>,
    cleared: bool,
    cleared_total: u32,
    events: Option<Sender<CombatEvent>>,
}

impl WaveDirector {
    /// Director before its first wave.
    #[must_use]
    pub fn new(config: WaveConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Scaling config.
    #[must_use]
    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Current wave number, 0 before the first.
    #[must_use]
    pub fn wave(&self) -> u32 {
        self.wave
    }

    /// Members of the current wave not yet removed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.members.len()
    }

    /// Whether the current wave has been cleared.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Waves cleared so far.
    #[must_use]
    pub fn cleared_total(&self) -> u32 {
        self.cleared_total
    }

    /// Spawns the next wave around `center`, each member targeting `target`.
    pub fn start_next_wave(
        &mut self,
        world: &mut World,
        profile: &Arc<StatProfile>,
        center: Vec3,
        target: Option<EntityHandle>,
    ) -> Vec<EntityHandle> {
        self.wave += 1;
        self.cleared = false;
        self.members.clear();
        self.events = Some(world.bus().sender());

        let overlay = self.config.overlay_for(self.wave);
        let size = self.config.size_of(self.wave);
        let mut spawned = Vec::with_capacity(size);
        for i in 0..size {
            let angle = std::f32::consts::TAU * i as f32 / size as f32;
            let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * self.config.spawn_radius;
            let handle = world.spawn(Faction::Enemy, Some(Arc::clone(profile)), center + offset, target);
            if let Err(e) = world.attach_overlay(handle, overlay) {
                warn!("Wave {} member {:?} left unscaled: {}", self.wave, handle, e);
            }
            self.members.insert(handle);
            spawned.push(handle);
        }

        world.bus().publish(CombatEvent::WaveStarted {
            wave: self.wave,
            size,
        });
        info!("Wave {} started with {} x {}", self.wave, size, profile.name);
        if spawned.is_empty() {
            self.mark_cleared();
        }
        spawned
    }

    fn mark_cleared(&mut self) {
        self.cleared = true;
        self.cleared_total += 1;
        info!("Wave {} cleared", self.wave);
        if let Some(events) = &self.events {
            let _ = events.try_send(CombatEvent::WaveCleared { wave: self.wave });
        }
    }
}

impl RemovalSink for WaveDirector {
    fn on_removed(&mut self, notice: &RemovalNotice) {
        if !self.members.remove(&notice.handle) || !self.members.is_empty() || self.cleared {
            return;
        }
        self.mark_cleared();
    }
}
