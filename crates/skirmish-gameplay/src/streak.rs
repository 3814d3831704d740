//! Kill streak tracking.
//!
//! One tracker hands out listeners for several health models: the player's
//! (any landed damage resets the streak) and each enemy's (a death credited
//! to the player extends it).

use std::cell::RefCell;
use std::rc::Rc;

use skirmish_common::EntityId;
use tracing::debug;

use crate::health::{HealthEvent, HealthListener};

#[derive(Debug)]
struct Streak {
    player: EntityId,
    current: u32,
    best: u32,
    kills: u32,
}

/// Counts consecutive kills the player makes without taking damage.
#[derive(Debug, Clone)]
pub struct KillStreakTracker {
    streak: Rc<RefCell<Streak>>,
}

impl KillStreakTracker {
    /// Tracker crediting kills to `player`.
    #[must_use]
    pub fn new(player: EntityId) -> Self {
        Self {
            streak: Rc::new(RefCell::new(Streak {
                player,
                current: 0,
                best: 0,
                kills: 0,
            })),
        }
    }

    /// Listener for the player's own health model.
    #[must_use]
    pub fn player_listener(&self) -> StreakListener {
        StreakListener {
            streak: Rc::clone(&self.streak),
            role: Role::Player,
        }
    }

    /// Listener for a potential victim's health model.
    #[must_use]
    pub fn victim_listener(&self) -> StreakListener {
        StreakListener {
            streak: Rc::clone(&self.streak),
            role: Role::Victim,
        }
    }

    /// Kills since the player last took damage.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.streak.borrow().current
    }

    /// Longest streak seen.
    #[must_use]
    pub fn best(&self) -> u32 {
        self.streak.borrow().best
    }

    /// Kills credited to the player overall.
    #[must_use]
    pub fn kills(&self) -> u32 {
        self.streak.borrow().kills
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Player,
    Victim,
}

/// Health listener feeding a [`KillStreakTracker`].
#[derive(Debug)]
pub struct StreakListener {
    streak: Rc<RefCell<Streak>>,
    role: Role,
}

impl HealthListener for StreakListener {
    fn on_health_event(&mut self, event: &HealthEvent) {
        let mut streak = self.streak.borrow_mut();
        match (self.role, event) {
            (Role::Player, HealthEvent::Damaged { amount, .. }) if *amount > 0.0 => {
                if streak.current > 0 {
                    debug!("Kill streak of {} broken", streak.current);
                }
                streak.current = 0;
            },
            (Role::Victim, HealthEvent::Died { killer }) if *killer == Some(streak.player) => {
                streak.current += 1;
                streak.kills += 1;
                streak.best = streak.best.max(streak.current);
            },
            _ => {}
        }
    }
}
