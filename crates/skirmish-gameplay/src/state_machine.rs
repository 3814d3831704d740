//! Generic finite state machine driver.
//!
//! The machine knows nothing about transitions. Each state decides its own
//! successor by returning it from `update`; the machine applies that request
//! only after `update` has returned, so a state always finishes its own
//! update before it is exited.
//!
//! State objects live in a pre-allocated [`StateSet`] for the owner's whole
//! lifetime. A transition only switches the active tag.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Identity of every state any entity can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateId {
    /// Standing still.
    Idle,
    /// Player-driven locomotion.
    Move,
    /// Pursuing a target.
    Chase,
    /// Walking back to the spawn point.
    ReturnHome,
    /// AI close-range attack.
    MeleeAttack,
    /// Player basic attack.
    RangedAttack,
    /// Player charged attack.
    ChargedAttack,
    /// Dodge roll.
    Roll,
    /// Staggered after a hit.
    Hurt,
    /// Dead. Terminal.
    Death,
}

impl StateId {
    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Move => "Move",
            Self::Chase => "Chase",
            Self::ReturnHome => "ReturnHome",
            Self::MeleeAttack => "MeleeAttack",
            Self::RangedAttack => "RangedAttack",
            Self::ChargedAttack => "ChargedAttack",
            Self::Roll => "Roll",
            Self::Hurt => "Hurt",
            Self::Death => "Death",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tag of a state within one state set.
pub trait StateKind: Copy + Eq + fmt::Debug {
    /// Public identity of the state.
    fn id(self) -> StateId;

    /// Whether no transition may leave this state.
    fn is_terminal(self) -> bool {
        self.id() == StateId::Death
    }
}

/// Behavior of one state.
pub trait EntityState<C, K> {
    /// Called when the state becomes active.
    fn enter(&mut self, _ctx: &mut C) {}

    /// Called when the state stops being active. Must clear whatever
    /// `enter` set so a re-entered state starts clean.
    fn exit(&mut self, _ctx: &mut C) {}

    /// Advances the state. Returns the requested successor, if any.
    fn update(&mut self, ctx: &mut C, dt: f32) -> Option<K>;
}

/// Pre-allocated storage of every state of one entity.
pub trait StateSet<C> {
    /// Tag type.
    type Kind: StateKind;

    /// Borrows the state behind a tag.
    fn state_mut(&mut self, kind: Self::Kind) -> &mut dyn EntityState<C, Self::Kind>;
}

/// A completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<K> {
    /// State left.
    pub from: K,
    /// State entered.
    pub to: K,
}

/// Holds the current state and dispatches enter/exit/update to it.
#[derive(Debug, Clone)]
pub struct StateMachine<S, K> {
    states: S,
    current: K,
    initialized: bool,
    transitions: u64,
}

impl<S, K: StateKind> StateMachine<S, K> {
    /// Wraps a state set. `initial` becomes current once
    /// [`initialize`](Self::initialize) runs.
    #[must_use]
    pub fn new(states: S, initial: K) -> Self {
        Self {
            states,
            current: initial,
            initialized: false,
            transitions: 0,
        }
    }

    /// Current state tag.
    #[must_use]
    pub fn current(&self) -> K {
        self.current
    }

    /// Whether the machine has entered its first state.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of transitions taken so far.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Borrows the state set.
    #[must_use]
    pub fn states(&self) -> &S {
        &self.states
    }

    /// Mutably borrows the state set.
    pub fn states_mut(&mut self) -> &mut S {
        &mut self.states
    }
}

impl<S, K: StateKind> StateMachine<S, K> {
    /// Sets and enters the initial state. No exit call is made.
    pub fn initialize<C>(&mut self, initial: K, ctx: &mut C)
    where
        S: StateSet<C, Kind = K>,
    {
        self.current = initial;
        self.initialized = true;
        self.states.state_mut(initial).enter(ctx);
    }

    /// Exits the current state and enters `next`.
    ///
    /// Ignored when `next` is already current, when the current state is
    /// terminal, or before initialization.
    pub fn change_state<C>(&mut self, next: K, ctx: &mut C) -> Option<Transition<K>>
    where
        S: StateSet<C, Kind = K>,
    {
        if !self.initialized || next == self.current || self.current.is_terminal() {
            return None;
        }

        let from = self.current;
        self.states.state_mut(from).exit(ctx);
        self.current = next;
        self.states.state_mut(next).enter(ctx);
        self.transitions += 1;
        trace!("State {} -> {}", from.id(), next.id());
        Some(Transition { from, to: next })
    }

    /// Updates the current state, then applies the transition it requested.
    pub fn tick<C>(&mut self, ctx: &mut C, dt: f32) -> Option<Transition<K>>
    where
        S: StateSet<C, Kind = K>,
    {
        if !self.initialized {
            return None;
        }
        let requested = self.states.state_mut(self.current).update(ctx, dt)?;
        self.change_state(requested, ctx)
    }
}
