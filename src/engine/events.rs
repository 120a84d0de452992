//! Race events - per-entrant stochastic state machine
//!
//! Each entrant is either idle or under one timed event that scales its
//! speed. Momentum shifts are instantaneous and never enter the active
//! state. All timing is in milliseconds since race start.

use crate::engine::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Gap between event checks once one resolves.
const EVENT_GAP_MIN_MS: f64 = 8_000.0;
const EVENT_GAP_MAX_MS: f64 = 18_000.0;

/// Delay before an entrant's first event check.
pub const FIRST_EVENT_MIN_MS: f64 = 3_000.0;
pub const FIRST_EVENT_MAX_MS: f64 = 7_000.0;

/// Kinds of timed events an entrant can be under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SpeedBurst,
    Slowdown,
    ComebackEffort,
}

impl EventKind {
    /// Commentary label shown next to the entrant.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::SpeedBurst => "burst of speed",
            EventKind::Slowdown => "slight slowdown",
            EventKind::ComebackEffort => "comeback effort",
        }
    }
}

/// Event machine state: idle, or under a timed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventState {
    Idle,
    Active {
        kind: EventKind,
        multiplier: f64,
        remaining_ms: f64,
    },
}

impl EventState {
    /// Speed multiplier currently applied by the event layer.
    pub fn multiplier(&self) -> f64 {
        match self {
            EventState::Idle => 1.0,
            EventState::Active { multiplier, .. } => *multiplier,
        }
    }

    /// Label of the active event, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            EventState::Idle => None,
            EventState::Active { kind, .. } => Some(kind.label()),
        }
    }
}

/// Advance one entrant's event machine by one tick.
///
/// `race_ms` is time since race start; `next_event_time` is the scheduled
/// offset from race start of the next trigger check. An active event counts
/// down every tick; a new event can only trigger from idle once `race_ms`
/// passes the schedule.
pub fn step(
    name: &str,
    state: &mut EventState,
    next_event_time: &mut f64,
    momentum: &mut f64,
    catch_up_factor: f64,
    race_ms: f64,
    elapsed_ms: f64,
    rng: &mut dyn RandomSource,
) {
    if let EventState::Active { kind, remaining_ms, .. } = state {
        *remaining_ms -= elapsed_ms;
        if *remaining_ms <= 0.0 {
            log::debug!("{}'s {} has ended", name, kind.label());
            *state = EventState::Idle;
            *next_event_time = race_ms + rng.range(EVENT_GAP_MIN_MS, EVENT_GAP_MAX_MS);
        }
        return;
    }

    if race_ms < *next_event_time {
        return;
    }

    let u = rng.unit();
    if u < 0.12 {
        *state = EventState::Active {
            kind: EventKind::SpeedBurst,
            multiplier: 1.15,
            remaining_ms: rng.range(800.0, 2000.0),
        };
        log::debug!("{} finds a burst of speed", name);
    } else if u < 0.16 {
        *state = EventState::Active {
            kind: EventKind::Slowdown,
            multiplier: 0.9,
            remaining_ms: rng.range(800.0, 2000.0),
        };
        log::debug!("{} slows slightly", name);
    } else if u < 0.24 {
        // Instantaneous momentum shift, no active state.
        if rng.chance(0.5) {
            *momentum += rng.range(0.10, 0.15);
            log::debug!("{} makes a move", name);
        } else {
            *momentum -= rng.range(0.05, 0.15);
            log::debug!("{} loses a bit of momentum", name);
        }
        *next_event_time = race_ms + rng.range(EVENT_GAP_MIN_MS, EVENT_GAP_MAX_MS);
    } else if u < 0.28 && catch_up_factor > 0.2 {
        // Comeback efforts are reserved for entrants already well behind.
        *state = EventState::Active {
            kind: EventKind::ComebackEffort,
            multiplier: 1.2,
            remaining_ms: rng.range(1000.0, 2000.0),
        };
        log::debug!("{} is making a comeback effort", name);
    } else {
        *next_event_time = race_ms + rng.range(EVENT_GAP_MIN_MS, EVENT_GAP_MAX_MS);
    }
}
