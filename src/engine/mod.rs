//! Race Engine Module
//!
//! Simulates a multi-entrant race over discrete time steps: stat
//! generation, a layered speed model, stochastic events, pack balancing,
//! and finish detection. Rendering, track geometry, audio, and UI are
//! external collaborators fed through snapshots and notifications.

pub mod entrant;
pub mod events;
pub mod positioning;
pub mod race;
pub mod rng;
pub mod server;
pub mod stats;

pub use entrant::{Entrant, EntrantSnapshot};
pub use events::{EventKind, EventState};
pub use race::{Race, RaceConfig, RaceNotification, RaceSnapshot};
pub use rng::{RandomSource, SeededSource};
pub use server::{RacePhase, RaceServer};
pub use stats::{Profile, SkillTrait};
