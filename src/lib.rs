//! Derby Sim - tick-driven race simulation engine
//!
//! Provides the race core for a racing frontend: the engine consumes
//! discrete (time, delta) pairs and a track-speed scale from its embedder,
//! advances every entrant's speed, distance, rank, and event state each
//! tick, and exposes read-only snapshots plus finish notifications. All
//! state is in-memory for the duration of one race.

pub mod engine;

pub use engine::entrant::{Entrant, EntrantSnapshot};
pub use engine::events::{EventKind, EventState};
pub use engine::race::{
    ConfigError, Race, RaceConfig, RaceNotification, RaceResult, RaceSnapshot,
};
pub use engine::rng::{RandomSource, SeededSource};
pub use engine::server::{RacePhase, RaceServer, ServerStats};
pub use engine::stats::{LapModifier, Profile, SkillTrait};
