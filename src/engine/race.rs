//! Race - configuration, whole-field orchestration, and finish ordering
//!
//! Owns the entrant set and the race-level clock fields. Each tick it
//! recomputes ranks and pack factors from a start-of-tick snapshot of
//! distances, then advances every entrant, collecting finish notifications
//! for the embedding frontend.

use crate::engine::entrant::{self, Entrant, EntrantSnapshot, TickContext};
use crate::engine::positioning;
use crate::engine::rng::RandomSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roster used for generated fields. Lanes beyond the pool get numbered
/// names.
const NAME_POOL: [&str; 12] = [
    "Thunderbolt",
    "Midnight Star",
    "Copper Canyon",
    "Silver Gale",
    "Iron Duke",
    "Prairie Fire",
    "Lucky Penny",
    "Stormwatch",
    "Desert Rose",
    "Northern Light",
    "Quicksilver",
    "Last Stand",
];

/// Lane tints, 0xRRGGBB.
const LANE_COLORS: [u32; 12] = [
    0xE53935, 0x1E88E5, 0x43A047, 0xFDD835, 0x8E24AA, 0xFB8C00, 0x00ACC1, 0x6D4C41, 0xD81B60,
    0x3949AB, 0x7CB342, 0x546E7A,
];

/// Race configuration supplied by the embedding frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Track length in distance units (one lap).
    pub track_length: f64,
    pub total_laps: u32,
    pub entrant_count: usize,
    /// Track-size speed scale from the rendering collaborator; values below
    /// 0.7 are floored.
    pub track_speed_scale: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track_length: 1000.0,
            total_laps: 4,
            entrant_count: 12,
            track_speed_scale: 1.0,
        }
    }
}

/// Fatal setup errors, reported at race construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("track length must be positive, got {0}")]
    TrackLength(f64),
    #[error("a race needs at least one lap, got {0}")]
    TotalLaps(u32),
    #[error("a race needs at least two entrants, got {0}")]
    EntrantCount(usize),
}

/// Finishing-order entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub lane: usize,
    pub name: String,
    /// Clock time of the crossing, in the external clock's milliseconds.
    pub finish_time: f64,
    /// Final placing, 1-indexed.
    pub position: u32,
}

/// Race-level notifications drained from each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceNotification {
    EntrantFinished {
        lane: usize,
        finish_time: f64,
        rank: u32,
    },
    /// Fires once, when the last entrant crosses. Results are ordered by
    /// finish time.
    RaceComplete { results: Vec<RaceResult> },
}

/// Compact per-tick view for the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub in_progress: bool,
    /// Milliseconds of race time elapsed since the start signal.
    pub elapsed_ms: f64,
    pub entrants: Vec<EntrantSnapshot>,
    pub finisher_count: u32,
}

/// Race-level context: config, field, clock, and finish order. Lives for
/// exactly one race and is fully reinitialized by `reset`.
#[derive(Debug)]
pub struct Race {
    pub config: RaceConfig,
    pub entrants: Vec<Entrant>,
    total_race_distance: f64,
    race_start_time: f64,
    race_elapsed_ms: f64,
    in_progress: bool,
    finish_order: Vec<RaceResult>,
}

impl Race {
    /// Validate the configuration and build the field. Entrants are created
    /// once here and reinitialized (not recreated) on reset.
    pub fn new(config: RaceConfig, rng: &mut dyn RandomSource) -> Result<Self, ConfigError> {
        if !(config.track_length > 0.0) {
            return Err(ConfigError::TrackLength(config.track_length));
        }
        if config.total_laps < 1 {
            return Err(ConfigError::TotalLaps(config.total_laps));
        }
        if config.entrant_count < 2 {
            return Err(ConfigError::EntrantCount(config.entrant_count));
        }

        let entrants = (0..config.entrant_count)
            .map(|lane| {
                Entrant::new(
                    lane,
                    default_name(lane),
                    LANE_COLORS[lane % LANE_COLORS.len()],
                    config.total_laps,
                    rng,
                )
            })
            .collect();

        let total_race_distance = config.track_length * config.total_laps as f64;
        log::info!(
            "race created: {} entrants, {} laps of {}m",
            config.entrant_count,
            config.total_laps,
            config.track_length
        );

        Ok(Self {
            config,
            entrants,
            total_race_distance,
            race_start_time: 0.0,
            race_elapsed_ms: 0.0,
            in_progress: false,
            finish_order: Vec::new(),
        })
    }

    /// Begin racing. `now_ms` is the external clock's current time and
    /// becomes the race start time.
    pub fn start(&mut self, now_ms: f64) {
        self.race_start_time = now_ms;
        self.race_elapsed_ms = 0.0;
        self.in_progress = true;
        log::info!("race started");
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn total_race_distance(&self) -> f64 {
        self.total_race_distance
    }

    pub fn race_start_time(&self) -> f64 {
        self.race_start_time
    }

    /// Finishing order so far.
    pub fn results(&self) -> &[RaceResult] {
        &self.finish_order
    }

    /// Advance the whole field by one tick of the external clock.
    ///
    /// The positioning pass runs over a consistent start-of-tick snapshot of
    /// distances before any entrant moves, so every entrant sees the same
    /// ordering this tick.
    pub fn update(
        &mut self,
        now_ms: f64,
        elapsed_ms: f64,
        rng: &mut dyn RandomSource,
    ) -> Vec<RaceNotification> {
        let mut notifications = Vec::new();
        if !self.in_progress {
            return notifications;
        }

        self.race_elapsed_ms = now_ms - self.race_start_time;
        positioning::apply(&mut self.entrants, self.config.track_length, rng);

        let ctx = TickContext {
            track_length: self.config.track_length,
            total_laps: self.config.total_laps,
            total_race_distance: self.total_race_distance,
            track_speed_scale: self.config.track_speed_scale.max(0.7),
            race_start_time: self.race_start_time,
            now_ms,
            elapsed_ms,
        };

        let mut crossed_this_tick = false;
        for idx in 0..self.entrants.len() {
            if entrant::advance(&mut self.entrants, idx, &ctx, rng) {
                crossed_this_tick = true;
                let rank = (self.finish_order.len() + 1) as u32;
                let crossed = &mut self.entrants[idx];
                crossed.rank = Some(rank);
                let finish_time = crossed.finish_time.unwrap_or(now_ms);
                self.finish_order.push(RaceResult {
                    lane: crossed.lane,
                    name: crossed.name.clone(),
                    finish_time,
                    position: rank,
                });
                notifications.push(RaceNotification::EntrantFinished {
                    lane: crossed.lane,
                    finish_time,
                    rank,
                });
            }
        }

        // A crossing takes its finishing position from the finish order, which
        // can collide with the start-of-tick ranks still held by the rest of
        // the field. Re-rank the survivors behind the finishers so the whole
        // field stays a single 1..n sequence.
        if crossed_this_tick {
            let mut next = self.finish_order.len() as u32 + 1;
            for idx in positioning::field_order(&self.entrants) {
                if !self.entrants[idx].finished {
                    self.entrants[idx].rank = Some(next);
                    next += 1;
                }
            }
        }

        if self.finish_order.len() == self.entrants.len() {
            self.in_progress = false;
            log::info!("race complete after {:.0} ms", self.race_elapsed_ms);
            notifications.push(RaceNotification::RaceComplete {
                results: self.finish_order.clone(),
            });
        }

        notifications
    }

    /// Fully reinitialize for a new race: identities persist, skills redraw,
    /// all mutable state and pending event timers clear before the next tick.
    pub fn reset(&mut self, rng: &mut dyn RandomSource) {
        self.in_progress = false;
        self.race_start_time = 0.0;
        self.race_elapsed_ms = 0.0;
        self.finish_order.clear();
        for entrant in &mut self.entrants {
            entrant.reset(self.config.total_laps, rng);
            log::debug!("{} - odds: {}-1", entrant.name, entrant.profile.odds);
        }
        log::info!("race reset");
    }

    /// Read-only view of the field for the rendering collaborator.
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            in_progress: self.in_progress,
            elapsed_ms: self.race_elapsed_ms,
            entrants: self.entrants.iter().map(EntrantSnapshot::from).collect(),
            finisher_count: self.finish_order.len() as u32,
        }
    }

    /// Current leader by distance.
    pub fn leader(&self) -> Option<&Entrant> {
        self.entrants
            .iter()
            .max_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap())
    }

    /// Entrant in a given lane.
    pub fn entrant(&self, lane: usize) -> Option<&Entrant> {
        self.entrants.iter().find(|e| e.lane == lane)
    }
}

fn default_name(lane: usize) -> String {
    NAME_POOL
        .get(lane)
        .map(|&n| n.to_owned())
        .unwrap_or_else(|| format!("Entrant {}", lane + 1))
}
