//! Race server - controller and tick driver
//!
//! Wraps the race core in a phase machine and a wall clock, and provides
//! the embedding frontend with snapshots, notifications, results, and
//! timing statistics. The core itself only ever sees explicit
//! (now_ms, elapsed_ms) pairs, so an external clock can drive
//! `advance_clock` directly.

use crate::engine::race::{
    ConfigError, Race, RaceConfig, RaceNotification, RaceResult, RaceSnapshot,
};
use crate::engine::rng::{RandomSource, SeededSource};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Countdown length before the field is released.
const COUNTDOWN_MS: f64 = 3_000.0;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Idle,
    Ready,
    Countdown,
    Racing,
    Results,
}

/// Controller statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub avg_tick_time_ms: f32,
    pub entrant_count: u32,
    pub phase: RacePhase,
}

/// Main race controller.
pub struct RaceServer {
    phase: RacePhase,
    race: Option<Race>,
    rng: SeededSource,
    /// Wall-clock origin; `now_ms` values are measured from here.
    started_at: Instant,
    last_tick: Instant,
    countdown_ms: f64,
    pending: Vec<RaceNotification>,
    /// Recent tick durations for averaging.
    tick_times: Vec<f32>,
    running: bool,
}

impl RaceServer {
    /// Create a server with an entropy-seeded random source.
    pub fn new() -> Self {
        Self::with_source(SeededSource::from_entropy())
    }

    /// Create a server that replays deterministically from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(SeededSource::from_seed(seed))
    }

    fn with_source(rng: SeededSource) -> Self {
        Self {
            phase: RacePhase::Idle,
            race: None,
            rng,
            started_at: Instant::now(),
            last_tick: Instant::now(),
            countdown_ms: 0.0,
            pending: Vec::new(),
            tick_times: Vec::with_capacity(60),
            running: false,
        }
    }

    /// Set up a new race with the given config.
    pub fn init_race(&mut self, config: RaceConfig) -> Result<(), ConfigError> {
        let entrant_count = config.entrant_count;
        self.race = Some(Race::new(config, &mut self.rng)?);
        self.phase = RacePhase::Ready;
        self.pending.clear();
        log::info!("race initialized with {} entrants", entrant_count);
        Ok(())
    }

    /// Begin the pre-race countdown. A finished race must be reset before it
    /// can start again.
    pub fn start_race(&mut self) {
        if self.race.is_some() && self.phase == RacePhase::Ready {
            self.phase = RacePhase::Countdown;
            self.countdown_ms = COUNTDOWN_MS;
            self.running = true;
            self.last_tick = Instant::now();
            log::info!("race countdown started");
        }
    }

    /// Drive one tick from the wall clock.
    pub fn tick(&mut self) -> Option<RaceSnapshot> {
        if !self.running {
            return self.race.as_ref().map(|r| r.snapshot());
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_secs_f64() * 1000.0;
        self.last_tick = now;
        let now_ms = now.duration_since(self.started_at).as_secs_f64() * 1000.0;

        let tick_start = Instant::now();
        let snapshot = self.advance_clock(now_ms, elapsed_ms);

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            let _ = self.tick_times.remove(0);
        }

        snapshot
    }

    /// Drive one tick from an external clock. `now_ms` and `elapsed_ms` are
    /// the clock's current time and delta since the previous tick.
    pub fn advance_clock(&mut self, now_ms: f64, elapsed_ms: f64) -> Option<RaceSnapshot> {
        if self.phase == RacePhase::Countdown {
            self.countdown_ms -= elapsed_ms;
            if self.countdown_ms <= 0.0 {
                self.countdown_ms = 0.0;
                if let Some(race) = &mut self.race {
                    race.start(now_ms);
                }
                self.phase = RacePhase::Racing;
            }
            // The transition tick is inert; its delta is countdown time, not
            // race time, so the field first moves on the next tick.
            return self.race.as_ref().map(|r| r.snapshot());
        }

        if self.phase == RacePhase::Racing {
            if let Some(race) = &mut self.race {
                let notifications = race.update(now_ms, elapsed_ms, &mut self.rng);
                let complete = notifications
                    .iter()
                    .any(|n| matches!(n, RaceNotification::RaceComplete { .. }));
                self.pending.extend(notifications);
                if complete {
                    self.phase = RacePhase::Results;
                    self.running = false;
                }
            }
        }

        self.race.as_ref().map(|r| r.snapshot())
    }

    /// Drain notifications accumulated since the last call.
    pub fn take_notifications(&mut self) -> Vec<RaceNotification> {
        std::mem::take(&mut self.pending)
    }

    /// Current snapshot without advancing the simulation.
    pub fn snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|r| r.snapshot())
    }

    /// Current snapshot as the JSON wire format for the frontend.
    pub fn snapshot_json(&self) -> Option<String> {
        self.snapshot()
            .and_then(|s| serde_json::to_string(&s).ok())
    }

    /// Finishing order so far.
    pub fn results(&self) -> Option<Vec<RaceResult>> {
        self.race.as_ref().map(|r| r.results().to_vec())
    }

    /// Reinitialize the current field for another race. Identities persist,
    /// skills and odds are redrawn.
    pub fn reset_race(&mut self) {
        if let Some(race) = &mut self.race {
            race.reset(&mut self.rng);
            self.phase = RacePhase::Ready;
        } else {
            self.phase = RacePhase::Idle;
        }
        self.running = false;
        self.countdown_ms = 0.0;
        self.pending.clear();
        self.tick_times.clear();
    }

    /// Pause the tick driver.
    pub fn pause(&mut self) {
        self.running = false;
        log::info!("race paused");
    }

    /// Resume the tick driver.
    pub fn resume(&mut self) {
        if matches!(self.phase, RacePhase::Countdown | RacePhase::Racing) {
            self.running = true;
            self.last_tick = Instant::now();
            log::info!("race resumed");
        }
    }

    /// Milliseconds left on the pre-race countdown.
    pub fn countdown_remaining(&self) -> f64 {
        self.countdown_ms
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Controller statistics for the frontend's debug panel.
    pub fn stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            avg_tick_time_ms: avg_tick_time,
            entrant_count: self
                .race
                .as_ref()
                .map(|r| r.entrants.len() as u32)
                .unwrap_or(0),
            phase: self.phase,
        }
    }

    /// Direct access to the underlying random source, for embedding
    /// frontends that draw their own cosmetic values.
    pub fn random_source(&mut self) -> &mut dyn RandomSource {
        &mut self.rng
    }
}

impl Default for RaceServer {
    fn default() -> Self {
        Self::new()
    }
}
