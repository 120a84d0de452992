//! Entrant - per-competitor state and the per-tick advance update
//!
//! Identity (lane, name, color) is fixed for the life of the entrant; the
//! skill profile is redrawn on every reset and all race state reinitializes.
//! `advance` runs the layered speed model: lap bookkeeping, the event
//! machine, momentum decay, stamina and luck factors, catch-up/lead-handicap
//! adjustment, and finish detection.

use crate::engine::events::{self, EventState, FIRST_EVENT_MAX_MS, FIRST_EVENT_MIN_MS};
use crate::engine::positioning;
use crate::engine::rng::RandomSource;
use crate::engine::stats::{self, Profile};
use serde::{Deserialize, Serialize};

/// Tick context handed to `advance` by the race orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub track_length: f64,
    pub total_laps: u32,
    pub total_race_distance: f64,
    /// Track-size scale from the rendering collaborator, already floored.
    pub track_speed_scale: f64,
    pub race_start_time: f64,
    pub now_ms: f64,
    pub elapsed_ms: f64,
}

/// One competitor: fixed identity, a redrawable profile, mutable race state.
#[derive(Debug, Clone)]
pub struct Entrant {
    pub lane: usize,
    pub name: String,
    /// 0xRRGGBB tint used by the rendering collaborator.
    pub color: u32,
    pub profile: Profile,
    pub current_speed: f64,
    pub distance: f64,
    pub current_lap: u32,
    pub finished: bool,
    pub finish_time: Option<f64>,
    /// 1-indexed rank, `None` before the race starts.
    pub rank: Option<u32>,
    pub momentum: f64,
    pub catch_up_factor: f64,
    pub lead_handicap: f64,
    pub event: EventState,
    /// Offset from race start of the next event check.
    pub next_event_time: f64,
    /// Latch so the final-lap balancer fires once per race.
    pub(crate) final_lap_balanced: bool,
}

impl Entrant {
    /// Create an entrant with a freshly drawn profile.
    pub fn new(
        lane: usize,
        name: String,
        color: u32,
        total_laps: u32,
        rng: &mut dyn RandomSource,
    ) -> Self {
        Self {
            lane,
            name,
            color,
            profile: stats::generate_profile(rng, total_laps),
            current_speed: 0.0,
            distance: 0.0,
            current_lap: 1,
            finished: false,
            finish_time: None,
            rank: None,
            momentum: 0.0,
            catch_up_factor: 0.0,
            lead_handicap: 0.0,
            event: EventState::Idle,
            next_event_time: first_event_delay(rng),
            final_lap_balanced: false,
        }
    }

    /// Reinitialize for a new race. Lane, name, and color persist; the
    /// profile is redrawn and every mutable field returns to its start value.
    pub fn reset(&mut self, total_laps: u32, rng: &mut dyn RandomSource) {
        self.profile = stats::generate_profile(rng, total_laps);
        self.current_speed = 0.0;
        self.distance = 0.0;
        self.current_lap = 1;
        self.finished = false;
        self.finish_time = None;
        self.rank = None;
        self.momentum = 0.0;
        self.catch_up_factor = 0.0;
        self.lead_handicap = 0.0;
        self.event = EventState::Idle;
        self.next_event_time = first_event_delay(rng);
        self.final_lap_balanced = false;
    }
}

fn first_event_delay(rng: &mut dyn RandomSource) -> f64 {
    rng.range(FIRST_EVENT_MIN_MS, FIRST_EVENT_MAX_MS)
}

/// Advance the entrant at `idx` by one tick. Returns `true` if it crossed
/// the finish line this tick.
///
/// Takes the whole field because entering the final lap rebalances the
/// still-racing cohort. Rank and catch-up/lead factors must already be
/// current for this tick (the race orchestrator runs the positioning pass
/// before any entrant moves).
pub fn advance(
    entrants: &mut [Entrant],
    idx: usize,
    ctx: &TickContext,
    rng: &mut dyn RandomSource,
) -> bool {
    if entrants[idx].finished {
        return false;
    }

    // Lap bookkeeping from distance, capped at the race's lap count.
    let previous_lap = entrants[idx].current_lap;
    let new_lap = ctx
        .total_laps
        .min((entrants[idx].distance / ctx.track_length) as u32 + 1);
    entrants[idx].current_lap = new_lap;

    if new_lap > previous_lap {
        log::debug!(
            "{} starting lap {} of {}",
            entrants[idx].name,
            new_lap,
            ctx.total_laps
        );
        // Occasional surge of energy at the start of a new lap.
        if rng.chance(0.3) {
            entrants[idx].momentum += rng.range(0.0, 0.15);
        }
        if new_lap == ctx.total_laps && !entrants[idx].final_lap_balanced {
            entrants[idx].final_lap_balanced = true;
            positioning::balance_final_lap(entrants, idx, ctx.track_length);
        }
    }

    let entrant = &mut entrants[idx];

    // Event machine step.
    let race_ms = ctx.now_ms - ctx.race_start_time;
    events::step(
        &entrant.name,
        &mut entrant.event,
        &mut entrant.next_event_time,
        &mut entrant.momentum,
        entrant.catch_up_factor,
        race_ms,
        ctx.elapsed_ms,
        rng,
    );

    // Momentum decays geometrically, snapping to zero near the floor.
    if entrant.momentum.abs() > 0.01 {
        entrant.momentum *= 0.995;
    } else {
        entrant.momentum = 0.0;
    }

    let lap_modifier = entrant.profile.lap_modifier(entrant.current_lap);
    let race_progress = entrant.distance / ctx.total_race_distance;
    let stamina_factor =
        (1.0 - race_progress / (entrant.profile.stamina + lap_modifier.stamina_boost)).max(0.7);
    let instant_random = 1.0 + rng.range(-0.5, 0.5) * (entrant.profile.luck_factor * 0.5);
    let event_multiplier = entrant.event.multiplier();

    let target_speed = entrant.profile.base_speed
        * stamina_factor
        * instant_random
        * event_multiplier
        * (1.0 + lap_modifier.speed_boost + entrant.catch_up_factor * 0.7
            - entrant.lead_handicap * 0.7
            + entrant.momentum * 0.8);

    // Gradual speed changes; chasers accelerate a little harder.
    let dt = ctx.elapsed_ms / 1000.0;
    if entrant.current_speed < target_speed {
        entrant.current_speed +=
            entrant.profile.acceleration * (1.0 + entrant.catch_up_factor * 0.6) * dt * 0.8;
    } else if entrant.current_speed > target_speed * 1.05 {
        entrant.current_speed -= entrant.profile.acceleration * 0.5 * dt * 0.8;
    }

    // Minimum race speed keeps the whole field moving.
    entrant.current_speed = entrant
        .current_speed
        .max(0.7 + entrant.catch_up_factor * 0.8);

    let actual_speed = entrant.current_speed * stamina_factor * instant_random * event_multiplier;
    let previous_distance = entrant.distance;
    entrant.distance += actual_speed * dt * 80.0 * ctx.track_speed_scale;

    // Finish when the total race distance is crossed between ticks. A
    // crossing check cannot miss the line on a large elapsed_ms the way a
    // fixed post-line window can.
    let finish_line = ctx.total_laps as f64 * ctx.track_length;
    if previous_distance < finish_line && entrant.distance >= finish_line {
        entrant.finished = true;
        entrant.finish_time = Some(ctx.now_ms);
        log::debug!("{} finished the race at {:.0} ms", entrant.name, ctx.now_ms);
        return true;
    }
    false
}

/// Read-only per-tick view exposed to the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrantSnapshot {
    pub lane: usize,
    pub name: String,
    pub color: u32,
    pub distance: f64,
    pub current_lap: u32,
    pub current_speed: f64,
    pub rank: Option<u32>,
    pub finished: bool,
    pub finish_time: Option<f64>,
    /// Commentary label of the active event, if any.
    pub event: Option<String>,
    pub odds: u32,
}

impl From<&Entrant> for EntrantSnapshot {
    fn from(entrant: &Entrant) -> Self {
        Self {
            lane: entrant.lane,
            name: entrant.name.clone(),
            color: entrant.color,
            distance: entrant.distance,
            current_lap: entrant.current_lap,
            current_speed: entrant.current_speed,
            rank: entrant.rank,
            finished: entrant.finished,
            finish_time: entrant.finish_time,
            event: entrant.event.label().map(str::to_owned),
            odds: entrant.profile.odds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rng::testing::Midpoint;
    use crate::engine::stats::LapModifier;
    use approx::assert_relative_eq;

    fn fixed_profile(base_speed: f64, total_laps: u32) -> Profile {
        Profile {
            base_speed,
            stamina: 1.0,
            acceleration: 0.4,
            luck_factor: 0.1,
            traits: vec![crate::engine::stats::SkillTrait::Balanced],
            odds: 5,
            lap_modifiers: vec![LapModifier::default(); total_laps as usize],
        }
    }

    fn solo_entrant(base_speed: f64, total_laps: u32) -> Entrant {
        let mut entrant = Entrant::new(0, "Solo".to_owned(), 0xE53935, total_laps, &mut Midpoint);
        entrant.profile = fixed_profile(base_speed, total_laps);
        entrant
    }

    fn ctx(track_length: f64, total_laps: u32, now_ms: f64, elapsed_ms: f64) -> TickContext {
        TickContext {
            track_length,
            total_laps,
            total_race_distance: track_length * total_laps as f64,
            track_speed_scale: 1.0,
            race_start_time: 0.0,
            now_ms,
            elapsed_ms,
        }
    }

    #[test]
    fn solo_midpoint_run_finishes_four_laps() {
        // 1000m track, 4 laps, every draw at its midpoint: no events, no
        // surges, factors all neutral.
        let mut field = vec![solo_entrant(3.0, 4)];
        let mut now = 0.0;
        let mut previous_distance = 0.0;
        let mut previous_lap = 1;
        let mut finished_at_tick = None;

        for tick in 0..4000 {
            now += 16.0;
            let c = ctx(1000.0, 4, now, 16.0);
            if advance(&mut field, 0, &c, &mut Midpoint) {
                finished_at_tick = Some(tick);
                break;
            }
            // Distance never decreases while unfinished; lap count is capped
            // and non-decreasing.
            assert!(field[0].distance >= previous_distance);
            assert!(field[0].current_lap <= 4);
            assert!(field[0].current_lap >= previous_lap);
            previous_distance = field[0].distance;
            previous_lap = field[0].current_lap;
        }

        assert!(finished_at_tick.is_some(), "entrant never finished");
        assert!(field[0].finished);
        assert!(field[0].distance >= 4000.0);
        assert_relative_eq!(field[0].finish_time.unwrap(), now);
    }

    #[test]
    fn finished_entrant_is_frozen() {
        let mut field = vec![solo_entrant(3.0, 2)];
        field[0].distance = 1999.0;
        field[0].current_speed = 3.0;
        field[0].current_lap = 2;
        field[0].final_lap_balanced = true;

        let c = ctx(1000.0, 2, 16.0, 16.0);
        assert!(advance(&mut field, 0, &c, &mut Midpoint));
        let frozen = field[0].clone();

        let c = ctx(1000.0, 2, 32.0, 16.0);
        assert!(!advance(&mut field, 0, &c, &mut Midpoint));
        assert_relative_eq!(field[0].distance, frozen.distance);
        assert_relative_eq!(field[0].current_speed, frozen.current_speed);
        assert_relative_eq!(field[0].momentum, frozen.momentum);
        assert_eq!(field[0].event, frozen.event);
        assert_eq!(field[0].finish_time, frozen.finish_time);
    }

    #[test]
    fn never_finishes_before_the_line() {
        let mut field = vec![solo_entrant(3.0, 4)];
        let mut now = 0.0;
        for _ in 0..4000 {
            now += 16.0;
            let c = ctx(1000.0, 4, now, 16.0);
            let crossed = advance(&mut field, 0, &c, &mut Midpoint);
            if crossed {
                break;
            }
            assert!(!field[0].finished);
            assert!(field[0].distance < 4000.0);
        }
        assert!(field[0].distance >= 4000.0);
    }

    #[test]
    fn large_tick_cannot_skip_the_finish() {
        let mut field = vec![solo_entrant(3.0, 4)];
        field[0].distance = 3990.0;
        field[0].current_lap = 4;
        field[0].final_lap_balanced = true;
        field[0].current_speed = 3.0;

        // A two-second tick carries the entrant far past any fixed window
        // behind the line; the crossing check still fires.
        let c = ctx(1000.0, 4, 2000.0, 2000.0);
        assert!(advance(&mut field, 0, &c, &mut Midpoint));
        assert!(field[0].distance > 4050.0);
    }

    #[test]
    fn reset_reinitializes_every_mutable_field() {
        let mut entrant = solo_entrant(3.0, 4);
        entrant.distance = 1234.0;
        entrant.current_speed = 2.5;
        entrant.current_lap = 2;
        entrant.finished = true;
        entrant.finish_time = Some(55_000.0);
        entrant.rank = Some(3);
        entrant.momentum = 0.1;
        entrant.catch_up_factor = 0.2;
        entrant.lead_handicap = 0.1;
        entrant.event = EventState::Active {
            kind: crate::engine::events::EventKind::SpeedBurst,
            multiplier: 1.15,
            remaining_ms: 500.0,
        };
        entrant.final_lap_balanced = true;

        entrant.reset(4, &mut Midpoint);

        assert_eq!(entrant.lane, 0);
        assert_eq!(entrant.name, "Solo");
        assert_relative_eq!(entrant.distance, 0.0);
        assert_relative_eq!(entrant.current_speed, 0.0);
        assert_eq!(entrant.current_lap, 1);
        assert!(!entrant.finished);
        assert_eq!(entrant.finish_time, None);
        assert_eq!(entrant.rank, None);
        assert_relative_eq!(entrant.momentum, 0.0);
        assert_relative_eq!(entrant.catch_up_factor, 0.0);
        assert_relative_eq!(entrant.lead_handicap, 0.0);
        assert_eq!(entrant.event, EventState::Idle);
        assert_relative_eq!(entrant.next_event_time, 5_000.0);
        assert!(!entrant.final_lap_balanced);
        assert_eq!(entrant.profile.lap_modifiers.len(), 4);
    }

    #[test]
    fn snapshot_reflects_entrant_state() {
        let mut entrant = solo_entrant(3.0, 4);
        entrant.distance = 1500.0;
        entrant.current_lap = 2;
        entrant.rank = Some(1);
        entrant.event = EventState::Active {
            kind: crate::engine::events::EventKind::ComebackEffort,
            multiplier: 1.2,
            remaining_ms: 800.0,
        };

        let snapshot = EntrantSnapshot::from(&entrant);
        assert_eq!(snapshot.lane, 0);
        assert_relative_eq!(snapshot.distance, 1500.0);
        assert_eq!(snapshot.current_lap, 2);
        assert_eq!(snapshot.rank, Some(1));
        assert_eq!(snapshot.event.as_deref(), Some("comeback effort"));
        assert_eq!(snapshot.odds, 5);
    }
}
