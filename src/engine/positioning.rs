//! Field positioning - ranks, catch-up and lead-handicap factors
//!
//! Recomputed once per tick from a fresh, start-of-tick snapshot of
//! distances, before any entrant moves. The factors pull trailing entrants
//! forward and lean on the leader so the pack stays visually close without
//! forcing a tie at the line.

use crate::engine::entrant::Entrant;
use crate::engine::rng::RandomSource;

/// Indices of all entrants, descending by distance. `sort_by` is stable, so
/// ties keep lane order.
pub fn field_order(entrants: &[Entrant]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entrants.len()).collect();
    order.sort_by(|&a, &b| {
        entrants[b]
            .distance
            .partial_cmp(&entrants[a].distance)
            .unwrap()
    });
    order
}

/// Recompute rank and pack-balancing factors for the whole field.
///
/// Finished entrants keep the rank assigned at their finish and are skipped;
/// they still anchor the ordering, so the best unfinished entrant behind a
/// finisher is treated as a chaser, never as the leader.
pub fn apply(entrants: &mut [Entrant], track_length: f64, rng: &mut dyn RandomSource) {
    let order = field_order(entrants);
    let field = order.len();
    let leader_distance = entrants[order[0]].distance;
    let runner_up_distance = if field > 1 {
        entrants[order[1]].distance
    } else {
        leader_distance
    };

    for (pos, &idx) in order.iter().enumerate() {
        let rank = (pos + 1) as u32;
        let entrant = &mut entrants[idx];
        if entrant.finished {
            continue;
        }
        entrant.rank = Some(rank);

        if rank == 1 {
            let percent_ahead = (entrant.distance - runner_up_distance) / track_length;
            entrant.lead_handicap = (percent_ahead * 1.5).min(0.2);
            if rng.chance(0.03) && percent_ahead > 0.04 {
                entrant.momentum -= 0.08;
                log::debug!("{} eases the pace slightly", entrant.name);
            }
            entrant.catch_up_factor = 0.0;
        } else {
            let percent_behind = (leader_distance - entrant.distance) / track_length;
            let position_factor = (0.02 * rank as f64).min(0.15);
            let distance_factor = percent_behind.min(0.15);
            entrant.catch_up_factor = position_factor + distance_factor + rng.range(0.0, 0.05);
            if rank as usize == field {
                entrant.catch_up_factor += 0.1;
            }
            entrant.lead_handicap = 0.0;

            // Rare recovery kick, back half of the field only.
            if rng.chance(0.01) && rank as f64 > field as f64 / 2.0 {
                entrant.momentum += 0.15;
                log::debug!("{} makes a move to catch up", entrant.name);
            }
        }
    }
}

/// One-shot momentum adjustment fired when `idx` enters the final lap,
/// applied to the entrant over the still-racing cohort ranked by distance.
pub fn balance_final_lap(entrants: &mut [Entrant], idx: usize, track_length: f64) {
    let active: Vec<usize> = field_order(entrants)
        .into_iter()
        .filter(|&i| !entrants[i].finished)
        .collect();
    if active.len() <= 1 {
        return;
    }

    let Some(pos) = active.iter().position(|&i| i == idx) else {
        return;
    };
    let total = active.len();

    if pos == 0 {
        // Leader only eases off if the gap back is significant.
        let lead = entrants[idx].distance - entrants[active[1]].distance;
        if lead > track_length * 0.06 {
            entrants[idx].momentum -= 0.08;
            log::debug!("{} feels the pressure of the final lap", entrants[idx].name);
        }
    } else {
        let rank = (pos + 1) as f64;
        let boost = (0.08 + rank / total as f64 * 0.12).min(0.2);
        entrants[idx].momentum += boost;
        log::debug!(
            "{} gets motivated for the final lap (boost {:.2})",
            entrants[idx].name,
            boost
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rng::testing::Midpoint;
    use approx::assert_relative_eq;

    fn field(distances: &[f64]) -> Vec<Entrant> {
        distances
            .iter()
            .enumerate()
            .map(|(lane, &d)| {
                let mut e = Entrant::new(
                    lane,
                    format!("Entrant {}", lane + 1),
                    0xFFFFFF,
                    4,
                    &mut Midpoint,
                );
                e.distance = d;
                e
            })
            .collect()
    }

    #[test]
    fn ranks_are_unique_and_descending_by_distance() {
        let mut entrants = field(&[200.0, 500.0, 350.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_eq!(entrants[1].rank, Some(1));
        assert_eq!(entrants[2].rank, Some(2));
        assert_eq!(entrants[0].rank, Some(3));
    }

    #[test]
    fn ties_break_by_lane_order() {
        let mut entrants = field(&[100.0, 100.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_eq!(entrants[0].rank, Some(1));
        assert_eq!(entrants[1].rank, Some(2));
    }

    #[test]
    fn leader_handicap_scales_with_gap_and_caps() {
        let mut entrants = field(&[300.0, 200.0, 100.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_relative_eq!(entrants[0].lead_handicap, 0.1 * 1.5);
        assert_relative_eq!(entrants[0].catch_up_factor, 0.0);

        let mut entrants = field(&[600.0, 100.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_relative_eq!(entrants[0].lead_handicap, 0.2);
    }

    #[test]
    fn chasers_get_position_distance_and_last_place_components() {
        let mut entrants = field(&[300.0, 200.0, 100.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        // Rank 2: 0.02*2 position + 0.1 distance + 0.025 midpoint boost.
        assert_relative_eq!(entrants[1].catch_up_factor, 0.04 + 0.1 + 0.025);
        assert_relative_eq!(entrants[1].lead_handicap, 0.0);
        // Rank 3 (last): distance component capped at 0.15, +0.1 last place.
        assert_relative_eq!(entrants[2].catch_up_factor, 0.06 + 0.15 + 0.025 + 0.1);
    }

    #[test]
    fn single_entrant_field_has_no_lead_handicap() {
        let mut entrants = field(&[250.0]);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_eq!(entrants[0].rank, Some(1));
        assert_relative_eq!(entrants[0].lead_handicap, 0.0);
    }

    #[test]
    fn finished_entrants_keep_their_rank() {
        let mut entrants = field(&[4000.0, 300.0, 200.0]);
        entrants[0].finished = true;
        entrants[0].rank = Some(1);
        apply(&mut entrants, 1000.0, &mut Midpoint);
        assert_eq!(entrants[0].rank, Some(1));
        // Best unfinished entrant chases the frozen leader, no handicap.
        assert_eq!(entrants[1].rank, Some(2));
        assert_relative_eq!(entrants[1].lead_handicap, 0.0);
        assert!(entrants[1].catch_up_factor > 0.0);
    }

    #[test]
    fn final_lap_leader_eases_only_with_a_real_gap() {
        let mut entrants = field(&[3100.0, 3050.0, 2900.0]);
        balance_final_lap(&mut entrants, 0, 1000.0);
        // 50m lead on a 1000m track is under the 6% threshold.
        assert_relative_eq!(entrants[0].momentum, 0.0);

        let mut entrants = field(&[3100.0, 3000.0, 2900.0]);
        balance_final_lap(&mut entrants, 0, 1000.0);
        assert_relative_eq!(entrants[0].momentum, -0.08);
    }

    #[test]
    fn final_lap_chasers_get_rank_scaled_boost() {
        let mut entrants = field(&[3100.0, 3000.0, 2900.0]);
        balance_final_lap(&mut entrants, 1, 1000.0);
        assert_relative_eq!(entrants[1].momentum, 0.08 + 2.0 / 3.0 * 0.12);

        let mut entrants = field(&[3100.0, 3000.0, 2900.0]);
        balance_final_lap(&mut entrants, 2, 1000.0);
        // Capped at 0.2.
        assert_relative_eq!(entrants[2].momentum, 0.2);
    }

    #[test]
    fn final_lap_balancing_needs_company() {
        let mut entrants = field(&[3100.0]);
        balance_final_lap(&mut entrants, 0, 1000.0);
        assert_relative_eq!(entrants[0].momentum, 0.0);
    }
}
