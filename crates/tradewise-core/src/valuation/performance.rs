// Recent-form adjustment.
//
// Compares a player's recent weekly output against their season-long
// expectation. Recent weeks are weighted geometrically: the latest week has
// weight 1, the week before `decay`, then `decay^2`, and so on, so a newer
// week never weighs less than an older one.

use crate::model::PlayerStats;

/// Recency-weighted average of the last `window` finite weekly scores.
///
/// Returns `None` when there are no usable scores.
pub fn recency_weighted_average(weekly_points: &[f64], window: usize, decay: f64) -> Option<f64> {
    let recent: Vec<f64> = weekly_points
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .rev()
        .take(window)
        .collect();
    if recent.is_empty() {
        return None;
    }

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut weight = 1.0;
    for points in recent {
        weighted += points * weight;
        total_weight += weight;
        weight *= decay;
    }

    Some(weighted / total_weight)
}

/// Points above (or below) expectation in recent weeks.
///
/// Zero when the player has no weekly scores or no expectation to compare
/// against.
pub fn performance_delta_points(stats: &PlayerStats, window: usize, decay: f64) -> f64 {
    let Some(recent) = recency_weighted_average(&stats.weekly_points, window, decay) else {
        return 0.0;
    };
    match stats.expected_points() {
        Some(expected) => recent - expected,
        None => 0.0,
    }
}
