use lapsight_core::domain::GpuTier;
use lapsight_core::games::{estimate_game_fps, GameEstimate, Playability};

use crate::commands::{to_data, CommandFailure, CommandResult, EXIT_INPUT};

pub const DEFAULT_REFRESH_HZ: u32 = 60;

pub fn run(tier: i64, refresh_rate: Option<u32>) -> CommandResult {
    match estimates(tier, refresh_rate.unwrap_or(DEFAULT_REFRESH_HZ)) {
        Ok((estimates, message)) => match to_data(&estimates) {
            Ok(data) => CommandResult::success_with_data("games", message, Some(data)),
            Err(failure) => CommandResult::from_failure("games", failure),
        },
        Err(failure) => CommandResult::from_failure("games", failure),
    }
}

fn estimates(
    tier: i64,
    refresh_rate: u32,
) -> Result<(Vec<GameEstimate>, String), CommandFailure> {
    if !(1..=10).contains(&tier) {
        let message = format!("gpu tier must be in 1..=10, got {tier}");
        return Err(("invalid_input", message, EXIT_INPUT));
    }
    if refresh_rate == 0 {
        let message = "refresh rate must be greater than zero".to_string();
        return Err(("invalid_input", message, EXIT_INPUT));
    }

    let estimates = estimate_game_fps(GpuTier::new(tier), refresh_rate);
    let smooth = estimates
        .iter()
        .filter(|estimate| {
            matches!(estimate.playability, Playability::Excellent | Playability::Good)
        })
        .count();
    let message = format!(
        "tier {tier} at {refresh_rate}Hz: {smooth} of {} games run well",
        estimates.len()
    );
    Ok((estimates, message))
}
