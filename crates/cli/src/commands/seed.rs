use chrono::Utc;
use lapsight_db::{DemoCatalog, SeedCheck};
use serde_json::json;

use crate::commands::{load_config, with_migrated_pool, CommandResult, EXIT_MIGRATION};

pub fn run() -> CommandResult {
    let result = load_config().and_then(|config| {
        with_migrated_pool(&config, |pool| async move {
            let seeded = DemoCatalog::load(&pool, Utc::now())
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

            let verification = DemoCatalog::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), EXIT_MIGRATION))?;

            if !verification.all_present {
                let message = verification_message(&verification.checks);
                return Err(("seed_verification", message, EXIT_MIGRATION));
            }
            Ok(seeded)
        })
    });

    match result {
        Ok(seeded) => {
            let message = format!(
                "demo catalog loaded: {} laptops, {} new price points",
                seeded.products_seeded.len(),
                seeded.price_points
            );
            CommandResult::success_with_data(
                "seed",
                message,
                Some(json!({
                    "products": seeded.products_seeded,
                    "price_points": seeded.price_points,
                })),
            )
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(checks: &[SeedCheck]) -> String {
    let failed = checks
        .iter()
        .filter(|check| !check.passed)
        .map(|check| format!("{}/{}", check.product_id, check.check))
        .collect::<Vec<_>>();

    if failed.is_empty() {
        "some demo catalog data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed.join(", "))
    }
}
