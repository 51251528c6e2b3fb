use chrono::Utc;
use lapsight_core::domain::{Budget, Priority, RecommendRequest, UsageKind};
use lapsight_core::recommend::rank_recommendations;
use lapsight_db::Catalog;

use crate::commands::{
    application_failure, load_config, to_data, with_migrated_pool, CommandFailure, CommandResult,
    EXIT_INPUT,
};

#[derive(Clone, Debug, Default)]
pub struct RecommendArgs {
    pub usage: Vec<String>,
    pub priority: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub limit: Option<usize>,
}

pub fn run(args: &RecommendArgs) -> CommandResult {
    let result = build_request(args).and_then(|request| {
        let config = load_config()?;
        let limit = args.limit.unwrap_or(config.catalog.recommend_limit).max(1);
        let pool_size = config.catalog.candidate_pool.max(limit);

        with_migrated_pool(&config, |pool| async move {
            let candidates = Catalog::sqlite(pool)
                .candidates(request.budget, pool_size, Utc::now())
                .await
                .map_err(application_failure)?;
            let recommendations = rank_recommendations(candidates, &request, limit);
            let message = if recommendations.is_empty() {
                "no laptops match the requested budget".to_string()
            } else {
                let names = recommendations
                    .iter()
                    .map(|recommendation| recommendation.product.name.as_str())
                    .collect::<Vec<_>>();
                format!("top {}: {}", recommendations.len(), names.join(", "))
            };
            Ok((message, to_data(&recommendations)?))
        })
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data("recommend", message, Some(data)),
        Err(failure) => CommandResult::from_failure("recommend", failure),
    }
}

/// Parses the flag values into a validated request. Usage values may be
/// repeated or comma separated.
pub fn build_request(args: &RecommendArgs) -> Result<RecommendRequest, CommandFailure> {
    let invalid = |message: String| ("invalid_input", message, EXIT_INPUT);

    let mut usage = Vec::new();
    for value in args.usage.iter().flat_map(|value| value.split(',')) {
        if value.trim().is_empty() {
            continue;
        }
        let kind = value.parse::<UsageKind>().map_err(|error| invalid(error.to_string()))?;
        if !usage.contains(&kind) {
            usage.push(kind);
        }
    }

    let priority = args
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(|error| invalid(error.to_string()))?;

    let budget = match (args.min, args.max) {
        (None, None) => None,
        (min, max) => Some(
            Budget::new(min.unwrap_or(0), max.unwrap_or(i64::MAX))
                .map_err(|error| invalid(error.to_string()))?,
        ),
    };

    let request = RecommendRequest { budget, usage, priority };
    request.validate().map_err(|error| invalid(error.to_string()))?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use lapsight_core::domain::{Budget, Priority, UsageKind};

    use super::{build_request, RecommendArgs};

    #[test]
    fn usage_accepts_repeated_and_comma_separated_values() {
        let args = RecommendArgs {
            usage: vec!["gaming,work".to_string(), "Gaming".to_string(), "portable".to_string()],
            ..RecommendArgs::default()
        };
        let request = build_request(&args).expect("request");
        assert_eq!(request.usage, vec![UsageKind::Gaming, UsageKind::Work, UsageKind::Portable]);
        assert_eq!(request.budget, None);
        assert_eq!(request.priority, None);
    }

    #[test]
    fn half_open_budget_fills_the_missing_bound() {
        let args = RecommendArgs {
            max: Some(1_500_000),
            priority: Some("value".to_string()),
            ..RecommendArgs::default()
        };
        let request = build_request(&args).expect("request");
        assert_eq!(request.budget, Some(Budget { min: 0, max: 1_500_000 }));
        assert_eq!(request.priority, Some(Priority::Value));
    }

    #[test]
    fn invalid_values_are_input_errors() {
        let cases = [
            RecommendArgs { usage: vec!["mining".to_string()], ..RecommendArgs::default() },
            RecommendArgs { priority: Some("cheapest".to_string()), ..RecommendArgs::default() },
            RecommendArgs {
                min: Some(2_000_000),
                max: Some(1_000_000),
                ..RecommendArgs::default()
            },
        ];
        for args in cases {
            let (class, _, code) = build_request(&args).expect_err("should be rejected");
            assert_eq!((class, code), ("invalid_input", 6));
        }
    }
}
