use chrono::Utc;
use lapsight_core::domain::ProductId;
use lapsight_core::format::format_krw;
use lapsight_db::Catalog;

use crate::commands::{
    application_failure, load_config, to_data, with_migrated_pool, CommandResult,
};

pub fn run(product_id: &str) -> CommandResult {
    let id = ProductId(product_id.trim().to_string());
    let result = load_config().and_then(|config| {
        with_migrated_pool(&config, |pool| async move {
            let report = Catalog::sqlite(pool)
                .report(&id, Utc::now())
                .await
                .map_err(application_failure)?;
            let data = to_data(&report)?;
            let message = format!(
                "{}: overall {}/100, {} at {} ({})",
                report.product.name,
                report.scores.overall,
                report.should_buy.verdict.label(),
                format_krw(report.price.current_lowest),
                report.should_buy.reason,
            );
            Ok((message, data))
        })
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data("analyze", message, Some(data)),
        Err(failure) => CommandResult::from_failure("analyze", failure),
    }
}
