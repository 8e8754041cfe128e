use crate::infra::{parse_date, seeded_assessment, seeded_market, seeded_subject};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use valuation_ai::error::AppError;
use valuation_ai::workflows::mls::CsvMarketData;
use valuation_ai::workflows::valuation::domain::{
    ConditionAssessment, MarketScope, Property, TrendWindow, ValuationRequest,
};
use valuation_ai::workflows::valuation::repository::InMemoryValuationStore;
use valuation_ai::workflows::valuation::{
    ValuationConfig, ValuationFailureView, ValuationService, ValuationServiceError,
    ValuationSummary,
};

#[derive(Args, Debug)]
pub(crate) struct ValuationRunArgs {
    /// Subject property JSON file
    #[arg(long)]
    pub(crate) subject_json: PathBuf,
    /// MLS comparable-sales CSV export
    #[arg(long)]
    pub(crate) candidates_csv: PathBuf,
    /// MLS market-series CSV export (trend degrades gracefully without it)
    #[arg(long)]
    pub(crate) market_csv: Option<PathBuf>,
    /// Structured condition assessment JSON file
    #[arg(long)]
    pub(crate) assessment_json: Option<PathBuf>,
    /// Search radius around the subject in kilometers
    #[arg(long, default_value_t = 5.0)]
    pub(crate) radius_km: f64,
    /// Maximum age of comparable sales in days
    #[arg(long, default_value_t = 365)]
    pub(crate) max_sale_age_days: i64,
    /// Trend lookback window in months
    #[arg(long, default_value_t = 24)]
    pub(crate) window_months: u32,
    /// Valuation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Valuation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Skip the condition assessment portion of the demo
    #[arg(long)]
    pub(crate) skip_assessment: bool,
}

pub(crate) async fn run_valuation(args: ValuationRunArgs) -> Result<(), AppError> {
    let ValuationRunArgs {
        subject_json,
        candidates_csv,
        market_csv,
        assessment_json,
        radius_km,
        max_sale_age_days,
        window_months,
        as_of,
    } = args;

    let subject: Property = serde_json::from_reader(std::fs::File::open(subject_json)?)?;
    let assessment: Option<ConditionAssessment> = match assessment_json {
        Some(path) => Some(serde_json::from_reader(std::fs::File::open(path)?)?),
        None => None,
    };
    let market = CsvMarketData::from_paths(candidates_csv, market_csv)?;

    let request = ValuationRequest {
        scope: MarketScope {
            admin_area: subject.location.admin_area.clone(),
            center: subject.location.clone(),
            max_radius_km: radius_km,
            max_sale_age_days,
        },
        subject,
        window: TrendWindow {
            months: window_months,
        },
        assessment,
        as_of: as_of.unwrap_or_else(|| Local::now().date_naive()),
    };

    appraise_and_render(Arc::new(market), request).await
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        skip_assessment,
    } = args;

    println!("Valuation pipeline demo");
    println!("Market: seeded sample county (6 closed sales, 24-month series)");

    let subject = seeded_subject();
    let request = ValuationRequest {
        scope: MarketScope {
            admin_area: subject.location.admin_area.clone(),
            center: subject.location.clone(),
            max_radius_km: 5.0,
            max_sale_age_days: 365,
        },
        subject,
        window: TrendWindow { months: 24 },
        assessment: if skip_assessment {
            None
        } else {
            Some(seeded_assessment())
        },
        as_of: as_of.unwrap_or_else(|| Local::now().date_naive()),
    };

    appraise_and_render(Arc::new(seeded_market()), request).await
}

async fn appraise_and_render(
    market: Arc<CsvMarketData>,
    request: ValuationRequest,
) -> Result<(), AppError> {
    let store = Arc::new(InMemoryValuationStore::default());
    let service = ValuationService::new(market, store, ValuationConfig::default());

    match service.appraise(request).await {
        Ok(record) => {
            render_summary(&ValuationSummary::from_record(&record));
            Ok(())
        }
        Err(ValuationServiceError::Run(failure)) => {
            render_failure(&ValuationFailureView::from_failure(&failure));
            Err(AppError::Valuation(ValuationServiceError::Run(failure)))
        }
        Err(other) => Err(AppError::Valuation(other)),
    }
}

fn render_summary(summary: &ValuationSummary) {
    println!(
        "\nValuation {} for {} ({}) as of {}",
        summary.run_id.0, summary.subject_id, summary.admin_area, summary.as_of
    );
    println!(
        "Point value: ${:.0} (range ${:.0} - ${:.0})",
        summary.point_value, summary.range_low, summary.range_high
    );
    println!(
        "Confidence: {:.2} | method coverage {:.0}% | {} comparables",
        summary.confidence,
        summary.coverage * 100.0,
        summary.comparable_count
    );

    println!("\nMethod results");
    for method in &summary.methods {
        match (method.point_estimate, &method.unavailable_reason) {
            (Some(point), _) => println!(
                "- {}: ${:.0} (band ${:.0} - ${:.0}, confidence {:.2})",
                method.method_label,
                point,
                method.band_low.unwrap_or(point),
                method.band_high.unwrap_or(point),
                method.confidence.unwrap_or(0.0)
            ),
            (None, Some(reason)) => {
                println!("- {}: unavailable ({reason})", method.method_label)
            }
            (None, None) => println!("- {}: unavailable", method.method_label),
        }
    }

    println!("\nMarket trend");
    println!(
        "- {} | {:.2}%/month | {:.0} days on market | inventory {:.0}{}",
        summary.trend.classification_label,
        summary.trend.monthly_velocity_pct,
        summary.trend.days_on_market_avg,
        summary.trend.inventory_level,
        if summary.trend.degraded {
            " | degraded (sparse data)"
        } else {
            ""
        }
    );
    println!(
        "- {}-month forecast: ${:.0} (confidence {:.2})",
        summary.trend.forecast_months,
        summary.trend.forecast_price,
        summary.trend.forecast_confidence
    );

    println!("\nCondition");
    if summary.condition.assessed {
        println!(
            "- multiplier {:.2} | cost to cure ${:.0} | net of repairs ${:.0}",
            summary.condition.multiplier,
            summary.condition.cost_to_cure,
            summary.condition.value_net_of_repairs
        );
    } else {
        println!("- unassessed (neutral multiplier, confidence reduced)");
    }
}

fn render_failure(failure: &ValuationFailureView) {
    println!("\nValuation {} did not finalize", failure.run_id.0);
    println!("- completed stage: {}", failure.completed_stage);
    println!("- reason: {}", failure.error);
    if let Some(count) = failure.comparables_resolved {
        println!("- comparables resolved before failure: {count}");
    }
    if let Some(count) = failure.methods_reported {
        println!("- method slots reported: {count}");
    }
}
