use crate::cli::ServeArgs;
use crate::infra::{seeded_market, valuation_config, AppState};
use crate::routes::with_valuation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use valuation_ai::config::AppConfig;
use valuation_ai::error::AppError;
use valuation_ai::telemetry;
use valuation_ai::workflows::mls::CsvMarketData;
use valuation_ai::workflows::valuation::repository::InMemoryValuationStore;
use valuation_ai::workflows::valuation::ValuationService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let market = match (args.candidates_csv.take(), args.market_csv.take()) {
        (Some(candidates), series) => {
            info!(?candidates, "serving against MLS CSV exports");
            CsvMarketData::from_paths(candidates, series)?
        }
        (None, _) => {
            info!("no MLS export supplied, serving against the seeded sample market");
            seeded_market()
        }
    };

    let store = Arc::new(InMemoryValuationStore::default());
    let valuation_service = Arc::new(ValuationService::new(
        Arc::new(market),
        store,
        valuation_config(&config),
    ));

    let app = with_valuation_routes(valuation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "valuation orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
