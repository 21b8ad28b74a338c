// Handler for the `macd` command: single-instrument crossover check
use super::helpers::{deliver, ensure_observations, signal_body, signal_title};
use crate::config::{FetchSettings, MacdSettings};
use crate::data::provider::ProviderChain;
use crate::error::{EngineError, EngineResult};
use crate::indicators::IndicatorEngine;
use crate::notify::Notifier;
use crate::signal::{evaluate, recommend};
use shared::models::{SessionMode, SignalReport};

pub async fn handle_run_macd(
    settings: &MacdSettings,
    fetch: &FetchSettings,
    chain: &ProviderChain,
    notifier: &dyn Notifier,
    mode: SessionMode,
) -> EngineResult<SignalReport> {
    let series = chain.fetch_daily(&settings.symbol, fetch.start_date).await?;
    ensure_observations(settings.periods.required_observations(), series.len())?;

    let rows = IndicatorEngine::new(settings.periods).macd_frame(&series);
    let state = evaluate(&rows)?;
    let row = *rows
        .last()
        .ok_or_else(|| EngineError::ComputationPrecondition("empty indicator frame".to_string()))?;

    let report = SignalReport {
        symbol: settings.symbol.clone(),
        state,
        row,
        mode,
        risk: None,
        outcome: None,
        recommendation: recommend(state, settings.inverse_strategy),
    };
    tracing::info!(
        symbol = %report.symbol,
        date = %row.date,
        dif = row.dif,
        dea = row.dea,
        state = state.label(),
        "MACD evaluated"
    );

    if state.is_cross() {
        deliver(notifier, &signal_title(&report), &signal_body(&report, &settings.target_symbol)).await;
    } else if settings.daily_report {
        let title = format!("[{}] daily report: {}", report.symbol, state.label());
        deliver(notifier, &title, &signal_body(&report, &settings.target_symbol)).await;
    } else {
        tracing::debug!(symbol = %report.symbol, "No cross, nothing to notify");
    }
    Ok(report)
}
