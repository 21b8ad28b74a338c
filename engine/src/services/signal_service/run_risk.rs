// Handler for the `risk` command: crossover on the signal instrument, gated by
// volatility and correlation against the target instrument
use super::helpers::{deliver, ensure_observations, session_mode, signal_body, signal_title};
use crate::config::{FetchSettings, RiskSettings};
use crate::data::aligner::{align, AlignMode};
use crate::data::provider::ProviderChain;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{IndicatorEngine, RiskWindows};
use crate::notify::Notifier;
use crate::signal::{evaluate, recommend, RiskGate};
use chrono::{DateTime, FixedOffset};
use shared::models::{GateOutcome, PriceSeries, SessionMode, SignalReport};

/// Folds today's realtime quotes into both series. Both quotes are required;
/// with only one available the daily closes are used unchanged.
async fn splice_realtime(
    chain: &ProviderChain,
    signal: &mut PriceSeries,
    target: &mut PriceSeries,
    now: &DateTime<FixedOffset>,
) -> bool {
    let (signal_quote, target_quote) = tokio::join!(
        chain.latest_quote(&signal.symbol),
        chain.latest_quote(&target.symbol)
    );
    match (signal_quote, target_quote) {
        (Some(s), Some(t)) => {
            let today = now.date_naive();
            signal.splice_latest(today, s);
            target.splice_latest(today, t);
            tracing::info!(date = %today, signal = s, target = t, "Spliced realtime quotes");
            true
        }
        _ => {
            tracing::info!("Realtime quotes incomplete, using daily closes only");
            false
        }
    }
}

pub async fn handle_run_risk(
    settings: &RiskSettings,
    fetch: &FetchSettings,
    chain: &ProviderChain,
    notifier: &dyn Notifier,
    now: DateTime<FixedOffset>,
) -> EngineResult<SignalReport> {
    let (mut signal, mut target) = tokio::try_join!(
        chain.fetch_daily(&settings.signal_symbol, fetch.start_date),
        chain.fetch_daily(&settings.target_symbol, fetch.start_date)
    )?;
    if settings.splice_realtime {
        splice_realtime(chain, &mut signal, &mut target, &now).await;
    }

    let frame = align(&[&signal, &target], AlignMode::Inner)?;
    ensure_observations(settings.required_observations(), frame.len())?;

    let windows = RiskWindows {
        vol_window: settings.vol_window,
        corr_window: settings.corr_window,
    };
    let rows = IndicatorEngine::new(settings.periods).risk_frame(
        &frame,
        &settings.signal_symbol,
        &settings.target_symbol,
        windows,
    )?;
    let state = evaluate(&rows)?;
    let row = *rows
        .last()
        .ok_or_else(|| EngineError::ComputationPrecondition("empty indicator frame".to_string()))?;

    let risk = RiskGate::from(settings).assess(&rows);
    let outcome = RiskGate::outcome(state, &risk);
    let recommendation = match outcome {
        Some(GateOutcome::Passed) => recommend(state, settings.inverse_strategy),
        _ => None,
    };
    let mode = session_mode(&now, settings.closing_hour);

    let report = SignalReport {
        symbol: settings.signal_symbol.clone(),
        state,
        row,
        mode,
        risk: Some(risk),
        outcome,
        recommendation,
    };
    tracing::info!(
        symbol = %report.symbol,
        date = %row.date,
        state = state.label(),
        risk_triggered = report.risk_triggered(),
        mode = mode.label(),
        "Risk-gated MACD evaluated"
    );
    tracing::debug!(snapshot = %report.snapshot(), "Latest indicator row");

    let body = signal_body(&report, &settings.target_symbol);
    if state.is_cross() {
        deliver(notifier, &signal_title(&report), &body).await;
    } else if mode == SessionMode::Closing {
        let title = format!("[{}] daily report: {} ({})", report.symbol, state.label(), mode.label());
        deliver(notifier, &title, &body).await;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MacdPeriods;
    use crate::data::provider::test_support::{daily_series, StaticProvider};
    use crate::data::provider::RetryPolicy;
    use crate::notify::test_support::RecordingNotifier;
    use chrono::{NaiveDate, TimeZone};
    use shared::models::{Recommendation, RiskTrigger, SignalState};
    use std::sync::Arc;
    use std::time::Duration;

    const SIGNAL: &str = "510880";
    const TARGET: &str = "515980";

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn settings() -> RiskSettings {
        RiskSettings {
            signal_symbol: SIGNAL.to_string(),
            target_symbol: TARGET.to_string(),
            periods: MacdPeriods { fast: 5, slow: 10, signal: 4 },
            vol_window: 10,
            corr_window: 10,
            splice_realtime: false,
            ..RiskSettings::default()
        }
    }

    fn fetch() -> FetchSettings {
        FetchSettings { start_date: start(), ..FetchSettings::default() }
    }

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600).unwrap().with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn provider(signal: &[f64], target: &[f64]) -> StaticProvider {
        StaticProvider::new("memory")
            .with_series(daily_series(SIGNAL, start(), signal))
            .with_series(daily_series(TARGET, start(), target))
    }

    fn chain(provider: StaticProvider) -> ProviderChain {
        ProviderChain::new(vec![Arc::new(provider)], RetryPolicy { max_attempts: 1, delay: Duration::ZERO })
    }

    /// Index of the first cross at or after `from` in the plain MACD frame of `closes`.
    fn first_cross(closes: &[f64], periods: MacdPeriods, from: usize) -> usize {
        let rows = IndicatorEngine::new(periods).macd_frame(&daily_series(SIGNAL, start(), closes));
        (from.max(1)..rows.len())
            .find(|&i| crate::signal::classify(&rows[i - 1], &rows[i]).is_cross())
            .expect("synthetic series should cross")
    }

    #[tokio::test]
    async fn test_cross_passes_with_uncorrelated_target() {
        let signal: Vec<f64> = (0..60)
            .map(|t| if t <= 40 { 100.0 - 0.8 * t as f64 } else { 68.0 + 1.5 * (t - 40) as f64 })
            .collect();
        let mut target = vec![50.0];
        for t in 1..60 {
            let step = if t % 2 == 0 { 0.01 } else { -0.01 };
            let prev = target[t - 1];
            target.push(prev * (1.0 + step));
        }
        let settings = settings();
        let k = first_cross(&signal, settings.periods, 41);
        let notifier = RecordingNotifier::default();

        let report = handle_run_risk(
            &settings,
            &fetch(),
            &chain(provider(&signal[..=k], &target[..=k])),
            &notifier,
            at(20, 16),
        )
        .await
        .unwrap();

        assert_eq!(report.state, SignalState::GoldenCross);
        assert!(!report.risk_triggered());

        let frame = align(
            &[&daily_series(SIGNAL, start(), &signal[..=k]), &daily_series(TARGET, start(), &target[..=k])],
            AlignMode::Inner,
        )
        .unwrap();
        let windows = RiskWindows { vol_window: settings.vol_window, corr_window: settings.corr_window };
        let rows = IndicatorEngine::new(settings.periods)
            .risk_frame(&frame, SIGNAL, TARGET, windows)
            .unwrap();
        let correlations: Vec<f64> = rows.iter().filter_map(|r| r.correlation).collect();
        assert_eq!(correlations.len(), rows.len() - settings.corr_window);
        assert!(
            correlations.iter().all(|c| *c < 0.5),
            "correlation should stay low throughout: {:?}",
            correlations
        );
        assert_eq!(report.outcome, Some(GateOutcome::Passed));
        assert_eq!(report.recommendation, Some(Recommendation::Sell));
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].0.contains("intercepted"));
        assert!(sent[0].1.contains("Action: sell 515980"));
    }

    #[tokio::test]
    async fn test_cross_intercepted_in_volatile_correlated_regime() {
        let signal: Vec<f64> = (0..60)
            .map(|t| {
                let trend = if t <= 30 { 100.0 - t as f64 } else { 70.0 + 2.0 * (t - 30) as f64 };
                let zigzag = if t % 2 == 0 { 1.03 } else { 0.97 };
                trend * zigzag
            })
            .collect();
        let target: Vec<f64> = signal.iter().map(|c| c * 2.0).collect();
        let settings = settings();
        let k = first_cross(&signal, settings.periods, settings.required_observations() - 1);
        let notifier = RecordingNotifier::default();

        let report = handle_run_risk(
            &settings,
            &fetch(),
            &chain(provider(&signal[..=k], &target[..=k])),
            &notifier,
            at(20, 10),
        )
        .await
        .unwrap();

        assert!(report.state.is_cross());
        assert!(report.risk_triggered());
        let risk = report.risk.as_ref().unwrap();
        assert!(matches!(risk.triggers[0], RiskTrigger::Extreme { .. }));
        assert_eq!(risk.reason(), Some(&RiskTrigger::Structural { window: 5 }));
        assert_eq!(report.outcome, Some(GateOutcome::Intercepted));
        assert_eq!(report.recommendation, None);
        assert_eq!(report.mode, SessionMode::Intraday);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("intercepted"));
        assert!(sent[0].1.contains("Action: hold"));
    }

    fn rising(n: usize) -> (Vec<f64>, Vec<f64>) {
        let signal: Vec<f64> = (0..n).map(|t| 100.0 + t as f64).collect();
        let target: Vec<f64> = (0..n).map(|t| 50.0 + if t % 2 == 0 { 0.5 } else { 0.0 }).collect();
        (signal, target)
    }

    #[tokio::test]
    async fn test_daily_report_only_in_closing_mode() {
        let (signal, target) = rising(30);
        let settings = settings();

        let notifier = RecordingNotifier::default();
        let report = handle_run_risk(&settings, &fetch(), &chain(provider(&signal, &target)), &notifier, at(30, 11))
            .await
            .unwrap();
        assert_eq!(report.state, SignalState::NoSignal);
        assert_eq!(report.outcome, None);
        assert!(notifier.sent().is_empty());

        let report = handle_run_risk(&settings, &fetch(), &chain(provider(&signal, &target)), &notifier, at(30, 15))
            .await
            .unwrap();
        assert_eq!(report.mode, SessionMode::Closing);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "[510880] daily report: no signal (closing confirmation)");
    }

    #[tokio::test]
    async fn test_realtime_quotes_are_spliced() {
        let (signal, target) = rising(30);
        let mut settings = settings();
        settings.splice_realtime = true;
        // history covers Jan 1..=Jan 30, the run happens on Jan 31
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let quoted = provider(&signal, &target).with_quote(SIGNAL, 130.0).with_quote(TARGET, 50.5);
        let notifier = RecordingNotifier::default();
        let report = handle_run_risk(&settings, &fetch(), &chain(quoted), &notifier, at(31, 10))
            .await
            .unwrap();
        assert_eq!(report.row.date, today);
        assert_eq!(report.row.close, 130.0);

        let half_quoted = provider(&signal, &target).with_quote(SIGNAL, 130.0);
        let report = handle_run_risk(&settings, &fetch(), &chain(half_quoted), &notifier, at(31, 10))
            .await
            .unwrap();
        assert_eq!(report.row.date, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        assert_eq!(report.row.close, 129.0);
    }

    #[tokio::test]
    async fn test_short_overlap_is_insufficient() {
        let (signal, target) = rising(30);
        let late_target = StaticProvider::new("memory")
            .with_series(daily_series(SIGNAL, start(), &signal))
            .with_series(daily_series(TARGET, start() + chrono::Duration::days(20), &target[..10]));
        let notifier = RecordingNotifier::default();
        let err = handle_run_risk(&settings(), &fetch(), &chain(late_target), &notifier, at(30, 16))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { required: 15, available: 10 }));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_aborts() {
        let signal: Vec<f64> = (0..30).map(|t| 100.0 + t as f64).collect();
        let only_signal = StaticProvider::new("memory").with_series(daily_series(SIGNAL, start(), &signal));
        let notifier = RecordingNotifier::default();
        let err = handle_run_risk(&settings(), &fetch(), &chain(only_signal), &notifier, at(30, 16))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FetchFailure { ref symbol, .. } if symbol == TARGET));
    }
}
