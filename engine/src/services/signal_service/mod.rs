// engine/src/services/signal_service/mod.rs
// SignalService owns the settings, provider chain and notifier for one run and
// dispatches each command to its handler module.

pub mod build_overlay;
pub mod helpers;
pub mod run_macd;
pub mod run_risk;

pub use build_overlay::{OverlayReport, OverlayRow};

use crate::config::MonitorSettings;
use crate::data::provider::ProviderChain;
use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use chrono::{DateTime, FixedOffset};
use shared::models::SignalReport;
use std::sync::Arc;

pub struct SignalService {
    settings: MonitorSettings,
    chain: ProviderChain,
    notifier: Arc<dyn Notifier>,
}

impl SignalService {
    pub fn new(settings: MonitorSettings, chain: ProviderChain, notifier: Arc<dyn Notifier>) -> Self {
        SignalService { settings, chain, notifier }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub async fn run_macd(&self, now: DateTime<FixedOffset>) -> EngineResult<SignalReport> {
        tracing::info!(symbol = %self.settings.macd.symbol, "Running MACD check, dispatching to handler.");
        let mode = helpers::session_mode(&now, self.settings.risk.closing_hour);
        run_macd::handle_run_macd(&self.settings.macd, &self.settings.fetch, &self.chain, self.notifier.as_ref(), mode)
            .await
    }

    pub async fn run_risk(&self, now: DateTime<FixedOffset>) -> EngineResult<SignalReport> {
        tracing::info!(
            signal = %self.settings.risk.signal_symbol,
            target = %self.settings.risk.target_symbol,
            "Running risk-gated check, dispatching to handler."
        );
        run_risk::handle_run_risk(&self.settings.risk, &self.settings.fetch, &self.chain, self.notifier.as_ref(), now)
            .await
    }

    pub async fn build_overlay(&self, now: DateTime<FixedOffset>) -> EngineResult<OverlayReport> {
        tracing::info!(
            primary = %self.settings.overlay.primary_symbol,
            output = %self.settings.overlay.output_path.display(),
            "Building overlay, dispatching to handler."
        );
        build_overlay::handle_build_overlay(&self.settings.overlay, &self.chain, self.notifier.as_ref(), now.date_naive())
            .await
    }

    /// Sends an aborted-run message when failure reporting is enabled.
    pub async fn report_failure(&self, command: &str, err: &EngineError) -> bool {
        helpers::report_failure(self.notifier.as_ref(), self.settings.notify.report_failures, command, err).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::test_support::{daily_series, StaticProvider};
    use crate::data::provider::RetryPolicy;
    use crate::notify::test_support::RecordingNotifier;
    use chrono::{NaiveDate, TimeZone};
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_failure_is_reported_once() {
        let mut settings = MonitorSettings::default();
        settings.fetch.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let provider = StaticProvider::new("memory").failing_first(10).with_series(daily_series(
            "510880",
            settings.fetch.start_date,
            &[1.0, 2.0, 3.0],
        ));
        let chain = ProviderChain::new(vec![Arc::new(provider)], RetryPolicy { max_attempts: 3, delay: Duration::ZERO });
        let notifier = Arc::new(RecordingNotifier::default());
        let service = SignalService::new(settings, chain, notifier.clone());
        let now = FixedOffset::east_opt(8 * 3600).unwrap().with_ymd_and_hms(2024, 1, 3, 15, 5, 0).unwrap();

        let err = service.run_macd(now).await.unwrap_err();
        assert!(matches!(err, EngineError::FetchFailure { attempts: 3, .. }));
        assert!(service.report_failure("macd", &err).await);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "[macd] run aborted");
    }
}
