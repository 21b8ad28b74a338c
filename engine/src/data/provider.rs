// Price series providers and the ordered fallback chain with bounded retries
use crate::config::FetchSettings;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::PriceSeries;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this source knows the symbol at all; the chain skips it otherwise.
    fn supports(&self, _symbol: &str) -> bool {
        true
    }

    /// Daily closes from `start` up to the latest available session.
    async fn fetch_daily(&self, symbol: &str, start: NaiveDate) -> EngineResult<PriceSeries>;

    /// Latest traded price, when the source offers one.
    async fn latest_quote(&self, _symbol: &str) -> EngineResult<Option<f64>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl From<&FetchSettings> for RetryPolicy {
    fn from(settings: &FetchSettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts.max(1),
            delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}

/// Providers tried in order, each up to `max_attempts` times.
pub struct ProviderChain {
    providers: Vec<Arc<dyn PriceProvider>>,
    retry: RetryPolicy,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>, retry: RetryPolicy) -> Self {
        Self { providers, retry }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of the providers that serve `symbol`, in chain order.
    pub fn sources_for(&self, symbol: &str) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.supports(symbol))
            .map(|p| p.name())
            .collect()
    }

    fn serving<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Arc<dyn PriceProvider>> + 'a {
        self.providers.iter().filter(move |p| p.supports(symbol))
    }

    /// First non-empty series wins; exhausting every provider yields `FetchFailure`.
    pub async fn fetch_daily(&self, symbol: &str, start: NaiveDate) -> EngineResult<PriceSeries> {
        let mut attempts = 0;
        let mut last_error = if self.providers.is_empty() {
            "no providers configured".to_string()
        } else {
            format!("no configured source serves '{}'", symbol)
        };

        for provider in self.serving(symbol) {
            for attempt in 1..=self.retry.max_attempts {
                attempts += 1;
                match provider.fetch_daily(symbol, start).await {
                    Ok(series) if !series.is_empty() => {
                        tracing::info!(symbol = %symbol, provider = provider.name(), attempt, rows = series.len(), "Fetched daily series");
                        return Ok(series);
                    }
                    Ok(_) => {
                        last_error = format!("{} returned no rows", provider.name());
                    }
                    Err(e) => {
                        last_error = format!("{}: {}", provider.name(), e);
                    }
                }
                tracing::warn!(symbol = %symbol, provider = provider.name(), attempt, error = %last_error, "Fetch attempt failed");
                if attempt < self.retry.max_attempts && !self.retry.delay.is_zero() {
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }

        Err(EngineError::FetchFailure {
            symbol: symbol.to_string(),
            attempts,
            reason: last_error,
        })
    }

    /// Best effort: the first provider that returns a quote wins, errors are logged and skipped.
    pub async fn latest_quote(&self, symbol: &str) -> Option<f64> {
        for provider in self.serving(symbol) {
            match provider.latest_quote(symbol).await {
                Ok(Some(price)) => return Some(price),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(symbol = %symbol, provider = provider.name(), error = %e, "Realtime quote unavailable");
                }
            }
        }
        None
    }
}
