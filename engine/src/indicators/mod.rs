// Technical indicators module
pub mod correlation;
pub mod ema;
pub mod frame;
pub mod macd;
pub mod returns;
pub mod volatility;

pub use correlation::RollingCorrelation;
pub use ema::Ema;
pub use frame::{IndicatorEngine, RiskWindows};
pub use macd::{Macd, MacdSeries};
pub use returns::Returns;
pub use volatility::RollingVolatility;

use serde_json::Value;

// Common trait for single-series indicators over a close sequence
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this indicator instance
    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>>; // None where the value is undefined (warm-up)
}

/// Trailing windows over an optional series: `f` sees the last `window` values
/// ending at each index, and the output is `None` unless all of them are defined.
pub(crate) fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut results = vec![None; values.len()];
    if window == 0 {
        return results;
    }
    let mut buf = Vec::with_capacity(window);
    for end in (window - 1)..values.len() {
        buf.clear();
        buf.extend(values[end + 1 - window..=end].iter().flatten().copied());
        if buf.len() == window {
            results[end] = f(&buf);
        }
    }
    results
}
