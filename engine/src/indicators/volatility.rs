// Rolling volatility: sample standard deviation of simple returns
use super::{rolling, IndicatorCalculator, Returns};
use serde_json::Value;

pub struct RollingVolatility {
    name: String,
    window: usize,
}

impl RollingVolatility {
    pub fn new(window: usize) -> Self {
        Self {
            name: format!("VOL({})", window),
            window,
        }
    }

    /// Volatility over an already computed return column.
    pub fn over_returns(&self, returns: &[Option<f64>]) -> Vec<Option<f64>> {
        if self.window < 2 {
            return vec![None; returns.len()];
        }
        rolling(returns, self.window, sample_std)
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    std.is_finite().then_some(std)
}

impl IndicatorCalculator for RollingVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "window": self.window, "ddof": 1 })
    }

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        self.over_returns(&Returns.calculate(data))
    }
}
