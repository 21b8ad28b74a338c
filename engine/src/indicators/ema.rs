// Exponential Moving Average (EMA), seeded with the first observation
use super::IndicatorCalculator;
use serde_json::Value;

pub struct Ema {
    name: String,
    span: usize,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Self {
            name: format!("EMA({})", span),
            span,
        }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }

    /// `ema[0] = x[0]`, `ema[t] = a*x[t] + (1-a)*ema[t-1]`.
    pub fn series(&self, data: &[f64]) -> Vec<f64> {
        let alpha = self.alpha();
        let mut results = Vec::with_capacity(data.len());
        let mut previous: Option<f64> = None;
        for &value in data {
            let ema = match previous {
                None => value,
                Some(prev) => alpha * value + (1.0 - alpha) * prev,
            };
            results.push(ema);
            previous = Some(ema);
        }
        results
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "span": self.span, "alpha": self.alpha() })
    }

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        if self.span == 0 {
            return vec![None; data.len()];
        }
        self.series(data).into_iter().map(Some).collect()
    }
}
