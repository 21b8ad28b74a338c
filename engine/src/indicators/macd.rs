// MACD built from first-value-seeded EMAs
use super::{Ema, IndicatorCalculator};
use crate::config::MacdPeriods;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub macd: Vec<f64>,
}

impl MacdSeries {
    pub fn len(&self) -> usize {
        self.dif.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dif.is_empty()
    }
}

pub struct Macd {
    name: String,
    periods: MacdPeriods,
}

impl Macd {
    pub fn new(periods: MacdPeriods) -> Self {
        Self {
            name: format!("MACD({},{},{})", periods.fast, periods.slow, periods.signal),
            periods,
        }
    }

    pub fn periods(&self) -> MacdPeriods {
        self.periods
    }

    pub fn compute(&self, closes: &[f64]) -> MacdSeries {
        let ema_fast = Ema::new(self.periods.fast).series(closes);
        let ema_slow = Ema::new(self.periods.slow).series(closes);
        let dif: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
        let dea = Ema::new(self.periods.signal).series(&dif);
        let macd = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();
        MacdSeries {
            ema_fast,
            ema_slow,
            dif,
            dea,
            macd,
        }
    }
}

impl IndicatorCalculator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "fast": self.periods.fast,
            "slow": self.periods.slow,
            "signal": self.periods.signal,
        })
    }

    /// The histogram column (`2 * (dif - dea)`).
    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        self.compute(data).macd.into_iter().map(Some).collect()
    }
}
