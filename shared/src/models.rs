use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily closes for one instrument, ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Drops every point dated before `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self.points.iter().filter(|p| p.date >= start).copied().collect(),
        }
    }

    /// Moves every point forward by `days` calendar days.
    pub fn shifted(&self, days: i64) -> Self {
        let offset = Duration::days(days);
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .map(|p| PricePoint::new(p.date + offset, p.close))
                .collect(),
        }
    }

    /// Folds a realtime quote into the series: a newer date is appended, the
    /// current last date is overwritten, anything older is ignored. Returns
    /// whether the series changed.
    pub fn splice_latest(&mut self, date: NaiveDate, close: f64) -> bool {
        match self.points.last_mut() {
            Some(last) if last.date == date => {
                last.close = close;
                true
            }
            Some(last) if last.date > date => false,
            _ => {
                self.points.push(PricePoint::new(date, close));
                true
            }
        }
    }
}

/// One row of the indicator frame. MACD components are always present once a
/// row exists; return-based columns are only filled by the risk variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub dif: f64,
    pub dea: f64,
    pub macd: f64,
    pub ret: Option<f64>,
    pub target_ret: Option<f64>,
    pub volatility: Option<f64>,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    GoldenCross,
    DeathCross,
    NoSignal,
}

impl SignalState {
    pub fn is_cross(&self) -> bool {
        !matches!(self, SignalState::NoSignal)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalState::GoldenCross => "golden cross",
            SignalState::DeathCross => "death cross",
            SignalState::NoSignal => "no signal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RiskTrigger {
    /// Volatility and correlation both above their thresholds on the latest row.
    Extreme { volatility: f64, correlation: f64 },
    /// Correlation above the structural threshold for `window` consecutive rows.
    Structural { window: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Matched triggers in evaluation order.
    pub triggers: Vec<RiskTrigger>,
}

impl RiskAssessment {
    pub fn triggered(&self) -> bool {
        !self.triggers.is_empty()
    }

    /// The reported reason is the last trigger that matched.
    pub fn reason(&self) -> Option<&RiskTrigger> {
        self.triggers.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOutcome {
    Passed,
    Intercepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    Intraday,
    Closing,
}

impl SessionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::Intraday => "intraday alert",
            SessionMode::Closing => "closing confirmation",
        }
    }
}

/// Everything a run decided about the latest row, handed to the notifier layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub symbol: String,
    pub state: SignalState,
    pub row: IndicatorRow,
    pub mode: SessionMode,
    pub risk: Option<RiskAssessment>,
    pub outcome: Option<GateOutcome>,
    pub recommendation: Option<Recommendation>,
}

impl SignalReport {
    pub fn risk_triggered(&self) -> bool {
        self.risk.as_ref().map_or(false, RiskAssessment::triggered)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
