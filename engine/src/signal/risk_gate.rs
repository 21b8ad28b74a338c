// Suppresses crossover actions while volatility/correlation are in a risk regime
use crate::config::RiskSettings;
use shared::models::{GateOutcome, IndicatorRow, RiskAssessment, RiskTrigger, SignalState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskGate {
    pub vol_threshold: f64,
    pub corr_threshold: f64,
    pub structural_corr_threshold: f64,
    pub structural_window: usize,
}

impl From<&RiskSettings> for RiskGate {
    fn from(settings: &RiskSettings) -> Self {
        RiskGate {
            vol_threshold: settings.vol_threshold,
            corr_threshold: settings.corr_threshold,
            structural_corr_threshold: settings.structural_corr_threshold,
            structural_window: settings.structural_window,
        }
    }
}

impl RiskGate {
    /// Extreme trigger: both strictly above their thresholds. Undefined inputs never fire.
    pub fn extreme(&self, volatility: Option<f64>, correlation: Option<f64>) -> Option<RiskTrigger> {
        match (volatility, correlation) {
            (Some(v), Some(c)) if v > self.vol_threshold && c > self.corr_threshold => Some(RiskTrigger::Extreme {
                volatility: v,
                correlation: c,
            }),
            _ => None,
        }
    }

    /// Structural trigger: the last `structural_window` correlations all exist and
    /// all exceed the structural threshold. A shorter tail never fires.
    pub fn structural(&self, recent: &[Option<f64>]) -> Option<RiskTrigger> {
        let n = self.structural_window;
        if n == 0 || recent.len() < n {
            return None;
        }
        let tail = &recent[recent.len() - n..];
        tail.iter()
            .all(|c| matches!(c, Some(v) if *v > self.structural_corr_threshold))
            .then_some(RiskTrigger::Structural { window: n })
    }

    /// Evaluates both triggers on the latest row of `rows`. Every matched trigger is
    /// recorded in order; the last one is the reported reason.
    pub fn assess(&self, rows: &[IndicatorRow]) -> RiskAssessment {
        let mut triggers = Vec::new();
        if let Some(curr) = rows.last() {
            if let Some(t) = self.extreme(curr.volatility, curr.correlation) {
                triggers.push(t);
            }
        }
        let correlations: Vec<Option<f64>> = rows.iter().map(|r| r.correlation).collect();
        if let Some(t) = self.structural(&correlations) {
            triggers.push(t);
        }
        RiskAssessment { triggers }
    }

    /// Only a fired cross can be intercepted.
    pub fn outcome(state: SignalState, risk: &RiskAssessment) -> Option<GateOutcome> {
        if !state.is_cross() {
            return None;
        }
        Some(if risk.triggered() {
            GateOutcome::Intercepted
        } else {
            GateOutcome::Passed
        })
    }
}
