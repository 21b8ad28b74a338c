// MACD crossover classification over the two most recent rows
use crate::error::{EngineError, EngineResult};
use shared::models::{IndicatorRow, Recommendation, SignalState};

/// Strict on both rows: a tie between dif and dea never produces a cross.
pub fn classify(prev: &IndicatorRow, curr: &IndicatorRow) -> SignalState {
    if prev.dif < prev.dea && curr.dif > curr.dea {
        SignalState::GoldenCross
    } else if prev.dif > prev.dea && curr.dif < curr.dea {
        SignalState::DeathCross
    } else {
        SignalState::NoSignal
    }
}

/// Classifies the last two rows of a frame.
pub fn evaluate(rows: &[IndicatorRow]) -> EngineResult<SignalState> {
    match rows {
        [.., prev, curr] => Ok(classify(prev, curr)),
        _ => Err(EngineError::ComputationPrecondition(format!(
            "need at least 2 indicator rows to evaluate a cross, have {}",
            rows.len()
        ))),
    }
}

/// Maps a cross to an action on the traded instrument. The contrarian mapping
/// sells on a golden cross of the signal instrument and buys on a death cross.
pub fn recommend(state: SignalState, inverse: bool) -> Option<Recommendation> {
    match (state, inverse) {
        (SignalState::GoldenCross, true) | (SignalState::DeathCross, false) => Some(Recommendation::Sell),
        (SignalState::DeathCross, true) | (SignalState::GoldenCross, false) => Some(Recommendation::Buy),
        (SignalState::NoSignal, _) => None,
    }
}
