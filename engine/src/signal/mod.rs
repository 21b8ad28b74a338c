pub mod evaluator;
pub mod risk_gate;

pub use evaluator::{classify, evaluate, recommend};
pub use risk_gate::RiskGate;
