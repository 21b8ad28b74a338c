// Engine library root
// Signal monitoring for exchange-listed funds: price providers, indicators,
// the crossover evaluator with its risk gate, notifiers and command handlers.

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod notify;
pub mod services;
pub mod signal;
