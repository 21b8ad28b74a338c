// Helper functions shared by the signal_service command handlers
use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use shared::models::{GateOutcome, Recommendation, RiskTrigger, SessionMode, SignalReport};
use shared::utils::{format_decimal, format_optional, format_percent};

/// Current wall-clock time at a fixed UTC offset.
pub fn local_now(utc_offset_hours: i32) -> EngineResult<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .ok_or_else(|| EngineError::ConfigError(format!("invalid UTC offset: {} hours", utc_offset_hours)))?;
    Ok(Utc::now().with_timezone(&offset))
}

/// Closing at or after `closing_hour` local time, intraday before it.
pub fn session_mode(now: &DateTime<FixedOffset>, closing_hour: u32) -> SessionMode {
    if now.hour() >= closing_hour {
        SessionMode::Closing
    } else {
        SessionMode::Intraday
    }
}

pub fn ensure_observations(required: usize, available: usize) -> EngineResult<()> {
    if available < required {
        return Err(EngineError::InsufficientData { required, available });
    }
    Ok(())
}

pub fn describe_trigger(trigger: &RiskTrigger) -> String {
    match trigger {
        RiskTrigger::Extreme { volatility, correlation } => format!(
            "extreme regime (volatility {}, correlation {})",
            format_percent(*volatility, 2),
            format_decimal(*correlation, 2)
        ),
        RiskTrigger::Structural { window } => {
            format!("structural regime (correlation elevated for {} sessions)", window)
        }
    }
}

fn action_line(report: &SignalReport, action_symbol: &str) -> String {
    match (report.outcome, report.recommendation) {
        (Some(GateOutcome::Intercepted), _) => "Action: hold (signal intercepted by risk gate)".to_string(),
        (_, Some(Recommendation::Buy)) => format!("Action: buy {}", action_symbol),
        (_, Some(Recommendation::Sell)) => format!("Action: sell {}", action_symbol),
        (_, None) => "Action: none".to_string(),
    }
}

pub fn signal_title(report: &SignalReport) -> String {
    let mut title = format!("[{}] {}", report.symbol, report.state.label());
    if report.outcome == Some(GateOutcome::Intercepted) {
        title.push_str(" intercepted");
    }
    format!("{} ({})", title, report.mode.label())
}

/// Plain-text body, one item per line.
pub fn signal_body(report: &SignalReport, action_symbol: &str) -> String {
    let row = &report.row;
    let mut lines = vec![
        format!("Date: {}", row.date),
        format!("Close: {}", format_decimal(row.close, 3)),
        format!(
            "DIF: {}  DEA: {}  MACD: {}",
            format_decimal(row.dif, 4),
            format_decimal(row.dea, 4),
            format_decimal(row.macd, 4)
        ),
    ];
    if let Some(risk) = &report.risk {
        lines.push(format!(
            "Volatility: {}  Correlation: {}",
            format_optional(row.volatility, 2, true),
            format_optional(row.correlation, 2, false)
        ));
        lines.push(match risk.reason() {
            Some(reason) => format!("Risk: triggered, {}", describe_trigger(reason)),
            None => "Risk: clear".to_string(),
        });
    }
    if report.state.is_cross() {
        lines.push(action_line(report, action_symbol));
    }
    lines.join("\n")
}

/// Sends a message; delivery failures are logged and never abort the run.
pub async fn deliver(notifier: &dyn Notifier, title: &str, body: &str) -> bool {
    match notifier.notify(title, body).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(notifier = notifier.name(), title = %title, error = %e, "Notification failed");
            false
        }
    }
}

/// Reports an aborted run through the notifier when failure reporting is enabled.
pub async fn report_failure(notifier: &dyn Notifier, enabled: bool, command: &str, err: &EngineError) -> bool {
    if !enabled {
        return false;
    }
    let title = format!("[{}] run aborted", command);
    deliver(notifier, &title, &err.to_string()).await
}
