// Monitor settings, loaded from a JSON file and completed with credentials from the environment.
use crate::error::EngineError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest accepted overlay lag, in either direction.
pub const MAX_LAG_DAYS: i64 = 3650;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MonitorSettings {
    pub macd: MacdSettings,
    pub risk: RiskSettings,
    pub overlay: OverlaySettings,
    pub fetch: FetchSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MacdPeriods {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl MacdPeriods {
    /// Observations needed before a MACD cross is evaluated.
    pub fn required_observations(&self) -> usize {
        self.slow + self.signal
    }

    fn validate(&self, section: &str) -> Result<(), EngineError> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(EngineError::ConfigError(format!("{}: MACD spans must be positive", section)));
        }
        if self.fast >= self.slow {
            return Err(EngineError::ConfigError(format!(
                "{}: fast span ({}) must be smaller than slow span ({})",
                section, self.fast, self.slow
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MacdSettings {
    pub symbol: String,
    /// Fund the recommendation is addressed to.
    pub target_symbol: String,
    pub periods: MacdPeriods,
    /// Send a "no signal" line even when nothing crossed.
    pub daily_report: bool,
    pub inverse_strategy: bool,
}

impl Default for MacdSettings {
    fn default() -> Self {
        MacdSettings {
            symbol: "510880".to_string(),
            target_symbol: "515980".to_string(),
            periods: MacdPeriods { fast: 20, slow: 40, signal: 15 },
            daily_report: false,
            inverse_strategy: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiskSettings {
    pub signal_symbol: String,
    pub target_symbol: String,
    pub periods: MacdPeriods,
    pub vol_window: usize,
    pub corr_window: usize,
    pub vol_threshold: f64,
    pub corr_threshold: f64,
    pub structural_corr_threshold: f64,
    pub structural_window: usize,
    /// Local hour (in `utc_offset_hours`) from which a run counts as closing confirmation.
    pub closing_hour: u32,
    pub utc_offset_hours: i32,
    pub splice_realtime: bool,
    pub inverse_strategy: bool,
}

impl Default for RiskSettings {
    fn default() -> Self {
        RiskSettings {
            signal_symbol: "510880".to_string(),
            target_symbol: "515980".to_string(),
            periods: MacdPeriods { fast: 21, slow: 42, signal: 16 },
            vol_window: 20,
            corr_window: 20,
            vol_threshold: 0.03,
            corr_threshold: 0.7,
            structural_corr_threshold: 0.8,
            structural_window: 5,
            closing_hour: 15,
            utc_offset_hours: 8,
            splice_realtime: true,
            inverse_strategy: true,
        }
    }
}

impl RiskSettings {
    pub fn required_observations(&self) -> usize {
        self.periods.slow.max(self.corr_window) + self.structural_window
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverlaySettings {
    pub primary_symbol: String,
    pub numerator_symbol: String,
    pub denominator_symbol: String,
    pub fetch_start: NaiveDate,
    pub view_start: NaiveDate,
    pub lag_days: i64,
    pub output_path: PathBuf,
    pub utc_offset_hours: i32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        OverlaySettings {
            primary_symbol: "HSTECH".to_string(),
            numerator_symbol: "CAD".to_string(),
            denominator_symbol: "OIL".to_string(),
            fetch_start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            view_start: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap_or_default(),
            lag_days: 150,
            output_path: PathBuf::from("overlay.csv"),
            utc_offset_hours: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSettings {
    /// Mainland funds and Hang Seng indices.
    Eastmoney,
    /// Foreign futures.
    Sina,
    Csv { dir: PathBuf },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchSettings {
    /// History start for the signal commands.
    pub start_date: NaiveDate,
    /// Providers, tried in order.
    pub sources: Vec<SourceSettings>,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub http_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            start_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            sources: vec![SourceSettings::Eastmoney, SourceSettings::Sina],
            max_attempts: 3,
            retry_delay_ms: 2000,
            http_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    #[default]
    Log,
    Pushplus,
    Wxpusher,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifySettings {
    pub channel: NotifyChannel,
    pub pushplus_token: Option<String>,
    pub wxpusher_token: Option<String>,
    pub wxpusher_uid: Option<String>,
    /// Send a message when upstream data could not be fetched.
    pub report_failures: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        NotifySettings {
            channel: NotifyChannel::Log,
            pushplus_token: None,
            wxpusher_token: None,
            wxpusher_uid: None,
            report_failures: true,
        }
    }
}

impl MonitorSettings {
    /// Reads settings from a JSON file, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    EngineError::ConfigError(format!("Failed to read config file '{}': {}", p.display(), e))
                })?;
                Self::from_json(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw).map_err(|e| EngineError::ConfigError(format!("Invalid config JSON: {}", e)))
    }

    /// Fills credentials from the environment. Values already present in the file win
    /// only when the variable is unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty("PUSHPLUS_TOKEN") {
            self.notify.pushplus_token = Some(token);
        }
        if let Some(token) = non_empty("WXPUSHER_TOKEN") {
            self.notify.wxpusher_token = Some(token);
        }
        if let Some(uid) = non_empty("WXPUSHER_UID") {
            self.notify.wxpusher_uid = Some(uid);
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.macd.periods.validate("macd")?;
        self.risk.periods.validate("risk")?;

        if self.risk.vol_window < 2 || self.risk.corr_window < 2 {
            return Err(EngineError::ConfigError(
                "risk: volatility and correlation windows must be at least 2".to_string(),
            ));
        }
        if self.risk.structural_window == 0 {
            return Err(EngineError::ConfigError("risk: structural_window must be positive".to_string()));
        }
        if self.risk.closing_hour > 23 || self.risk.utc_offset_hours.abs() > 14 {
            return Err(EngineError::ConfigError("risk: invalid session clock settings".to_string()));
        }
        if self.overlay.lag_days.unsigned_abs() > MAX_LAG_DAYS.unsigned_abs() {
            return Err(EngineError::ConfigError(format!(
                "overlay: lag_days must be within +/-{} days, got {}",
                MAX_LAG_DAYS, self.overlay.lag_days
            )));
        }
        if self.overlay.view_start < self.overlay.fetch_start {
            return Err(EngineError::ConfigError("overlay: view_start precedes fetch_start".to_string()));
        }
        if self.fetch.sources.is_empty() {
            return Err(EngineError::ConfigError("fetch: at least one source is required".to_string()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(EngineError::ConfigError("fetch: max_attempts must be positive".to_string()));
        }

        match self.notify.channel {
            NotifyChannel::Log => {}
            NotifyChannel::Pushplus => {
                if self.notify.pushplus_token.is_none() {
                    return Err(EngineError::ConfigError("notify: PUSHPLUS_TOKEN is not set".to_string()));
                }
            }
            NotifyChannel::Wxpusher => {
                if self.notify.wxpusher_token.is_none() || self.notify.wxpusher_uid.is_none() {
                    return Err(EngineError::ConfigError(
                        "notify: WXPUSHER_TOKEN and WXPUSHER_UID must both be set".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
