pub mod settings;

pub use settings::{
    FetchSettings, MacdPeriods, MacdSettings, MonitorSettings, NotifyChannel, NotifySettings, OverlaySettings,
    RiskSettings, SourceSettings,
};
