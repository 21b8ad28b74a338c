// Notification delivery behind a single capability trait
pub mod log;
pub mod pushplus;
pub mod wxpusher;

pub use self::log::LogNotifier;
pub use pushplus::PushPlusNotifier;
pub use wxpusher::WxPusherNotifier;

use crate::config::{NotifyChannel, NotifySettings};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Delivers one message. `body` is plain text, one item per line.
    async fn notify(&self, title: &str, body: &str) -> EngineResult<()>;
}

/// Picks the configured channel; `dry_run` always logs instead of sending.
pub fn build_notifier(settings: &NotifySettings, timeout: Duration, dry_run: bool) -> EngineResult<Arc<dyn Notifier>> {
    if dry_run {
        return Ok(Arc::new(LogNotifier));
    }
    let missing = |what: &str| EngineError::ConfigError(format!("notify: {} is not set", what));
    let notifier: Arc<dyn Notifier> = match settings.channel {
        NotifyChannel::Log => Arc::new(LogNotifier),
        NotifyChannel::Pushplus => {
            let token = settings.pushplus_token.clone().ok_or_else(|| missing("PUSHPLUS_TOKEN"))?;
            Arc::new(PushPlusNotifier::new(token, timeout)?)
        }
        NotifyChannel::Wxpusher => {
            let token = settings.wxpusher_token.clone().ok_or_else(|| missing("WXPUSHER_TOKEN"))?;
            let uid = settings.wxpusher_uid.clone().ok_or_else(|| missing("WXPUSHER_UID"))?;
            Arc::new(WxPusherNotifier::new(token, uid, timeout)?)
        }
    };
    Ok(notifier)
}

/// Escapes a plain-text body and joins its lines with `<br>` for HTML channels.
pub fn html_body(body: &str) -> String {
    body.lines()
        .map(|line| line.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"))
        .collect::<Vec<_>>()
        .join("<br>")
}
