use super::Notifier;
use crate::error::EngineResult;
use async_trait::async_trait;

/// Writes messages to the log. Used for dry runs and when no channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, title: &str, body: &str) -> EngineResult<()> {
        tracing::info!(title = %title, "Notification (log only)");
        for line in body.lines() {
            tracing::info!("  {}", line);
        }
        Ok(())
    }
}
