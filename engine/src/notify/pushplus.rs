// PushPlus webhook delivery
use super::{html_body, Notifier};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const SEND_URL: &str = "http://www.pushplus.plus/send";

#[derive(Debug, Serialize)]
struct PushPlusPayload<'a> {
    token: &'a str,
    title: &'a str,
    content: String,
    template: &'a str,
}

pub struct PushPlusNotifier {
    client: Client,
    token: String,
}

impl PushPlusNotifier {
    pub fn new(token: String, timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, token })
    }
}

/// PushPlus answers HTTP 200 with `{"code": 200, ...}` on success and another code otherwise.
pub fn check_response(body: &str) -> EngineResult<()> {
    let value: Value = serde_json::from_str(body)?;
    match value.get("code").and_then(Value::as_i64) {
        Some(200) => Ok(()),
        code => Err(EngineError::NotifyError(format!(
            "pushplus rejected message (code {:?}): {}",
            code,
            value.get("msg").and_then(Value::as_str).unwrap_or("no message")
        ))),
    }
}

#[async_trait]
impl Notifier for PushPlusNotifier {
    fn name(&self) -> &str {
        "pushplus"
    }

    async fn notify(&self, title: &str, body: &str) -> EngineResult<()> {
        let payload = PushPlusPayload {
            token: &self.token,
            title,
            content: html_body(body),
            template: "html",
        };
        let response = self.client.post(SEND_URL).json(&payload).send().await?.error_for_status()?;
        let text = response.text().await?;
        check_response(&text)?;
        tracing::info!(title = %title, "PushPlus message delivered");
        Ok(())
    }
}
